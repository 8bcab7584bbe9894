//! Revenue Aggregator: per-category revenue over orders in one status.
//!
//! Recomputed from scratch on every call.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;

use rigstore_core::OrderStatus;

use crate::db::{RepositoryError, Store};
use crate::models::{CategoryRevenue, RevenueLine};

/// Errors from revenue reporting.
#[derive(Debug, Error)]
pub enum RevenueError {
    #[error("revenue for category {0:?} is too large to report")]
    Overflow(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Group lines by category, summing `unit_price * quantity` and units.
///
/// Sorted by total descending, ties by category name ascending.
///
/// # Errors
///
/// Returns `RevenueError::Overflow` if a category total does not fit a `Decimal`.
pub fn aggregate_revenue(lines: &[RevenueLine]) -> Result<Vec<CategoryRevenue>, RevenueError> {
    let mut by_category: BTreeMap<&str, (Decimal, i64)> = BTreeMap::new();
    for line in lines {
        let entry = by_category
            .entry(line.category.as_str())
            .or_insert((Decimal::ZERO, 0));
        entry.0 = line
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|amount| entry.0.checked_add(amount))
            .ok_or_else(|| RevenueError::Overflow(line.category.clone()))?;
        entry.1 = entry
            .1
            .checked_add(i64::from(line.quantity))
            .ok_or_else(|| RevenueError::Overflow(line.category.clone()))?;
    }

    let mut rows: Vec<CategoryRevenue> = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryRevenue {
            category: category.to_owned(),
            total,
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    Ok(rows)
}

/// Revenue by category for orders currently in `status`.
///
/// # Errors
///
/// Returns `RevenueError::Repository` if the store is unreachable and
/// `RevenueError::Overflow` if a total cannot be represented.
pub async fn revenue_by_category(
    store: &dyn Store,
    status: OrderStatus,
) -> Result<Vec<CategoryRevenue>, RevenueError> {
    let lines = store.revenue_lines(status).await?;
    aggregate_revenue(&lines)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(category: &str, price: i64, quantity: i32) -> RevenueLine {
        RevenueLine {
            category: category.to_owned(),
            unit_price: Decimal::from(price),
            quantity,
        }
    }

    #[test]
    fn test_aggregate_sums_price_times_quantity() {
        let rows = aggregate_revenue(&[
            line("laptop", 1000, 2),
            line("gpu", 700, 1),
            line("laptop", 500, 1),
        ])
        .unwrap();

        assert_eq!(
            rows,
            vec![
                CategoryRevenue {
                    category: "laptop".to_owned(),
                    total: Decimal::from(2500),
                    count: 3,
                },
                CategoryRevenue {
                    category: "gpu".to_owned(),
                    total: Decimal::from(700),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_ties_break_by_category() {
        let rows = aggregate_revenue(&[line("b", 10, 1), line("a", 5, 2)]).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_revenue(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_totals_are_nondecreasing_in_reverse() {
        let rows = aggregate_revenue(&[
            line("a", 3, 7),
            line("b", 100, 1),
            line("c", 1, 1),
            line("d", 40, 2),
        ])
        .unwrap();
        assert!(rows.windows(2).all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn test_aggregate_reports_overflow() {
        let huge = RevenueLine {
            category: "server".to_owned(),
            unit_price: Decimal::MAX,
            quantity: 2,
        };
        let err = aggregate_revenue(&[huge.clone()]).unwrap_err();
        assert!(matches!(err, RevenueError::Overflow(ref c) if c == "server"));

        let single = RevenueLine { quantity: 1, ..huge };
        let err = aggregate_revenue(&[single.clone(), single]).unwrap_err();
        assert!(matches!(err, RevenueError::Overflow(_)));
    }
}
