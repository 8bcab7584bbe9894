//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - model_name: Apex 7950
//!     category: CPU
//!     price: "649.00"
//!     stock: 12
//!     specs:
//!       cpu: 16 cores / 32 threads
//! ```
//!
//! Every entry is validated before the database is touched, so a bad file
//! inserts nothing.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use rigstore_api::db::PgStore;
use rigstore_api::services::catalog::{CatalogService, ProductDraft};

use super::connect;

/// Top-level shape of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductDraft>,
}

/// Parse a catalog file and check every entry.
///
/// # Errors
///
/// Returns one message per invalid entry, or a single message if the YAML
/// itself does not parse.
pub fn parse_catalog(content: &str) -> Result<Vec<ProductDraft>, Vec<String>> {
    let file: CatalogFile = serde_yaml::from_str(content).map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = file
        .products
        .iter()
        .enumerate()
        .filter_map(|(i, draft)| {
            draft
                .clone()
                .validate()
                .err()
                .map(|e| format!("entry {}: {e}", i + 1))
        })
        .collect();

    if errors.is_empty() {
        Ok(file.products)
    } else {
        Err(errors)
    }
}

/// Insert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, fails validation, or the
/// database rejects an insert.
pub async fn catalog(file_path: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;

    let drafts = match parse_catalog(&content) {
        Ok(drafts) => drafts,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(products = drafts.len(), "Catalog validated");

    let store = PgStore::new(connect().await?);
    let catalog = CatalogService::new(&store);

    let mut inserted = 0;
    for draft in drafts {
        let product = catalog.create(draft).await?;
        info!(id = %product.id, model = %product.model_name, "Inserted product");
        inserted += 1;
    }

    info!("Seeding complete! Products inserted: {inserted}");
    Ok(inserted)
}
