//! Revenue reporting over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use rigstore_integration_tests::{TestServer, decimal};

async fn place(server: &TestServer, token: &str, product_id: i64, quantity: i64) -> i64 {
    let resp = server
        .post(
            "/api/orders",
            Some(token),
            &json!({ "items": [{ "product_id": product_id, "quantity": quantity }] }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
}

async fn set_status(server: &TestServer, admin: &str, order_id: i64, status: &str) {
    let resp = server
        .put(
            &format!("/api/orders/{order_id}"),
            Some(admin),
            &json!({ "status": status }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn revenue(server: &TestServer, admin: &str, query: &str) -> Vec<Value> {
    let resp = server
        .get(&format!("/api/stats/revenue{query}"), Some(admin))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_revenue_groups_delivered_orders_by_category() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let gpu = server.create_product(&admin, "GPU", "GPU", "600", 10).await;
    let cpu = server.create_product(&admin, "CPU", "CPU", "300", 10).await;
    let psu = server.create_product(&admin, "PSU", "PSU", "100", 10).await;
    let token = server.register("Ada", "ada@example.com").await;

    let a = place(&server, &token, gpu, 1).await;
    let b = place(&server, &token, cpu, 2).await;
    let c = place(&server, &token, psu, 6).await;
    let pending = place(&server, &token, gpu, 3).await;
    for id in [a, b, c] {
        set_status(&server, &admin, id, "Delivered").await;
    }
    set_status(&server, &admin, pending, "Shipped").await;

    let rows = revenue(&server, &admin, "").await;
    let summary: Vec<(String, Decimal, i64)> = rows
        .iter()
        .map(|r| {
            (
                r["category"].as_str().unwrap().to_owned(),
                decimal(&r["total"]),
                r["count"].as_i64().unwrap(),
            )
        })
        .collect();

    // Ties on total are broken by category name.
    assert_eq!(
        summary,
        vec![
            ("CPU".to_owned(), Decimal::from(600), 2),
            ("GPU".to_owned(), Decimal::from(600), 1),
            ("PSU".to_owned(), Decimal::from(600), 6),
        ]
    );

    let shipped = revenue(&server, &admin, "?status=Shipped").await;
    assert_eq!(shipped.len(), 1);
    assert_eq!(decimal(&shipped[0]["total"]), Decimal::from(1800));
}

#[tokio::test]
async fn test_revenue_skips_deleted_products() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let kept = server.create_product(&admin, "Kept", "Case", "50", 10).await;
    let gone = server.create_product(&admin, "Gone", "Fan", "20", 10).await;
    let token = server.register("Ada", "ada@example.com").await;

    for product in [kept, gone] {
        let id = place(&server, &token, product, 1).await;
        set_status(&server, &admin, id, "Delivered").await;
    }
    server.delete(&format!("/api/products/{gone}"), Some(&admin)).await;

    let rows = revenue(&server, &admin, "").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["category"], "Case");
}

#[tokio::test]
async fn test_revenue_rejects_unknown_status() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;

    let resp = server
        .get("/api/stats/revenue?status=Lost", Some(&admin))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
