//! Order placement, listings, and status updates over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use rigstore_integration_tests::{TestServer, decimal, error_code};

fn order(lines: &[(i64, i64)]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(product_id, quantity)| json!({ "product_id": product_id, "quantity": quantity }))
        .collect();
    json!({ "items": items })
}

#[tokio::test]
async fn test_place_order_decrements_stock_and_prices_server_side() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let gpu = server.create_product(&admin, "GPU", "GPU", "500.00", 4).await;
    let ram = server.create_product(&admin, "RAM", "Memory", "80.50", 10).await;
    let token = server.register("Ada", "ada@example.com").await;

    let mut body = order(&[(gpu, 2), (ram, 3)]);
    body["total_amount"] = json!("1.00");
    let resp = server.post("/api/orders", Some(&token), &body).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let placed: Value = resp.json().await.unwrap();
    assert_eq!(placed["status"], "Processing");
    assert_eq!(decimal(&placed["total_amount"]), Decimal::new(124_150, 2));
    assert_eq!(placed["items"].as_array().unwrap().len(), 2);

    assert_eq!(server.stock(gpu).await, 2);
    assert_eq!(server.stock(ram).await, 7);
}

#[tokio::test]
async fn test_rejected_order_writes_nothing() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let plenty = server.create_product(&admin, "Plenty", "CPU", "10", 50).await;
    let scarce = server.create_product(&admin, "Scarce", "CPU", "10", 1).await;
    let token = server.register("Ada", "ada@example.com").await;

    let resp = server
        .post("/api/orders", Some(&token), &order(&[(plenty, 5), (scarce, 2)]))
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(resp).await, "insufficient_stock");

    let resp = server
        .post("/api/orders", Some(&token), &order(&[(plenty, 5), (9999, 1)]))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(server.stock(plenty).await, 50);
    assert_eq!(server.stock(scarce).await, 1);

    let mine: Vec<Value> = server
        .get("/api/orders/mine", Some(&token))
        .await
        .json()
        .await
        .unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_invalid_order_payloads_are_400() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let id = server.create_product(&admin, "CPU", "CPU", "10", 5).await;
    let token = server.register("Ada", "ada@example.com").await;

    for body in [order(&[]), order(&[(id, 0)]), order(&[(id, -2)])] {
        let resp = server.post("/api/orders", Some(&token), &body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
    }
    assert_eq!(server.stock(id).await, 5);

    let resp = server.post("/api/orders", None, &order(&[(id, 1)])).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_orders_never_oversell() {
    let server = Arc::new(TestServer::spawn().await);
    let admin = server.admin_token().await;
    let id = server.create_product(&admin, "Last Units", "GPU", "999", 5).await;
    let token = Arc::new(server.register("Ada", "ada@example.com").await);

    let mut handles = Vec::new();
    for _ in 0..12 {
        let server = Arc::clone(&server);
        let token = Arc::clone(&token);
        handles.push(tokio::spawn(async move {
            server
                .post("/api/orders", Some(&token), &order(&[(id, 1)]))
                .await
                .status()
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => placed += 1,
            StatusCode::UNPROCESSABLE_ENTITY => {}
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(server.stock(id).await, 0);
}

#[tokio::test]
async fn test_listings_are_scoped_and_survive_product_deletion() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let id = server.create_product(&admin, "Retired Board", "Motherboard", "180", 5).await;
    let ada = server.register("Ada", "ada@example.com").await;
    let bob = server.register("Bob", "bob@example.com").await;

    for token in [&ada, &bob] {
        let resp = server.post("/api/orders", Some(token), &order(&[(id, 1)])).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = server.delete(&format!("/api/products/{id}"), Some(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let mine: Vec<Value> = server
        .get("/api/orders/mine", Some(&ada))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["customer"]["full_name"], "Ada");
    let product = &mine[0]["items"][0]["product"];
    assert_eq!(product["model_name"], "Product unavailable");
    assert_eq!(product["available"], false);
    assert_eq!(product["price"], Value::Null);

    let all: Vec<Value> = server
        .get("/api/orders", Some(&admin))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    // Newest first.
    assert_eq!(all[0]["customer"]["email"], "bob@example.com");
}

#[tokio::test]
async fn test_status_updates() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;
    let id = server.create_product(&admin, "SSD", "Storage", "90", 5).await;
    let token = server.register("Ada", "ada@example.com").await;

    let placed: Value = server
        .post("/api/orders", Some(&token), &order(&[(id, 1)]))
        .await
        .json()
        .await
        .unwrap();
    let order_id = placed["id"].as_i64().unwrap();
    let path = format!("/api/orders/{order_id}");

    let resp = server.put(&path, Some(&admin), &json!({ "status": "Shipped" })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "id": order_id, "status": "Shipped" }));

    let resp = server.put(&path, Some(&admin), &json!({ "status": "Lost" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server.put(&path, Some(&token), &json!({ "status": "Delivered" })).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = server
        .put("/api/orders/424242", Some(&admin), &json!({ "status": "Delivered" }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Permissive policy allows moving backwards.
    let resp = server.put(&path, Some(&admin), &json!({ "status": "Processing" })).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forward_only_policy_refuses_backwards_moves() {
    use rigstore_api::models::TransitionPolicy;

    let server = TestServer::spawn_with(|config| {
        config.transition_policy = TransitionPolicy::ForwardOnly;
    })
    .await;
    let admin = server.admin_token().await;
    let id = server.create_product(&admin, "SSD", "Storage", "90", 5).await;
    let token = server.register("Ada", "ada@example.com").await;

    let placed: Value = server
        .post("/api/orders", Some(&token), &order(&[(id, 1)]))
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/orders/{}", placed["id"]);

    let resp = server.put(&path, Some(&admin), &json!({ "status": "Delivered" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    for status in ["Shipped", "Delivered"] {
        let resp = server.put(&path, Some(&admin), &json!({ "status": status })).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = server.put(&path, Some(&admin), &json!({ "status": "Shipped" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extreme_prices_are_rejected_and_max_price_orders_succeed() {
    let server = TestServer::spawn().await;
    let admin = server.admin_token().await;

    let resp = server
        .post(
            "/api/products",
            Some(&admin),
            &json!({
                "model_name": "Overflow",
                "price": "70000000000000000000000000000",
                "stock": 5,
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let id = server
        .create_product(&admin, "Mainframe", "Server", "9999999999.99", 5)
        .await;
    let token = server.register("Ada", "ada@example.com").await;

    let resp = server
        .post("/api/orders", Some(&token), &order(&[(id, 2), (id, 3)]))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.unwrap();
    assert_eq!(
        decimal(&placed["total_amount"]),
        Decimal::from_str_exact("49999999999.95").unwrap()
    );
    assert_eq!(server.stock(id).await, 0);
}
