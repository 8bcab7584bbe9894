//! HTTP black-box test harness for rigstore.
//!
//! Each [`TestServer`] runs the full router (middleware included) on an
//! ephemeral port over a fresh in-memory store, so tests are independent and
//! need no database.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rigstore-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use rigstore_api::config::ApiConfig;
use rigstore_api::db::{DynStore, IdentityStore, MemoryStore};
use rigstore_api::{AppState, app};
use rigstore_core::{Email, Role};

/// Secret shared by every test server.
pub const TEST_SECRET: &str = "integration-test-secret-with-enough-entropy-1234";

/// Password used by [`TestServer::register`].
pub const PASSWORD: &str = "correct horse battery";

/// A running API server and a client pointed at it.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    store: Arc<MemoryStore>,
}

impl TestServer {
    /// Start a server with the default in-memory configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Start a server after adjusting its configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut ApiConfig)) -> Self {
        let mut config = ApiConfig::in_memory(SecretString::from(TEST_SECRET));
        configure(&mut config);

        let store = Arc::new(MemoryStore::new());
        let dyn_store: DynStore = store.clone();
        let state = AppState::new(config, dyn_store);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            store,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: &Value) -> Response {
        let mut req = self.client.put(self.url(path)).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Response {
        let mut req = self.client.delete(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }

    /// Register a customer and return their token.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let resp = self
            .post(
                "/api/auth/register",
                None,
                &json!({ "full_name": name, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        token_of(resp).await
    }

    /// Log in and return the token.
    pub async fn login(&self, email: &str) -> String {
        let resp = self
            .post(
                "/api/auth/login",
                None,
                &json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        token_of(resp).await
    }

    /// Register an account, promote it out of band, and log in again so the
    /// token carries the admin role.
    pub async fn admin_token(&self) -> String {
        let email = "admin@rigstore.test";
        self.register("Store Admin", email).await;
        self.store
            .set_role(&Email::parse(email).unwrap(), Role::Admin)
            .await
            .unwrap()
            .unwrap();
        self.login(email).await
    }

    /// Create a product as admin and return its id.
    pub async fn create_product(
        &self,
        admin: &str,
        model_name: &str,
        category: &str,
        price: &str,
        stock: i64,
    ) -> i64 {
        let resp = self
            .post(
                "/api/products",
                Some(admin),
                &json!({
                    "model_name": model_name,
                    "category": category,
                    "price": price,
                    "stock": stock,
                }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    /// Current stock of a product.
    pub async fn stock(&self, product_id: i64) -> i64 {
        let resp = self.get(&format!("/api/products/{product_id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json::<Value>().await.unwrap()["stock"].as_i64().unwrap()
    }
}

async fn token_of(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_owned()
}

/// Read a decimal field that may be serialized as a string or a number.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

/// Read the machine-readable error code from an error response.
pub async fn error_code(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"].as_str().unwrap().to_owned()
}
