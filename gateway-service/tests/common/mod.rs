//! Test helpers: spawn the gateway on a random port and talk to it over HTTP.

#![allow(dead_code)]

use gateway_service::config::{GatewayConfig, MongoConfig, StoreBackend, StoreConfig};
use gateway_service::services::{DocumentStore, MemoryStore, MongoStore};
use gateway_service::startup::Application;
use reqwest::{Client, Method};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: Client,
    pub store: Arc<dyn DocumentStore>,
    mongo: Option<MongoStore>,
}

pub fn test_config(backend: StoreBackend) -> GatewayConfig {
    GatewayConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port for testing
        },
        mongodb: MongoConfig {
            uri: std::env::var("TEST_MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: format!("gateway_test_{}", Uuid::new_v4().simple()),
            collection: "users".to_string(),
        },
        store: StoreConfig { backend },
    }
}

impl TestApp {
    /// Gateway backed by a fresh in-memory store.
    pub async fn spawn() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        Self::spawn_with(test_config(StoreBackend::Memory), store, None).await
    }

    /// Gateway backed by a throwaway MongoDB database.
    pub async fn spawn_mongo() -> Self {
        let config = test_config(StoreBackend::Mongo);
        let mongo = MongoStore::connect(
            &config.mongodb.uri,
            &config.mongodb.database,
            &config.mongodb.collection,
        )
        .await
        .expect("Failed to connect to MongoDB");
        let store: Arc<dyn DocumentStore> = Arc::new(mongo.clone());
        Self::spawn_with(config, store, Some(mongo)).await
    }

    async fn spawn_with(
        config: GatewayConfig,
        store: Arc<dyn DocumentStore>,
        mongo: Option<MongoStore>,
    ) -> Self {
        let app = Application::build_with_store(config, store.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            store,
            mongo,
        }
    }

    /// Send `body` as JSON and return the HTTP status with the parsed envelope.
    pub async fn call(&self, method: Method, route: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .request(method, format!("{}/api/{}", self.address, route))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request");
        let status = response.status().as_u16();
        let envelope = response.json().await.expect("Failed to parse envelope");
        (status, envelope)
    }

    /// Send a raw, possibly malformed, body.
    pub async fn call_raw(&self, method: Method, route: &str, body: &'static str) -> (u16, Value) {
        let response = self
            .client
            .request(method, format!("{}/api/{}", self.address, route))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request");
        let status = response.status().as_u16();
        let envelope = response.json().await.expect("Failed to parse envelope");
        (status, envelope)
    }

    pub async fn insert_one(&self, document: &Value) -> (u16, Value) {
        self.call(Method::POST, "insert_one", document).await
    }

    pub async fn insert_many(&self, documents: &Value) -> (u16, Value) {
        self.call(Method::POST, "insert_many", documents).await
    }

    pub async fn find(&self, query: &Value) -> (u16, Value) {
        self.call(Method::GET, "find", query).await
    }

    pub async fn update_one(&self, body: &Value) -> (u16, Value) {
        self.call(Method::PUT, "update_one", body).await
    }

    pub async fn update_many(&self, body: &Value) -> (u16, Value) {
        self.call(Method::PUT, "update_many", body).await
    }

    pub async fn delete_one(&self, query: &Value) -> (u16, Value) {
        self.call(Method::DELETE, "delete_one", query).await
    }

    pub async fn delete_many(&self, query: &Value) -> (u16, Value) {
        self.call(Method::DELETE, "delete_many", query).await
    }

    /// Drop the MongoDB test database, if any.
    pub async fn cleanup(&self) {
        if let Some(mongo) = &self.mongo {
            let _ = mongo.database().drop(None).await;
        }
    }
}
