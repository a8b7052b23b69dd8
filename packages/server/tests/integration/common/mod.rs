use std::net::SocketAddr;
use std::sync::Arc;

use common::config::{FilesystemConfig, IntegrityConfig, StorageConfig};
use common::integrity::VerificationService;
use common::storage::BlobSources;
use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use coldstore_server::config::{AppConfig, CorsConfig, DatabaseConfig, ServerConfig, SweepConfig};
use coldstore_server::state::AppState;
use coldstore_server::store::DbRecordStore;

pub mod routes {
    pub const RECORDS: &str = "/api/v1/records";
    pub const STATS: &str = "/api/v1/records/stats";
    pub const VERIFY_BATCH: &str = "/api/v1/records/verify-batch";

    pub fn record(id: &str) -> String {
        format!("/api/v1/records/{id}")
    }

    pub fn checksum(id: &str) -> String {
        format!("/api/v1/records/{id}/checksum")
    }

    pub fn verify(id: &str) -> String {
        format!("/api/v1/records/{id}/verify")
    }

    pub fn mark_verified(id: &str) -> String {
        format!("/api/v1/records/{id}/mark-verified")
    }

    pub fn owner_records(owner_id: i32) -> String {
        format!("/api/v1/owners/{owner_id}/records")
    }
}

/// A running test server backed by a throwaway SQLite file and blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub blobs: TempDir,
    _db_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_dir = tempfile::tempdir().expect("Failed to create database dir");
        let blobs = tempfile::tempdir().expect("Failed to create blob dir");
        let db_url = format!("sqlite://{}?mode=rwc", db_dir.path().join("test.db").display());

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 1,
                min_connections: 1,
            },
            integrity: IntegrityConfig::default(),
            storage: StorageConfig {
                local: Some(FilesystemConfig {
                    root: blobs.path().to_path_buf(),
                }),
                ..Default::default()
            },
            sweep: SweepConfig::default(),
        };

        let db = coldstore_server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        let sources = BlobSources::from_config(&config.storage).expect("Invalid storage config");
        let integrity = VerificationService::new(
            Arc::new(DbRecordStore::new(db.clone())),
            Arc::new(sources),
            &config.integrity,
        );

        let state = AppState {
            config,
            integrity,
            shutdown: CancellationToken::new(),
        };
        let app = coldstore_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            blobs,
            _db_dir: db_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Write a blob beneath the local storage root.
    pub fn write_blob(&self, name: &str, bytes: &[u8]) {
        let path = self.blobs.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create blob parent");
        }
        std::fs::write(path, bytes).expect("Failed to write blob");
    }

    pub fn remove_blob(&self, name: &str) {
        std::fs::remove_file(self.blobs.path().join(name)).expect("Failed to remove blob");
    }

    /// Register a local record via the API and return its `id`.
    pub async fn register(&self, owner_id: i32, name: &str) -> String {
        let res = self
            .post(
                routes::RECORDS,
                &serde_json::json!({
                    "owner_id": owner_id,
                    "stored_path": format!("/{name}"),
                    "original_name": name,
                    "location_kind": "local",
                }),
            )
            .await;
        assert_eq!(res.status, 201, "register failed: {}", res.text);
        res.id()
    }

    /// Write a blob, register it, and record its checksums. Returns the `id`.
    pub async fn stored(&self, owner_id: i32, name: &str, bytes: &[u8]) -> String {
        self.write_blob(name, bytes);
        let id = self.register(owner_id, name).await;
        let res = self.post(&routes::checksum(&id), &serde_json::json!({})).await;
        assert_eq!(res.status, 200, "checksum failed: {}", res.text);
        id
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }
}
