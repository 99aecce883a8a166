//! Integration tests for ABC Retail.
//!
//! Each test spawns the full application router on an ephemeral port with
//! in-memory document, blob and session stores, then drives it over HTTP
//! with a cookie-keeping client. No database or network services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p abc-retail-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use abc_retail_web::blob::MemoryBlobStore;
use abc_retail_web::config::{BlobConfig, DEFAULT_IMAGE_CONTAINER, RetailConfig};
use abc_retail_web::db::MemoryDocumentStore;
use abc_retail_web::middleware::create_session_layer;
use abc_retail_web::state::AppState;
use reqwest::{Client, Response, StatusCode, redirect};
use secrecy::SecretString;
use tempfile::TempDir;
use tower_sessions::MemoryStore;

/// Password used by the account helpers.
pub const PASSWORD: &str = "secret1";

/// A running application plus handles on its backing stores.
pub struct TestApp {
    /// Root URL, e.g. `http://127.0.0.1:41234`.
    pub base_url: String,
    /// Client with a cookie jar. Redirects are not followed so tests can
    /// assert on them.
    pub client: Client,
    /// Application state, for inspecting the stores through the services.
    pub state: AppState,
    /// Document store behind the app.
    pub documents: Arc<MemoryDocumentStore>,
    /// Blob store behind the app.
    pub blobs: Arc<MemoryBlobStore>,
    _blob_dir: TempDir,
}

impl TestApp {
    /// Start the app on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the client cannot be built.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
        ))
        .await
        .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let base_url = format!("http://{addr}");

        let blob_dir = tempfile::tempdir().expect("Failed to create blob directory");
        let config = RetailConfig {
            database_url: SecretString::from("postgres://unused"),
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            image_container: DEFAULT_IMAGE_CONTAINER.to_string(),
            blob: BlobConfig::Local {
                root: blob_dir.path().to_path_buf(),
            },
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let documents = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config, documents.clone(), blobs.clone());

        let app = abc_retail_web::app(state.clone(), session_layer);
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        Self {
            base_url,
            client: new_client(),
            state,
            documents,
            blobs,
            _blob_dir: blob_dir,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start over with an empty cookie jar.
    pub fn reset_cookies(&mut self) {
        self.client = new_client();
    }

    /// GET `path` with the app's client.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a url-encoded form to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// POST a multipart form to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> Response {
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Register an admin and check it redirected to the admin login.
    ///
    /// # Panics
    ///
    /// Panics if registration does not succeed.
    pub async fn register_admin(&self, username: &str) {
        let resp = self
            .post_form(
                "/admin/register",
                &[("username", username), ("password", PASSWORD)],
            )
            .await;
        assert_redirect(&resp, "/admin/login");
    }

    /// Log in as an admin and check it landed on product management.
    ///
    /// # Panics
    ///
    /// Panics if login does not succeed.
    pub async fn login_admin(&self, username: &str) {
        let resp = self
            .post_form(
                "/admin/login",
                &[("username", username), ("password", PASSWORD)],
            )
            .await;
        assert_redirect(&resp, "/admin/manage-products");
    }

    /// Register a customer and check it redirected to the customer login.
    ///
    /// # Panics
    ///
    /// Panics if registration does not succeed.
    pub async fn register_customer(
        &self,
        username: &str,
        name: &str,
        email: &str,
        address: &str,
    ) {
        let resp = self
            .post_form(
                "/customer/register",
                &[
                    ("username", username),
                    ("password", PASSWORD),
                    ("name", name),
                    ("email", email),
                    ("delivery_address", address),
                ],
            )
            .await;
        assert_redirect(&resp, "/customer/login");
    }

    /// Log in as a customer and check it landed on the catalog.
    ///
    /// # Panics
    ///
    /// Panics if login does not succeed.
    pub async fn login_customer(&self, username: &str) {
        let resp = self
            .post_form(
                "/customer/login",
                &[("username", username), ("password", PASSWORD)],
            )
            .await;
        assert_redirect(&resp, "/customer/products");
    }

    /// Create a product without an image through the admin form.
    ///
    /// The client must already be signed in as an admin.
    ///
    /// # Panics
    ///
    /// Panics if the product is not created.
    pub async fn create_product(&self, name: &str, price: &str) {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("description", format!("{name} description"))
            .text("price", price.to_string());
        let resp = self.post_multipart("/admin/create-product", form).await;
        assert_redirect(&resp, "/admin/manage-products");
    }
}

fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Assert that `resp` is a 303 redirect to `location`.
///
/// # Panics
///
/// Panics if the status or location differ.
pub fn assert_redirect(resp: &Response, location: &str) {
    assert_eq!(
        resp.status(),
        StatusCode::SEE_OTHER,
        "expected redirect to {location}"
    );
    assert_eq!(
        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some(location)
    );
}
