//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                               - Home page
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (document store ping)
//!
//! # Admin
//! GET  /admin/register                 - Registration form
//! POST /admin/register                 - Create admin
//! GET  /admin/login                    - Login form
//! POST /admin/login                    - Authenticate admin
//! GET  /admin/logout                   - End session
//! GET  /admin/manage-products          - Product list (requires admin)
//! GET  /admin/create-product           - Product form (requires admin)
//! POST /admin/create-product           - Create product, multipart with image (requires admin)
//! GET  /admin/edit-product/{id}        - Edit form (requires admin)
//! POST /admin/edit-product/{id}        - Replace product (requires admin)
//! GET  /admin/delete-product/{id}      - Delete confirmation (requires admin)
//! POST /admin/delete-product/{id}      - Delete product (requires admin)
//!
//! # Customer
//! GET  /customer/register              - Registration form
//! POST /customer/register              - Create customer
//! GET  /customer/login                 - Login form
//! POST /customer/login                 - Authenticate customer
//! GET  /customer/logout                - End session
//! GET  /customer/products              - Catalog (requires customer)
//! GET  /customer/order/{productId}     - Order draft (requires customer)
//! POST /customer/order                 - Place order (requires customer)
//! ```

pub mod admin;
pub mod auth;
pub mod customer;
pub mod health;
pub mod home;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::Flash;
use crate::models::CurrentSession;
use crate::state::AppState;

/// Largest accepted product image upload.
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Values every page layout needs.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Signed-in admin's username.
    pub admin: Option<String>,
    /// Signed-in customer's display name.
    pub customer: Option<String>,
    /// One-shot message from the previous request.
    pub flash: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn new(current: &CurrentSession, Flash(flash): Flash) -> Self {
        Self {
            admin: current.admin.as_ref().map(|a| a.username.clone()),
            customer: current.customer.as_ref().map(|c| c.name.clone()),
            flash,
        }
    }
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(admin::register_page).post(admin::register))
        .route("/login", get(admin::login_page).post(admin::login))
        .route("/logout", get(admin::logout))
        .route("/manage-products", get(admin::manage_products))
        .route(
            "/create-product",
            get(admin::create_product_page)
                .post(admin::create_product)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route(
            "/edit-product/{id}",
            get(admin::edit_product_page).post(admin::edit_product),
        )
        .route(
            "/delete-product/{id}",
            get(admin::delete_product_page).post(admin::delete_product),
        )
}

/// Create the customer routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(customer::register_page).post(customer::register),
        )
        .route("/login", get(customer::login_page).post(customer::login))
        .route("/logout", get(customer::logout))
        .route("/products", get(customer::products))
        .route("/order/{product_id}", get(customer::order_page))
        .route("/order", post(customer::place_order))
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/admin", admin_routes())
        .nest("/customer", customer_routes())
}
