//! Customer route handlers.
//!
//! Browsing and ordering require a customer sign-in. The order form only
//! lets the customer change the delivery address; everything else is
//! rebuilt from the session and the store when the form is posted.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use abc_retail_core::{OrderId, ProductId, Role};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{Flash, RequireCustomer, set_flash};
use crate::models::{CurrentSession, Order, Product};
use crate::routes::PageContext;
use crate::routes::auth::{self, INVALID_CREDENTIALS, LoginForm, LoginOutcome};
use crate::services::{AccountError, FieldErrors, NewCustomer, OrderingError};
use crate::state::AppState;

/// Order form as posted from the confirmation page.
#[derive(Debug, Deserialize)]
pub struct OrderForm {
    pub product_id: String,
    /// Id generated when the draft was shown; reused so a resubmitted form
    /// cannot place the same order twice.
    #[serde(default)]
    pub order_id: Option<String>,
    pub delivery_address: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Customer registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: NewCustomer,
    pub errors: FieldErrors,
}

/// Customer login page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub error: Option<&'static str>,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/products.html")]
pub struct ProductsTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "customer/order.html")]
pub struct OrderTemplate {
    pub page: PageContext,
    pub order: Order,
    pub errors: FieldErrors,
}

// =============================================================================
// Registration and Login
// =============================================================================

/// Display the customer registration form.
pub async fn register_page(current: CurrentSession, flash: Flash) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::new(&current, flash),
        form: NewCustomer::default(),
        errors: FieldErrors::new(),
    }
}

/// Handle customer registration.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    current: CurrentSession,
    session: Session,
    Form(form): Form<NewCustomer>,
) -> Result<Response, AppError> {
    let errors = match state.accounts().register_customer(&form).await {
        Ok(_) => {
            set_flash(&session, "Account created. Please log in.").await;
            return Ok(Redirect::to(Role::Customer.login_path()).into_response());
        }
        Err(AccountError::Validation(errors)) => errors,
        Err(AccountError::DuplicateUsername) => {
            let mut errors = FieldErrors::new();
            errors.add("username", "username is already taken");
            errors
        }
        Err(e) => return Err(e.into()),
    };

    Ok(RegisterTemplate {
        page: PageContext::new(&current, Flash::default()),
        form: NewCustomer {
            password: String::new(),
            ..form
        },
        errors,
    }
    .into_response())
}

/// Display the customer login form.
pub async fn login_page(current: CurrentSession, flash: Flash) -> Response {
    if let Some(redirect) = auth::redirect_if_signed_in(&current, Role::Customer) {
        return redirect.into_response();
    }

    LoginTemplate {
        page: PageContext::new(&current, flash),
        username: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle customer login.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match auth::attempt_login(&state, &session, Role::Customer, &form).await? {
        LoginOutcome::SignedIn(redirect) => Ok(redirect.into_response()),
        LoginOutcome::Rejected => Ok(LoginTemplate {
            page: PageContext::new(&current, Flash::default()),
            username: form.username,
            error: Some(INVALID_CREDENTIALS),
        }
        .into_response()),
    }
}

/// Log out and return to the customer login page.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    auth::logout(&session, Role::Customer).await
}

// =============================================================================
// Catalog and Ordering
// =============================================================================

/// List every product.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    current: CurrentSession,
    flash: Flash,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog().list().await?;

    Ok(ProductsTemplate {
        page: PageContext::new(&current, flash),
        products,
    })
}

/// Show the unsaved order for one product.
#[instrument(skip_all, fields(customer_id = %customer.id, product_id = %product_id))]
pub async fn order_page(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    current: CurrentSession,
    flash: Flash,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .ordering()
        .view_order_draft(&ProductId::new(product_id), &customer)
        .await?;

    Ok(OrderTemplate {
        page: PageContext::new(&current, flash),
        order,
        errors: FieldErrors::new(),
    })
}

/// Place an order.
///
/// The draft is rebuilt from the signed-in customer and the product id, so
/// a tampered form cannot change whose order this is or what it contains.
#[instrument(skip_all, fields(customer_id = %customer.id, product_id = %form.product_id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    current: CurrentSession,
    session: Session,
    Form(form): Form<OrderForm>,
) -> Result<Response, AppError> {
    let ordering = state.ordering();

    let mut order = ordering
        .view_order_draft(&ProductId::new(form.product_id), &customer)
        .await?;
    if let Some(id) = form
        .order_id
        .filter(|id| uuid::Uuid::parse_str(id).is_ok())
    {
        order.id = OrderId::new(id);
    }
    order.delivery_address = form.delivery_address;

    let errors = match ordering.submit_order(order.clone()).await {
        Ok(placed) => {
            let name = placed.first_product().map_or("your item", |p| p.name.as_str());
            set_flash(&session, format!("Order placed for {name}.")).await;
            return Ok(Redirect::to(Role::Customer.landing_path()).into_response());
        }
        Err(OrderingError::AlreadyPlaced(id)) => {
            tracing::info!(order_id = %id, "order form submitted again");
            set_flash(&session, "This order has already been placed.").await;
            return Ok(Redirect::to(Role::Customer.landing_path()).into_response());
        }
        Err(OrderingError::Validation(errors)) => errors,
        Err(e) => return Err(e.into()),
    };

    Ok(OrderTemplate {
        page: PageContext::new(&current, Flash::default()),
        order,
        errors,
    }
    .into_response())
}
