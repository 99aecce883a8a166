//! Admin route handlers.
//!
//! Registration and login are open; everything under product management
//! requires an admin sign-in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State, multipart::MultipartError},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use abc_retail_core::{ProductId, Role};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{Flash, RequireAdmin, set_flash};
use crate::models::{CurrentSession, Product};
use crate::routes::PageContext;
use crate::routes::auth::{self, INVALID_CREDENTIALS, LoginForm, LoginOutcome};
use crate::services::{AccountError, CatalogError, FieldErrors, ImageUpload, NewAdmin, ProductForm};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Admin registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: NewAdmin,
    pub errors: FieldErrors,
}

/// Admin login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub error: Option<&'static str>,
}

/// Product management list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
}

/// New product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/create_product.html")]
pub struct CreateProductTemplate {
    pub page: PageContext,
    pub form: ProductForm,
    pub errors: FieldErrors,
}

/// Edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_product.html")]
pub struct EditProductTemplate {
    pub page: PageContext,
    pub product: Product,
    pub form: ProductForm,
    pub errors: FieldErrors,
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/delete_product.html")]
pub struct DeleteProductTemplate {
    pub page: PageContext,
    pub product: Product,
}

// =============================================================================
// Registration and Login
// =============================================================================

/// Display the admin registration form.
pub async fn register_page(current: CurrentSession, flash: Flash) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::new(&current, flash),
        form: NewAdmin::default(),
        errors: FieldErrors::new(),
    }
}

/// Handle admin registration.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    current: CurrentSession,
    session: Session,
    Form(form): Form<NewAdmin>,
) -> Result<Response, AppError> {
    let errors = match state.accounts().register_admin(&form).await {
        Ok(_) => {
            set_flash(&session, "Admin account created. Please log in.").await;
            return Ok(Redirect::to(Role::Admin.login_path()).into_response());
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
        form: NewAdmin {
            password: String::new(),
            ..form
        },
        errors,
    }
    .into_response())
}

/// Display the admin login form.
pub async fn login_page(current: CurrentSession, flash: Flash) -> Response {
    if let Some(redirect) = auth::redirect_if_signed_in(&current, Role::Admin) {
        return redirect.into_response();
    }

    LoginTemplate {
        page: PageContext::new(&current, flash),
        username: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle admin login.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match auth::attempt_login(&state, &session, Role::Admin, &form).await? {
        LoginOutcome::SignedIn(redirect) => Ok(redirect.into_response()),
        LoginOutcome::Rejected => Ok(LoginTemplate {
            page: PageContext::new(&current, Flash::default()),
            username: form.username,
            error: Some(INVALID_CREDENTIALS),
        }
        .into_response()),
    }
}

/// Log out and return to the admin login page.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    auth::logout(&session, Role::Admin).await
}

// =============================================================================
// Product Management
// =============================================================================

/// List every product.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn manage_products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    current: CurrentSession,
    flash: Flash,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog().list().await?;

    Ok(ProductsTemplate {
        page: PageContext::new(&current, flash),
        products,
    })
}

/// Display the new product form.
pub async fn create_product_page(
    RequireAdmin(_admin): RequireAdmin,
    current: CurrentSession,
    flash: Flash,
) -> impl IntoResponse {
    CreateProductTemplate {
        page: PageContext::new(&current, flash),
        form: ProductForm::default(),
        errors: FieldErrors::new(),
    }
}

/// Handle the new product form, including the optional image file.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    current: CurrentSession,
    session: Session,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (form, image) = read_product_form(multipart).await?;

    let errors = match state.catalog().create(&form, image).await {
        Ok(product) => {
            set_flash(&session, format!("Created \"{}\".", product.name)).await;
            return Ok(Redirect::to(Role::Admin.landing_path()).into_response());
        }
        Err(CatalogError::Validation(errors)) => errors,
        Err(CatalogError::ImageUploadFailed(e)) => {
            tracing::warn!(error = %e, "product image upload failed");
            let mut errors = FieldErrors::new();
            errors.add("image", "image could not be uploaded, please try again");
            errors
        }
        Err(e) => return Err(e.into()),
    };

    Ok(CreateProductTemplate {
        page: PageContext::new(&current, Flash::default()),
        form,
        errors,
    }
    .into_response())
}

/// Display the edit form for one product.
pub async fn edit_product_page(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    current: CurrentSession,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog().get(&ProductId::new(id)).await?;

    Ok(EditProductTemplate {
        page: PageContext::new(&current, flash),
        form: ProductForm::from_product(&product),
        product,
        errors: FieldErrors::new(),
    })
}

/// Handle the edit form. The stored image is kept.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    current: CurrentSession,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let id = ProductId::new(id);
    let catalog = state.catalog();

    let errors = match catalog.update(&id, &form).await {
        Ok(product) => {
            set_flash(&session, format!("Saved \"{}\".", product.name)).await;
            return Ok(Redirect::to(Role::Admin.landing_path()).into_response());
        }
        Err(CatalogError::Validation(errors)) => errors,
        Err(e) => return Err(e.into()),
    };

    let product = catalog.get(&id).await?;
    Ok(EditProductTemplate {
        page: PageContext::new(&current, Flash::default()),
        product,
        form,
        errors,
    }
    .into_response())
}

/// Display the delete confirmation for one product.
pub async fn delete_product_page(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    current: CurrentSession,
    flash: Flash,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog().get(&ProductId::new(id)).await?;

    Ok(DeleteProductTemplate {
        page: PageContext::new(&current, flash),
        product,
    })
}

/// Delete a product after confirmation.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state.catalog().delete(&ProductId::new(id)).await?;
    set_flash(&session, "Product deleted.").await;
    Ok(Redirect::to(Role::Admin.landing_path()))
}

// =============================================================================
// Helpers
// =============================================================================

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

/// Split the multipart body into the product fields and the image file.
///
/// A file input left empty arrives as a part with no bytes and is treated as
/// no image.
async fn read_product_form(
    mut multipart: Multipart,
) -> Result<(ProductForm, Option<ImageUpload>), AppError> {
    let mut form = ProductForm::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => form.name = field.text().await.map_err(bad_multipart)?,
            "description" => form.description = field.text().await.map_err(bad_multipart)?,
            "price" => form.price = field.text().await.map_err(bad_multipart)?,
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok((form, image))
}
