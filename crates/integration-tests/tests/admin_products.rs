//! Admin product management: create with and without an image, edit, delete.

use abc_retail_core::ProductId;
use abc_retail_integration_tests::{TestApp, assert_redirect};
use abc_retail_web::blob::BlobStore;
use abc_retail_web::models::Product;
use abc_retail_web::services::CatalogError;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

/// A 1x1 transparent PNG.
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

async fn admin_app() -> TestApp {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;
    app.login_admin("shopadmin").await;
    app
}

async fn products(app: &TestApp) -> Vec<Product> {
    app.state
        .catalog()
        .list()
        .await
        .expect("Failed to list products")
}

fn product_form(name: &str, price: &str) -> Form {
    Form::new()
        .text("name", name.to_string())
        .text("description", "Stoneware, 350 ml")
        .text("price", price.to_string())
}

fn image_part(bytes: &[u8], file_name: &str, mime: &str) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("valid mime type")
}

#[tokio::test]
async fn test_create_product_with_image_stores_blob() {
    let app = admin_app().await;

    let form = product_form("Enamel Mug", "12.5")
        .part("image", image_part(PNG_BYTES, "mug.png", "image/png"));
    let resp = app.post_multipart("/admin/create-product", form).await;
    assert_redirect(&resp, "/admin/manage-products");

    let products = products(&app).await;
    assert_eq!(products.len(), 1);
    let product = &products[0];
    assert_eq!(product.name, "Enamel Mug");
    assert_eq!(product.price.to_string(), "12.50");

    let url = product.image_url.as_deref().expect("image url should be set");
    assert!(url.contains("product-images"));
    assert!(url.ends_with("_mug.png"));

    let stored = app.blobs.get(url).await.expect("blob should exist");
    assert_eq!(stored.bytes, PNG_BYTES);
    assert_eq!(stored.content_type, "image/png");
    assert_eq!(
        app.blobs.download(url).await.expect("download"),
        PNG_BYTES.to_vec()
    );

    let body = app
        .get("/admin/manage-products")
        .await
        .text()
        .await
        .expect("products body");
    assert!(body.contains("Enamel Mug"));
    assert!(body.contains("12.50"));
    assert!(body.contains("Created"));
}

#[tokio::test]
async fn test_create_product_without_image_leaves_url_empty() {
    let app = admin_app().await;

    // Browsers send an empty file part when no file is chosen
    let form = product_form("Gift Card", "0")
        .part("image", image_part(&[], "", "application/octet-stream"));
    let resp = app.post_multipart("/admin/create-product", form).await;
    assert_redirect(&resp, "/admin/manage-products");

    let products = products(&app).await;
    assert_eq!(products.len(), 1);
    assert!(products[0].image_url.is_none());
    assert_eq!(app.blobs.object_count().await, 0);
}

#[tokio::test]
async fn test_create_product_rejects_non_image_file() {
    let app = admin_app().await;

    let form = product_form("Manual", "3.00").part(
        "image",
        image_part(b"%PDF-1.4", "manual.pdf", "application/pdf"),
    );
    let resp = app.post_multipart("/admin/create-product", form).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("form body");
    assert!(body.contains("image must be an image file"));
    assert!(body.contains("Manual"));

    assert!(products(&app).await.is_empty());
    assert_eq!(app.blobs.object_count().await, 0);
}

#[tokio::test]
async fn test_create_product_validates_fields() {
    let app = admin_app().await;

    let resp = app
        .post_multipart("/admin/create-product", product_form("", "-4"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("form body");
    assert!(body.contains("name is required"));
    assert!(body.contains("price cannot be negative"));

    let resp = app
        .post_multipart("/admin/create-product", product_form("Mug", "cheap"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("form body");
    assert!(body.contains("price must be a number"));

    assert!(products(&app).await.is_empty());
}

#[tokio::test]
async fn test_edit_product_keeps_image() {
    let app = admin_app().await;
    let form = product_form("Enamel Mug", "12.00")
        .part("image", image_part(PNG_BYTES, "mug.png", "image/png"));
    app.post_multipart("/admin/create-product", form).await;
    let original = products(&app).await.remove(0);

    let resp = app.get(&format!("/admin/edit-product/{}", original.id)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("edit body").contains("Enamel Mug"));

    let resp = app
        .post_form(
            &format!("/admin/edit-product/{}", original.id),
            &[
                ("name", "Speckled Mug"),
                ("description", "Now speckled"),
                ("price", "14"),
            ],
        )
        .await;
    assert_redirect(&resp, "/admin/manage-products");

    let updated = app
        .state
        .catalog()
        .get(&original.id)
        .await
        .expect("product should exist");
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.name, "Speckled Mug");
    assert_eq!(updated.description, "Now speckled");
    assert_eq!(updated.price.to_string(), "14.00");
    assert_eq!(updated.image_url, original.image_url);
}

#[tokio::test]
async fn test_edit_product_invalid_rerenders_and_keeps_stored_values() {
    let app = admin_app().await;
    app.create_product("Enamel Mug", "12.00").await;
    let original = products(&app).await.remove(0);

    let resp = app
        .post_form(
            &format!("/admin/edit-product/{}", original.id),
            &[("name", "Enamel Mug"), ("description", ""), ("price", "-1")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.text()
            .await
            .expect("edit body")
            .contains("price cannot be negative")
    );

    let stored = app
        .state
        .catalog()
        .get(&original.id)
        .await
        .expect("product should exist");
    assert_eq!(stored, original);
}

#[tokio::test]
async fn test_delete_product_then_get_is_not_found() {
    let app = admin_app().await;
    app.create_product("Enamel Mug", "12.00").await;
    let product = products(&app).await.remove(0);
    let path = format!("/admin/delete-product/{}", product.id);

    let resp = app.get(&path).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("delete body").contains("Enamel Mug"));

    assert_redirect(&app.post_form(&path, &[]).await, "/admin/manage-products");

    let err = app
        .state
        .catalog()
        .get(&product.id)
        .await
        .expect_err("product should be gone");
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert_eq!(app.get(&path).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        app.get(&format!("/admin/edit-product/{}", product.id))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );

    // Deleting again is a 404 rather than a silent success
    assert_eq!(app.post_form(&path, &[]).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_unknown_product_is_not_found() {
    let app = admin_app().await;

    let resp = app
        .post_form("/admin/delete-product/no-such-product-42", &[])
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = resp.text().await.expect("error body");
    // The id is not echoed back
    assert!(!body.contains("no-such-product-42"));

    let err = app
        .state
        .catalog()
        .delete(&ProductId::new("no-such-product-42"))
        .await
        .expect_err("nothing to delete");
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_admin_username_is_rejected() {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;

    let resp = app
        .post_form(
            "/admin/register",
            &[("username", "shopadmin"), ("password", "another1")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.text()
            .await
            .expect("register body")
            .contains("username is already taken")
    );
}
