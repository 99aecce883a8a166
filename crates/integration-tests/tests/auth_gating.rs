//! Login, logout and route gating for both roles.

use abc_retail_integration_tests::{PASSWORD, TestApp, assert_redirect};
use reqwest::StatusCode;

const INVALID_CREDENTIALS: &str = "Invalid username or password.";

#[tokio::test]
async fn test_anonymous_requests_redirect_to_role_login() {
    let app = TestApp::spawn().await;

    for path in [
        "/admin/manage-products",
        "/admin/create-product",
        "/admin/edit-product/p1",
        "/admin/delete-product/p1",
    ] {
        assert_redirect(&app.get(path).await, "/admin/login");
    }
    assert_redirect(
        &app.post_form("/admin/delete-product/p1", &[]).await,
        "/admin/login",
    );

    for path in ["/customer/products", "/customer/order/p1"] {
        assert_redirect(&app.get(path).await, "/customer/login");
    }
    assert_redirect(
        &app.post_form(
            "/customer/order",
            &[("product_id", "p1"), ("delivery_address", "1 Main St")],
        )
        .await,
        "/customer/login",
    );
}

#[tokio::test]
async fn test_customer_session_does_not_grant_admin_access() {
    let app = TestApp::spawn().await;
    app.register_customer("alice", "Alice", "a@x.com", "1 Main St")
        .await;
    app.login_customer("alice").await;

    assert_eq!(app.get("/customer/products").await.status(), StatusCode::OK);
    assert_redirect(&app.get("/admin/manage-products").await, "/admin/login");
}

#[tokio::test]
async fn test_admin_credentials_do_not_log_in_customers() {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;

    let resp = app
        .post_form(
            "/customer/login",
            &[("username", "shopadmin"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("login body").contains(INVALID_CREDENTIALS));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::spawn().await;
    app.register_customer("alice", "Alice", "a@x.com", "1 Main St")
        .await;

    let wrong_password = app
        .post_form(
            "/customer/login",
            &[("username", "alice"), ("password", "wrong-password")],
        )
        .await;
    let unknown_user = app
        .post_form(
            "/customer/login",
            &[("username", "mallory"), ("password", "wrong-password")],
        )
        .await;

    assert_eq!(wrong_password.status(), StatusCode::OK);
    assert_eq!(unknown_user.status(), wrong_password.status());

    let wrong_password = wrong_password.text().await.expect("login body");
    let unknown_user = unknown_user.text().await.expect("login body");
    assert!(wrong_password.contains(INVALID_CREDENTIALS));
    assert!(unknown_user.contains(INVALID_CREDENTIALS));
    // Apart from the echoed username the pages are identical
    assert_eq!(
        wrong_password.replace("alice", "USER"),
        unknown_user.replace("mallory", "USER")
    );

    // Neither attempt signed anyone in
    assert_redirect(&app.get("/customer/products").await, "/customer/login");
}

#[tokio::test]
async fn test_admin_logout_gates_admin_pages_again() {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;
    app.login_admin("shopadmin").await;

    assert_eq!(
        app.get("/admin/manage-products").await.status(),
        StatusCode::OK
    );

    assert_redirect(&app.get("/admin/logout").await, "/admin/login");
    assert_redirect(&app.get("/admin/manage-products").await, "/admin/login");
}

#[tokio::test]
async fn test_customer_logout_clears_whole_session() {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;
    app.register_customer("alice", "Alice", "a@x.com", "1 Main St")
        .await;

    // One browser signed in as both roles
    app.login_admin("shopadmin").await;
    app.login_customer("alice").await;
    assert_eq!(
        app.get("/admin/manage-products").await.status(),
        StatusCode::OK
    );
    assert_eq!(app.get("/customer/products").await.status(), StatusCode::OK);

    assert_redirect(&app.get("/customer/logout").await, "/customer/login");

    assert_redirect(&app.get("/customer/products").await, "/customer/login");
    assert_redirect(&app.get("/admin/manage-products").await, "/admin/login");
}

#[tokio::test]
async fn test_login_page_redirects_when_already_signed_in() {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;

    assert_eq!(app.get("/admin/login").await.status(), StatusCode::OK);
    app.login_admin("shopadmin").await;
    assert_redirect(&app.get("/admin/login").await, "/admin/manage-products");

    // Signed in as admin only, so the customer login still renders
    assert_eq!(app.get("/customer/login").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_sets_http_only_session_cookie() {
    let app = TestApp::spawn().await;
    app.register_admin("shopadmin").await;

    let resp = app
        .post_form(
            "/admin/login",
            &[("username", "shopadmin"), ("password", PASSWORD)],
        )
        .await;
    assert_redirect(&resp, "/admin/manage-products");

    let cookie = resp
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("abc_session="))
        .expect("session cookie should be set");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    // Plain http base URL
    assert!(!cookie.contains("Secure"));

    // 30 minute idle timeout, give or take the time spent handling the request
    let max_age: i64 = cookie
        .split(';')
        .find_map(|part| part.trim().strip_prefix("Max-Age="))
        .expect("session cookie should carry Max-Age")
        .parse()
        .expect("Max-Age should be numeric");
    assert!((1790..=1800).contains(&max_age), "Max-Age={max_age}");
}

#[tokio::test]
async fn test_health_and_common_headers() {
    let app = TestApp::spawn().await;

    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(
        resp.headers()
            .get("x-frame-options")
            .and_then(|v| v.to_str().ok()),
        Some("DENY")
    );
    assert_eq!(resp.text().await.expect("health body"), "ok");

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);

    let resp = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("GET request failed");
    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-123")
    );

    assert_eq!(app.get("/no/such/page").await.status(), StatusCode::NOT_FOUND);
}
