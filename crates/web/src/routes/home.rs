//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::Flash;
use crate::models::CurrentSession;
use crate::routes::PageContext;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
}

/// Display the home page with links for whichever roles are signed in.
pub async fn index(current: CurrentSession, flash: Flash) -> impl IntoResponse {
    HomeTemplate {
        page: PageContext::new(&current, flash),
    }
}
