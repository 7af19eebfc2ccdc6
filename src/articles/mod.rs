use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;
pub mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_article))
        .route("/read", get(handlers::list_articles))
        .route("/read/:id", get(handlers::get_article))
        .route("/update/:id", put(handlers::update_article))
        .route("/remove/:id", delete(handlers::remove_article))
        .route("/publish/:id", patch(handlers::publish_article))
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024)) // 5MB upload cap
}
