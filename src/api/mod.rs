mod handlers;

pub use handlers::AnswerInput;

use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::navigation::Navigator;

/// The single session served by the API.
pub type SharedNavigator = Arc<Mutex<Navigator<Database>>>;

pub fn create_router(navigator: Navigator<Database>) -> Router {
    let api = Router::new()
        .route("/state", get(handlers::get_state))
        .route("/answer", post(handlers::answer))
        .route("/back", post(handlers::go_back))
        .route("/restart", post(handlers::restart))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(Mutex::new(navigator)))
}
