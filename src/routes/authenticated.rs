use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Defines the routes accessible only to viewers who passed session
/// validation.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthViewer` extractor
/// middleware being present on the router layer above this module. This
/// guarantees that all handlers receive a validated `AuthViewer` carrying
/// the viewer's id and display name.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/document/mine
        // Lists every document the viewer authored, whatever its visibility.
        // Registered before the public `{id}` route can shadow it: axum
        // prefers the static segment over the parameter.
        .route("/api/document/mine", get(handlers::get_my_documents))
}
