use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are reachable **without** a session. The document
/// handlers here still resolve the viewer from the session cookie when one is
/// presented, but a missing or invalid session only narrows what they return;
/// it never rejects the request.
///
/// Security Mandate:
/// All data retrieval handlers in this module enforce the owner-or-public
/// access predicate at the Repository level. This prevents anonymous or
/// unauthorized viewing of PROTECTED and PRIVATE documents.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // GET /api/document/query?title=...&author=...&skip=...&size=...
        // Access-filtered, paginated document listing with title-prefix
        // search. Page size is clamped to a hard ceiling of 20.
        .route("/api/document/query", get(handlers::query_documents))
        // GET /api/document/{id}
        // Single-document detail under the same owner-or-public rule.
        // Hidden and missing documents both answer 404.
        .route("/api/document/{id}", get(handlers::get_document))
}
