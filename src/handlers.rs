use crate::{
    AppState,
    auth::{AuthViewer, Viewer},
    models::{DocumentMeta, DocumentQueryResponse, DocumentResponse, DocumentSummary},
    repository::DocumentQuery,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

/// Hard ceiling on the listing page size. Requests may ask for less, never
/// for more; the cap bounds per-request response cost.
pub const MAX_PAGE_SIZE: i64 = 20;

// --- Filter Structs ---

/// DocumentQueryParams
///
/// Raw query parameters for the listing endpoint (GET /api/document/query).
/// The numeric fields arrive as strings and are parsed leniently: anything
/// unparseable falls back to the documented default instead of failing the
/// request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct DocumentQueryParams {
    /// Case-sensitive title prefix, default "".
    pub title: Option<String>,
    /// Exact author-id constraint, default unset.
    pub author: Option<String>,
    /// Pagination offset, default "0".
    pub skip: Option<String>,
    /// Page size, default "20", clamped to a maximum of 20.
    pub size: Option<String>,
}

impl DocumentQueryParams {
    /// Normalizes the raw parameters into the repository's query input:
    /// defaults applied, `skip` floored at 0, `size` clamped to the ceiling.
    pub fn normalize(self) -> DocumentQuery {
        let skip = self
            .skip
            .as_deref()
            .unwrap_or("0")
            .parse::<i64>()
            .unwrap_or(0)
            .max(0);

        let size = self
            .size
            .as_deref()
            .unwrap_or("20")
            .parse::<i64>()
            .unwrap_or(MAX_PAGE_SIZE)
            .clamp(0, MAX_PAGE_SIZE);

        DocumentQuery {
            title_prefix: self.title.unwrap_or_default(),
            author_id: self.author.unwrap_or_default(),
            skip,
            size,
        }
    }
}

// --- Handlers ---

/// query_documents
///
/// [Public Route] Access-filtered document listing with title-prefix search,
/// an optional exact author constraint, and pagination.
///
/// The viewer is resolved softly from the session cookie: a missing, invalid,
/// or expired token degrades to the anonymous viewer instead of erroring.
/// Anonymous viewers only ever see PUBLIC documents; a logged-in viewer
/// additionally sees every document they authored, whatever its visibility.
#[utoipa::path(
    get,
    path = "/api/document/query",
    params(DocumentQueryParams),
    responses((status = 200, description = "Filtered listing", body = DocumentQueryResponse))
)]
pub async fn query_documents(
    viewer: Viewer,
    State(state): State<AppState>,
    Query(params): Query<DocumentQueryParams>,
) -> Json<DocumentQueryResponse> {
    let query = params.normalize();
    let hits = state
        .repo
        .query_documents(&query, viewer.predicate_id())
        .await;
    let data = hits.into_iter().map(DocumentSummary::from).collect();

    // `amount` stays the constant placeholder the wire contract pins.
    Json(DocumentQueryResponse {
        ok: 1,
        data,
        amount: 0,
    })
}

/// get_document
///
/// [Public Route] Single-document detail under the same owner-or-public rule
/// as the listing, so a hidden document and a missing one are
/// indistinguishable to a non-owner.
#[utoipa::path(
    get,
    path = "/api/document/{id}",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Found", body = DocumentResponse),
        (status = 404, description = "Missing or not visible")
    )
)]
pub async fn get_document(
    viewer: Viewer,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, StatusCode> {
    match state.repo.get_document(&id, viewer.predicate_id()).await {
        Some(doc) => Ok(Json(DocumentResponse { ok: 1, data: doc })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_my_documents
///
/// [Authenticated Route] Every document owned by the requesting viewer,
/// including PROTECTED and PRIVATE ones, newest-updated first.
///
/// *Note*: The viewer identity is resolved securely via the `AuthViewer`
/// extractor; the route rejects with 401 before this handler runs when no
/// valid session is presented.
#[utoipa::path(
    get,
    path = "/api/document/mine",
    responses(
        (status = 200, description = "Own documents", body = [DocumentMeta]),
        (status = 401, description = "No valid session")
    )
)]
pub async fn get_my_documents(
    AuthViewer { user }: AuthViewer,
    State(state): State<AppState>,
) -> Json<Vec<DocumentMeta>> {
    let docs = state.repo.get_documents_by_author(&user.id).await;
    Json(docs)
}
