use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Visibility Model ---

/// Visibility
///
/// Tri-state access classifier for a document. The wire representation is the
/// SCREAMING-case string the frontend union type expects; the persisted
/// representation is an integer column (see `to_stored`/`from_stored`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Private,
}

impl Visibility {
    /// Maps the symbolic visibility to its persisted integer encoding.
    /// Total: every variant has exactly one encoding.
    pub fn to_stored(self) -> i32 {
        match self {
            Visibility::Public => 1,
            Visibility::Protected => 0,
            Visibility::Private => -1,
        }
    }

    /// Maps a persisted integer back to the symbolic visibility.
    ///
    /// Total: any value outside {0, 1} collapses to `Private`. The integer
    /// domain is unbounded while the symbolic domain has three values, so an
    /// unrecognized stored value decodes to the most restrictive state
    /// instead of failing or widening access.
    pub fn from_stored(raw: i32) -> Self {
        match raw {
            1 => Visibility::Public,
            0 => Visibility::Protected,
            _ => Visibility::Private,
        }
    }
}

/// listing_grants_access
///
/// The access rule shared by the listing and detail queries: a viewer sees a
/// document when they authored it, or when its stored visibility is the
/// PUBLIC encoding. Anonymous viewers are represented by the empty string,
/// which never matches an author id (author ids are non-empty by
/// construction).
///
/// PROTECTED (0) is not admitted for non-owners here; the broader grant it
/// implies has never had listing semantics.
pub fn listing_grants_access(viewer_id: &str, author_id: &str, stored_visibility: i32) -> bool {
    author_id == viewer_id || stored_visibility == Visibility::Public.to_stored()
}

// --- Core Application Schemas ---

/// IconMeta
///
/// Icon descriptor attached to a document: the icon library, the icon name
/// within it, and an optional numbering overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IconMeta {
    pub library: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbering: Option<i32>,
}

impl Default for IconMeta {
    /// The icon shown for documents that never picked one.
    fn default() -> Self {
        Self {
            library: "lucide".to_string(),
            value: "Image".to_string(),
            numbering: None,
        }
    }
}

/// DocumentMeta
///
/// The full document record as this service reads it. Owned and mutated
/// exclusively by the storage layer; every operation here is a read.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentMeta {
    pub id: String,
    pub title: String,
    /// Author display name.
    pub author: String,
    pub author_id: String,
    pub visibility: Visibility,
    #[ts(type = "string")]
    pub created: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated: DateTime<Utc>,
    pub icon: IconMeta,
    pub tags: Vec<String>,
}

/// DocumentKind
///
/// Discriminates a plain document from one carrying the one-to-one exercise
/// extension. Only the tag crosses the wire, never the exercise payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum DocumentKind {
    Document,
    Exercise,
}

/// DocumentHit
///
/// One row produced by the filtered listing query. Carries the raw stored
/// visibility and the presence flag for the exercise extension; projection
/// into the wire shape happens in the handler.
#[derive(Debug, Clone, FromRow, Default)]
pub struct DocumentHit {
    pub id: String,
    pub title: String,
    pub author_id: String,
    pub author_name: String,
    pub visibility: i32,
    pub is_exercise: bool,
}

// --- Response Shapes (Output) ---

/// DocumentSummary
///
/// The compact item shape the listing endpoint returns. `visibility` is the
/// raw persisted integer, passed through unmapped for the frontend to decode.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentSummary {
    pub title: String,
    pub author_id: String,
    /// Author display name.
    pub author: String,
    pub visibility: i32,
    // 'type' is a reserved keyword in Rust, so we rename it for internal use.
    #[serde(rename = "type")]
    #[ts(rename = "type")]
    pub kind: DocumentKind,
    pub id: String,
}

impl From<DocumentHit> for DocumentSummary {
    fn from(hit: DocumentHit) -> Self {
        Self {
            title: hit.title,
            author_id: hit.author_id,
            author: hit.author_name,
            visibility: hit.visibility,
            kind: if hit.is_exercise {
                DocumentKind::Exercise
            } else {
                DocumentKind::Document
            },
            id: hit.id,
        }
    }
}

/// DocumentQueryResponse
///
/// Envelope for the listing endpoint: `{ ok: 1, data, amount }`.
/// `amount` has always been reported as the constant 0 placeholder and stays
/// that way for wire compatibility.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DocumentQueryResponse {
    pub ok: u8,
    pub data: Vec<DocumentSummary>,
    pub amount: i64,
}

/// DocumentResponse
///
/// Envelope for the single-document detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DocumentResponse {
    pub ok: u8,
    pub data: DocumentMeta,
}
