use crate::models::{DocumentHit, DocumentMeta, IconMeta, Visibility};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use std::sync::Arc;

/// DocumentQuery
///
/// The normalized input to the listing operation. All fields have been
/// defaulted and clamped by the handler before reaching the repository, so
/// implementations can bind them directly.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Case-sensitive title prefix; empty matches every title.
    pub title_prefix: String,
    /// Exact author-id constraint; empty means unconstrained.
    pub author_id: String,
    /// Pagination offset, already floored at 0.
    pub skip: i64,
    /// Page size, already clamped to the hard ceiling.
    pub size: i64,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence reads. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact
/// with the data layer without knowing the specific implementation
/// (Postgres, in-memory stub, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
///
/// Every method is a read; document records are mutated elsewhere.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Access-filtered, paginated listing. `viewer_id` is the resolved viewer
    /// or the empty string for anonymous requests; a document is included
    /// when the viewer authored it or its stored visibility is PUBLIC, with
    /// the title-prefix and author constraints applied on top. Result order
    /// is storage-defined.
    async fn query_documents(&self, query: &DocumentQuery, viewer_id: &str) -> Vec<DocumentHit>;

    /// Single document under the same owner-or-public rule as the listing.
    async fn get_document(&self, id: &str, viewer_id: &str) -> Option<DocumentMeta>;

    /// Every document owned by `author_id` regardless of visibility,
    /// newest-updated first.
    async fn get_documents_by_author(&self, author_id: &str) -> Vec<DocumentMeta>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape for queries returning the full document record, including the
/// flattened icon columns. Converted into `DocumentMeta` before leaving the
/// repository.
#[derive(FromRow)]
struct DocumentRow {
    id: String,
    title: String,
    author_id: String,
    author_name: String,
    visibility: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    icon_library: String,
    icon_value: String,
    icon_numbering: Option<i32>,
    tags: Vec<String>,
}

impl From<DocumentRow> for DocumentMeta {
    fn from(row: DocumentRow) -> Self {
        DocumentMeta {
            id: row.id,
            title: row.title,
            author: row.author_name,
            author_id: row.author_id,
            visibility: Visibility::from_stored(row.visibility),
            created: row.created_at,
            updated: row.updated_at,
            icon: IconMeta {
                library: row.icon_library,
                value: row.icon_value,
                numbering: row.icon_numbering,
            },
            tags: row.tags,
        }
    }
}

// Shared SELECT list for full-record queries.
const DOCUMENT_COLUMNS: &str = r#"
    d.id, d.title, d.author_id, u.name AS author_name,
    d.visibility, d.created_at, d.updated_at,
    d.icon_library, d.icon_value, d.icon_numbering, d.tags
"#;

/// escape_like
///
/// Escapes LIKE wildcards so a title prefix is matched literally. Postgres
/// treats backslash as the default escape character.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Repository for PostgresRepository {
    /// query_documents
    ///
    /// Implements the access-filtered listing using QueryBuilder for safe
    /// parameterization, adhering to the **"No SQL Injection Risk"** mandate.
    ///
    /// The access predicate is encoded directly in the WHERE clause:
    /// `(author_id = $viewer OR visibility = 1)`. An anonymous viewer binds
    /// as the empty string, which never matches an author id, so anonymous
    /// requests see only PUBLIC rows. The exercise extension is joined purely
    /// for its presence flag.
    async fn query_documents(&self, query: &DocumentQuery, viewer_id: &str) -> Vec<DocumentHit> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                d.id, d.title, d.author_id, u.name AS author_name,
                d.visibility, (e.document_id IS NOT NULL) AS is_exercise
            FROM documents d
            JOIN users u ON u.id = d.author_id
            LEFT JOIN exercises e ON e.document_id = d.id
            WHERE (d.author_id = "#,
        );
        builder.push_bind(viewer_id);
        builder.push(" OR d.visibility = ");
        builder.push_bind(Visibility::Public.to_stored());
        builder.push(")");

        // Case-sensitive prefix match; an empty prefix matches every title.
        builder.push(" AND d.title LIKE ");
        builder.push_bind(format!("{}%", escape_like(&query.title_prefix)));

        if !query.author_id.is_empty() {
            builder.push(" AND d.author_id = ");
            builder.push_bind(query.author_id.as_str());
        }

        builder.push(" OFFSET ");
        builder.push_bind(query.skip);
        builder.push(" LIMIT ");
        builder.push_bind(query.size);

        match builder
            .build_query_as::<DocumentHit>()
            .fetch_all(&self.pool)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!("query_documents error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_document
    ///
    /// Retrieves a document if the viewer owns it OR it is PUBLIC. A hidden
    /// document and a missing one are indistinguishable to a non-owner.
    async fn get_document(&self, id: &str, viewer_id: &str) -> Option<DocumentMeta> {
        let sql = format!(
            r#"SELECT {DOCUMENT_COLUMNS}
               FROM documents d
               JOIN users u ON u.id = d.author_id
               WHERE d.id = $1 AND (d.author_id = $2 OR d.visibility = $3)"#
        );

        sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(viewer_id)
            .bind(Visibility::Public.to_stored())
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_document error: {:?}", e);
                None
            })
            .map(DocumentMeta::from)
    }

    /// get_documents_by_author
    ///
    /// Retrieves all documents owned by the given author, including
    /// PROTECTED and PRIVATE ones.
    async fn get_documents_by_author(&self, author_id: &str) -> Vec<DocumentMeta> {
        let sql = format!(
            r#"SELECT {DOCUMENT_COLUMNS}
               FROM documents d
               JOIN users u ON u.id = d.author_id
               WHERE d.author_id = $1
               ORDER BY d.updated_at DESC"#
        );

        match sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows.into_iter().map(DocumentMeta::from).collect(),
            Err(e) => {
                tracing::error!("get_documents_by_author error: {:?}", e);
                vec![]
            }
        }
    }
}
