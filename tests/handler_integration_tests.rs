use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use doc_portal::{
    AppConfig, AppState, MockSessionService, create_router,
    handlers::{DocumentQueryParams, MAX_PAGE_SIZE},
    models::{
        DocumentHit, DocumentMeta, DocumentQueryResponse, IconMeta, Visibility,
        listing_grants_access,
    },
    repository::{DocumentQuery, Repository, RepositoryState},
};
use std::sync::Arc;
use tower::util::ServiceExt;

// --- In-Memory Repository ---

// Applies the same filter semantics as the SQL listing over seeded rows, so
// handler behavior can be exercised without a database.
struct SeededRepository {
    documents: Vec<SeededDocument>,
}

#[derive(Clone)]
struct SeededDocument {
    id: &'static str,
    title: &'static str,
    author_id: &'static str,
    author_name: &'static str,
    visibility: i32,
    is_exercise: bool,
}

impl SeededDocument {
    fn hit(&self) -> DocumentHit {
        DocumentHit {
            id: self.id.to_string(),
            title: self.title.to_string(),
            author_id: self.author_id.to_string(),
            author_name: self.author_name.to_string(),
            visibility: self.visibility,
            is_exercise: self.is_exercise,
        }
    }

    fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            id: self.id.to_string(),
            title: self.title.to_string(),
            author: self.author_name.to_string(),
            author_id: self.author_id.to_string(),
            visibility: Visibility::from_stored(self.visibility),
            created: Utc::now(),
            updated: Utc::now(),
            icon: IconMeta::default(),
            tags: vec![],
        }
    }
}

#[async_trait]
impl Repository for SeededRepository {
    async fn query_documents(&self, query: &DocumentQuery, viewer_id: &str) -> Vec<DocumentHit> {
        self.documents
            .iter()
            .filter(|d| listing_grants_access(viewer_id, d.author_id, d.visibility))
            .filter(|d| d.title.starts_with(&query.title_prefix))
            .filter(|d| query.author_id.is_empty() || d.author_id == query.author_id)
            .skip(query.skip as usize)
            .take(query.size as usize)
            .map(SeededDocument::hit)
            .collect()
    }

    async fn get_document(&self, id: &str, viewer_id: &str) -> Option<DocumentMeta> {
        self.documents
            .iter()
            .find(|d| d.id == id && listing_grants_access(viewer_id, d.author_id, d.visibility))
            .map(SeededDocument::meta)
    }

    async fn get_documents_by_author(&self, author_id: &str) -> Vec<DocumentMeta> {
        self.documents
            .iter()
            .filter(|d| d.author_id == author_id)
            .map(SeededDocument::meta)
            .collect()
    }
}

// --- Test Setup Helpers ---

fn app(documents: Vec<SeededDocument>, sessions: MockSessionService) -> axum::Router {
    let state = AppState {
        repo: Arc::new(SeededRepository { documents }) as RepositoryState,
        sessions: Arc::new(sessions),
        config: AppConfig::default(),
    };
    create_router(state)
}

/// Seeds the three-document scenario used by several listing tests.
fn prefix_scenario() -> Vec<SeededDocument> {
    vec![
        SeededDocument {
            id: "a",
            title: "Foo",
            author_id: "u1",
            author_name: "Ada",
            visibility: 1,
            is_exercise: false,
        },
        SeededDocument {
            id: "b",
            title: "Foobar",
            author_id: "u1",
            author_name: "Ada",
            visibility: 0,
            is_exercise: false,
        },
        SeededDocument {
            id: "c",
            title: "Fox",
            author_id: "u1",
            author_name: "Ada",
            visibility: -1,
            is_exercise: true,
        },
    ]
}

async fn get(
    app: axum::Router,
    uri: &str,
    cookie: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }

    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

fn listing(json: &serde_json::Value) -> DocumentQueryResponse {
    serde_json::from_value(json.clone()).expect("listing envelope")
}

// --- Parameter Normalization ---

#[test]
fn test_normalize_applies_defaults() {
    let query = DocumentQueryParams::default().normalize();
    assert_eq!(query.title_prefix, "");
    assert_eq!(query.author_id, "");
    assert_eq!(query.skip, 0);
    assert_eq!(query.size, MAX_PAGE_SIZE);
}

#[test]
fn test_normalize_caps_oversized_page() {
    let query = DocumentQueryParams {
        size: Some("50".to_string()),
        ..Default::default()
    }
    .normalize();
    assert_eq!(query.size, MAX_PAGE_SIZE);
}

#[test]
fn test_normalize_keeps_sizes_within_ceiling() {
    for requested in 1..=20i64 {
        let query = DocumentQueryParams {
            size: Some(requested.to_string()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(query.size, requested);
    }
}

#[test]
fn test_normalize_malformed_numbers_fall_back() {
    let query = DocumentQueryParams {
        skip: Some("abc".to_string()),
        size: Some("NaN".to_string()),
        ..Default::default()
    }
    .normalize();
    assert_eq!(query.skip, 0);
    assert_eq!(query.size, MAX_PAGE_SIZE);
}

#[test]
fn test_normalize_floors_negative_values() {
    let query = DocumentQueryParams {
        skip: Some("-5".to_string()),
        size: Some("-1".to_string()),
        ..Default::default()
    }
    .normalize();
    assert_eq!(query.skip, 0);
    assert_eq!(query.size, 0);
}

// --- Listing Endpoint ---

#[tokio::test]
async fn test_anonymous_prefix_query_returns_only_public() {
    let app = app(prefix_scenario(), MockSessionService::new());

    let (status, json) = get(app, "/api/document/query?title=Fo", None).await;
    assert_eq!(status, StatusCode::OK);

    let response = listing(&json);
    assert_eq!(response.ok, 1);
    let ids: Vec<&str> = response.data.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a"], "only the PUBLIC document may be listed");
}

#[tokio::test]
async fn test_owner_sees_own_documents_regardless_of_visibility() {
    let docs = vec![SeededDocument {
        id: "d",
        title: "X",
        author_id: "u1",
        author_name: "Ada",
        visibility: -1,
        is_exercise: false,
    }];
    let sessions = MockSessionService::new().with_session("tok-u1", "u1", "Ada");
    let app = app(docs, sessions);

    let (status, json) = get(app, "/api/document/query", Some("auth-session=tok-u1")).await;
    assert_eq!(status, StatusCode::OK);

    let response = listing(&json);
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].id, "d");
}

#[tokio::test]
async fn test_invalid_session_token_degrades_to_anonymous() {
    let sessions = MockSessionService::new().with_session("tok-u1", "u1", "Ada");
    let app = app(prefix_scenario(), sessions);

    // The token is unknown to the session store, so only PUBLIC rows appear.
    let (status, json) = get(app, "/api/document/query", Some("auth-session=bogus")).await;
    assert_eq!(status, StatusCode::OK);

    let response = listing(&json);
    let ids: Vec<&str> = response.data.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
}

#[tokio::test]
async fn test_requested_size_above_ceiling_returns_at_most_twenty() {
    let docs: Vec<SeededDocument> = (0..30)
        .map(|i| SeededDocument {
            id: Box::leak(format!("doc-{i}").into_boxed_str()),
            title: "Title",
            author_id: "u1",
            author_name: "Ada",
            visibility: 1,
            is_exercise: false,
        })
        .collect();
    let app = app(docs, MockSessionService::new());

    let (status, json) = get(app, "/api/document/query?size=50", None).await;
    assert_eq!(status, StatusCode::OK);

    let response = listing(&json);
    assert_eq!(response.data.len(), 20, "page size must cap at 20");
}

#[tokio::test]
async fn test_skip_offsets_into_the_listing() {
    let app = app(prefix_scenario(), MockSessionService::new());
    let sessions = MockSessionService::new().with_session("tok-u1", "u1", "Ada");
    let app_owner = self::app(prefix_scenario(), sessions);

    // Anonymous: one visible document, skipping past it empties the page.
    let (_, json) = get(app, "/api/document/query?skip=1", None).await;
    assert!(listing(&json).data.is_empty());

    // Owner: all three visible, skip=1 leaves two.
    let (_, json) = get(
        app_owner,
        "/api/document/query?skip=1",
        Some("auth-session=tok-u1"),
    )
    .await;
    assert_eq!(listing(&json).data.len(), 2);
}

#[tokio::test]
async fn test_author_filter_is_conjunctive_with_access() {
    let mut docs = prefix_scenario();
    docs.push(SeededDocument {
        id: "z",
        title: "Zeta",
        author_id: "u2",
        author_name: "Grace",
        visibility: 1,
        is_exercise: false,
    });
    let app = app(docs, MockSessionService::new());

    // Constraining to u1 keeps the access predicate: only "a" survives.
    let (_, json) = get(app.clone(), "/api/document/query?author=u1", None).await;
    let ids: Vec<String> = listing(&json).data.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids, vec!["a"]);

    // A matching author with a PUBLIC document still lists.
    let (_, json) = get(app, "/api/document/query?author=u2", None).await;
    let ids: Vec<String> = listing(&json).data.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids, vec!["z"]);
}

#[tokio::test]
async fn test_author_filter_mismatch_yields_empty_data() {
    let app = app(prefix_scenario(), MockSessionService::new());

    let (status, json) = get(app, "/api/document/query?author=nobody", None).await;
    assert_eq!(status, StatusCode::OK);

    let response = listing(&json);
    assert!(response.data.is_empty());
    // The count field stays the constant placeholder.
    assert_eq!(response.amount, 0);
    assert_eq!(response.ok, 1);
}

#[tokio::test]
async fn test_malformed_numeric_params_do_not_fail_the_request() {
    let app = app(prefix_scenario(), MockSessionService::new());

    let (status, json) = get(app, "/api/document/query?skip=abc&size=xyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing(&json).data.len(), 1);
}

#[tokio::test]
async fn test_exercise_extension_tags_the_summary() {
    let docs = vec![
        SeededDocument {
            id: "plain",
            title: "Plain",
            author_id: "u1",
            author_name: "Ada",
            visibility: 1,
            is_exercise: false,
        },
        SeededDocument {
            id: "drill",
            title: "Drill",
            author_id: "u1",
            author_name: "Ada",
            visibility: 1,
            is_exercise: true,
        },
    ];
    let app = app(docs, MockSessionService::new());

    let (_, json) = get(app, "/api/document/query", None).await;
    let data = json["data"].as_array().unwrap().clone();
    let kind_of = |id: &str| {
        data.iter()
            .find(|d| d["id"] == id)
            .map(|d| d["type"].as_str().unwrap().to_string())
            .unwrap()
    };

    assert_eq!(kind_of("plain"), "Document");
    assert_eq!(kind_of("drill"), "Exercise");
}

// --- Detail Endpoint ---

#[tokio::test]
async fn test_detail_hides_private_documents_from_anonymous() {
    let app = app(prefix_scenario(), MockSessionService::new());

    let (status, _) = get(app.clone(), "/api/document/c", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app, "/api/document/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], 1);
    assert_eq!(json["data"]["id"], "a");
    assert_eq!(json["data"]["visibility"], "PUBLIC");
}

#[tokio::test]
async fn test_detail_visible_to_owner_whatever_the_visibility() {
    let sessions = MockSessionService::new().with_session("tok-u1", "u1", "Ada");
    let app = app(prefix_scenario(), sessions);

    let (status, json) = get(app, "/api/document/c", Some("auth-session=tok-u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "c");
    assert_eq!(json["data"]["visibility"], "PRIVATE");
}

// --- My Documents Endpoint ---

#[tokio::test]
async fn test_my_documents_requires_a_session() {
    let app = app(prefix_scenario(), MockSessionService::new());

    let (status, _) = get(app, "/api/document/mine", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_my_documents_lists_all_own_visibilities() {
    let sessions = MockSessionService::new().with_session("tok-u1", "u1", "Ada");
    let app = app(prefix_scenario(), sessions);

    let (status, json) = get(app, "/api/document/mine", Some("auth-session=tok-u1")).await;
    assert_eq!(status, StatusCode::OK);

    let docs = json.as_array().expect("array of documents");
    assert_eq!(docs.len(), 3, "PROTECTED and PRIVATE rows included");
}
