//! Local development sharing hub.
//!
//! Serves the sharing API contract under `/api/v1`, backed by sled, so the
//! client can be exercised without a remote deployment:
//!
//! - `POST /auth/issue` issues a bearer token
//! - `POST /notebooks` creates a shared notebook (token required)
//! - `PUT|PATCH /notebooks/{id}` replaces its content (token required)
//! - `GET /notebooks/{id}` fetches it by id or readable alias

use crate::config::HubConfig;
use crate::error::StoreError;
use crate::models::{
    IssueTokenResponse, NotebookDocument, ShareRequest, ShareResponse, SharedNotebookRecord,
    SharedNotebookRef, UpdateRequest,
};
use crate::store::LocalStore;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

#[cfg(test)]
#[path = "hub_test.rs"]
mod hub_test;

const TOKENS_TREE: &str = "tokens";
const NOTEBOOKS_TREE: &str = "notebooks";
const ALIASES_TREE: &str = "aliases";

/// Room for the request envelope around the notebook content.
const BODY_SLACK: usize = 64 * 1024;

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "clever", "curious", "eager", "gentle", "happy", "keen", "lucky", "merry",
    "quiet", "swift",
];
const NOUNS: &[&str] = &[
    "badger", "comet", "falcon", "harbor", "lantern", "maple", "otter", "pebble", "river",
    "sparrow", "tiger", "willow",
];

// ============================================================================
// State
// ============================================================================

pub struct HubState {
    pub store: LocalStore,
    pub config: HubConfig,
}

impl HubState {
    pub fn new(store: LocalStore, config: HubConfig) -> Self {
        Self { store, config }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNotebook {
    id: String,
    readable_id: String,
    content: NotebookDocument,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub fn router(state: Arc<HubState>) -> Router {
    let body_limit = state.config.max_notebook_bytes + BODY_SLACK;

    Router::new()
        .route("/api/v1/auth/issue", post(issue_token))
        .route("/api/v1/notebooks", post(create_notebook))
        .route(
            "/api/v1/notebooks/{id}",
            get(get_notebook).put(update_notebook).patch(update_notebook),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/auth/issue
pub async fn issue_token(State(state): State<Arc<HubState>>) -> Response {
    let token = generate_token();

    if let Err(e) = state.store.put(TOKENS_TREE, &token, &Utc::now()) {
        return storage_failure(e);
    }

    Json(IssueTokenResponse { token }).into_response()
}

/// POST /api/v1/notebooks
pub async fn create_notebook(
    State(state): State<Arc<HubState>>,
    headers: HeaderMap,
    Json(req): Json<ShareRequest>,
) -> Response {
    if let Err(rejection) = require_token(&state, &headers) {
        return rejection;
    }
    if let Err(rejection) = check_size(&state, &req.content) {
        return rejection;
    }

    let readable_id = match unused_readable_id(&state.store) {
        Ok(r) => r,
        Err(e) => return storage_failure(e),
    };
    let now = Utc::now();
    let stored = StoredNotebook {
        id: uuid::Uuid::new_v4().to_string(),
        readable_id,
        content: req.content,
        created_at: now,
        updated_at: now,
    };

    let saved = state
        .store
        .put(NOTEBOOKS_TREE, &stored.id, &stored)
        .and_then(|_| state.store.put(ALIASES_TREE, &stored.readable_id, &stored.id));
    if let Err(e) = saved {
        return storage_failure(e);
    }

    info!("Created notebook {} ({})", stored.id, stored.readable_id);

    (
        StatusCode::CREATED,
        Json(ShareResponse {
            message: Some("Notebook created successfully".to_string()),
            notebook: SharedNotebookRef {
                id: stored.id,
                readable_id: Some(stored.readable_id),
            },
        }),
    )
        .into_response()
}

/// PUT|PATCH /api/v1/notebooks/{id}
pub async fn update_notebook(
    Path(id): Path<String>,
    State(state): State<Arc<HubState>>,
    headers: HeaderMap,
    Json(req): Json<UpdateRequest>,
) -> Response {
    if let Err(rejection) = require_token(&state, &headers) {
        return rejection;
    }

    let mut stored = match find_notebook(&state.store, &id) {
        Ok(Some(s)) => s,
        Ok(None) => return message(StatusCode::NOT_FOUND, "Notebook not found"),
        Err(e) => return storage_failure(e),
    };

    if let Err(rejection) = check_size(&state, &req.content) {
        return rejection;
    }

    stored.content = req.content;
    stored.updated_at = Utc::now();
    if let Err(e) = state.store.put(NOTEBOOKS_TREE, &stored.id, &stored) {
        return storage_failure(e);
    }

    info!("Updated notebook {}", stored.id);
    Json(serde_json::json!({ "message": "Notebook updated successfully" })).into_response()
}

/// GET /api/v1/notebooks/{id}
pub async fn get_notebook(Path(id): Path<String>, State(state): State<Arc<HubState>>) -> Response {
    match find_notebook(&state.store, &id) {
        Ok(Some(stored)) => Json(SharedNotebookRecord {
            id: stored.id,
            readable_id: Some(stored.readable_id),
            domain_id: Some(state.config.domain_id.clone()),
            content: stored.content,
        })
        .into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, "Notebook not found"),
        Err(e) => storage_failure(e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(serde_json::json!({ "message": text }))).into_response()
}

fn storage_failure(e: StoreError) -> Response {
    error!("Hub storage failure: {}", e);
    message(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
}

fn require_token(state: &HubState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return Err(message(StatusCode::UNAUTHORIZED, "Missing bearer token"));
    };

    match state.store.contains(TOKENS_TREE, token) {
        Ok(true) => Ok(()),
        Ok(false) => {
            warn!("Rejected unknown bearer token");
            Err(message(StatusCode::UNAUTHORIZED, "Invalid bearer token"))
        }
        Err(e) => Err(storage_failure(e)),
    }
}

fn check_size(state: &HubState, content: &NotebookDocument) -> Result<(), Response> {
    let size = content.encoded_len();
    if size > state.config.max_notebook_bytes {
        warn!(
            "Rejected notebook of {} bytes (limit {})",
            size, state.config.max_notebook_bytes
        );
        return Err(message(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!(
                "Notebook exceeds the maximum size of {} bytes",
                state.config.max_notebook_bytes
            ),
        ));
    }
    Ok(())
}

/// Look a notebook up by id, then by readable alias.
fn find_notebook(
    store: &LocalStore,
    id_or_alias: &str,
) -> Result<Option<StoredNotebook>, StoreError> {
    if let Some(stored) = store.get(NOTEBOOKS_TREE, id_or_alias)? {
        return Ok(Some(stored));
    }
    match store.get::<String>(ALIASES_TREE, id_or_alias)? {
        Some(id) => store.get(NOTEBOOKS_TREE, &id),
        None => Ok(None),
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 24] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn generate_readable_id() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("shared");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("notebook");
    format!("{}-{}-{}", adjective, noun, rng.gen_range(10..100))
}

fn unused_readable_id(store: &LocalStore) -> Result<String, StoreError> {
    for _ in 0..32 {
        let candidate = generate_readable_id();
        if !store.contains(ALIASES_TREE, &candidate)? {
            return Ok(candidate);
        }
    }
    // word space exhausted, disambiguate with a uuid fragment
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    Ok(format!("{}-{}", generate_readable_id(), &suffix[..8]))
}
