//! HTTP client for the remote sharing service.
//!
//! Pure transport: authenticate, create, update and retrieve shared notebooks.
//! Deciding *when* to call any of this is the resolver's and orchestrator's job.

use crate::config::Config;
use crate::error::{
    AuthError, RetrieveError, RetrieveFailure, ShareError, ShareFailure, UpdateError,
};
use crate::models::{
    ApiErrorBody, IssueTokenResponse, NotebookDocument, ShareRequest, ShareResponse,
    SharedNotebookRecord, SharedNotebookRef, UpdateRequest,
};
use regex::Regex;
use reqwest::StatusCode;
use std::future::Future;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, info, warn};
use url::Url;

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

/// Query parameter carrying a shared notebook id on the notebook page.
pub const NOTEBOOK_PARAM: &str = "notebook";

/// Operations the sync core needs from the sharing service.
pub trait SharingApi {
    /// Make sure a bearer token is held. No network call when one already is.
    fn authenticate(&self) -> impl Future<Output = Result<(), AuthError>>;

    /// Create a new shared notebook from the full document.
    fn share(
        &self,
        content: &NotebookDocument,
    ) -> impl Future<Output = Result<SharedNotebookRef, ShareError>>;

    /// Overwrite an existing shared notebook in place.
    fn update(
        &self,
        id: &str,
        content: &NotebookDocument,
    ) -> impl Future<Output = Result<(), UpdateError>>;

    /// Fetch a shared notebook by id or readable alias.
    fn retrieve(&self, id: &str)
        -> impl Future<Output = Result<SharedNotebookRecord, RetrieveError>>;

    /// Shareable link for the given id. No I/O.
    fn make_retrieve_url(&self, id: &str) -> Url;
}

// ============================================================================
// reqwest Client
// ============================================================================

pub struct SharingClient {
    http: reqwest::Client,
    api_url: String,
    app_url: Url,
    token: Mutex<Option<String>>,
}

impl SharingClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            app_url: config.app_url.clone(),
            token: Mutex::new(None),
        }
    }

    /// Forget the cached bearer token.
    pub fn reset_token(&self) {
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }

    pub fn has_token(&self) -> bool {
        self.current_token().is_some()
    }

    fn current_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn notebook_endpoint(&self, id: &str) -> String {
        self.endpoint(&format!("/notebooks/{}", urlencoding::encode(id)))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl SharingApi for SharingClient {
    async fn authenticate(&self) -> Result<(), AuthError> {
        if self.has_token() {
            return Ok(());
        }

        let response = self
            .http
            .post(self.endpoint("/auth/issue"))
            .send()
            .await
            .map_err(|e| AuthError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            warn!("Token issuance rejected ({}): {}", status, message);
            return Err(AuthError { message });
        }

        let issued: IssueTokenResponse = response.json().await.map_err(|e| AuthError {
            message: format!("Invalid token response: {}", e),
        })?;

        if let Ok(mut token) = self.token.lock() {
            *token = Some(issued.token);
        }
        debug!("Obtained sharing service token");
        Ok(())
    }

    async fn share(&self, content: &NotebookDocument) -> Result<SharedNotebookRef, ShareError> {
        let request = self
            .http
            .post(self.endpoint("/notebooks"))
            .json(&ShareRequest {
                content: content.clone(),
            });

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ShareError {
                reason: ShareFailure::Network,
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ShareError {
                reason: classify_rejection(status, &message),
                status: Some(status.as_u16()),
                message,
            });
        }

        let created: ShareResponse = response.json().await.map_err(|e| ShareError {
            reason: ShareFailure::Network,
            status: Some(status.as_u16()),
            message: format!("Invalid share response: {}", e),
        })?;

        info!(
            "Shared notebook as {} ({})",
            created.notebook.id,
            created.message.as_deref().unwrap_or("no message")
        );
        Ok(created.notebook)
    }

    async fn update(&self, id: &str, content: &NotebookDocument) -> Result<(), UpdateError> {
        let request = self
            .http
            .put(self.notebook_endpoint(id))
            .json(&UpdateRequest {
                content: content.clone(),
            });

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| UpdateError {
                reason: ShareFailure::Network,
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(UpdateError {
                reason: classify_rejection(status, &message),
                status: Some(status.as_u16()),
                message,
            });
        }

        debug!("Updated shared notebook {}", id);
        Ok(())
    }

    async fn retrieve(&self, id: &str) -> Result<SharedNotebookRecord, RetrieveError> {
        let request = self.http.get(self.notebook_endpoint(id));

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| RetrieveError {
                reason: RetrieveFailure::Network,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RetrieveError {
                reason: RetrieveFailure::NotFound,
                message: format!("Notebook \"{}\" was not found", id),
            });
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(RetrieveError {
                reason: RetrieveFailure::ServerRejected,
                message: format!("{} ({})", message, status),
            });
        }

        response.json().await.map_err(|e| RetrieveError {
            reason: RetrieveFailure::Network,
            message: format!("Invalid notebook response: {}", e),
        })
    }

    fn make_retrieve_url(&self, id: &str) -> Url {
        make_retrieve_url(&self.app_url, id)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// `<app_url>?notebook=<id>`, keeping any other parameters of the app URL.
pub fn make_retrieve_url(app_url: &Url, id: &str) -> Url {
    let mut url = app_url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != NOTEBOOK_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(NOTEBOOK_PARAM, id);
    url
}

/// 413 is authoritative. The message heuristic only catches servers or
/// proxies that report the size limit under another status.
pub fn classify_rejection(status: StatusCode, message: &str) -> ShareFailure {
    if status == StatusCode::PAYLOAD_TOO_LARGE || looks_too_large(message) {
        ShareFailure::TooLarge
    } else {
        ShareFailure::ServerRejected
    }
}

fn looks_too_large(message: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)too\s+large|payload\s+too|size\s+limit|exceeds?\s+(the\s+)?(max|size)")
                .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}

/// Best description of a failed response: the JSON `message`, else the raw body.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
