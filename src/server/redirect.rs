use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use log::{debug, error};

use crate::mirror::SnapshotStore;
use crate::selector::{SelectError, Selector};
use crate::util::redirect_target;

/// Per-route state: the shared store plus the selector bound to that route.
#[derive(Clone)]
pub struct RedirectState {
    store: Arc<SnapshotStore>,
    selector: Selector,
}

impl RedirectState {
    pub fn new(store: Arc<SnapshotStore>, selector: Selector) -> Self {
        Self { store, selector }
    }
}

/// Answers with a 302 to the selected mirror. `uri` is already stripped of
/// the route prefix.
pub async fn redirect(State(state): State<RedirectState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return reason(StatusCode::METHOD_NOT_ALLOWED);
    }

    let snapshot = state.store.read();
    if !snapshot.is_ready() {
        return reason(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let target = state
        .selector
        .select(&snapshot, uri.path())
        .and_then(|selection| redirect_target(&selection.mirror.url, selection.path));
    match target {
        Ok(target) => {
            debug!("redirecting {} to {}", uri.path(), target);
            (StatusCode::FOUND, [(header::LOCATION, target.as_str())]).into_response()
        }
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for SelectError {
    fn into_response(self) -> Response {
        match self {
            SelectError::InvalidCountryCode(_) | SelectError::CountryNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            SelectError::EmptySnapshot => reason(StatusCode::INTERNAL_SERVER_ERROR),
            SelectError::MalformedMirrorUrl { .. } => {
                error!("{self}");
                reason(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn reason(status: StatusCode) -> Response {
    let text = status.canonical_reason().unwrap_or_default();
    (status, text).into_response()
}
