use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mirror::SnapshotStore;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub ready: bool,
    pub version: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
    pub cutoff: i64,
    pub check_frequency: i64,
    pub num_checks: i64,
    pub upstream_version: i64,
    pub mirrors: usize,
    pub countries: usize,
}

/// Summary of the snapshot currently being served.
pub async fn status(State(store): State<Arc<SnapshotStore>>) -> Json<StatusReport> {
    let snapshot = store.read();
    let metadata = snapshot.metadata();
    Json(StatusReport {
        ready: snapshot.is_ready(),
        version: snapshot.version(),
        fetched_at: snapshot.fetched_at(),
        last_check: metadata.last_check,
        cutoff: metadata.cutoff,
        check_frequency: metadata.check_frequency,
        num_checks: metadata.num_checks,
        upstream_version: metadata.version,
        mirrors: snapshot.global().len(),
        countries: snapshot.country_count(),
    })
}
