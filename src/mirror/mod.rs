mod builder;
mod store;

pub use builder::{FilterStats, SnapshotBuilder};
pub use store::SnapshotStore;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const HTTP_PROTOCOL: &str = "http";

/// One mirror as reported by the upstream status feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MirrorRecord {
    pub protocol: String,
    pub url: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, deserialize_with = "uppercase_code")]
    pub country_code: String,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delay: Option<i64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub completion_pct: Option<f64>,
    #[serde(default)]
    pub duration_avg: Option<f64>,
    #[serde(default)]
    pub duration_stddev: Option<f64>,
}

impl MirrorRecord {
    pub fn is_http(&self) -> bool {
        self.protocol.eq_ignore_ascii_case(HTTP_PROTOCOL)
    }

    /// Unchecked mirrors report no completion and count as not synced.
    pub fn completion(&self) -> f64 {
        self.completion_pct.unwrap_or(0.0)
    }

    /// Lower scores rank first; unscored mirrors go last.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        match (self.score, other.score) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

fn uppercase_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default().trim().to_ascii_uppercase())
}

/// Raw payload of the upstream status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorStatus {
    #[serde(default)]
    pub cutoff: i64,
    #[serde(default)]
    pub check_frequency: i64,
    #[serde(default)]
    pub num_checks: i64,
    pub last_check: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
    pub urls: Vec<MirrorRecord>,
}

/// Upstream bookkeeping carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusMetadata {
    pub cutoff: i64,
    pub check_frequency: i64,
    pub num_checks: i64,
    pub last_check: Option<DateTime<Utc>>,
    pub version: i64,
}

/// Immutable, filtered and ranked view of the qualifying mirrors.
///
/// `countries[c]` holds exactly the members of `global` whose country code
/// is `c`, in the same relative order. Records are shared between the two
/// views.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    global: Vec<Arc<MirrorRecord>>,
    countries: HashMap<String, Vec<Arc<MirrorRecord>>>,
    metadata: StatusMetadata,
    fetched_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Snapshot {
    /// The sentinel served before the first successful refresh.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ranks and filters a decoded payload.
    ///
    /// The raw list is stable-sorted best-first, so mirrors with equal score
    /// keep upstream order. A record is retained iff it is served over plain
    /// HTTP and its completion is at least `min_completion`.
    pub fn from_status(status: MirrorStatus, min_completion: f64) -> (Self, FilterStats) {
        let MirrorStatus {
            cutoff,
            check_frequency,
            num_checks,
            last_check,
            version,
            mut urls,
        } = status;

        // Vec::sort_by is stable
        urls.sort_by(MirrorRecord::rank_cmp);

        let mut stats = FilterStats {
            total: urls.len(),
            ..FilterStats::default()
        };
        let mut global = Vec::with_capacity(urls.len());
        let mut countries: HashMap<String, Vec<Arc<MirrorRecord>>> = HashMap::new();

        for mirror in urls {
            let is_http = mirror.is_http();
            let is_complete = mirror.completion() >= min_completion;
            if is_http {
                stats.http += 1;
            }
            if is_complete {
                stats.complete += 1;
            }
            if !(is_http && is_complete) {
                continue;
            }

            let mirror = Arc::new(mirror);
            countries
                .entry(mirror.country_code.clone())
                .or_default()
                .push(Arc::clone(&mirror));
            global.push(mirror);
        }
        stats.retained = global.len();

        let snapshot = Self {
            global,
            countries,
            metadata: StatusMetadata {
                cutoff,
                check_frequency,
                num_checks,
                last_check: Some(last_check),
                version,
            },
            fetched_at: Some(Utc::now()),
            version: 0,
        };
        (snapshot, stats)
    }

    /// A snapshot with no qualifying mirror cannot serve redirects.
    pub fn is_ready(&self) -> bool {
        !self.global.is_empty()
    }

    pub fn global(&self) -> &[Arc<MirrorRecord>] {
        &self.global
    }

    /// Mirrors of one country, best first. `code` must be uppercase.
    pub fn country(&self, code: &str) -> Option<&[Arc<MirrorRecord>]> {
        self.countries
            .get(code)
            .map(Vec::as_slice)
            .filter(|bucket| !bucket.is_empty())
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn metadata(&self) -> &StatusMetadata {
        &self.metadata
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Publish sequence number assigned by the store; 0 until published.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(protocol: &str, completion: f64, code: &str, score: f64) -> MirrorRecord {
        MirrorRecord {
            protocol: protocol.to_string(),
            url: format!("{protocol}://{}.mirror.example/archlinux/", code.to_ascii_lowercase()),
            country: String::new(),
            country_code: code.to_string(),
            last_sync: None,
            delay: None,
            score: Some(score),
            completion_pct: Some(completion),
            duration_avg: None,
            duration_stddev: None,
        }
    }

    pub(crate) fn status(urls: Vec<MirrorRecord>) -> MirrorStatus {
        MirrorStatus {
            cutoff: 86400,
            check_frequency: 600,
            num_checks: 12,
            last_check: Utc::now(),
            version: 3,
            urls,
        }
    }

    #[test]
    fn keeps_only_complete_http_mirrors() {
        let first = record("http", 1.0, "US", 10.0);
        let input = status(vec![
            first.clone(),
            record("https", 1.0, "US", 5.0),
            record("http", 0.5, "DE", 1.0),
        ]);

        let (snapshot, stats) = Snapshot::from_status(input, 1.0);

        assert_eq!(snapshot.global().len(), 1);
        assert_eq!(*snapshot.global()[0], first);
        assert_eq!(snapshot.country_count(), 1);
        assert_eq!(snapshot.country("US").map(|b| b.len()), Some(1));
        assert!(snapshot.country("DE").is_none());
        assert_eq!(
            stats,
            FilterStats {
                total: 3,
                http: 2,
                complete: 2,
                retained: 1
            }
        );
    }

    #[test]
    fn sorts_best_first_and_keeps_upstream_order_on_ties() {
        let mut a = record("http", 1.0, "US", 2.0);
        a.url = "http://a.example/".into();
        let mut b = record("http", 1.0, "DE", 2.0);
        b.url = "http://b.example/".into();
        let best = record("http", 1.0, "FR", 0.5);
        let mut unscored = record("http", 1.0, "US", 0.0);
        unscored.score = None;

        let (snapshot, _) =
            Snapshot::from_status(status(vec![unscored, a.clone(), best.clone(), b.clone()]), 1.0);

        let urls: Vec<&str> = snapshot.global().iter().map(|m| m.url.as_str()).collect();
        assert_eq!(urls[..3], [best.url.as_str(), a.url.as_str(), b.url.as_str()]);
        assert_eq!(snapshot.global()[3].score, None);
    }

    #[test]
    fn country_buckets_mirror_global_order() {
        let input = status(vec![
            record("http", 1.0, "US", 3.0),
            record("http", 1.0, "DE", 1.0),
            record("http", 1.0, "US", 2.0),
            record("https", 1.0, "US", 0.1),
        ]);

        let (snapshot, _) = Snapshot::from_status(input, 1.0);

        let bucketed: usize = ["US", "DE"]
            .iter()
            .filter_map(|code| snapshot.country(code))
            .map(|bucket| bucket.len())
            .sum();
        assert_eq!(bucketed, snapshot.global().len());
        for mirror in snapshot.global() {
            let bucket = snapshot.country(&mirror.country_code).expect("bucket");
            assert!(bucket.iter().any(|m| Arc::ptr_eq(m, mirror)));
        }
        let us: Vec<Option<f64>> = snapshot
            .country("US")
            .expect("US")
            .iter()
            .map(|m| m.score)
            .collect();
        assert_eq!(us, vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn lower_threshold_admits_partial_mirrors() {
        let mut unchecked = record("http", 0.0, "SE", 1.0);
        unchecked.completion_pct = None;
        let input = status(vec![record("http", 0.5, "DE", 1.0), unchecked]);

        let (snapshot, stats) = Snapshot::from_status(input, 0.5);

        assert_eq!(snapshot.global().len(), 1);
        assert_eq!(stats.complete, 1);
    }

    #[test]
    fn empty_result_is_valid_but_not_ready() {
        let (snapshot, stats) =
            Snapshot::from_status(status(vec![record("rsync", 1.0, "US", 1.0)]), 1.0);
        assert!(!snapshot.is_ready());
        assert_eq!(stats.retained, 0);
        assert!(snapshot.metadata().last_check.is_some());
        assert!(!Snapshot::empty().is_ready());
    }

    #[test]
    fn decodes_upstream_payload_with_nulls() {
        let body = r#"{
            "cutoff": 86400,
            "check_frequency": 600,
            "num_checks": 24,
            "last_check": "2024-05-01T10:00:00.123Z",
            "version": 3,
            "urls": [
                {"protocol": "http", "url": "http://mirror.example/archlinux/",
                 "country": "Germany", "country_code": "de",
                 "last_sync": "2024-05-01T09:00:00Z", "delay": 3600,
                 "score": 1.5, "completion_pct": 1.0,
                 "duration_avg": 0.3, "duration_stddev": 0.1, "active": true},
                {"protocol": "https", "url": "https://new.example/",
                 "country": "", "country_code": "", "last_sync": null,
                 "delay": null, "score": null, "completion_pct": null,
                 "duration_avg": null, "duration_stddev": null}
            ]
        }"#;

        let status: MirrorStatus = serde_json::from_str(body).expect("decode");
        assert_eq!(status.urls.len(), 2);
        assert_eq!(status.urls[0].country_code, "DE");
        assert_eq!(status.urls[1].score, None);
        assert_eq!(status.urls[1].completion(), 0.0);
    }
}
