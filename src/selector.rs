use std::fmt;
use std::sync::{Arc, OnceLock};

use clap::ValueEnum;
use rand::seq::SliceRandom;
use regex::Regex;
use thiserror::Error;

use crate::mirror::{MirrorRecord, Snapshot};

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("no mirrors available")]
    EmptySnapshot,
    #[error("invalid country code in path {0:?}")]
    InvalidCountryCode(String),
    #[error("country {0} not found")]
    CountryNotFound(String),
    #[error("mirror has malformed URL {url:?}: {source}")]
    MalformedMirrorUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// How a mirror is picked from an ordered candidate list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SelectionPolicy {
    /// Always the best-ranked mirror
    #[default]
    Best,
    /// Uniformly random among qualifying mirrors
    Random,
}

impl SelectionPolicy {
    fn pick<'a>(&self, candidates: &'a [Arc<MirrorRecord>]) -> Option<&'a Arc<MirrorRecord>> {
        match self {
            SelectionPolicy::Best => candidates.first(),
            SelectionPolicy::Random => candidates.choose(&mut rand::thread_rng()),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::Best => f.write_str("best"),
            SelectionPolicy::Random => f.write_str("random"),
        }
    }
}

/// A chosen mirror plus the part of the request path still to be appended.
#[derive(Debug)]
pub struct Selection<'p> {
    pub mirror: Arc<MirrorRecord>,
    pub path: &'p str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Global(SelectionPolicy),
    Country(SelectionPolicy),
}

impl Selector {
    /// `path` is the request path below the route prefix.
    pub fn select<'p>(
        &self,
        snapshot: &Snapshot,
        path: &'p str,
    ) -> Result<Selection<'p>, SelectError> {
        match *self {
            Selector::Global(policy) => {
                let mirror = policy
                    .pick(snapshot.global())
                    .ok_or(SelectError::EmptySnapshot)?;
                Ok(Selection {
                    mirror: Arc::clone(mirror),
                    path,
                })
            }
            Selector::Country(policy) => {
                let parsed = CountryPath::parse(path)
                    .ok_or_else(|| SelectError::InvalidCountryCode(path.to_string()))?;
                let mirror = snapshot
                    .country(&parsed.code)
                    .and_then(|bucket| policy.pick(bucket))
                    .ok_or(SelectError::CountryNotFound(parsed.code))?;
                Ok(Selection {
                    mirror: Arc::clone(mirror),
                    path: parsed.rest,
                })
            }
        }
    }
}

/// A two-letter country code at the start of a path, e.g. `/de/core/os`.
#[derive(Debug, PartialEq, Eq)]
pub struct CountryPath<'p> {
    /// Uppercase code
    pub code: String,
    /// Whatever follows the code and its separator
    pub rest: &'p str,
}

impl<'p> CountryPath<'p> {
    pub fn parse(path: &'p str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^/([A-Za-z]{2})(?:/|$)").expect("country pattern is valid")
        });

        let captures = pattern.captures(path)?;
        let matched = captures.get(0)?;
        let code = captures.get(1)?.as_str().to_ascii_uppercase();
        Some(Self {
            code,
            rest: &path[matched.end()..],
        })
    }
}
