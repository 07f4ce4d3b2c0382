//! Container filter criteria
//!
//! Filters are written as comma-separated `key=value` tokens, e.g.
//! `label=game-server,status=running`. Values under the same key are ORed by
//! the runtime, distinct keys are ANDed.

use crate::error::FilterParseWarning;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter specification, logging and skipping malformed tokens
    pub fn parse(spec: &str) -> Self {
        let (criteria, warnings) = Self::parse_with_warnings(spec);
        for warning in &warnings {
            warn!("⚠️  Filter: {}", warning);
        }
        criteria
    }

    /// Parse a filter specification and hand back the skipped tokens
    pub fn parse_with_warnings(spec: &str) -> (Self, Vec<FilterParseWarning>) {
        let mut criteria = Self::new();
        let mut warnings = Vec::new();

        for token in spec.split(',').map(str::trim) {
            if token.is_empty() {
                continue;
            }

            let Some((key, value)) = token.split_once('=') else {
                warnings.push(FilterParseWarning::MissingSeparator {
                    token: token.to_string(),
                });
                continue;
            };

            let key = key.trim();
            if key.is_empty() {
                warnings.push(FilterParseWarning::EmptyKey {
                    token: token.to_string(),
                });
                continue;
            }

            criteria.insert(key, value.trim());
        }

        debug!("Parsed filter {:?} into {}", spec, criteria);
        (criteria, warnings)
    }

    /// Add a key/value pair. Empty keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.entries.entry(key).or_default().insert(value.into());
    }

    /// Builder-style variant of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Union of both criteria. Neither input is modified.
    pub fn merge(base: &Self, extra: &Self) -> Self {
        let mut merged = base.clone();
        for (key, values) in &extra.entries {
            merged
                .entries
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        merged
    }

    /// Extend `self` with `extra`
    pub fn merged_with(&self, extra: &Self) -> Self {
        Self::merge(self, extra)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn values(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|values| values.contains(value))
    }

    /// Every key/value pair, ordered by key then value
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Shape expected by the Docker list API
    pub fn to_docker_filters(&self) -> HashMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(key, values)| (key.clone(), values.iter().cloned().collect()))
            .collect()
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .pairs()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&rendered)
    }
}
