//! Project search against the index.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::{IndexClient, IndexError, ProjectInfo};
use crate::inventory::{normalize_name, Package};

/// Scraped results are capped at this many entries.
pub const MAX_RESULTS: usize = 50;

/// Summaries longer than this are truncated.
pub const SUMMARY_LIMIT: usize = 150;

const MAX_TERM_LEN: usize = 100;
const FORBIDDEN: &[char] = &[
    '{', '}', '[', ']', '(', ')', '*', '+', '?', '\\', '|', '^', '$', '<', '>', '!', '@', '#',
    '%', '&', '=', ';', '`', '"', '\'',
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Installed version in the active environment, if installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<String>,
}

/// Trim and check a search term.
pub fn validate_term(term: &str) -> Result<&str, IndexError> {
    let term = term.trim();
    let invalid = |reason: &str| IndexError::InvalidQuery {
        reason: reason.to_string(),
    };
    if term.is_empty() {
        return Err(invalid("search term is empty"));
    }
    if term.chars().count() > MAX_TERM_LEN {
        return Err(invalid("search term is longer than 100 characters"));
    }
    if term.contains(FORBIDDEN) || term.chars().any(char::is_control) {
        return Err(invalid("search term contains special characters"));
    }
    Ok(term)
}

fn truncate_summary(summary: String) -> String {
    if summary.chars().count() <= SUMMARY_LIMIT {
        return summary;
    }
    let mut cut: String = summary.chars().take(SUMMARY_LIMIT).collect();
    cut.push_str("...");
    cut
}

/// Search the index for `term`.
///
/// An exact project match is returned alone; otherwise the search page
/// results are used. Hits are marked with the installed version from
/// `installed`.
pub fn search(client: &dyn IndexClient, term: &str, installed: &[Package]) -> Result<Vec<SearchHit>, IndexError> {
    let term = validate_term(term)?;

    let projects = match client.project(term) {
        Ok(mut project) => {
            if project.name.is_empty() {
                project.name = term.to_string();
            }
            vec![project]
        }
        Err(IndexError::NotFound { .. }) => {
            tracing::debug!("No project named '{}', searching", term);
            let mut found = client.search_page(term)?;
            found.truncate(MAX_RESULTS);
            found
        }
        Err(err) => return Err(err),
    };

    let local: HashMap<String, &str> = installed
        .iter()
        .map(|p| (p.key(), p.version.as_str()))
        .collect();
    let mut seen = HashSet::new();
    let mut hits: Vec<SearchHit> = projects
        .into_iter()
        .filter(|p| seen.insert(p.name.to_lowercase()))
        .map(|ProjectInfo { name, version, summary }| SearchHit {
            installed: local.get(&normalize_name(&name)).map(|v| v.to_string()),
            summary: summary.map(truncate_summary),
            name,
            version,
        })
        .collect();
    hits.sort_by_key(|h| h.name.to_lowercase());
    Ok(hits)
}
