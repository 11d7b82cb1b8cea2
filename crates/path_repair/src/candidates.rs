//! Candidate path generation.
//!
//! Produces the ordered, deduplicated list of remote directories worth
//! probing for a server. Pure: no I/O, same input gives the same list.

use crate::types::{PathCategory, ServerDescriptor};

const KILLLOG_TEMPLATES: &[&str] = &[
    "{host}_{server}/actual1/deathlogs",
    "{host}_{server}/actual/deathlogs",
    "{host}/{server}/actual1/deathlogs",
    "{host}/{server}/actual/deathlogs",
    "{server}/actual1/deathlogs",
    "{server}/actual/deathlogs",
];

const TEXTLOG_TEMPLATES: &[&str] = &[
    "{host}_{server}/Logs",
    "{host}_{server}/Deadside/Logs",
    "{host}/{server}/Logs",
    "{host}/{server}/Deadside/Logs",
    "{server}/Logs",
    "{server}/Deadside/Logs",
];

/// Directory templates for a category, most likely first.
pub fn templates(category: PathCategory) -> &'static [&'static str] {
    match category {
        PathCategory::KillLog => KILLLOG_TEMPLATES,
        PathCategory::TextLog => TEXTLOG_TEMPLATES,
    }
}

/// Trims surrounding whitespace and trailing separators so equal
/// directories compare equal.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() && trimmed.starts_with('/') {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

/// Builds the candidate list for `server`:
/// the configured path, then `cached` (if different), then every template
/// that can be filled from the server's host and identifier.
pub fn generate_candidates(
    server: &ServerDescriptor,
    category: PathCategory,
    cached: Option<&str>,
) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(8);
    let mut push = |path: String| {
        if !path.is_empty() && !candidates.contains(&path) {
            candidates.push(path);
        }
    };

    push(normalize_path(server.path(category)));
    if let Some(cached) = cached {
        push(normalize_path(cached));
    }

    let host = server.effective_host();
    if let Some(token) = server.server_token() {
        for template in templates(category) {
            if let Some(path) = render(template, host, &token) {
                push(path);
            }
        }
    }

    candidates
}

fn render(template: &str, host: Option<&str>, server: &str) -> Option<String> {
    let rendered = if template.contains("{host}") {
        template.replace("{host}", host?)
    } else {
        template.to_string()
    };
    Some(normalize_path(&rendered.replace("{server}", server)))
}
