//! Shared types and utilities for admin routes

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Placeholder shown when an owner email or restaurant name cannot be joined
pub const UNKNOWN: &str = "Unknown";

/// Log comprehensive database error details for debugging
pub fn log_db_err(req_id: Uuid, step: &'static str, e: &sqlx::Error) {
    if let Some(db) = e.as_database_error() {
        tracing::error!(
            %req_id,
            step,
            code = ?db.code(),
            message = db.message(),
            table = ?db.table(),
            constraint = ?db.constraint(),
            full_error = ?e,
            "Database query failed"
        );
    } else {
        tracing::error!(%req_id, step, error = ?e, "Non-database SQLx error");
    }
}

/// Log a failed read-model query and hide its details from the caller
pub fn db_failure(req_id: Uuid, step: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| {
        log_db_err(req_id, step, &e);
        ApiError::Database(e.to_string())
    }
}

/// `?search=&status=` filters shared by the restaurant and subscription lists
#[derive(Debug, Default, Deserialize)]
pub struct ListFilter {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListFilter {
    /// Trimmed search term, `None` when blank
    pub fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// `ILIKE` pattern matching the search term anywhere, with `%`, `_` and
    /// `\` in the term matched literally
    pub fn search_pattern(&self) -> Option<String> {
        self.search().map(|term| {
            let mut pattern = String::with_capacity(term.len() + 2);
            pattern.push('%');
            for c in term.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    pattern.push('\\');
                }
                pattern.push(c);
            }
            pattern.push('%');
            pattern
        })
    }

    /// Status to match, `None` for `all` or blank
    pub fn status(&self) -> Option<String> {
        self.status
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && s != "all")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter_normalizes_blank_and_all() {
        let filter = ListFilter {
            search: Some("   ".into()),
            status: Some("All".into()),
        };
        assert_eq!(filter.search(), None);
        assert_eq!(filter.status(), None);

        let filter = ListFilter {
            search: Some(" pizza ".into()),
            status: Some("Past_Due".into()),
        };
        assert_eq!(filter.search().as_deref(), Some("pizza"));
        assert_eq!(filter.status().as_deref(), Some("past_due"));
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ListFilter {
            search: Some(" 100%_off\\ ".into()),
            status: None,
        };
        assert_eq!(
            filter.search_pattern().as_deref(),
            Some("%100\\%\\_off\\\\%")
        );

        let filter = ListFilter {
            search: Some("pizza".into()),
            status: None,
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%pizza%"));
        assert_eq!(ListFilter::default().search_pattern(), None);
    }
}
