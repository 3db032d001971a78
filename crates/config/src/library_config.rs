//! Library listing configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use shelfcast_core::{LibraryId, LibraryOrdering};
use shelfcast_database::{CacheContext, FinishedCheck, RECENT_BOOKS_LIMIT};

/// How the cached library is listed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Library the listings are scoped to; unset lists only library-less books
    pub preferred_library_id: Option<String>,

    pub ordering: LibraryOrdering,

    /// Leave finished books out of listings
    pub hide_finished: bool,

    /// List only books with at least one chapter on the device
    pub downloaded_only: bool,

    /// Seconds from the end at which a book counts as finished; unset means
    /// the position has to match the length exactly
    pub finished_tolerance_secs: Option<f64>,

    /// Entries on the "continue listening" shelf
    pub recent_limit: u32,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            preferred_library_id: None,
            ordering: LibraryOrdering::default(),
            hide_finished: false,
            downloaded_only: false,
            finished_tolerance_secs: None,
            recent_limit: RECENT_BOOKS_LIMIT,
        }
    }
}

impl LibraryConfig {
    /// Listing preferences for the cached-book store
    pub fn cache_context(&self) -> CacheContext {
        CacheContext {
            library_id: self.preferred_library_id.clone().map(LibraryId::new),
            ordering: self.ordering,
            hide_finished: self.hide_finished,
            downloaded_only: self.downloaded_only,
            finished_check: self
                .finished_tolerance_secs
                .map_or(FinishedCheck::Exact, FinishedCheck::Tolerance),
            recent_limit: self.recent_limit,
        }
    }
}

impl ConfigSection for LibraryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::optional_not_empty(
                self.preferred_library_id.as_deref(),
                "library.preferred_library_id",
            ),
            Validator::in_range(self.recent_limit, 1, 100, "library.recent_limit"),
        ];

        if let Some(tolerance) = self.finished_tolerance_secs {
            results.push(Validator::in_range(
                tolerance,
                0.0,
                600.0,
                "library.finished_tolerance_secs",
            ));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        if other.preferred_library_id.is_some() {
            self.preferred_library_id = other.preferred_library_id;
        }
        self.ordering = other.ordering;
        self.hide_finished = other.hide_finished;
        self.downloaded_only = other.downloaded_only;
        self.finished_tolerance_secs = other.finished_tolerance_secs;
        self.recent_limit = other.recent_limit;
    }

    fn section_name(&self) -> &'static str {
        "library"
    }
}
