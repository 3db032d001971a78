//! Chapter-position resolution
//!
//! Converts an overall playback position (seconds since the start of the
//! book, across all files) into a chapter index plus the offset inside that
//! chapter. All functions here are pure and never fail.
//!
//! A position within [`BOUNDARY_EPSILON`] of a chapter's end already belongs
//! to the next chapter. Positions at or past the end of the final chapter
//! resolve to the final chapter with offset `0.0`.

use crate::types::Chapter;
use serde::{Deserialize, Serialize};

/// Look-ahead tolerance, in seconds, applied at every chapter end
pub const BOUNDARY_EPSILON: f64 = 0.1;

/// Sentinel chapter index reported for a book without chapters
pub const NO_CHAPTER: i64 = -1;

/// Resolved chapter and offset for an overall position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChapterPosition {
    /// `None` only when the book has no chapters
    pub index: Option<usize>,
    /// Seconds relative to the chapter start; negative inside the epsilon window
    pub position: f64,
}

impl ChapterPosition {
    /// Position reported for a book without chapters
    pub const EMPTY: Self = Self {
        index: None,
        position: 0.0,
    };

    /// Returns the index, or `-1` when the book has no chapters
    pub fn index_or_sentinel(&self) -> i64 {
        self.index.map_or(NO_CHAPTER, |i| i as i64)
    }
}

/// Resolves the chapter containing `overall_position` and the offset inside it
///
/// Chapters are scanned in order; the first chapter whose
/// `end - BOUNDARY_EPSILON` lies strictly after the position wins. The scan is
/// sequential on purpose so that chapters shorter than the epsilon never shift
/// the result. When no chapter qualifies the last chapter is returned with an
/// offset of `0.0`.
pub fn resolve_chapter_position(chapters: &[Chapter], overall_position: f64) -> ChapterPosition {
    let Some(last) = chapters.len().checked_sub(1) else {
        return ChapterPosition::EMPTY;
    };

    for (index, chapter) in chapters.iter().enumerate() {
        if overall_position < chapter.end - BOUNDARY_EPSILON {
            return ChapterPosition {
                index: Some(index),
                position: overall_position - chapter.start,
            };
        }
    }

    ChapterPosition {
        index: Some(last),
        position: 0.0,
    }
}

/// Chapter index for `overall_position`; `None` for a book without chapters
pub fn resolve_chapter_index(chapters: &[Chapter], overall_position: f64) -> Option<usize> {
    resolve_chapter_position(chapters, overall_position).index
}

/// Offset inside the resolved chapter for `overall_position`
pub fn resolve_chapter_offset(chapters: &[Chapter], overall_position: f64) -> f64 {
    resolve_chapter_position(chapters, overall_position).position
}
