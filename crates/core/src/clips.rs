//! Chapter-to-file clip resolution
//!
//! Audio files and chapters have independent boundaries: one chapter may span
//! several files, and one file may hold several chapters. The player needs,
//! for every chapter, the ordered slices of files that make it up.

use crate::types::{BookFile, Chapter, FileId};
use serde::{Deserialize, Serialize};

/// Slices shorter than this, and chapter remainders within it, are ignored
pub const CLIP_EPSILON: f64 = 0.01;

/// A slice of one audio file, in seconds relative to the file start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileClip {
    pub file_id: FileId,
    pub clip_start: f64,
    pub clip_end: f64,
}

impl FileClip {
    /// Length of the slice in seconds
    pub fn duration(&self) -> f64 {
        self.clip_end - self.clip_start
    }
}

/// Maps every chapter to the file slices that compose it
///
/// Files are consumed in order. Chapters extending past the last file get
/// truncated clips; files extending past the last chapter are not referenced.
pub fn resolve_chapter_files(chapters: &[Chapter], files: &[BookFile]) -> Vec<Vec<FileClip>> {
    let mut remaining_files = files.iter();
    let Some(mut current_file) = remaining_files.next() else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(chapters.len());
    // Overall position where the current file starts
    let mut file_offset = 0.0;

    for chapter in chapters {
        let mut clips = Vec::with_capacity(1);
        let mut outstanding_start = chapter.start;

        while outstanding_start < chapter.end - CLIP_EPSILON {
            let file_end = file_offset + current_file.duration;
            let overlap_end = chapter.end.min(file_end);

            if overlap_end - outstanding_start > CLIP_EPSILON {
                clips.push(FileClip {
                    file_id: current_file.id.clone(),
                    clip_start: outstanding_start - file_offset,
                    clip_end: overlap_end - file_offset,
                });
            }

            if file_end >= chapter.end {
                break;
            }

            match remaining_files.next() {
                Some(next) => {
                    file_offset += current_file.duration;
                    current_file = next;
                }
                None => break,
            }

            outstanding_start = overlap_end;
        }

        result.push(clips);
    }

    result
}
