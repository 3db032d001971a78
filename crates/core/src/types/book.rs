//! Book, chapter and file domain models

use crate::position::{resolve_chapter_position, ChapterPosition};
use crate::types::{MediaProgress, Timestamp, Validator};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a server-assigned identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Library item identifier of a book or podcast, assigned by the media server
    BookId
);
string_id!(
    /// Chapter identifier, unique within one book
    ChapterId
);
string_id!(
    /// Audio file identifier, unique within one book
    FileId
);
string_id!(
    /// Server library the book belongs to
    LibraryId
);

/// A named sub-range of a book's total playback duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    /// Seconds from the start of the book
    pub start: f64,
    /// Seconds from the start of the book
    pub end: f64,
    pub duration: f64,
    /// Whether the chapter audio can be played (cached on-device or streamable)
    pub available: bool,
}

impl Chapter {
    /// Creates a chapter starting at `start` and lasting `duration` seconds
    pub fn new(id: impl Into<ChapterId>, title: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end: start + duration,
            duration,
            available: true,
        }
    }

    /// Returns true if the overall position falls inside `[start, end)`
    pub fn contains(&self, overall_position: f64) -> bool {
        overall_position >= self.start && overall_position < self.end
    }
}

impl Validator for Chapter {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.id.as_str().trim().is_empty() {
            errors.push("Chapter id cannot be empty".to_string());
        }

        if self.duration < 0.0 {
            errors.push(format!("Chapter duration must not be negative: {}", self.duration));
        }

        if (self.start + self.duration - self.end).abs() > 1e-6 {
            errors.push(format!(
                "Chapter end {} does not match start {} + duration {}",
                self.end, self.start, self.duration
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A raw audio track of a book; its boundaries need not match chapter boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookFile {
    pub id: FileId,
    pub name: String,
    pub duration: f64,
    pub mime_type: String,
}

impl BookFile {
    /// Creates a file entry
    pub fn new(id: impl Into<FileId>, name: impl Into<String>, duration: f64, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration,
            mime_type: mime_type.into(),
        }
    }
}

/// Series membership of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSeries {
    pub name: String,
    pub sequence: Option<String>,
}

/// Full book aggregate as delivered by the server or rebuilt from the local cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedBook {
    pub id: BookId,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub narrator: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<String>,
    pub abstract_text: Option<String>,
    pub series: Vec<BookSeries>,
    pub files: Vec<BookFile>,
    /// Playback order
    pub chapters: Vec<Chapter>,
    pub progress: Option<MediaProgress>,
    /// `None` for items that only exist locally
    pub library_id: Option<LibraryId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DetailedBook {
    /// Creates a book with no chapters, files or metadata besides the title
    pub fn new(id: impl Into<BookId>, title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            author: None,
            narrator: None,
            publisher: None,
            year: None,
            abstract_text: None,
            series: Vec::new(),
            files: Vec::new(),
            chapters: Vec::new(),
            progress: None,
            library_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of all chapter durations
    pub fn total_duration(&self) -> f64 {
        self.chapters.iter().map(|c| c.duration).sum()
    }

    /// Resolves an overall position into a chapter index and in-chapter offset
    pub fn chapter_position(&self, overall_position: f64) -> ChapterPosition {
        resolve_chapter_position(&self.chapters, overall_position)
    }

    /// Finds a chapter by id
    pub fn chapter(&self, id: &ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| &c.id == id)
    }

    /// Space-separated series names, used for searching and sorting
    pub fn series_names(&self) -> String {
        self.series
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Validator for DetailedBook {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Book title cannot be empty".to_string());
        }

        for chapter in &self.chapters {
            if let Err(mut chapter_errors) = chapter.validate() {
                errors.append(&mut chapter_errors);
            }
        }

        if self
            .chapters
            .windows(2)
            .any(|pair| pair[1].start < pair[0].start)
        {
            errors.push("Chapters must be ordered by start".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Library list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    /// Whole seconds
    pub duration: i64,
    pub library_id: Option<LibraryId>,
    /// True when the book has rows in the local cache
    pub cached: bool,
}

/// Entry of the "continue listening" shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentBook {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    pub listened_last_update: Option<Timestamp>,
    /// 0-100, `None` when no progress is known
    pub listened_percentage: Option<u8>,
}

impl RecentBook {
    /// Computes the listened percentage from a position and a total duration
    pub fn percentage(current_time: f64, duration: f64) -> Option<u8> {
        if duration <= 0.0 {
            return None;
        }
        Some(((current_time / duration) * 100.0).clamp(0.0, 100.0) as u8)
    }
}
