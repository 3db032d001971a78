//! Library listing options

use serde::{Deserialize, Serialize};

/// Field a library listing can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderingField {
    #[default]
    Title,
    Author,
    Duration,
}

impl OrderingField {
    /// Column of `detailed_books` this field sorts on
    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "detailed_books.title",
            Self::Author => "detailed_books.author",
            Self::Duration => "detailed_books.duration",
        }
    }
}

impl std::fmt::Display for OrderingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Author => write!(f, "author"),
            Self::Duration => write!(f, "duration"),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderingDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderingDirection {
    /// SQL keyword for this direction
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl std::fmt::Display for OrderingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

/// Sort order of a library listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct LibraryOrdering {
    pub field: OrderingField,
    pub direction: OrderingDirection,
}

impl LibraryOrdering {
    /// Creates an ordering
    pub fn new(field: OrderingField, direction: OrderingDirection) -> Self {
        Self { field, direction }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedItems<T> {
    pub items: Vec<T>,
    pub current_page: u32,
}

impl<T> PagedItems<T> {
    /// Wraps a page of items
    pub fn new(items: Vec<T>, current_page: u32) -> Self {
        Self {
            items,
            current_page,
        }
    }

    /// Returns true if the page has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
