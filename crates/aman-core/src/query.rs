//! Keyword queries over a document set.
//!
//! Index backed modes look the keyword up in [`PageIndices`]; scanning modes
//! walk every page of every book and match a case-insensitive substring.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::docset::DocumentSet;
use crate::index::PageIndices;
use crate::types::{Page, PageRef};
use crate::{Error, Result};

/// Section scanned by [`QueryMode::Synopsis`].
pub const SYNOPSIS: &str = "SYNOPSIS";

/// What a keyword is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    /// Full title first, then the name part of the title.
    #[default]
    Page,
    /// Full `topic/name` title only.
    BookPage,
    /// Entries of `SEE ALSO` sections.
    SeeAlso,
    /// Substring of the `SYNOPSIS` section.
    Synopsis,
    /// Substring of the whole page text.
    FullText,
}

impl QueryMode {
    /// Every mode, in display order.
    pub const ALL: [Self; 5] = [
        Self::Page,
        Self::BookPage,
        Self::SeeAlso,
        Self::Synopsis,
        Self::FullText,
    ];

    /// Name used on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::BookPage => "book-page",
            Self::SeeAlso => "see-also",
            Self::Synopsis => "synopsis",
            Self::FullText => "full-text",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown query mode '{s}'")))
    }
}

/// A query mode with its indices.
#[derive(Debug, Clone, Default)]
pub struct Query {
    mode: QueryMode,
    indices: PageIndices,
}

impl Query {
    /// Create a query for `mode`. Indices are registered by [`setup`](Self::setup).
    pub fn new(mode: QueryMode) -> Self {
        Self {
            mode,
            indices: PageIndices::new(),
        }
    }

    /// Query mode.
    pub const fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Registered indices.
    pub const fn indices(&self) -> &PageIndices {
        &self.indices
    }

    /// Register and set up the indices of the mode. Persisted indices are
    /// only reused when `all_valid` reports that no book was rebuilt.
    ///
    /// Returns the total number of index keys.
    pub fn setup(&mut self, docs: &DocumentSet, force: bool, all_valid: bool) -> Result<usize> {
        self.indices = PageIndices::new();
        match self.mode {
            QueryMode::Page => {
                self.indices.add_title_index(true);
                self.indices.add_short_title_index(true);
            },
            QueryMode::BookPage => {
                self.indices.add_title_index(true);
            },
            QueryMode::SeeAlso => {
                self.indices.add_see_also_index(true);
            },
            QueryMode::Synopsis | QueryMode::FullText => return Ok(0),
        }

        let storage = docs
            .storage()
            .ok_or_else(|| Error::Storage("document set has no cache".to_string()))?;
        self.indices.setup(docs, storage, force || !all_valid)
    }

    /// Pages matching `keyword`, in index order or document order.
    pub fn search(&self, docs: &DocumentSet, keyword: &str) -> Result<Vec<PageRef>> {
        let found = match self.mode {
            QueryMode::Page | QueryMode::BookPage | QueryMode::SeeAlso => self
                .indices
                .search(keyword)
                .map(|entry| entry.page_refs().to_vec())
                .unwrap_or_default(),
            QueryMode::Synopsis => scan(docs, keyword, |page| {
                page.find_section(SYNOPSIS)
                    .map(|lines| lines.join("\n"))
                    .unwrap_or_default()
            })?,
            QueryMode::FullText => scan(docs, keyword, |page| page.raw_page().to_string())?,
        };
        info!("query '{keyword}' in mode {} found {} pages", self.mode, found.len());
        Ok(found)
    }
}

fn scan<F>(docs: &DocumentSet, keyword: &str, text_of: F) -> Result<Vec<PageRef>>
where
    F: Fn(&Page) -> String,
{
    let needle = keyword.to_lowercase();
    let mut found = Vec::new();
    for doc in docs.documents() {
        for page in docs.book(doc.name())?.pages() {
            if text_of(page).to_lowercase().contains(&needle) {
                found.push(PageRef::new(doc.name(), page.title()));
            }
        }
    }
    Ok(found)
}
