//! Book/Page document model.
//!
//! A [`Book`] is one parsed autodoc file, a [`Page`] one documented entry in
//! it. Both are immutable once built; the parser and the cache are the only
//! producers. The serialized shape is the cache record format:
//!
//! ```text
//! book: { toc: [title], topics: [topic], pages: { title: { toc, sections, raw_page } } }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the anonymous section holding everything before the first header.
pub const PREAMBLE: &str = "";

/// Section scanned for cross references.
pub const SEE_ALSO: &str = "SEE ALSO";

/// Split a `topic/name` title into its two halves.
pub(crate) fn split_title(title: &str) -> Option<(&str, &str)> {
    title.split_once('/')
}

/// One documented entry of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    title: String,
    toc: Vec<String>,
    sections: HashMap<String, Vec<String>>,
    raw_page: String,
}

impl Page {
    pub(crate) fn new(title: impl Into<String>, raw_page: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            toc: Vec::new(),
            sections: HashMap::new(),
            raw_page: raw_page.into(),
        }
    }

    /// Add a finalized section. A name seen before extends that section so
    /// the section list stays free of duplicates.
    pub(crate) fn push_section(&mut self, name: String, mut lines: Vec<String>) {
        if let Some(existing) = self.sections.get_mut(&name) {
            if !existing.is_empty() && !lines.is_empty() {
                existing.push(String::new());
            }
            existing.append(&mut lines);
            return;
        }
        self.toc.push(name.clone());
        self.sections.insert(name, lines);
    }

    /// Full `topic/name` title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Part of the title before the first `/`.
    pub fn topic(&self) -> &str {
        split_title(&self.title).map_or(self.title.as_str(), |(topic, _)| topic)
    }

    /// Part of the title after the first `/`.
    pub fn short_title(&self) -> &str {
        split_title(&self.title).map_or(self.title.as_str(), |(_, short)| short)
    }

    /// Section names in page order. The preamble, named `""`, comes first.
    pub fn section_names(&self) -> &[String] {
        &self.toc
    }

    /// Lines of the section with exactly this name.
    pub fn section(&self, name: &str) -> Option<&[String]> {
        self.sections.get(name).map(Vec::as_slice)
    }

    /// Lines of the first section whose name matches ignoring case and
    /// surrounding whitespace.
    pub fn find_section(&self, name: &str) -> Option<&[String]> {
        let wanted = name.trim();
        self.toc
            .iter()
            .find(|candidate| candidate.trim().eq_ignore_ascii_case(wanted))
            .and_then(|candidate| self.section(candidate))
    }

    /// Lines before the first section header.
    pub fn preamble(&self) -> &[String] {
        self.section(PREAMBLE).unwrap_or_default()
    }

    /// Named sections (everything but the preamble) in page order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.toc
            .iter()
            .filter(|name| name.as_str() != PREAMBLE)
            .filter_map(|name| self.section(name).map(|lines| (name.as_str(), lines)))
    }

    /// Verbatim page body as found in the source file.
    pub fn raw_page(&self) -> &str {
        &self.raw_page
    }
}

/// One parsed autodoc file.
///
/// Pages are stored in table of contents order; every TOC entry has exactly
/// one page and no page exists outside the TOC.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "BookRecord", into = "BookRecord")]
pub struct Book {
    toc: Vec<String>,
    topics: Vec<String>,
    pages: Vec<Page>,
    by_title: HashMap<String, usize>,
}

impl Book {
    /// Append a page at the end of the table of contents.
    ///
    /// Returns `false` if a page with the same title already exists.
    pub(crate) fn push_page(&mut self, page: Page) -> bool {
        if self.by_title.contains_key(page.title()) {
            return false;
        }
        self.by_title.insert(page.title.clone(), self.pages.len());
        self.toc.push(page.title.clone());
        self.pages.push(page);
        true
    }

    /// Derive the sorted, de-duplicated topic list from the page titles.
    pub(crate) fn finish(mut self) -> Self {
        let mut topics: Vec<String> = self
            .pages
            .iter()
            .map(|page| page.topic().to_string())
            .collect();
        topics.sort();
        topics.dedup();
        self.topics = topics;
        self
    }

    /// Page titles in canonical order.
    pub fn toc(&self) -> &[String] {
        &self.toc
    }

    /// Sorted distinct topics.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Number of pages.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Look up a page by its full title.
    pub fn page(&self, title: &str) -> Option<&Page> {
        self.by_title.get(title).map(|&idx| &self.pages[idx])
    }

    /// Page at a table of contents position.
    pub fn page_at(&self, pos: usize) -> Option<&Page> {
        self.pages.get(pos)
    }

    /// Pages in table of contents order.
    pub fn pages(&self) -> impl ExactSizeIterator<Item = &Page> {
        self.pages.iter()
    }
}

#[derive(Serialize, Deserialize)]
struct PageRecord {
    toc: Vec<String>,
    sections: BTreeMap<String, Vec<String>>,
    raw_page: String,
}

#[derive(Serialize, Deserialize)]
struct BookRecord {
    toc: Vec<String>,
    topics: Vec<String>,
    pages: BTreeMap<String, PageRecord>,
}

impl From<Book> for BookRecord {
    fn from(book: Book) -> Self {
        let pages = book
            .pages
            .into_iter()
            .map(|page| {
                let record = PageRecord {
                    toc: page.toc,
                    sections: page.sections.into_iter().collect(),
                    raw_page: page.raw_page,
                };
                (page.title, record)
            })
            .collect();
        Self {
            toc: book.toc,
            topics: book.topics,
            pages,
        }
    }
}

impl TryFrom<BookRecord> for Book {
    type Error = String;

    fn try_from(mut record: BookRecord) -> Result<Self, Self::Error> {
        let mut book = Self::default();
        for title in record.toc {
            let page_record = record
                .pages
                .remove(&title)
                .ok_or_else(|| format!("no page for toc entry '{title}'"))?;
            let mut page = Page::new(title.clone(), page_record.raw_page);
            let mut sections = page_record.sections;
            for name in page_record.toc {
                let lines = sections
                    .remove(&name)
                    .ok_or_else(|| format!("page '{title}' lacks section '{name}'"))?;
                page.toc.push(name.clone());
                page.sections.insert(name, lines);
            }
            if let Some(extra) = sections.keys().next() {
                return Err(format!("page '{title}' has unlisted section '{extra}'"));
            }
            if !book.push_page(page) {
                return Err(format!("duplicate toc entry '{title}'"));
            }
        }
        if let Some(extra) = record.pages.keys().next() {
            return Err(format!("page '{extra}' is not in the toc"));
        }
        let book = book.finish();
        if book.topics != record.topics {
            return Err("stored topics do not match page titles".to_string());
        }
        Ok(book)
    }
}

/// Back-reference from an index entry to a page of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    /// Name of the document (file stem of the source).
    pub doc_name: String,
    /// Full `topic/name` title of the page.
    pub page_title: String,
}

impl PageRef {
    /// Create a reference to `page_title` in document `doc_name`.
    pub fn new(doc_name: impl Into<String>, page_title: impl Into<String>) -> Self {
        Self {
            doc_name: doc_name.into(),
            page_title: page_title.into(),
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.doc_name, self.page_title)
    }
}

/// All page references recorded for one index key, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexEntry {
    page_refs: Vec<PageRef>,
}

impl IndexEntry {
    pub(crate) fn push(&mut self, page_ref: PageRef) {
        self.page_refs.push(page_ref);
    }

    /// Referenced pages in insertion order.
    pub fn page_refs(&self) -> &[PageRef] {
        &self.page_refs
    }

    /// Number of references.
    pub fn len(&self) -> usize {
        self.page_refs.len()
    }

    /// True when the entry holds no references.
    pub fn is_empty(&self) -> bool {
        self.page_refs.is_empty()
    }
}

impl IntoIterator for IndexEntry {
    type Item = PageRef;
    type IntoIter = std::vec::IntoIter<PageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.page_refs.into_iter()
    }
}
