//! Inverted keyword indices over the pages of a document set.
//!
//! Each [`PageIndex`] maps a key extracted from every page to the pages that
//! produced it. Indices are persisted next to the document caches as
//! `_index_<id>[_ic].json[.gz]` and are reused until a rebuild is forced.
//! [`PageIndices`] chains several indices; the first one with a hit wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use tracing::{debug, info};

use crate::Result;
use crate::docset::DocumentSet;
use crate::storage::Storage;
use crate::types::{IndexEntry, Page, PageRef, SEE_ALSO};

const INDEX_KEY: &str = "index";

/// Trailing call syntax on cross references: `Open()`, `socket(2)`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static CALL_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d*\)$").unwrap());

/// How an index derives its keys from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// The full `topic/name` title.
    Title,
    /// The part of the title after the first `/`.
    ShortTitle,
    /// Every entry listed in the page's `SEE ALSO` section.
    CrossReference,
}

impl KeyRule {
    /// Extract the keys of `page`, in order.
    pub fn keys(self, page: &Page) -> Vec<String> {
        match self {
            Self::Title => vec![page.title().to_string()],
            Self::ShortTitle => vec![page.short_title().to_string()],
            Self::CrossReference => page
                .find_section(SEE_ALSO)
                .map(cross_references)
                .unwrap_or_default(),
        }
    }
}

fn cross_references(lines: &[String]) -> Vec<String> {
    lines
        .join(", ")
        .split(',')
        .map(|entry| CALL_SUFFIX_RE.replace(entry.trim(), "").trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// One persisted keyword index.
#[derive(Debug, Clone)]
pub struct PageIndex {
    id: String,
    rule: KeyRule,
    ignore_case: bool,
    index: BTreeMap<String, IndexEntry>,
}

impl PageIndex {
    /// Create an empty index.
    pub fn new(id: impl Into<String>, rule: KeyRule, ignore_case: bool) -> Self {
        Self {
            id: id.into(),
            rule,
            ignore_case,
            index: BTreeMap::new(),
        }
    }

    /// Stable identifier used in the file name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key extraction rule.
    pub const fn rule(&self) -> KeyRule {
        self.rule
    }

    /// Whether keys are lower-cased on build and lookup.
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Record name in the store, without the compression suffix.
    pub fn file_stem(&self) -> String {
        if self.ignore_case {
            format!("_index_{}_ic", self.id)
        } else {
            format!("_index_{}", self.id)
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Load the index from `storage`, or rebuild it from `docs` and save it
    /// when forced or when no usable record exists. Returns the key count.
    pub fn setup(&mut self, docs: &DocumentSet, storage: &Storage, force: bool) -> Result<usize> {
        let stem = self.file_stem();
        if !force {
            let start = Instant::now();
            if let Some(index) = storage.load::<BTreeMap<String, IndexEntry>>(&stem, INDEX_KEY)? {
                self.index = index;
                info!(
                    "loaded index '{}' in {:.6}s",
                    storage.record_path(&stem).display(),
                    start.elapsed().as_secs_f64()
                );
                return Ok(self.len());
            }
        }

        self.rebuild(docs)?;
        let start = Instant::now();
        storage.save(&stem, INDEX_KEY, &self.index)?;
        info!(
            "saved index '{}' in {:.6}s",
            storage.record_path(&stem).display(),
            start.elapsed().as_secs_f64()
        );
        Ok(self.len())
    }

    fn rebuild(&mut self, docs: &DocumentSet) -> Result<()> {
        let start = Instant::now();
        self.index.clear();
        let mut num_pages = 0;
        let mut num_keys = 0;

        for doc in docs.documents() {
            let book = docs.book(doc.name())?;
            for page in book.pages() {
                let keys = self.rule.keys(page);
                if keys.is_empty() {
                    continue;
                }
                num_pages += 1;
                for key in keys {
                    num_keys += 1;
                    self.insert(key, PageRef::new(doc.name(), page.title()));
                }
            }
        }

        info!(
            "rebuilt index '{}' with {num_pages} pages and {num_keys} keys in {:.6}s",
            self.id,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn insert(&mut self, key: String, page_ref: PageRef) {
        let key = if self.ignore_case {
            key.to_lowercase()
        } else {
            key
        };
        self.index.entry(key).or_default().push(page_ref);
    }

    /// Look up `key`, folding case when the index does.
    pub fn search(&self, key: &str) -> Option<&IndexEntry> {
        let entry = if self.ignore_case {
            self.index.get(&key.to_lowercase())
        } else {
            self.index.get(key)
        };
        debug!("index '{}' lookup '{key}': {:?}", self.id, entry.map(IndexEntry::len));
        entry
    }
}

/// Ordered chain of indices searched first-match.
#[derive(Debug, Clone, Default)]
pub struct PageIndices {
    indices: Vec<PageIndex>,
}

impl PageIndices {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an index to the chain.
    pub fn add_index(&mut self, index: PageIndex) -> &mut PageIndex {
        self.indices.push(index);
        let last = self.indices.len() - 1;
        &mut self.indices[last]
    }

    /// Append an index over full `topic/name` titles.
    pub fn add_title_index(&mut self, ignore_case: bool) -> &mut PageIndex {
        self.add_index(PageIndex::new("topic_title", KeyRule::Title, ignore_case))
    }

    /// Append an index over the name part of titles.
    pub fn add_short_title_index(&mut self, ignore_case: bool) -> &mut PageIndex {
        self.add_index(PageIndex::new("title", KeyRule::ShortTitle, ignore_case))
    }

    /// Append an index over `SEE ALSO` cross references.
    pub fn add_see_also_index(&mut self, ignore_case: bool) -> &mut PageIndex {
        self.add_index(PageIndex::new("see_also", KeyRule::CrossReference, ignore_case))
    }

    /// Registered indices in order.
    pub fn indices(&self) -> &[PageIndex] {
        &self.indices
    }

    /// True when no index is registered.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Set up every index in order and return the total key count.
    pub fn setup(&mut self, docs: &DocumentSet, storage: &Storage, force: bool) -> Result<usize> {
        let start = Instant::now();
        let mut total = 0;
        for index in &mut self.indices {
            total += index.setup(docs, storage, force)?;
        }
        info!(
            "set up {} indices with {total} entries in {:.6}s (forced={force})",
            self.indices.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(total)
    }

    /// Entry of the first index that has a non-empty match for `key`.
    pub fn search(&self, key: &str) -> Option<&IndexEntry> {
        self.indices
            .iter()
            .filter_map(|index| index.search(key))
            .find(|entry| !entry.is_empty())
    }
}
