//! Per-document cache of parsed books.
//!
//! Every autodoc source file gets one cache record `<name>.json[.gz]` in the
//! cache directory holding its parsed [`Book`]. A record is only trusted when
//! its modification time is strictly newer than the source's and its schema
//! version matches; anything else silently re-parses the source and rewrites
//! the record.

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use tracing::{debug, info};

use crate::parser::AutodocParser;
use crate::storage::{Compression, Storage};
use crate::types::Book;
use crate::{Error, Result};

const BOOK_KEY: &str = "book";

/// Where a document's cache record lives and how old it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    /// Path of the cache record.
    pub path: PathBuf,
    /// Modification time of the record, `None` if it does not exist yet.
    pub modified: Option<SystemTime>,
    /// Whether the record is gzip compressed.
    pub compressed: bool,
}

impl CacheSlot {
    /// A record is fresh when it was written strictly after the source changed.
    pub fn is_fresh(&self, source_modified: SystemTime) -> bool {
        self.modified.is_some_and(|cached| cached > source_modified)
    }
}

/// One autodoc source file.
#[derive(Debug)]
pub struct Document {
    name: String,
    doc_path: PathBuf,
    doc_mtime: SystemTime,
    cache_slot: Option<CacheSlot>,
    book: OnceCell<Book>,
}

impl Document {
    /// Describe a source file without touching the file system.
    pub fn new(name: impl Into<String>, doc_path: impl Into<PathBuf>, doc_mtime: SystemTime) -> Self {
        Self {
            name: name.into(),
            doc_path: doc_path.into(),
            doc_mtime,
            cache_slot: None,
            book: OnceCell::new(),
        }
    }

    /// Describe the source file at `path`, named after its file stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::NotFound(format!("no document name in '{}'", path.display())))?;
        let doc_mtime = fs::metadata(path)?.modified()?;
        Ok(Self::new(name, path, doc_mtime))
    }

    /// Document name, the stem of the source file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the source file.
    pub fn doc_path(&self) -> &Path {
        &self.doc_path
    }

    /// Modification time of the source file at discovery.
    pub const fn doc_mtime(&self) -> SystemTime {
        self.doc_mtime
    }

    /// Bound cache slot, if any.
    pub const fn cache_slot(&self) -> Option<&CacheSlot> {
        self.cache_slot.as_ref()
    }

    /// Bind the document to a cache slot.
    pub fn set_cache_slot(&mut self, slot: CacheSlot) {
        self.cache_slot = Some(slot);
    }

    /// Whether the bound cache record is newer than the source.
    pub fn is_cache_valid(&self) -> bool {
        self.cache_slot
            .as_ref()
            .is_some_and(|slot| slot.is_fresh(self.doc_mtime))
    }

    /// The book, if it has been loaded.
    pub fn book(&self) -> Option<&Book> {
        self.book.get()
    }

    pub(crate) fn book_cell(&self) -> &OnceCell<Book> {
        &self.book
    }

    pub(crate) fn set_book(&mut self, book: Book) {
        self.book = OnceCell::from(book);
    }
}

/// Result of [`DocumentCache::load_or_build`].
#[derive(Debug)]
pub struct LoadOutcome {
    /// The book, either loaded from the cache or freshly parsed.
    pub book: Book,
    /// True when the source had to be parsed again.
    pub rebuilt: bool,
}

/// Cache store for parsed books.
#[derive(Debug, Clone)]
pub struct DocumentCache {
    storage: Storage,
    parser: AutodocParser,
}

impl DocumentCache {
    /// Open the cache in `cache_dir`. The compression choice is fixed for
    /// the lifetime of the store.
    pub fn open(cache_dir: impl Into<PathBuf>, compression: Compression) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(cache_dir, compression)?,
            parser: AutodocParser::new(),
        })
    }

    /// Underlying record store.
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Describe the cache slot for the document called `name`.
    pub fn slot_for(&self, name: &str) -> Result<CacheSlot> {
        Ok(CacheSlot {
            path: self.storage.record_path(name),
            modified: self.storage.modified(name)?,
            compressed: self.storage.compression().is_compressed(),
        })
    }

    /// Bind `doc` to its slot in this cache.
    pub fn bind(&self, doc: &mut Document) -> Result<()> {
        let slot = self.slot_for(doc.name())?;
        debug!(
            "cache '{}' (exists={}) for '{}'",
            slot.path.display(),
            slot.modified.is_some(),
            doc.name()
        );
        doc.set_cache_slot(slot);
        info!("cache for '{}' valid={}", doc.name(), doc.is_cache_valid());
        Ok(())
    }

    /// Return the document's book, from the cache when it is valid and
    /// otherwise by parsing the source and rewriting the cache.
    ///
    /// A parse failure leaves any existing cache record untouched.
    pub fn load_or_build(&self, doc: &Document, force: bool) -> Result<LoadOutcome> {
        let fresh = match doc.cache_slot() {
            Some(slot) => slot.is_fresh(doc.doc_mtime()),
            None => self.slot_for(doc.name())?.is_fresh(doc.doc_mtime()),
        };

        if !force && fresh {
            let start = Instant::now();
            if let Some(book) = self.storage.load::<Book>(doc.name(), BOOK_KEY)? {
                info!(
                    "loaded cache for '{}' in {:.6}s",
                    doc.name(),
                    start.elapsed().as_secs_f64()
                );
                return Ok(LoadOutcome {
                    book,
                    rebuilt: false,
                });
            }
            info!("cache for '{}' is invalid, rebuilding", doc.name());
        }

        let book = self.build(doc)?;
        Ok(LoadOutcome {
            book,
            rebuilt: true,
        })
    }

    fn build(&self, doc: &Document) -> Result<Book> {
        info!("parsing autodoc from '{}'", doc.doc_path().display());
        let book = self.parser.parse_file(doc.doc_path())?;
        let start = Instant::now();
        self.storage.save(doc.name(), BOOK_KEY, &book)?;
        debug!(
            "saved cache for '{}' in {:.6}s",
            doc.name(),
            start.elapsed().as_secs_f64()
        );
        Ok(book)
    }
}
