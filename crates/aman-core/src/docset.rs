//! Discovery and cache setup for a set of autodoc files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::{Document, DocumentCache};
use crate::storage::{Compression, Storage};
use crate::types::{Book, Page, PageRef};
use crate::{Error, Result};

/// File suffix of autodoc sources.
pub const DEFAULT_SUFFIX: &str = ".doc";

/// Record listing the document names the indices were last built over.
const DOCUMENTS_STEM: &str = "_documents";
const DOCUMENTS_KEY: &str = "documents";

/// All autodoc documents found in a list of directories, each bound to its
/// cache record.
#[derive(Debug)]
pub struct DocumentSet {
    compression: Compression,
    suffix: String,
    documents: Vec<Document>,
    cache: Option<DocumentCache>,
}

impl DocumentSet {
    /// Create an empty set whose caches use `compression`.
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            suffix: DEFAULT_SUFFIX.to_string(),
            documents: Vec::new(),
            cache: None,
        }
    }

    /// Use `suffix` instead of `.doc` to recognize source files.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Source file suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// List the source files directly inside `dir`, sorted by file name.
    pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<Document>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(suffix)) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let doc_mtime = entry.metadata()?.modified()?;
            found.push(Document::new(name, entry.path(), doc_mtime));
        }
        found.sort_by(|a, b| a.doc_path().file_name().cmp(&b.doc_path().file_name()));
        debug!("found {} autodocs in '{}'", found.len(), dir.display());
        Ok(found)
    }

    /// Discover the documents of `source_dirs`, bind them to caches in
    /// `cache_dir` and load or rebuild every book.
    ///
    /// Returns `true` when every book came from a valid cache and the set
    /// of document names is the one recorded by the previous setup, which
    /// means persisted indices can be trusted as well.
    pub fn setup<P: AsRef<Path>>(
        &mut self,
        source_dirs: &[P],
        cache_dir: impl Into<PathBuf>,
        force: bool,
    ) -> Result<bool> {
        let start = Instant::now();
        let cache = DocumentCache::open(cache_dir, self.compression)?;

        let mut documents: Vec<Document> = Vec::new();
        for dir in source_dirs {
            for doc in Self::discover(dir.as_ref(), &self.suffix)? {
                if documents.iter().any(|known| known.name() == doc.name()) {
                    warn!(
                        "ignoring '{}': a document named '{}' was already found",
                        doc.doc_path().display(),
                        doc.name()
                    );
                    continue;
                }
                documents.push(doc);
            }
        }

        let mut all_valid = true;
        let mut total_pages = 0;
        for doc in &mut documents {
            cache.bind(doc)?;
            let outcome = cache.load_or_build(doc, force)?;
            if outcome.rebuilt {
                all_valid = false;
                cache.bind(doc)?;
            }
            total_pages += outcome.book.num_pages();
            doc.set_book(outcome.book);
        }

        // A removed or renamed source rebuilds no cache but still changes
        // what the indices may refer to.
        let names: Vec<String> = documents.iter().map(|doc| doc.name().to_string()).collect();
        let storage = cache.storage();
        let recorded = storage.load::<Vec<String>>(DOCUMENTS_STEM, DOCUMENTS_KEY)?;
        if recorded.as_ref() != Some(&names) {
            if all_valid {
                info!("document list changed: {recorded:?} -> {names:?}");
            }
            all_valid = false;
            storage.save(DOCUMENTS_STEM, DOCUMENTS_KEY, &names)?;
        }

        info!(
            "loaded doc set with {} books ({total_pages} pages) in {:.6}s, all_valid={all_valid}",
            documents.len(),
            start.elapsed().as_secs_f64()
        );
        self.documents = documents;
        self.cache = Some(cache);
        Ok(all_valid)
    }

    /// Record store of the cache directory, available after [`setup`](Self::setup).
    pub fn storage(&self) -> Option<&Storage> {
        self.cache.as_ref().map(DocumentCache::storage)
    }

    /// Documents in discovery order.
    pub fn documents(&self) -> impl ExactSizeIterator<Item = &Document> {
        self.documents.iter()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no document was found.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document called `name`.
    pub fn find_document(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.name() == name)
    }

    /// Book of the document called `name`, loaded on first use.
    pub fn book(&self, name: &str) -> Result<&Book> {
        let doc = self
            .find_document(name)
            .ok_or_else(|| Error::NotFound(format!("document '{name}'")))?;
        if let Some(book) = doc.book() {
            return Ok(book);
        }
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| Error::Storage("document set has no cache".to_string()))?;
        let outcome = cache.load_or_build(doc, false)?;
        Ok(doc.book_cell().get_or_init(|| outcome.book))
    }

    /// Resolve an index reference to its page.
    pub fn resolve(&self, page_ref: &PageRef) -> Result<&Page> {
        self.book(&page_ref.doc_name)?
            .page(&page_ref.page_title)
            .ok_or_else(|| Error::NotFound(format!("page '{page_ref}'")))
    }
}
