//! # aman-core
//!
//! Core functionality for aman - read Amiga autodocs like man pages.
//!
//! This crate parses autodoc files into a structured [`Book`]/[`Page`] model,
//! keeps one cache record per source file so repeated lookups skip parsing,
//! and maintains persisted keyword indices over all pages.
//!
//! ## Architecture
//!
//! - **Types**: the book and page model, index entries and page references
//! - **Parsing**: heuristic autodoc parser with strict structural checks
//! - **Storage**: versioned JSON records, optionally gzip compressed
//! - **Cache**: per-document cache with modification time staleness
//! - **Index**: inverted keyword indices searched first-match
//! - **Document set**: discovery, cache setup and page reference resolution
//! - **Query**: index lookups and full scans
//! - **Configuration**: TOML file and environment layering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aman_core::{Compression, DocumentSet, Query, QueryMode};
//!
//! let mut docs = DocumentSet::new(Compression::Gzip);
//! let all_valid = docs.setup(&["/opt/autodocs"], "/tmp/aman-cache", false)?;
//!
//! let mut query = Query::new(QueryMode::Page);
//! query.setup(&docs, false, all_valid)?;
//! for page_ref in query.search(&docs, "AllocMem")? {
//!     let page = docs.resolve(&page_ref)?;
//!     println!("{}", page.title());
//! }
//! # Ok::<(), aman_core::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Structural problems in a source file surface as [`Error::Parse`] with the
//! failing [`ParseError`]. Stale or unreadable cache and index files are never
//! errors; they are rebuilt.
//!
//! ```rust
//! use aman_core::{AutodocParser, ParseError};
//!
//! let result = AutodocParser::new().parse("no header\n");
//! assert_eq!(result.unwrap_err(), ParseError::MissingTocHeader);
//! ```

/// Per-document cache of parsed books
pub mod cache;
/// Layered configuration
pub mod config;
/// Document discovery and setup
pub mod docset;
/// Error types and result aliases
pub mod error;
/// Persisted keyword indices
pub mod index;
/// Autodoc parser
pub mod parser;
/// Query modes
pub mod query;
/// Versioned JSON record storage
pub mod storage;
/// Book and page model
pub mod types;

// Re-export commonly used types
pub use cache::{CacheSlot, Document, DocumentCache, LoadOutcome};
pub use config::Config;
pub use docset::{DEFAULT_SUFFIX, DocumentSet};
pub use error::{Error, ParseError, Result};
pub use index::{KeyRule, PageIndex, PageIndices};
pub use parser::AutodocParser;
pub use query::{Query, QueryMode};
pub use storage::{Compression, Storage};
pub use types::*;
