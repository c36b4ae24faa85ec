//! Error types and handling for aman-core operations.
//!
//! This module provides the error type shared by every component of the
//! autodoc pipeline. Errors are categorized for logging and carry enough
//! context to tell the user which source file or cache entry was involved.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: reading sources, cache files and index files
//! - **Parse Errors**: structural problems in an autodoc source file
//! - **Serialization Errors**: JSON/TOML encoding and decoding
//! - **Storage Errors**: cache and index persistence beyond plain I/O
//! - **Configuration Errors**: missing man paths, unreadable config files
//! - **Not Found**: page references that do not resolve
//!
//! Stale or incompatible caches are *not* errors. The document cache and the
//! index builder treat them as a signal to rebuild and never surface them.
//!
//! ```rust
//! use aman_core::{Error, ParseError};
//!
//! let err = Error::Parse {
//!     path: "dos.doc".into(),
//!     source: ParseError::MissingTocHeader,
//! };
//! assert_eq!(err.category(), "parse");
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Structural problems found while parsing an autodoc file.
///
/// Any of these rejects the whole file; the parser never produces a partial
/// book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The first line is not the literal `TABLE OF CONTENTS` header.
    #[error("missing TABLE OF CONTENTS header")]
    MissingTocHeader,

    /// The table of contents is empty, contains an empty entry, or is not
    /// terminated by a form feed.
    #[error("malformed table of contents: {0}")]
    MalformedToc(String),

    /// A page block does not match the next table of contents entry.
    #[error("page '{found}' does not match table of contents entry '{expected}'")]
    TocPageMismatch {
        /// Table of contents entry that was expected next.
        expected: String,
        /// Raw title found on the page block.
        found: String,
    },

    /// The input ended without the form-feed-only end marker.
    #[error("missing end of file marker")]
    MissingEofMarker,

    /// A page title is not of the form `topic/name`.
    #[error("invalid page title '{0}': expected 'topic/name'")]
    InvalidTitle(String),
}

/// The main error type for aman-core operations.
///
/// All public functions in aman-core return `Result<T, Error>`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers opening source files, reading and writing cache or index
    /// files, and scanning directories. The core does not retry.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An autodoc source file could not be parsed.
    #[error("Parse error in '{}': {source}", .path.display())]
    Parse {
        /// Source file that was rejected.
        path: PathBuf,
        /// The structural invariant that broke.
        #[source]
        source: ParseError,
    },

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage operation failed.
    ///
    /// Cache or index persistence problems beyond basic file I/O, such as a
    /// failing compression stream.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document or page could not be found.
    ///
    /// Returned when a page reference names a document that was not
    /// discovered or a page its book does not contain.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Get the error category as a string identifier.
    ///
    /// Useful as a structured logging field:
    ///
    /// - `"io"` - File system and I/O operations
    /// - `"parse"` - Autodoc parsing
    /// - `"serialization"` - Data format conversion
    /// - `"storage"` - Cache and index persistence
    /// - `"config"` - Configuration and settings
    /// - `"not_found"` - Unresolvable references
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Parse { .. } => "parse",
            Self::Serialization(_) => "serialization",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
