//! On-disk store for versioned JSON records.
//!
//! Both the document cache and the page indices persist their data as a JSON
//! envelope carrying a schema version next to the payload:
//!
//! ```text
//! { "schema_version": 1, "<payload key>": ... }
//! ```
//!
//! A store is bound to one directory and one [`Compression`] choice. The
//! compression is never detected from file contents, it only decides how
//! bytes are transformed and which suffix the file name gets.
//!
//! Records that are missing, undecodable, untagged or tagged with another
//! schema version load as `None`; callers rebuild them. Only real I/O
//! failures are errors.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Current schema version of every persisted record.
pub const SCHEMA_VERSION: u64 = 1;

/// Name of the envelope field holding the schema version.
pub const SCHEMA_VERSION_TAG: &str = "schema_version";

/// Whole-record transform applied to persisted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain JSON (`.json`).
    #[default]
    None,
    /// Gzip compressed JSON (`.json.gz`).
    Gzip,
}

impl Compression {
    /// Gzip when `compress` is set, plain otherwise.
    pub const fn from_flag(compress: bool) -> Self {
        if compress { Self::Gzip } else { Self::None }
    }

    /// Whether records are compressed.
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Gzip)
    }

    /// File name for a record called `stem`.
    pub fn file_name(self, stem: &str) -> String {
        match self {
            Self::None => format!("{stem}.json"),
            Self::Gzip => format!("{stem}.json.gz"),
        }
    }

    fn encode(self, json: Vec<u8>) -> io::Result<Vec<u8>> {
        match self {
            Self::None => Ok(json),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), GzCompression::default());
                encoder.write_all(&json)?;
                encoder.finish()
            },
        }
    }

    fn decode(self, bytes: Vec<u8>) -> io::Result<Vec<u8>> {
        match self {
            Self::None => Ok(bytes),
            Self::Gzip => {
                let mut json = Vec::new();
                GzDecoder::new(bytes.as_slice()).read_to_end(&mut json)?;
                Ok(json)
            },
        }
    }
}

/// Directory of versioned JSON records sharing one compression choice.
#[derive(Debug, Clone)]
pub struct Storage {
    root_dir: PathBuf,
    compression: Compression,
}

impl Storage {
    /// Open a store rooted at `root_dir`, creating the directory if needed.
    pub fn open(root_dir: impl Into<PathBuf>, compression: Compression) -> Result<Self> {
        let root_dir = root_dir.into();
        fs::create_dir_all(&root_dir).map_err(|e| {
            Error::Storage(format!(
                "Failed to create cache directory '{}': {e}",
                root_dir.display()
            ))
        })?;
        Ok(Self {
            root_dir,
            compression,
        })
    }

    /// Directory holding the records.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Compression applied to every record of this store.
    pub const fn compression(&self) -> Compression {
        self.compression
    }

    /// Path of the record called `stem`.
    pub fn record_path(&self, stem: &str) -> PathBuf {
        self.root_dir.join(self.compression.file_name(stem))
    }

    /// Modification time of the record, `None` if it does not exist.
    pub fn modified(&self, stem: &str) -> Result<Option<SystemTime>> {
        match fs::metadata(self.record_path(stem)) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `payload` under `key` in a versioned envelope.
    ///
    /// The record is written to a temporary file first and renamed into
    /// place. There is no locking against other processes.
    pub fn save<T: Serialize>(&self, stem: &str, key: &str, payload: &T) -> Result<()> {
        let mut envelope = serde_json::Map::new();
        envelope.insert(SCHEMA_VERSION_TAG.to_string(), SCHEMA_VERSION.into());
        envelope.insert(key.to_string(), serde_json::to_value(payload)?);
        let json = serde_json::to_vec(&envelope)?;
        let bytes = self
            .compression
            .encode(json)
            .map_err(|e| Error::Storage(format!("Failed to compress '{stem}': {e}")))?;

        let path = self.record_path(stem);
        let tmp_path = self.root_dir.join(format!("{}.tmp", self.compression.file_name(stem)));
        fs::write(&tmp_path, bytes)?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            fs::remove_file(&path)?;
        }

        fs::rename(&tmp_path, &path)?;
        debug!("saved record '{}'", path.display());
        Ok(())
    }

    /// Load the payload stored under `key`.
    ///
    /// Returns `Ok(None)` when the record is absent or invalid for this
    /// schema version.
    pub fn load<T: DeserializeOwned>(&self, stem: &str, key: &str) -> Result<Option<T>> {
        let path = self.record_path(stem);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("record '{}' does not exist", path.display());
                return Ok(None);
            },
            Err(e) => return Err(e.into()),
        };

        let json = match self.compression.decode(bytes) {
            Ok(json) => json,
            Err(e) => {
                debug!("record '{}' does not decompress: {e}", path.display());
                return Ok(None);
            },
        };

        let mut envelope = match serde_json::from_slice::<serde_json::Value>(&json) {
            Ok(serde_json::Value::Object(envelope)) => envelope,
            Ok(_) => {
                debug!("record '{}' is not a JSON object", path.display());
                return Ok(None);
            },
            Err(e) => {
                debug!("record '{}' is not valid JSON: {e}", path.display());
                return Ok(None);
            },
        };

        match envelope.get(SCHEMA_VERSION_TAG).and_then(serde_json::Value::as_u64) {
            Some(SCHEMA_VERSION) => {},
            Some(version) => {
                debug!(
                    "record '{}' has schema version {version}, expected {SCHEMA_VERSION}",
                    path.display()
                );
                return Ok(None);
            },
            None => {
                debug!("record '{}' has no schema version", path.display());
                return Ok(None);
            },
        }

        let Some(payload) = envelope.remove(key) else {
            debug!("record '{}' has no '{key}' field", path.display());
            return Ok(None);
        };
        match serde_json::from_value(payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!("record '{}' does not match the schema: {e}", path.display());
                Ok(None)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([("Open".to_string(), vec!["dos/Open".to_string()])])
    }

    #[test]
    fn test_save_and_load_plain() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::None).unwrap();

        storage.save("dos", "index", &sample()).unwrap();
        let loaded: Option<BTreeMap<String, Vec<String>>> = storage.load("dos", "index").unwrap();

        assert_eq!(loaded, Some(sample()));
        assert!(temp.path().join("dos.json").exists());
        assert!(!temp.path().join("dos.json.tmp").exists());
    }

    #[test]
    fn test_save_and_load_gzip() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::Gzip).unwrap();

        storage.save("dos", "index", &sample()).unwrap();
        let path = temp.path().join("dos.json.gz");
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

        let loaded: Option<BTreeMap<String, Vec<String>>> = storage.load("dos", "index").unwrap();
        assert_eq!(loaded, Some(sample()));
    }

    #[test]
    fn test_envelope_shape() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::None).unwrap();
        storage.save("dos", "book", &sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(temp.path().join("dos.json")).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], 1);
        assert_eq!(raw["book"]["Open"][0], "dos/Open");
    }

    #[test]
    fn test_missing_record_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::None).unwrap();

        let loaded: Option<Vec<String>> = storage.load("absent", "book").unwrap();
        assert!(loaded.is_none());
        assert!(storage.modified("absent").unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::None).unwrap();
        fs::write(
            temp.path().join("dos.json"),
            r#"{"schema_version": 2, "book": []}"#,
        )
        .unwrap();

        let loaded: Option<Vec<String>> = storage.load("dos", "book").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_missing_version_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::None).unwrap();
        fs::write(temp.path().join("dos.json"), r#"{"book": []}"#).unwrap();

        let loaded: Option<Vec<String>> = storage.load("dos", "book").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_garbage_is_none() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::open(temp.path(), Compression::Gzip).unwrap();
        fs::write(temp.path().join("dos.json.gz"), b"{ not gzip").unwrap();

        let loaded: Option<Vec<String>> = storage.load("dos", "book").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_compression_is_not_sniffed() {
        let temp = TempDir::new().unwrap();
        let plain = Storage::open(temp.path(), Compression::None).unwrap();
        plain.save("dos", "book", &sample()).unwrap();

        // a gzip store looks for its own file name and never reads the plain one
        let gzip = Storage::open(temp.path(), Compression::Gzip).unwrap();
        let loaded: Option<BTreeMap<String, Vec<String>>> = gzip.load("dos", "book").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(Compression::None.file_name("exec"), "exec.json");
        assert_eq!(Compression::Gzip.file_name("exec"), "exec.json.gz");
        assert_eq!(Compression::from_flag(true), Compression::Gzip);
        assert!(!Compression::from_flag(false).is_compressed());
    }
}
