//! File-store collaborator.
//!
//! Uploads are written under a unique, store-chosen name and handed back as a
//! [`StoredPath`]. The command builder asks the store whether a path is one it
//! issued before letting it into an argument vector, so a client-declared name
//! or a raw filesystem path can never reach the engine.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clipforged_common::paths::{extension_of, is_allowed_upload, sanitize_filename};
use clipforged_common::short_hex;
use regex::Regex;

use crate::{Error, Result};

/// Length of the random token in stored upload names.
const UPLOAD_TOKEN_LEN: usize = 10;

static ISSUED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+_[0-9a-f]{10}\.[a-z0-9]+$").expect("valid regex"));

static PLACEHOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+\.[a-z0-9]+$").expect("valid regex"));

/// A path handed out by a [`FileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredPath(PathBuf);

impl StoredPath {
    /// Wrap a path the store has just issued.
    ///
    /// Only store implementations should call this; the builder re-checks
    /// provenance with [`FileStore::is_issued`] regardless.
    pub fn issued(path: PathBuf) -> Self {
        Self(path)
    }

    /// Borrow the on-disk path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Lower-cased extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.0
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(extension_of)
    }
}

impl std::fmt::Display for StoredPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Storage for uploads and outputs.
pub trait FileStore: Send + Sync {
    /// Persist an upload under a fresh unique name.
    ///
    /// `prefix` is a short label (usually the slot name) kept in the stored
    /// name for operators; the declared filename only contributes its
    /// extension.
    fn store(&self, data: &mut dyn Read, declared_filename: &str, prefix: &str)
        -> Result<StoredPath>;

    /// Claim an output file name and return its absolute location.
    ///
    /// The claim is exclusive: a name that already exists in the output
    /// directory is refused with [`Error::UnsafePathParameter`], so a job can
    /// only ever overwrite or remove the file it claimed.
    fn reserve_output_path(&self, filename: &str) -> Result<PathBuf>;

    /// Remove an upload this store issued. Paths it did not issue are left
    /// alone.
    fn discard(&self, path: &StoredPath) -> Result<()>;

    /// Create the upload and output directories if missing.
    fn ensure_directories_exist(&self) -> Result<()>;

    /// Whether `path` was issued by this store.
    fn is_issued(&self, path: &Path) -> bool;
}

/// Directory-backed store: `{upload_dir}/{prefix}_{token}.{ext}`.
#[derive(Debug, Clone)]
pub struct DiskStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl DiskStore {
    /// Create both directories and return a store rooted at their canonical
    /// absolute paths.
    pub fn open(upload_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(upload_dir.as_ref())?;
        std::fs::create_dir_all(output_dir.as_ref())?;
        Ok(Self {
            upload_dir: upload_dir.as_ref().canonicalize()?,
            output_dir: output_dir.as_ref().canonicalize()?,
        })
    }

    /// Directory holding uploads.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Directory holding outputs.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl FileStore for DiskStore {
    fn store(
        &self,
        data: &mut dyn Read,
        declared_filename: &str,
        prefix: &str,
    ) -> Result<StoredPath> {
        if !is_allowed_upload(declared_filename) {
            return Err(Error::UnsupportedUpload {
                filename: declared_filename.to_string(),
            });
        }
        let ext = extension_of(declared_filename).unwrap_or_else(|| "bin".to_string());
        let name = format!(
            "{}_{}.{}",
            label(prefix),
            short_hex(UPLOAD_TOKEN_LEN),
            ext
        );
        let path = self.upload_dir.join(name);

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let written = std::io::copy(data, &mut file)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("Stored upload {:?} ({} bytes) as {}", declared_filename, written, path.display());
        #[cfg(not(feature = "tracing"))]
        let _ = written;

        Ok(StoredPath::issued(path))
    }

    fn reserve_output_path(&self, filename: &str) -> Result<PathBuf> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| Error::unsafe_path("outname", "output name must be a bare file name"))?;
        let path = self.output_dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::unsafe_path(
                "outname",
                "an output with this name already exists",
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn discard(&self, path: &StoredPath) -> Result<()> {
        if !self.is_issued(path.as_path()) {
            return Ok(());
        }
        match std::fs::remove_file(path.as_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_directories_exist(&self) -> Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn is_issued(&self, path: &Path) -> bool {
        if !path.is_absolute() || path.parent() != Some(self.upload_dir.as_path()) {
            return false;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        ISSUED_NAME.is_match(name) && path.is_file()
    }
}

/// Store used for command previews.
///
/// Nothing is written; inputs become `{upload_dir}/{slot}.ext` placeholders so
/// a preview renders through the same provenance-checked builder as a real
/// job.
#[derive(Debug, Clone)]
pub struct PreviewStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl PreviewStore {
    /// Create a preview store mirroring the configured directories.
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Placeholder input for a slot.
    pub fn placeholder(&self, slot: &str) -> StoredPath {
        StoredPath::issued(self.upload_dir.join(format!("{}.ext", label(slot))))
    }
}

impl FileStore for PreviewStore {
    fn store(
        &self,
        data: &mut dyn Read,
        declared_filename: &str,
        prefix: &str,
    ) -> Result<StoredPath> {
        std::io::copy(data, &mut std::io::sink())?;
        let ext = extension_of(declared_filename).unwrap_or_else(|| "ext".to_string());
        Ok(StoredPath::issued(
            self.upload_dir.join(format!("{}.{}", label(prefix), ext)),
        ))
    }

    fn reserve_output_path(&self, filename: &str) -> Result<PathBuf> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| Error::unsafe_path("outname", "output name must be a bare file name"))?;
        Ok(self.output_dir.join(name))
    }

    fn discard(&self, _path: &StoredPath) -> Result<()> {
        Ok(())
    }

    fn ensure_directories_exist(&self) -> Result<()> {
        Ok(())
    }

    fn is_issued(&self, path: &Path) -> bool {
        path.parent() == Some(self.upload_dir.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| PLACEHOLDER_NAME.is_match(n))
    }
}

/// Restrict a caller-influenced label to `[A-Za-z0-9_]`.
fn label(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(32)
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
