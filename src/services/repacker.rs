// ArchiveRepacker - rebuilds a factory image with replacement partition images
//
// Layout handled:
//
//   <factory>.zip
//   └── <vendor-folder>/
//       ├── flash-all.sh, bootloader-*.img, ...   (copied through untouched)
//       └── image-<device>.zip                     (nested archive)
//           └── boot.img, system.img, ...          (payloads, replaced by name)
//
// The whole run is synchronous and single-threaded. It is meant to be driven
// from a blocking worker (see services::runner).

use super::archive;
use super::log_sink::LogSink;
use crate::models::{BuildSettings, RepackRequest};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use filetime::FileTime;
use std::fs;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use zip::result::ZipError;

/// Timestamp appended to artifact names
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Outcome of one repack run: the artifact path or what went wrong
pub type RepackResult = Result<Utf8PathBuf, RepackError>;

/// Errors that abort a repack run
#[derive(Error, Debug)]
pub enum RepackError {
    /// Input is not a readable zip archive
    #[error("invalid archive '{path}': {source}")]
    ArchiveFormat {
        path: Utf8PathBuf,
        #[source]
        source: ZipError,
    },

    /// Archive opened fine but its layout is not a factory image
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Filesystem failure: missing file, permission denied, disk full
    #[error("failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("illegal outer directory '{path}': expected exactly one entry, found {found}")]
    OuterDirectory { path: Utf8PathBuf, found: usize },

    #[error("illegal outer directory '{path}': the only entry is not a directory")]
    VendorNotDirectory { path: Utf8PathBuf },

    #[error(
        "illegal inner directory '{path}': expected exactly one .{extension} file, found {found}"
    )]
    InnerDirectory {
        path: Utf8PathBuf,
        extension: String,
        found: usize,
    },
}

impl RepackError {
    /// Adapter for `map_err` on filesystem calls
    pub(crate) fn io(action: &'static str, path: &Utf8Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| RepackError::Io {
            action,
            path,
            source,
        }
    }

    fn invalid_input(action: &'static str, path: &Utf8Path, message: &str) -> Self {
        RepackError::Io {
            action,
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, message.to_string()),
        }
    }
}

/// Repacks factory images into a fixed output directory.
pub struct ArchiveRepacker {
    output_dir: Utf8PathBuf,
    nested_extension: String,
    log: Arc<LogSink>,
}

impl ArchiveRepacker {
    /// Repacker writing into `output_dir`, looking for nested `.zip` archives
    pub fn new(output_dir: impl Into<Utf8PathBuf>, log: Arc<LogSink>) -> Self {
        Self {
            output_dir: output_dir.into(),
            nested_extension: "zip".to_string(),
            log,
        }
    }

    /// Repacker configured from user settings
    pub fn from_settings(settings: &BuildSettings, fallback_dir: &Utf8Path, log: Arc<LogSink>) -> Self {
        Self::new(settings.resolve_output_dir(fallback_dir), log)
            .with_nested_extension(&settings.nested_archive_extension)
    }

    /// Override the nested archive extension (without the leading dot)
    pub fn with_nested_extension(mut self, extension: &str) -> Self {
        self.nested_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Repack using the current local time for the artifact name
    pub fn repack(&self, request: &RepackRequest) -> RepackResult {
        self.repack_at(request, Local::now())
    }

    /// Repack with an explicit artifact timestamp.
    ///
    /// The source archive is only ever read. Working directories are removed
    /// on success and on failure.
    pub fn repack_at(&self, request: &RepackRequest, timestamp: DateTime<Local>) -> RepackResult {
        let source = &request.source_archive;
        let artifact = self.artifact_path(source, timestamp)?;
        let outer_path = self.outer_working_dir(source)?;

        if source.starts_with(&outer_path) {
            return Err(RepackError::invalid_input(
                "unpack",
                source,
                "source archive lies inside its own working directory",
            ));
        }
        if let Some(inside) = request
            .replacements
            .iter()
            .find(|replacement| replacement.starts_with(&outer_path))
        {
            return Err(RepackError::invalid_input(
                "copy",
                inside,
                "replacement lies inside the working directory",
            ));
        }

        let outer = WorkingDir::create(outer_path, &self.log)?;
        archive::unzip(source, outer.path(), &self.log)?;

        let vendor_dir = single_entry(outer.path())?;
        let nested_archive = self.single_nested_archive(&vendor_dir)?;

        let nested = WorkingDir::create(nested_archive.with_extension(""), &self.log)?;
        archive::unzip(&nested_archive, nested.path(), &self.log)?;

        for replacement in &request.replacements {
            self.copy_replacement(replacement, nested.path())?;
        }

        archive::zip_dir(nested.path(), &nested_archive, &self.log)?;
        nested.remove(&self.log)?;

        archive::zip_dir(outer.path(), &artifact, &self.log)?;
        outer.remove(&self.log)?;

        Ok(artifact)
    }

    /// `<output_dir>/<stem>_<timestamp>.<ext>`
    pub fn artifact_path(
        &self,
        source: &Utf8Path,
        timestamp: DateTime<Local>,
    ) -> Result<Utf8PathBuf, RepackError> {
        let stem = source_stem(source)?;
        let stamp = timestamp.format(ARTIFACT_TIMESTAMP_FORMAT);
        let name = match source.extension() {
            Some(ext) => format!("{}_{}.{}", stem, stamp, ext),
            None => format!("{}_{}", stem, stamp),
        };
        Ok(self.output_dir.join(name))
    }

    /// `<output_dir>/<stem>`; shared by every run on the same source name
    pub fn outer_working_dir(&self, source: &Utf8Path) -> Result<Utf8PathBuf, RepackError> {
        Ok(self.output_dir.join(source_stem(source)?))
    }

    fn single_nested_archive(&self, vendor_dir: &Utf8Path) -> Result<Utf8PathBuf, RepackError> {
        let mut matches = Vec::new();
        for entry in vendor_dir
            .read_dir_utf8()
            .map_err(RepackError::io("list", vendor_dir))?
        {
            let entry = entry.map_err(RepackError::io("list", vendor_dir))?;
            let is_file = entry
                .file_type()
                .map_err(RepackError::io("stat", entry.path()))?
                .is_file();
            let has_extension = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.nested_extension));

            if is_file && has_extension {
                matches.push(entry.into_path());
            }
        }

        if matches.len() != 1 {
            return Err(StructureError::InnerDirectory {
                path: vendor_dir.to_path_buf(),
                extension: self.nested_extension.clone(),
                found: matches.len(),
            }
            .into());
        }
        Ok(matches.remove(0))
    }

    /// Copy one replacement into `dest_dir`, keeping permissions and mtime
    fn copy_replacement(&self, source: &Utf8Path, dest_dir: &Utf8Path) -> Result<(), RepackError> {
        let file_name = source.file_name().ok_or_else(|| {
            RepackError::invalid_input("copy", source, "replacement path has no file name")
        })?;
        let dest = dest_dir.join(file_name);

        let metadata = fs::metadata(source).map_err(RepackError::io("copy", source))?;
        if !metadata.is_file() {
            return Err(RepackError::invalid_input(
                "copy",
                source,
                "replacement is not a regular file",
            ));
        }

        // A read-only file from an earlier replacement cannot be truncated in place
        if dest.exists() {
            fs::remove_file(&dest).map_err(RepackError::io("remove", &dest))?;
        }
        fs::copy(source, &dest).map_err(RepackError::io("copy", source))?;

        // Only needs ownership of `dest`, so read-only copies work too
        filetime::set_file_mtime(&dest, FileTime::from_last_modification_time(&metadata))
            .map_err(RepackError::io("set mtime of", &dest))?;

        self.log.info(format!("copy '{}' ==> '{}'", source, dest_dir));
        Ok(())
    }
}

fn source_stem(source: &Utf8Path) -> Result<&str, RepackError> {
    source
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            RepackError::invalid_input("open archive", source, "source path has no file name")
        })
}

/// The only entry of `dir`, which must be a directory
fn single_entry(dir: &Utf8Path) -> Result<Utf8PathBuf, RepackError> {
    let entries = dir
        .read_dir_utf8()
        .map_err(RepackError::io("list", dir))?
        .collect::<io::Result<Vec<_>>>()
        .map_err(RepackError::io("list", dir))?;

    if entries.len() != 1 {
        return Err(StructureError::OuterDirectory {
            path: dir.to_path_buf(),
            found: entries.len(),
        }
        .into());
    }

    let vendor = entries[0].path().to_path_buf();
    if !vendor.is_dir() {
        return Err(StructureError::VendorNotDirectory { path: vendor }.into());
    }
    Ok(vendor)
}

/// Extraction directory owned by one run.
///
/// Created empty (any stale directory is removed first). Removed explicitly
/// with [`WorkingDir::remove`] on success, or by `Drop` when the run bails.
struct WorkingDir {
    path: Utf8PathBuf,
    armed: bool,
}

impl WorkingDir {
    fn create(path: Utf8PathBuf, log: &LogSink) -> Result<Self, RepackError> {
        if path.exists() {
            fs::remove_dir_all(&path).map_err(RepackError::io("remove", &path))?;
            log.info(format!("rmtree '{}'", path));
        }

        fs::create_dir_all(&path).map_err(RepackError::io("create", &path))?;
        log.info(format!("makedirs '{}'", path));

        Ok(Self { path, armed: true })
    }

    fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn remove(mut self, log: &LogSink) -> Result<(), RepackError> {
        self.armed = false;
        fs::remove_dir_all(&self.path).map_err(RepackError::io("remove", &self.path))?;
        log.info(format!("rmtree '{}'", self.path));
        Ok(())
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                tracing::warn!("Failed to clean up working directory {}: {}", self.path, e);
            } else {
                tracing::debug!("Cleaned up working directory {}", self.path);
            }
        }
    }
}
