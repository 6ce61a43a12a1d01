// Zip container helpers used by the repacker.
//
// Reading uses extract-all semantics. Writing always uses stored entries: the
// payloads are disk images that do not compress meaningfully, and skipping
// deflate keeps multi-gigabyte repacks I/O bound.

use super::log_sink::LogSink;
use super::repacker::RepackError;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Datelike, Local, Timelike};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Files at or above this size need zip64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Extract every entry of `archive` into the existing directory `dest`.
pub fn unzip(archive: &Utf8Path, dest: &Utf8Path, log: &LogSink) -> Result<(), RepackError> {
    log.debug(format!("start unzip '{}'", archive));

    let file = File::open(archive).map_err(RepackError::io("open archive", archive))?;
    let mut zip =
        ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(e, "read archive", archive))?;
    zip.extract(dest)
        .map_err(|e| zip_error(e, "extract archive", archive))?;

    log.debug(format!("finish unzip '{}'", dest));
    Ok(())
}

/// Write every file under `src_dir` into a fresh archive at `target`.
///
/// Entry names are paths relative to `src_dir` with `/` separators, in file
/// name order. Directories are not stored. An existing `target` is removed
/// first; a partially written `target` is removed on failure.
pub fn zip_dir(src_dir: &Utf8Path, target: &Utf8Path, log: &LogSink) -> Result<(), RepackError> {
    if target.exists() {
        fs::remove_file(target).map_err(RepackError::io("remove", target))?;
        log.info(format!("remove '{}'", target));
    }

    log.debug(format!("start zip '{}'", src_dir));

    if let Err(e) = write_archive(src_dir, target) {
        if target.exists() {
            if let Err(cleanup) = fs::remove_file(target) {
                tracing::warn!("Failed to remove partial archive {}: {}", target, cleanup);
            }
        }
        return Err(e);
    }

    log.debug(format!("finish zip '{}'", target));
    Ok(())
}

/// Archive entry names currently in `archive`, in central directory order
pub fn entry_names(archive: &Utf8Path) -> Result<Vec<String>, RepackError> {
    let file = File::open(archive).map_err(RepackError::io("open archive", archive))?;
    let zip =
        ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(e, "read archive", archive))?;
    Ok(zip.file_names().map(str::to_string).collect())
}

fn write_archive(src_dir: &Utf8Path, target: &Utf8Path) -> Result<(), RepackError> {
    let file = File::create(target).map_err(RepackError::io("create archive", target))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| RepackError::io("walk", src_dir)(io::Error::from(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = Utf8PathBuf::try_from(entry.path().to_path_buf()).map_err(|e| {
            RepackError::io("walk", src_dir)(io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        let name = archive_name(src_dir, &path)?;
        let metadata = entry
            .metadata()
            .map_err(|e| RepackError::io("stat", &path)(io::Error::from(e)))?;

        writer
            .start_file(name, entry_options(&metadata))
            .map_err(|e| zip_error(e, "write archive", target))?;

        let mut input = File::open(&path).map_err(RepackError::io("read", &path))?;
        io::copy(&mut input, &mut writer).map_err(RepackError::io("write archive", target))?;
    }

    writer
        .finish()
        .map_err(|e| zip_error(e, "finish archive", target))?;
    Ok(())
}

fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(metadata.len() >= ZIP64_THRESHOLD);

    let options = match entry_time(metadata) {
        Some(time) => options.last_modified_time(time),
        None => options,
    };

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };

    options
}

/// File mtime as an MS-DOS timestamp; `None` outside the 1980..=2107 range
fn entry_time(metadata: &fs::Metadata) -> Option<zip::DateTime> {
    let modified: DateTime<Local> = metadata.modified().ok()?.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(modified.year()).ok()?,
        modified.month() as u8,
        modified.day() as u8,
        modified.hour() as u8,
        modified.minute() as u8,
        modified.second() as u8,
    )
    .ok()
}

/// `/`-separated path of `path` relative to `root`
fn archive_name(root: &Utf8Path, path: &Utf8Path) -> Result<String, RepackError> {
    let relative = path.strip_prefix(root).map_err(|e| {
        RepackError::io("walk", root)(io::Error::new(io::ErrorKind::InvalidInput, e))
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/"))
}

fn zip_error(error: ZipError, action: &'static str, path: &Utf8Path) -> RepackError {
    match error {
        ZipError::Io(source) => RepackError::Io {
            action,
            path: path.to_path_buf(),
            source,
        },
        other => RepackError::ArchiveFormat {
            path: path.to_path_buf(),
            source: other,
        },
    }
}
