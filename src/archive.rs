//! Project archive builder.
//!
//! Walks the allow-listed top-level entries of the project, skips dependency
//! caches at every depth, and writes a deflate (level 9) zip with paths
//! relative to the project root. The archive itself and the running
//! executable are never packaged, whatever the allow-list says.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::errors::DeployError;
use crate::project_config::ArchiveSettings;

const COMPRESSION_LEVEL: i64 = 9;

/// Result of a finished archive build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub file_count: usize,
    pub size_bytes: u64,
}

/// Build the archive at `destination` and wait until it is finalized on disk.
///
/// The destination file is created before the blocking work starts, so once
/// this future has been polled the caller's cleanup always has a file to
/// remove.
pub async fn build_archive(
    project_root: &Path,
    destination: &Path,
    settings: &ArchiveSettings,
) -> Result<ArchiveSummary, DeployError> {
    let file = File::create(destination).map_err(|e| DeployError::io(destination, e))?;
    let root = project_root.to_path_buf();
    let dest = destination.to_path_buf();
    let settings = settings.clone();
    let protected = protected_paths(destination);

    let summary = tokio::task::spawn_blocking(move || {
        write_archive(file, &root, &dest, &settings, &protected)
    })
        .await
        .map_err(|e| DeployError::Archive {
            path: destination.to_path_buf(),
            message: format!("archive task failed: {e}"),
        })??;

    info!(
        files = summary.file_count,
        bytes = summary.size_bytes,
        path = %destination.display(),
        "archive ready"
    );
    Ok(summary)
}

/// Canonical paths that must stay out of the archive: the archive being
/// written and the executable doing the writing.
pub fn protected_paths(destination: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = destination.canonicalize().ok().into_iter().collect();
    match std::env::current_exe().and_then(|exe| exe.canonicalize()) {
        Ok(exe) => paths.push(exe),
        Err(e) => debug!(error = %e, "could not resolve own executable"),
    }
    paths
}

/// Synchronous archive writer; returns only after the zip is finished and synced.
///
/// Files whose canonical path is in `protected` are skipped.
pub fn write_archive(
    file: File,
    project_root: &Path,
    destination: &Path,
    settings: &ArchiveSettings,
    protected: &[PathBuf],
) -> Result<ArchiveSummary, DeployError> {
    let archive_err = |message: String| DeployError::Archive {
        path: destination.to_path_buf(),
        message,
    };

    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut file_count = 0;
    for name in &settings.include {
        if settings.exclude.iter().any(|excluded| excluded == name) {
            debug!(entry = %name, "excluded from archive");
            continue;
        }
        let top = project_root.join(name);
        if !top.exists() {
            debug!(entry = %name, "not present, skipping");
            continue;
        }

        for entry in collect_files(&top, &settings.skip_dirs) {
            let path = entry.map_err(|e| archive_err(e.to_string()))?;
            if path.canonicalize().is_ok_and(|c| protected.contains(&c)) {
                debug!(path = %path.display(), "protected file left out of archive");
                continue;
            }
            let relative = archive_name(project_root, &path)
                .ok_or_else(|| archive_err(format!("{} is outside the project", path.display())))?;

            zip.start_file(relative.as_str(), options)
                .map_err(|e| archive_err(e.to_string()))?;
            let mut source = File::open(&path).map_err(|e| DeployError::io(&path, e))?;
            std::io::copy(&mut source, &mut zip).map_err(|e| DeployError::io(&path, e))?;
            file_count += 1;
        }
    }

    let mut writer = zip.finish().map_err(|e| archive_err(e.to_string()))?;
    writer.flush().map_err(|e| DeployError::io(destination, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| DeployError::io(destination, e.into_error()))?;
    file.sync_all().map_err(|e| DeployError::io(destination, e))?;
    let size_bytes = file
        .metadata()
        .map_err(|e| DeployError::io(destination, e))?
        .len();

    Ok(ArchiveSummary {
        file_count,
        size_bytes,
    })
}

/// Regular files under `top` (or `top` itself), sorted, with skipped names pruned.
fn collect_files<'a>(
    top: &Path,
    skip: &'a [String],
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> + 'a {
    WalkDir::new(top)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || !skip
                    .iter()
                    .any(|name| entry.file_name().to_str() == Some(name.as_str()))
        })
        .filter_map(|entry| match entry {
            Ok(e) if e.file_type().is_file() => Some(Ok(e.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
}

/// Zip entry name: `/`-separated path relative to the project root.
fn archive_name(project_root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(project_root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
