//! Output directory lifecycle: prepare, fill, archive.
//!
//! [`prepare_output_dir`] runs before any figure is rendered and leaves an
//! empty directory. [`finish`] runs after every render has completed: it
//! copies the source logs in, writes `<dir>.tar.gz` next to the directory and
//! checksums the contents. Archives are byte-reproducible for identical
//! inputs.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use flate2::{Compression, GzBuilder};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{ReportError, Result};
use crate::verbose::{vprintln, wprintln};

/// A finished output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// The output directory.
    pub dir: PathBuf,
    /// Log copies inside `dir`.
    pub logs: Vec<PathBuf>,
    /// `<dir>.tar.gz`, when archiving was requested.
    pub archive: Option<PathBuf>,
    /// SHA-256 of the directory contents.
    pub checksum: String,
}

/// Ensure `dir` exists and is empty.
///
/// `dir` is checked with [`check_output_dir`] against `keep` before anything
/// is removed. An existing directory is then removed; a failed removal is
/// reported and retried once before it becomes an error.
pub fn prepare_output_dir(dir: &Path, keep: &[PathBuf]) -> Result<()> {
    check_output_dir(dir, keep)?;
    remove_dir_with_retry(dir)?;
    fs::create_dir_all(dir).map_err(|e| ReportError::io("creating", dir, e))
}

/// Refuse output directories whose removal would take other files along.
///
/// `dir` must end in a normal path component (not `.`, `..` or a root), and
/// may neither hold the working directory nor any path in `keep`.
pub fn check_output_dir(dir: &Path, keep: &[PathBuf]) -> Result<()> {
    let refuse = |reason: String| {
        Err(ReportError::Config(format!(
            "refusing to use `{}` as the output directory: {reason}",
            dir.display()
        )))
    };
    if !matches!(dir.components().next_back(), Some(Component::Normal(_))) {
        return refuse("it does not name a directory of its own".into());
    }
    archive_path(dir)?;

    // Nothing to protect until the directory exists.
    let Ok(root) = fs::canonicalize(dir) else {
        return Ok(());
    };
    if let Ok(cwd) = std::env::current_dir().and_then(fs::canonicalize) {
        if cwd.starts_with(&root) {
            return refuse("it contains the working directory".into());
        }
    }
    for path in keep {
        if fs::canonicalize(path).is_ok_and(|p| p.starts_with(&root)) {
            return refuse(format!("it contains `{}`", path.display()));
        }
    }
    Ok(())
}

fn remove_dir_with_retry(dir: &Path) -> Result<()> {
    remove_with_retry(dir, |path| fs::remove_dir_all(path))
}

/// Run `remove` on `dir`, retrying once. A missing directory counts as removed.
fn remove_with_retry(dir: &Path, mut remove: impl FnMut(&Path) -> io::Result<()>) -> Result<()> {
    let mut attempt = || match remove(dir) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    };
    if let Err(first) = attempt() {
        wprintln!("removing {} failed ({first}), retrying", dir.display());
        attempt().map_err(|e| ReportError::io("removing", dir, e))?;
    }
    Ok(())
}

/// Path of the archive written for `dir`: a sibling named `<dir>.tar.gz`.
pub fn archive_path(dir: &Path) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        ReportError::Config(format!(
            "output directory `{}` has no final component to name its archive",
            dir.display()
        ))
    })?;
    let mut file_name = name.to_os_string();
    file_name.push(".tar.gz");
    Ok(dir.with_file_name(file_name))
}

/// Copy `logs` into `dir`, keeping their file names.
pub fn copy_logs(dir: &Path, logs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    logs.iter()
        .map(|log| {
            let name = log.file_name().ok_or_else(|| {
                ReportError::io(
                    "copying",
                    log,
                    std::io::Error::new(ErrorKind::InvalidInput, "not a file path"),
                )
            })?;
            let dest = dir.join(name);
            fs::copy(log, &dest).map_err(|e| ReportError::io("copying", log, e))?;
            Ok(dest)
        })
        .collect()
}

/// Regular files under `dir`, sorted by relative path.
fn sorted_files(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ReportError::io("walking", dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        files.push((entry.path().to_path_buf(), rel));
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// SHA-256 over the relative paths and contents of every file in `dir`.
///
/// Each path and each content blob is preceded by its length, so moving
/// bytes between a name and its contents changes the digest.
pub fn dir_checksum(dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for (path, rel) in sorted_files(dir)? {
        let rel = rel.to_string_lossy();
        hasher.update((rel.len() as u64).to_le_bytes());
        hasher.update(rel.as_bytes());
        let contents = fs::read(&path).map_err(|e| ReportError::io("reading", &path, e))?;
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `<dir>.tar.gz` with entries rooted at the directory name.
///
/// Entries are sorted and carry fixed metadata (mtime 0, mode 0644, owner
/// 0:0), and the gzip header has no timestamp, so the bytes depend only on
/// file names and contents.
pub fn write_archive(dir: &Path) -> Result<PathBuf> {
    let archive = archive_path(dir)?;
    let root = dir.file_name().map(PathBuf::from).unwrap_or_default();

    let file = fs::File::create(&archive).map_err(|e| ReportError::io("creating", &archive, e))?;
    let encoder = GzBuilder::new().mtime(0).write(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, rel) in sorted_files(dir)? {
        let contents = fs::read(&path).map_err(|e| ReportError::io("reading", &path, e))?;
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        builder
            .append_data(&mut header, root.join(&rel), contents.as_slice())
            .map_err(|e| ReportError::io("archiving", &path, e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| ReportError::io("writing", &archive, e))?;
    encoder
        .finish()
        .map_err(|e| ReportError::io("writing", &archive, e))?;
    Ok(archive)
}

/// Complete the output directory once every figure is rendered.
pub fn finish(dir: &Path, logs: &[PathBuf], archive: bool) -> Result<Bundle> {
    let copied = copy_logs(dir, logs)?;
    let checksum = dir_checksum(dir)?;
    vprintln!("  bundle checksum: {checksum}");
    let archive = if archive {
        let path = write_archive(dir)?;
        vprintln!("  wrote {}", path.display());
        Some(path)
    } else {
        None
    };
    Ok(Bundle {
        dir: dir.to_path_buf(),
        logs: copied,
        archive,
        checksum,
    })
}

/// Remove `dir` and its archive. Returns whether anything was removed.
///
/// `dir` is checked against `keep` like in [`prepare_output_dir`].
pub fn clean(dir: &Path, keep: &[PathBuf]) -> Result<bool> {
    check_output_dir(dir, keep)?;
    let mut removed = false;
    if dir.exists() {
        remove_dir_with_retry(dir)?;
        removed = true;
    }
    let archive = archive_path(dir)?;
    match fs::remove_file(&archive) {
        Ok(()) => removed = true,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(ReportError::io("removing", &archive, e)),
    }
    Ok(removed)
}
