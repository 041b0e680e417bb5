//! Filesystem helpers built on `cap-std` and `camino`.
#![forbid(unsafe_code)]

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Open a source file for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Create the directory that will hold `path` if it does not exist yet.
///
/// Used for database files whose parent directory may be missing on first run.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_base(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?.create_dir_all(&relative)
}

/// Split `dir` into an ambient base (filesystem root or `.`) and the rest.
fn split_base(dir: &Utf8Path) -> io::Result<(Utf8PathBuf, Utf8PathBuf)> {
    if !dir.is_absolute() {
        return Ok((Utf8PathBuf::from("."), dir.to_path_buf()));
    }
    let root = dir
        .ancestors()
        .last()
        .ok_or_else(|| io::Error::other("absolute path without a root"))?;
    let relative = dir
        .strip_prefix(root)
        .map_err(|_| io::Error::other("failed to strip root from absolute path"))?;
    Ok((root.to_path_buf(), relative.to_path_buf()))
}
