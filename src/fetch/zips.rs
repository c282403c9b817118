// src/fetch/zips.rs
use std::fs::{self, File};
use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::fetch::RemoteIndex;

/// Derive the local file name for a remote href: its last path segment.
pub fn archive_name(href: &str) -> Option<&str> {
    href.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Names of the `*.zip` archives already present in `dir`, sorted.
pub fn local_archives(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".zip") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Download every referenced archive not yet present in `dir`, returning how
/// many were fetched.
///
/// Each file streams into a `.part` sibling and is renamed into place once
/// complete, so an interrupted transfer never masquerades as a finished
/// archive. The first failed download aborts the whole call; archives
/// completed before the failure stay on disk.
pub fn ensure_local<S: AsRef<str>>(
    index: &dyn RemoteIndex,
    dir: &Path,
    hrefs: &[S],
) -> Result<usize> {
    let mut downloaded = 0;
    for href in hrefs {
        let href = href.as_ref();
        let Some(name) = archive_name(href) else {
            continue;
        };
        let dest = dir.join(name);
        if dest.exists() {
            continue;
        }

        let start = Instant::now();
        let part = dest.with_extension("zip.part");
        let mut file = File::create(&part)?;
        let bytes = match index.fetch(href, &mut file) {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&part);
                return Err(e);
            }
        };
        drop(file);
        fs::rename(&part, &dest)?;

        info!(name = %name, bytes, elapsed = ?start.elapsed(), "downloaded archive");
        downloaded += 1;
    }
    Ok(downloaded)
}
