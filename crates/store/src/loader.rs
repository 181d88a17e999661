//! Load `.txt` and `.md` files from a directory as documents.

use std::path::Path;

use ragpack_core::document::Document;
use ragpack_core::error::StoreError;
use tracing::{debug, warn};

const EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Read every `*.txt` / `*.md` file directly under `dir`.
///
/// Files are returned sorted by name; the document name is the file name.
/// Unreadable or non-UTF-8 files are skipped with a warning. Subdirectories
/// are not descended into.
pub fn load_directory(dir: &Path) -> Result<Vec<Document>, StoreError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| StoreError::Storage(format!("{}: {e}", dir.display())))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_supported_extension(p))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "Skipping file with non-UTF-8 name");
            continue;
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(name, chars = content.chars().count(), "Loaded document");
                documents.push(Document::new(name, content));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
        }
    }

    Ok(documents)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}
