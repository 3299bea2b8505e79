//! Filesystem walker
//!
//! Enumerates the content of a file or directory in the order its bytes are
//! laid out in the piece stream.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, trace};
use walkdir::WalkDir;

use crate::error::{Result, TorrentError};
use crate::torrent::info::FileEntry;

/// Result of walking a content root
#[derive(Debug, Clone, Default)]
pub struct ContentWalk {
    /// Files in piece-stream order, relative to the root
    pub files: Vec<FileEntry>,
    /// On-disk location of each entry in `files`
    pub real_paths: Vec<PathBuf>,
    /// Sum of every file length
    pub total_length: u64,
}

impl ContentWalk {
    /// Get the number of files found
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Check if no file was found
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn push(&mut self, entry: FileEntry, real_path: PathBuf) {
        self.total_length += entry.length;
        self.files.push(entry);
        self.real_paths.push(real_path);
    }
}

/// Walk `root` depth-first in lexical order.
///
/// A file root yields a single entry named after the file. Symbolic links
/// are followed. Any error discards the whole walk.
pub fn walk(root: &Path) -> Result<ContentWalk> {
    debug!("Walking content root: {}", root.display());

    let metadata = std::fs::metadata(root).map_err(|e| {
        error!("Failed to stat content root '{}': {}", root.display(), e);
        TorrentError::filesystem_error_full("Failed to stat content root", root.display().to_string(), e.to_string())
    })?;

    let mut walk = ContentWalk::default();

    if metadata.is_file() {
        let name = root
            .file_name()
            .ok_or_else(|| TorrentError::filesystem_error_with_path("Content root has no file name", root.display().to_string()))?;
        let entry = FileEntry {
            path: vec![utf8_component(name, root)?],
            length: metadata.len(),
        };
        walk.push(entry, root.to_path_buf());
        return Ok(walk);
    }

    for dir_entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let dir_entry = dir_entry.map_err(|e| {
            error!("Failed to walk '{}': {}", root.display(), e);
            TorrentError::from(e)
        })?;
        if !dir_entry.file_type().is_file() {
            continue;
        }

        let real_path = dir_entry.path().to_path_buf();
        let length = dir_entry
            .metadata()
            .map_err(TorrentError::from)?
            .len();
        let path = relative_components(root, &real_path)?;
        trace!("Found file {:?} ({} bytes)", path, length);

        walk.push(FileEntry { path, length }, real_path);
    }

    debug!(
        "Walk of '{}' found {} files, {} bytes",
        root.display(),
        walk.file_count(),
        walk.total_length
    );
    Ok(walk)
}

/// Split the part of `path` below `root` into UTF-8 segments
fn relative_components(root: &Path, path: &Path) -> Result<Vec<String>> {
    let relative = path.strip_prefix(root).map_err(|e| {
        TorrentError::filesystem_error_full("File is outside the content root", path.display().to_string(), e.to_string())
    })?;

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(utf8_component(segment, path)),
            _ => None,
        })
        .collect()
}

fn utf8_component(segment: &std::ffi::OsStr, path: &Path) -> Result<String> {
    segment
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| TorrentError::filesystem_error_with_path("Path is not valid UTF-8", path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tree(root: &Path) {
        fs::create_dir_all(root.join("b_dir/nested")).unwrap();
        fs::write(root.join("c.txt"), b"ccc").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("b_dir/z.bin"), b"zz").unwrap();
        fs::write(root.join("b_dir/nested/n.bin"), b"nnnn").unwrap();
    }

    #[test]
    fn test_walk_directory_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        write_tree(&root);

        let walk = walk(&root).unwrap();
        let paths: Vec<Vec<String>> = walk.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec!["a.txt".to_string()],
                vec!["b_dir".to_string(), "nested".to_string(), "n.bin".to_string()],
                vec!["b_dir".to_string(), "z.bin".to_string()],
                vec!["c.txt".to_string()],
            ]
        );
        assert_eq!(walk.total_length, 10);
        assert_eq!(walk.real_paths[1], root.join("b_dir/nested/n.bin"));
    }

    #[test]
    fn test_walk_single_file_keeps_leaf_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.bin");
        fs::write(&file, b"hello").unwrap();

        let walk = walk(&file).unwrap();
        assert_eq!(walk.file_count(), 1);
        assert_eq!(walk.files[0].path, vec!["single.bin".to_string()]);
        assert_eq!(walk.files[0].length, 5);
        assert_eq!(walk.real_paths[0], file);
    }

    #[test]
    fn test_walk_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/inner")).unwrap();

        let walk = walk(&dir.path().join("empty")).unwrap();
        assert!(walk.is_empty());
        assert_eq!(walk.total_length, 0);
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        match walk(&missing) {
            Err(TorrentError::FilesystemError { path, .. }) => {
                assert_eq!(path, Some(missing.display().to_string()));
            }
            other => panic!("expected filesystem error, got {:?}", other),
        }
    }

    #[test]
    fn test_walk_counts_zero_length_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("empty"), b"").unwrap();
        fs::write(root.join("full"), b"xyz").unwrap();

        let walk = walk(&root).unwrap();
        assert_eq!(walk.file_count(), 2);
        assert_eq!(walk.files[0].length, 0);
        assert_eq!(walk.total_length, 3);
    }
}
