//! Depth-first traversal yielding only regular files.
//!
//! Sensor dumps arrive as directory trees of unpredictable depth. The
//! walker keeps an explicit stack and expands directories lazily, so
//! iteration starts immediately and memory stays proportional to the tree
//! depth rather than its total size.

use std::fs;
use std::io;
use std::path::PathBuf;

/// Iterator over every regular file under one or more root paths.
///
/// A root that is itself a file is yielded directly. Traversal order is
/// unspecified. I/O failures (unreadable directory, vanished entry) are
/// yielded in place as errors; iteration continues with the rest of the
/// stack.
#[derive(Debug, Clone)]
pub struct FileWalker {
    stack: Vec<PathBuf>,
}

impl FileWalker {
    /// Walks a single root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![root.into()],
        }
    }

    /// Walks several roots in one pass.
    pub fn from_roots<P>(roots: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            stack: roots.into_iter().map(Into::into).collect(),
        }
    }
}

impl Iterator for FileWalker {
    type Item = io::Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.stack.pop() {
            if path.is_file() {
                return Some(Ok(path));
            }
            match fs::read_dir(&path) {
                Ok(entries) => {
                    for entry in entries {
                        match entry {
                            Ok(entry) => self.stack.push(entry.path()),
                            Err(e) => return Some(Err(e)),
                        }
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(path, b"").expect("create file");
    }

    fn collect_files(walker: FileWalker) -> BTreeSet<PathBuf> {
        walker.map(|f| f.expect("no io errors")).collect()
    }

    #[test]
    fn finds_files_at_all_depths() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        touch(&root.join("top.csv"));
        touch(&root.join("a").join("mid.csv"));
        touch(&root.join("a").join("b").join("deep.csv"));

        let files = collect_files(FileWalker::new(root));
        assert_eq!(files.len(), 3);
        assert!(files.contains(&root.join("a").join("b").join("deep.csv")));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempdir().expect("tempdir");
        let mut walker = FileWalker::new(dir.path());
        assert!(walker.next().is_none());
    }

    #[test]
    fn file_root_is_yielded_directly() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("single.csv");
        touch(&file);

        let files = collect_files(FileWalker::new(&file));
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec![file]);
    }

    #[test]
    fn multiple_roots_are_walked_in_one_pass() {
        let dir = tempdir().expect("tempdir");
        touch(&dir.path().join("one").join("a.csv"));
        touch(&dir.path().join("two").join("b.csv"));

        let files = collect_files(FileWalker::from_roots([
            dir.path().join("one"),
            dir.path().join("two"),
        ]));
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn missing_root_yields_an_error() {
        let mut walker = FileWalker::new("/nonexistent/sensor-dump");
        let first = walker.next().expect("one result");
        assert!(first.is_err());
        assert!(walker.next().is_none());
    }
}
