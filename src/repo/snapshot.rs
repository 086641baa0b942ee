//! Immutable view of a cloned tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// How deep the listing goes. Deep enough to see nested app directories
/// without drowning the prompt context in vendored trees.
const MAX_DEPTH: usize = 4;

/// Snapshot of a cloned repository: a sorted, depth-bounded listing of
/// relative paths (directories suffixed with `/`) plus on-demand file reads.
/// Captured once per job, right after clone; every heuristic downstream is a
/// pure function of this view.
#[derive(Debug, Clone)]
pub struct RepoSnapshot {
    root: PathBuf,
    entries: Vec<String>,
}

impl RepoSnapshot {
    pub fn capture(root: &Path) -> io::Result<Self> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(MAX_DEPTH)
            .sort_by_file_name()
        {
            let entry = entry?;
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or_else(|_| entry.path());
            let mut rel = rel.display().to_string();
            if entry.file_type().is_dir() {
                rel.push('/');
            }
            entries.push(rel);
        }
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Relative paths, directories suffixed with `/`, in traversal order
    /// (each directory's children sorted, parents before children).
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Relative paths of regular files only.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.ends_with('/'))
            .map(String::as_str)
    }

    /// Read a file's contents, replacing invalid UTF-8. The heuristics only
    /// care about recognizable text, not byte fidelity.
    pub fn read(&self, rel: &str) -> io::Result<String> {
        let bytes = fs::read(self.root.join(rel))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, b"x").expect("write");
    }

    #[test]
    fn test_capture_sorts_and_suffixes_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("a/inner.py"));

        let snapshot = RepoSnapshot::capture(dir.path()).expect("capture");
        assert_eq!(snapshot.entries(), &["a/", "a/inner.py", "b.txt"]);
    }

    #[test]
    fn test_capture_is_depth_bounded() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("one/two/three/four/five/six.txt"));

        let snapshot = RepoSnapshot::capture(dir.path()).expect("capture");
        assert!(snapshot.entries().iter().any(|e| e == "one/two/three/four/"));
        assert!(
            !snapshot.entries().iter().any(|e| e.contains("five")),
            "entries below the depth bound must be omitted: {:?}",
            snapshot.entries()
        );
    }

    #[test]
    fn test_files_excludes_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("src/main.py"));

        let snapshot = RepoSnapshot::capture(dir.path()).expect("capture");
        let files: Vec<&str> = snapshot.files().collect();
        assert_eq!(files, vec!["src/main.py"]);
    }

    #[test]
    fn test_read_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("blob.py"), [0x66, 0x6f, 0xff, 0x6f]).expect("write");

        let snapshot = RepoSnapshot::capture(dir.path()).expect("capture");
        let text = snapshot.read("blob.py").expect("read");
        assert!(text.starts_with("fo"));
    }
}
