use std::io;
use std::path::{Path, PathBuf};

/// Where the unlock marker lives for the lifetime of a session.
pub trait SessionStore {
    fn is_unlocked(&self) -> bool;
    fn mark_unlocked(&mut self) -> io::Result<()>;
    fn clear(&mut self) -> io::Result<()>;
}

/// Process-scoped marker for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySession {
    unlocked: bool,
}

#[cfg(test)]
impl SessionStore for MemorySession {
    fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    fn mark_unlocked(&mut self) -> io::Result<()> {
        self.unlocked = true;
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.unlocked = false;
        Ok(())
    }
}

const MARKER: &str = "unlocked";

/// Marker file shared by consecutive CLI invocations; `opsdash lock` ends the session.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSession {
    fn is_unlocked(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .map(|s| s.trim() == MARKER)
            .unwrap_or(false)
    }

    fn mark_unlocked(&mut self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        std::fs::write(&self.path, MARKER)
    }

    fn clear(&mut self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_marker_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSession::new(dir.path().join("nested").join("session"));
        assert!(!store.is_unlocked());
        store.mark_unlocked().unwrap();
        assert!(store.is_unlocked());
        assert!(FileSession::new(store.path()).is_unlocked());
        store.clear().unwrap();
        assert!(!store.is_unlocked());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn foreign_file_content_is_not_a_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        std::fs::write(&path, "locked").unwrap();
        assert!(!FileSession::new(&path).is_unlocked());
    }
}
