use anyhow::Context;
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Normalize a caller-chosen session name into a directory-safe key.
/// session_key = blake3(name) → hex string (first 32 chars).
pub fn session_key(session: &str) -> String {
    let hash = blake3::hash(session.trim().as_bytes());
    hash.to_hex()[..32].to_string()
}

/// Return the per-user store root.
/// Linux: `~/.local/share/gitdoc/`, falls back to `~/.gitdoc/`.
pub fn store_root() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("gitdoc")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".gitdoc")
    } else {
        PathBuf::from(".gitdoc-store")
    }
}

/// `root/sessions/<session_key>/`
pub fn session_dir(root: &Path, session: &str) -> PathBuf {
    root.join("sessions").join(session_key(session))
}

/// Remove everything stored for a session. Missing sessions are fine.
pub fn purge_session(root: &Path, session: &str) -> anyhow::Result<()> {
    let dir = session_dir(root, session);
    match fs::remove_dir_all(&dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing session {}", dir.display())),
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Held for the duration of a read-modify-write on a session file.
pub struct LockGuard {
    _file: fs::File,
}

pub fn lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(LockGuard { _file: file })
}

/// String map persisted as `session.json` inside one session directory.
///
/// Survives process restarts that reuse the same session name; a new
/// session name starts empty.
#[derive(Debug, Clone)]
pub struct SessionFile {
    data_path: PathBuf,
    lock_path: PathBuf,
}

impl SessionFile {
    pub fn open(root: &Path, session: &str) -> Self {
        let dir = session_dir(root, session);
        Self {
            data_path: dir.join("session.json"),
            lock_path: dir.join("session.lock"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.data_path
    }

    fn read_map(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.data_path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.data_path)
            .with_context(|| format!("reading session: {}", self.data_path.display()))?;
        let map = serde_json::from_str(&content)
            .with_context(|| format!("parsing session: {}", self.data_path.display()))?;
        Ok(map)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(map)?;
        write_atomic(&self.data_path, data.as_bytes())
            .with_context(|| format!("saving session: {}", self.data_path.display()))
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _guard = lock_file(&self.lock_path)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = lock_file(&self.lock_path)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_deterministic() {
        let k1 = session_key("tab-1");
        let k2 = session_key("tab-1");
        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 32);
        assert!(k1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(k1, session_key("tab-2"));
    }

    #[test]
    fn store_root_is_not_empty() {
        assert!(!store_root().as_os_str().is_empty());
    }

    #[test]
    fn set_get_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let file = SessionFile::open(tmp.path(), "s1");
        assert_eq!(file.get("gitdoc_tree:a/b").unwrap(), None);

        file.set("gitdoc_tree:a/b", "t1").unwrap();
        assert_eq!(file.get("gitdoc_tree:a/b").unwrap().as_deref(), Some("t1"));

        file.set("gitdoc_tree:a/b", "t2").unwrap();
        assert_eq!(file.get("gitdoc_tree:a/b").unwrap().as_deref(), Some("t2"));

        file.remove("gitdoc_tree:a/b").unwrap();
        assert_eq!(file.get("gitdoc_tree:a/b").unwrap(), None);
    }

    #[test]
    fn survives_reopen_within_session() {
        let tmp = tempfile::tempdir().unwrap();
        SessionFile::open(tmp.path(), "s1").set("k", "v").unwrap();
        let reopened = SessionFile::open(tmp.path(), "s1");
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn sessions_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        SessionFile::open(tmp.path(), "s1").set("k", "v").unwrap();
        assert_eq!(SessionFile::open(tmp.path(), "s2").get("k").unwrap(), None);
    }

    #[test]
    fn purge_removes_session() {
        let tmp = tempfile::tempdir().unwrap();
        let file = SessionFile::open(tmp.path(), "s1");
        file.set("k", "v").unwrap();
        purge_session(tmp.path(), "s1").unwrap();
        assert!(!file.path().exists());
        purge_session(tmp.path(), "s1").unwrap();
    }

    #[test]
    fn corrupt_session_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = SessionFile::open(tmp.path(), "s1");
        write_atomic(file.path(), b"not json").unwrap();
        assert!(file.get("k").is_err());
    }
}
