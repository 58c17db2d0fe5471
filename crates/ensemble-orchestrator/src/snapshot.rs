//! Run snapshot persistence.
//!
//! Run state is plain serde data, so persisting a suspended run is a JSON
//! write. [`FileSnapshotStore`] keeps one file per snapshot under
//! `<root>/<owner>/<name>.json`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{OrchestrationError, Result};
use crate::state::RunState;

/// Saves and restores run state by owner and name.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Save `state` under `owner`/`name`, replacing any previous snapshot.
    async fn save(&self, owner: &str, name: &str, state: &RunState) -> Result<()>;

    /// Load the snapshot saved under `owner`/`name`.
    ///
    /// # Errors
    /// Returns `SnapshotNotFound` if nothing was saved under that key.
    async fn load(&self, owner: &str, name: &str) -> Result<RunState>;

    /// Delete a snapshot; returns whether one existed.
    async fn delete(&self, owner: &str, name: &str) -> Result<bool>;

    /// Snapshot names saved for `owner`, sorted.
    async fn list(&self, owner: &str) -> Result<Vec<String>>;
}

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store rooted at `root`; directories are created on save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a snapshot is stored in.
    pub fn path_for(&self, owner: &str, name: &str) -> PathBuf {
        self.owner_dir(owner).join(format!("{}.json", sanitize(name)))
    }

    fn owner_dir(&self, owner: &str) -> PathBuf {
        let owner = if owner.trim().is_empty() { "default" } else { owner };
        self.root.join(sanitize(owner))
    }
}

/// Keeps keys inside their directory: anything but `[A-Za-z0-9_.-]` becomes `_`.
fn sanitize(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if cleaned.chars().all(|c| c == '.') { cleaned.replace('.', "_") } else { cleaned }
}

/// Write `state` to `path`, creating its directory.
///
/// The JSON goes to a temporary file that is then renamed over `path`, so a
/// crash never leaves a half-written snapshot.
pub async fn write_snapshot_file(path: &Path, state: &RunState) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let json = state.to_json()?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), run_id = %state.run_id, status = %state.status, "Snapshot saved");
    Ok(())
}

/// Read a snapshot written by [`write_snapshot_file`].
pub async fn read_snapshot_file(path: &Path) -> Result<RunState> {
    let json = tokio::fs::read_to_string(path).await?;
    RunState::from_json(&json)
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, owner: &str, name: &str, state: &RunState) -> Result<()> {
        write_snapshot_file(&self.path_for(owner, name), state).await
    }

    async fn load(&self, owner: &str, name: &str) -> Result<RunState> {
        let path = self.path_for(owner, name);
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => RunState::from_json(&json),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(OrchestrationError::SnapshotNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, owner: &str, name: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(owner, name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, owner: &str) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.owner_dir(owner)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentDescriptor, AgentRole, RunConfig, WorkflowStrategy};
    use crate::lifecycle::RunStatus;

    #[test]
    fn test_sanitize_keeps_keys_inside_root() {
        assert_eq!(sanitize("run-1.final"), "run-1.final");
        assert_eq!(sanitize("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize(".."), "__");
        assert_eq!(sanitize("a b/c"), "a_b_c");
    }

    #[test]
    fn test_path_layout() {
        let store = FileSnapshotStore::new("/tmp/snapshots");
        assert_eq!(store.path_for("alice", "run-1"), PathBuf::from("/tmp/snapshots/alice/run-1.json"));
        assert_eq!(store.path_for("", "run-1"), PathBuf::from("/tmp/snapshots/default/run-1.json"));
    }

    #[tokio::test]
    async fn test_snapshot_file_replaces_previous_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("runs").join("run.json");
        let config = RunConfig::new("sequential", "X", vec![AgentDescriptor::new("a", AgentRole::Generalist)]);
        let mut state = RunState::new(config, WorkflowStrategy::Sequential);

        write_snapshot_file(&path, &state).await.unwrap();
        state.transition(RunStatus::Running).unwrap();
        write_snapshot_file(&path, &state).await.unwrap();

        let loaded = read_snapshot_file(&path).await.unwrap();
        assert_eq!(loaded.run_id, state.run_id);
        assert_eq!(loaded.status, RunStatus::Running);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
