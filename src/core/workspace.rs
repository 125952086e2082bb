//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Represents an FST workspace
#[derive(Debug)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .fst/)
    root: PathBuf,
}

impl Workspace {
    /// Find the workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current = std::env::current_dir()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find the workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            let fst_dir = current.join(".fst");
            if fst_dir.is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        let fst_dir = root.join(".fst");
        if fst_dir.exists() {
            return Err(WorkspaceError::AlreadyExists(root.clone()));
        }

        Self::write_structure(&root)?;
        Ok(Self { root })
    }

    /// Force initialization even if .fst/ exists
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        Self::write_structure(&root)?;
        Ok(Self { root })
    }

    fn write_structure(root: &Path) -> Result<(), WorkspaceError> {
        let fst_dir = root.join(".fst");
        std::fs::create_dir_all(&fst_dir)
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        let config_path = fst_dir.join("config.yaml");
        std::fs::write(&config_path, Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        Self::create_entity_dirs(root)
    }

    fn default_config() -> &'static str {
        r#"# FST Workspace Configuration

# Default author for new entities (can be overridden by global config)
# author: ""

# Default tax rate applied when a quote enables tax (percent)
# tax_rate: 0.0

# Default output format (auto, yaml, json, tsv)
# default_format: auto
"#
    }

    fn create_entity_dirs(root: &Path) -> Result<(), WorkspaceError> {
        let dirs = [
            "clients",
            "technicians",
            "materials",
            "projects",
            "quotes",
            "work_orders",
            "changelog",
        ];

        for dir in dirs {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }

        Ok(())
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .fst configuration directory
    pub fn fst_dir(&self) -> PathBuf {
        self.root.join(".fst")
    }

    /// Get the path for an entity file
    pub fn entity_path(&self, prefix: EntityPrefix, id: &EntityId) -> PathBuf {
        self.root
            .join(prefix.dir_name())
            .join(format!("{}.fst.yaml", id))
    }

    /// Get the directory holding entities of the given prefix
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(prefix.dir_name())
    }

    /// Get the directory holding per-entity change logs
    pub fn changelog_dir(&self) -> PathBuf {
        self.root.join("changelog")
    }

    /// Iterate all entity files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        let dir = self.entity_dir(prefix);
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(".fst.yaml"))
            .map(|e| e.path().to_path_buf())
    }

    /// Allocate the next human-facing quote number for a year,
    /// e.g. "Q-2026-0007". Scans existing records so numbering survives
    /// deletes and out-of-band edits.
    pub fn next_quote_number(&self, year: i32) -> Result<String, WorkspaceError> {
        let next = self.next_sequence(EntityPrefix::Quo, &format!("Q-{year}-"))?;
        Ok(format!("Q-{year}-{next:04}"))
    }

    /// Allocate the next work order number for a year, e.g. "WO-2026-0042"
    pub fn next_wo_number(&self, year: i32) -> Result<String, WorkspaceError> {
        let next = self.next_sequence(EntityPrefix::Wo, &format!("WO-{year}-"))?;
        Ok(format!("WO-{year}-{next:04}"))
    }

    fn next_sequence(
        &self,
        prefix: EntityPrefix,
        number_prefix: &str,
    ) -> Result<u32, WorkspaceError> {
        let mut max = 0u32;
        for path in self.iter_entity_files(prefix) {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
            for line in content.lines() {
                let value = line
                    .strip_prefix("quote_number:")
                    .or_else(|| line.strip_prefix("wo_number:"))
                    .map(str::trim)
                    .map(|v| v.trim_matches(['\'', '"']));
                if let Some(number) = value {
                    if let Some(seq) = number.strip_prefix(number_prefix) {
                        if let Ok(n) = seq.parse::<u32>() {
                            max = max.max(n);
                        }
                    }
                }
            }
        }
        Ok(max + 1)
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not an FST workspace (searched from {searched_from:?}). Run 'fst init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("FST workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        assert!(ws.fst_dir().exists());
        assert!(ws.fst_dir().join("config.yaml").exists());
        assert!(ws.root().join("clients").is_dir());
        assert!(ws.root().join("quotes").is_dir());
        assert!(ws.root().join("work_orders").is_dir());
        assert!(ws.root().join("changelog").is_dir());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let err = Workspace::init(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
    }

    #[test]
    fn test_discover_finds_fst_dir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let ws = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(
            ws.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_fails_without_fst_dir() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }

    #[test]
    fn test_quote_numbering_scans_existing_records() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();

        assert_eq!(ws.next_quote_number(2026).unwrap(), "Q-2026-0001");

        std::fs::write(
            ws.entity_dir(EntityPrefix::Quo).join("QUO-A.fst.yaml"),
            "quote_number: Q-2026-0041\n",
        )
        .unwrap();
        std::fs::write(
            ws.entity_dir(EntityPrefix::Quo).join("QUO-B.fst.yaml"),
            "quote_number: Q-2025-0100\n",
        )
        .unwrap();

        assert_eq!(ws.next_quote_number(2026).unwrap(), "Q-2026-0042");
        assert_eq!(ws.next_quote_number(2025).unwrap(), "Q-2025-0101");
    }
}
