//! Filesystem-backed store: one YAML file per entity, one append-only
//! change log file per entity under changelog/.
//!
//! A batch is made atomic through compensation: before any write, the
//! previous contents of every touched file are captured, and a failure
//! partway through restores them all before the error is returned.

use std::fs;
use std::path::PathBuf;

use crate::core::changelog::ChangeLogEntry;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::store::{Store, StoreError, WriteBatch};
use crate::core::workspace::Workspace;
use crate::entities::quote::Quote;
use crate::entities::work_order::WorkOrder;

/// Store implementation over a workspace's YAML files
pub struct YamlStore {
    ws: Workspace,
}

/// A file write staged with its pre-image for rollback
struct StagedWrite {
    path: PathBuf,
    content: String,
    previous: Option<String>,
}

impl YamlStore {
    pub fn new(ws: Workspace) -> Self {
        Self { ws }
    }

    /// Discover the enclosing workspace and open a store over it
    pub fn open() -> Result<Self, StoreError> {
        let ws = Workspace::discover().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self::new(ws))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.ws
    }

    fn read_entity<T: serde::de::DeserializeOwned + 'static>(
        &self,
        prefix: EntityPrefix,
        id: &EntityId,
    ) -> Result<T, StoreError> {
        let path = self.ws.entity_path(prefix, id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        serde_yml::from_str(&content).map_err(|e| StoreError::Serde(e.to_string()))
    }

    fn changelog_path(&self, entity_id: &str) -> PathBuf {
        self.ws.changelog_dir().join(format!("{entity_id}.yaml"))
    }

    /// Serialize one entity write, bumping the revision when the file
    /// already exists on disk
    fn stage_entity<T: serde::Serialize>(
        &self,
        path: PathBuf,
        entity: &mut T,
        bump: impl FnOnce(&mut T),
    ) -> Result<StagedWrite, StoreError> {
        let previous = match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        if previous.is_some() {
            bump(entity);
        }
        let content =
            serde_yml::to_string(entity).map_err(|e| StoreError::Serde(e.to_string()))?;
        Ok(StagedWrite {
            path,
            content,
            previous,
        })
    }

    fn stage_log_appends(
        &self,
        entries: &[ChangeLogEntry],
    ) -> Result<Vec<StagedWrite>, StoreError> {
        // Group appends per entity so each log file is rewritten once
        let mut staged: Vec<StagedWrite> = Vec::new();
        for entry in entries {
            let path = self.changelog_path(&entry.entity_id);
            if let Some(existing) = staged.iter_mut().find(|s| s.path == path) {
                let mut log: Vec<ChangeLogEntry> = serde_yml::from_str(&existing.content)
                    .map_err(|e| StoreError::Serde(e.to_string()))?;
                log.push(entry.clone());
                existing.content = serde_yml::to_string(&log)
                    .map_err(|e| StoreError::Serde(e.to_string()))?;
                continue;
            }

            let previous = match fs::read_to_string(&path) {
                Ok(content) => Some(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(StoreError::Io(e.to_string())),
            };
            let mut log: Vec<ChangeLogEntry> = match &previous {
                Some(content) => serde_yml::from_str(content)
                    .map_err(|e| StoreError::Serde(e.to_string()))?,
                None => Vec::new(),
            };
            log.push(entry.clone());
            let content =
                serde_yml::to_string(&log).map_err(|e| StoreError::Serde(e.to_string()))?;
            staged.push(StagedWrite {
                path,
                content,
                previous,
            });
        }
        Ok(staged)
    }

    /// Restore the pre-images of every file written so far
    fn roll_back(written: &[StagedWrite]) {
        for staged in written {
            let result = match &staged.previous {
                Some(content) => fs::write(&staged.path, content),
                None => fs::remove_file(&staged.path),
            };
            if result.is_err() {
                // Nothing more can be done from here; the caller gets
                // the original error and the partial state is visible.
                break;
            }
        }
    }
}

impl Store for YamlStore {
    fn quote(&self, id: &EntityId) -> Result<Quote, StoreError> {
        self.read_entity(EntityPrefix::Quo, id)
    }

    fn work_order(&self, id: &EntityId) -> Result<WorkOrder, StoreError> {
        self.read_entity(EntityPrefix::Wo, id)
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        // Stage everything first: serialization or read failures abort
        // before any file is touched.
        let mut staged: Vec<StagedWrite> = Vec::new();
        for mut quote in batch.quotes {
            let path = self.ws.entity_path(EntityPrefix::Quo, &quote.id);
            staged.push(self.stage_entity(path, &mut quote, |q| q.entity_revision += 1)?);
        }
        for mut wo in batch.work_orders {
            let path = self.ws.entity_path(EntityPrefix::Wo, &wo.id);
            staged.push(self.stage_entity(path, &mut wo, |w| w.entity_revision += 1)?);
        }
        staged.extend(self.stage_log_appends(&batch.log)?);

        // Commit, compensating on the first failure
        for (index, write) in staged.iter().enumerate() {
            if let Err(e) = fs::write(&write.path, &write.content) {
                Self::roll_back(&staged[..index]);
                return Err(StoreError::Io(e.to_string()));
            }
        }
        Ok(())
    }

    fn log_for(&self, entity_id: &str) -> Result<Vec<ChangeLogEntry>, StoreError> {
        let path = self.changelog_path(entity_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
        serde_yml::from_str(&content).map_err(|e| StoreError::Serde(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::changelog::{ChangeLogEntry, EntityKind};
    use chrono::Utc;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, YamlStore) {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        (tmp, YamlStore::new(ws))
    }

    #[test]
    fn test_round_trip_quote() {
        let (_tmp, mut store) = store();
        let quote = Quote::new("Q-2026-0001", "Test", "test");
        let id = quote.id.clone();

        let batch = WriteBatch::new().with_quote(quote);
        store.apply(batch).unwrap();

        let read = store.quote(&id).unwrap();
        assert_eq!(read.quote_number, "Q-2026-0001");
        assert_eq!(read.entity_revision, 1);

        // second write is a patch of an existing file: revision bumps
        let batch = WriteBatch::new().with_quote(read);
        store.apply(batch).unwrap();
        assert_eq!(store.quote(&id).unwrap().entity_revision, 2);
    }

    #[test]
    fn test_missing_quote() {
        let (_tmp, store) = store();
        let id = EntityId::new(EntityPrefix::Quo);
        assert!(matches!(store.quote(&id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_log_appends_in_order() {
        let (_tmp, mut store) = store();
        let quote = Quote::new("Q-2026-0001", "Test", "test");
        let id = quote.id.to_string();

        let first = ChangeLogEntry::created(EntityKind::Quote, &id, "jsmith", Utc::now());
        let second = ChangeLogEntry::status_changed(
            EntityKind::Quote,
            &id,
            "draft",
            "sent",
            "jsmith",
            Utc::now(),
        );

        store
            .apply(WriteBatch::new().with_quote(quote).with_log(vec![first]))
            .unwrap();
        store
            .apply(WriteBatch::new().with_log(vec![second]))
            .unwrap();

        let log = store.log_for(&id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.last().unwrap().new_value.as_deref(),
            Some("sent")
        );
    }

    #[test]
    fn test_failed_batch_rolls_back_earlier_writes() {
        let (_tmp, mut store) = store();
        let quote = Quote::new("Q-2026-0001", "Test", "test");
        let quote_id = quote.id.clone();
        store
            .apply(WriteBatch::new().with_quote(quote.clone()))
            .unwrap();

        // Break the work_orders directory so the second write in the
        // batch fails after the quote file has already been rewritten.
        let wo_dir = store.workspace().entity_dir(EntityPrefix::Wo);
        fs::remove_dir_all(&wo_dir).unwrap();
        fs::write(&wo_dir, "not a directory").unwrap();

        let mut changed = quote;
        changed.title = "Changed title".to_string();
        let wo = WorkOrder::new("WO-2026-0001", "Test", "test");
        let err = store
            .apply(WriteBatch::new().with_quote(changed).with_work_order(wo))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        // The quote file was restored to its pre-batch contents
        let read = store.quote(&quote_id).unwrap();
        assert_eq!(read.title, "Test");
        assert_eq!(read.entity_revision, 1);
    }

    #[test]
    fn test_batch_touches_quote_and_work_order_files() {
        let (_tmp, mut store) = store();
        let quote = Quote::new("Q-2026-0001", "Test", "test");
        let wo = WorkOrder::new("WO-2026-0001", "Test", "test");
        let quote_id = quote.id.clone();
        let wo_id = wo.id.clone();

        let batch = WriteBatch::new().with_quote(quote).with_work_order(wo);
        store.apply(batch).unwrap();

        assert!(store.quote(&quote_id).is_ok());
        assert!(store.work_order(&wo_id).is_ok());
    }
}
