//! Debounced save and bulk load.
//!
//! The whole store is one JSON blob under `StoreConfig::storage_key`. Two
//! small settings live under their own keys and are written immediately:
//! the last viewed document per panel and the panel visibility flags.

use crate::events::StoreEvent;
use crate::selection::Selection;
use crate::storage::StorageError;
use crate::store::EntityStore;
use chakra_core::id::{EntityId, PanelId};
use chakra_core::model::DocumentDraft;
use chakra_core::snapshot::{LastViewed, PanelVisibility, Snapshot};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EntityStore {
    /// Schedule a write after the quiet window, replacing any pending one.
    pub fn save(&mut self) {
        if self.bulk_loading {
            return;
        }
        let now = self.clock.now_ms();
        self.save_timer.schedule(now);
    }

    /// Drive the debounce timer. Writes and returns `true` once the window
    /// has elapsed since the last `save`.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.save_timer.fire(now) {
            return false;
        }
        self.write_snapshot()
    }

    /// Cancel any pending write and write now.
    pub fn save_now(&mut self) -> bool {
        self.save_timer.cancel();
        self.write_snapshot()
    }

    pub fn has_pending_save(&self) -> bool {
        self.save_timer.is_pending()
    }

    /// Milliseconds until the pending write is due.
    pub fn save_due_in(&self) -> Option<u64> {
        self.save_timer.remaining(self.clock.now_ms())
    }

    fn write_snapshot(&mut self) -> bool {
        match self.try_write_snapshot() {
            Ok(bytes) => {
                log::debug!("saved {bytes} bytes to {}", self.config.storage_key);
                self.emit(StoreEvent::StateSaved { bytes });
                true
            }
            Err(err) => {
                log::error!("failed to save state: {err}");
                false
            }
        }
    }

    fn try_write_snapshot(&mut self) -> Result<usize, PersistError> {
        let json = self.snapshot().to_json()?;
        self.storage.set(&self.config.storage_key, &json)?;
        Ok(json.len())
    }

    /// The persisted form of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            documents: self.documents.iter().cloned().collect(),
            circles: self.circles.iter().cloned().collect(),
            squares: self.squares.iter().cloned().collect(),
            tabs: self.tabs.iter().cloned().collect(),
            selected_document_ids: self.selection.documents.clone(),
        }
    }

    /// Replace the in-memory state with what storage holds.
    ///
    /// A missing or unreadable snapshot loads as empty state. Returns
    /// whether a saved snapshot was found.
    pub fn load(&mut self) -> bool {
        let key = self.config.panel_visibility_key.clone();
        if let Some(flags) = self.read_setting::<PanelVisibility>(&key) {
            self.panel_visibility = flags;
        }
        let key = self.config.storage_key.clone();
        let saved = self.read_setting::<Snapshot>(&key);
        let found = saved.is_some();
        self.load_snapshot(saved.unwrap_or_default());
        found
    }

    /// Replace the in-memory state with `snapshot`.
    ///
    /// Records are registered parents first; a record whose parent is
    /// missing is skipped. Each panel gets its selected document back from
    /// the snapshot, else from the last viewed key, else its first
    /// document. Configured panels left without any document get a fresh
    /// default one, which is written out immediately.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.clear();
        self.bulk_loading = true;

        let Snapshot {
            documents,
            circles,
            squares,
            tabs,
            selected_document_ids,
        } = snapshot;
        for document in documents {
            self.register_document(document);
        }
        for circle in circles {
            self.register_circle(circle);
        }
        for square in squares {
            if square.is_me && self.me_square(square.circle_id).is_some_and(|me| me.id != square.id) {
                log::warn!("skipping extra Me square {} of circle {}", square.id, square.circle_id);
                continue;
            }
            self.register_square(square);
        }
        for tab in tabs {
            self.register_tab(tab);
        }

        // Nothing is selected after a load, so no square is on screen.
        let orphaned = self
            .squares
            .ids_where(|s| s.tab_id.is_some_and(|tab| !self.tabs.contains(tab)));
        for id in self.squares.ids().to_vec() {
            if let Some(square) = self.squares.get_mut(id) {
                square.visible = false;
                if orphaned.contains(&id) {
                    square.tab_id = None;
                }
            }
        }
        for id in self.circles.ids().to_vec() {
            if let Some(circle) = self.circles.get_mut(id) {
                circle.closest_square_name = None;
            }
        }

        let last_viewed_key = self.config.last_viewed_key.clone();
        let last_viewed: LastViewed = self.read_setting(&last_viewed_key).unwrap_or_default();
        let mut created_defaults = false;
        let panels = self.panels();
        for &panel in &panels {
            let restored = [selected_document_ids.get(&panel), last_viewed.get(&panel)]
                .into_iter()
                .flatten()
                .copied()
                .find(|&id| self.document_in_panel(id, panel))
                .or_else(|| {
                    self.documents
                        .iter()
                        .find(|d| d.circle_type == panel)
                        .map(|d| d.id)
                });
            let document_id = match restored {
                Some(id) => id,
                None if self.config.panels.contains(&panel) => {
                    created_defaults = true;
                    self.create_document(DocumentDraft::new(panel)).id
                }
                None => continue,
            };
            self.selection.documents.insert(panel, document_id);
            self.filter_circles_by_document(panel);
        }

        self.bulk_loading = false;
        for &panel in &panels {
            self.recompute_circle_connections(panel);
        }
        log::info!(
            "loaded {} documents, {} circles, {} squares, {} tabs",
            self.documents.len(),
            self.circles.len(),
            self.squares.len(),
            self.tabs.len()
        );
        self.emit(StoreEvent::StateLoaded {
            documents: self.documents.len(),
            circles: self.circles.len(),
            squares: self.squares.len(),
            tabs: self.tabs.len(),
        });
        if created_defaults {
            self.save_now();
        }
    }

    /// Drop every record, connection and selection. Panel visibility flags
    /// are kept.
    pub(crate) fn clear(&mut self) {
        self.documents.clear();
        self.circles.clear();
        self.squares.clear();
        self.tabs.clear();
        self.square_links.clear();
        self.circle_links.clear();
        self.selection = Selection::default();
        self.document_lists.clear();
        self.save_timer.cancel();
    }

    fn document_in_panel(&self, id: EntityId, panel: PanelId) -> bool {
        self.documents
            .get(id)
            .is_some_and(|d| d.circle_type == panel)
    }

    pub(crate) fn remember_last_viewed(&mut self, panel: PanelId, id: EntityId) {
        if self.bulk_loading {
            return;
        }
        let key = self.config.last_viewed_key.clone();
        let mut last_viewed: LastViewed = self.read_setting(&key).unwrap_or_default();
        last_viewed.insert(panel, id);
        self.write_setting(&key, &last_viewed);
    }

    /// The last viewed document of `panel`, as stored.
    pub fn last_viewed_document(&self, panel: PanelId) -> Option<EntityId> {
        self.read_setting::<LastViewed>(&self.config.last_viewed_key)?
            .get(&panel)
            .copied()
    }

    pub(crate) fn write_setting<T: Serialize>(&mut self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(PersistError::from)
            .and_then(|json| self.storage.set(key, &json).map_err(PersistError::from));
        if let Err(err) = result {
            log::error!("failed to write {key}: {err}");
        }
    }

    /// Read and parse a JSON value. Unreadable or malformed values are
    /// logged and read as absent.
    pub(crate) fn read_setting<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key) {
            Ok(raw) => raw?,
            Err(err) => {
                log::warn!("failed to read {key}: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("ignoring corrupt value under {key}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::ManualClock;
    use crate::storage::MemoryStorage;
    use chakra_core::config::StoreConfig;
    use chakra_core::model::{CircleDraft, Document};

    fn store() -> (EntityStore, MemoryStorage, ManualClock) {
        let storage = MemoryStorage::new();
        let clock = ManualClock::new();
        let store = EntityStore::new(
            StoreConfig::default(),
            Box::new(storage.clone()),
            Box::new(clock.clone()),
        );
        (store, storage, clock)
    }

    #[test]
    fn tick_waits_for_quiet_window() {
        let (mut store, storage, clock) = store();
        store.create_document(DocumentDraft::new(PanelId::intern("left")));
        assert!(store.has_pending_save());
        clock.advance(299);
        assert!(!store.tick());
        clock.advance(1);
        assert!(store.tick());
        assert_eq!(storage.write_count(), 1);
        assert!(!store.has_pending_save());
    }

    #[test]
    fn bulk_load_does_not_schedule_saves() {
        let (mut store, storage, _clock) = store();
        let panel = PanelId::intern("left");
        let mut snapshot = Snapshot::default();
        snapshot.documents.push(Document {
            id: EntityId::intern("document_persist_a"),
            name: "A".into(),
            circle_type: panel,
            list_type: None,
        });
        store.load_snapshot(snapshot);
        assert!(!store.has_pending_save());
        assert_eq!(storage.write_count(), 0);
        assert_eq!(
            store.selected_document(panel),
            Some(EntityId::intern("document_persist_a"))
        );
    }

    #[test]
    fn orphaned_circle_is_skipped_on_load() {
        let (mut store, _storage, _clock) = store();
        let panel = PanelId::intern("left");
        let mut source = EntityStore::in_memory(StoreConfig::default());
        let circle = source.create_circle(CircleDraft::new(panel, 0.0, 0.0)).unwrap();

        let mut snapshot = Snapshot::default();
        snapshot.circles.push(circle);
        store.load_snapshot(snapshot);

        assert_eq!(store.circles.len(), 0);
        // The configured panel still gets its default document.
        assert_eq!(store.documents_for_panel(panel).len(), 1);
    }
}
