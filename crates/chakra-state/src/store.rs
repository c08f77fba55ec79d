//! The entity store: single owner of documents, circles, squares and tabs.
//!
//! Every mutation goes through the store. A mutation updates the
//! repositories, publishes the matching event on the bus, runs the store's
//! own reactions to that event, and schedules a debounced save, all before
//! returning. Unknown ids are never errors: creation returns `None`,
//! removal returns `false`.
//!
//! Selection lives in `selection.rs`, connection derivation in
//! `connections.rs` and save/load in `persistence.rs`; they are further
//! `impl EntityStore` blocks over the same state.

use crate::connections::ConnectionGraph;
use crate::debounce::{Clock, Debouncer, SystemClock};
use crate::events::{EventBus, StoreEvent, SubscriptionId};
use crate::repository::Repository;
use crate::selection::Selection;
use crate::storage::{KeyValueStore, MemoryStorage};
use chakra_core::config::StoreConfig;
use chakra_core::id::{EntityId, PanelId};
use chakra_core::model::*;
use chakra_core::snapshot::PanelVisibility;
use std::collections::{BTreeSet, HashMap};

pub struct EntityStore {
    pub(crate) config: StoreConfig,

    pub(crate) documents: Repository<Document>,
    pub(crate) circles: Repository<Circle>,
    pub(crate) squares: Repository<Square>,
    pub(crate) tabs: Repository<Tab>,

    /// Derived square↔square connections, all circles together.
    pub(crate) square_links: ConnectionGraph,
    /// Derived circle↔circle connections, all panels together.
    pub(crate) circle_links: ConnectionGraph,

    pub(crate) selection: Selection,
    pub(crate) panel_visibility: PanelVisibility,
    pub(crate) document_lists: HashMap<PanelId, bool>,

    pub(crate) bus: EventBus,
    pub(crate) storage: Box<dyn KeyValueStore>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) save_timer: Debouncer,

    /// Set while a snapshot is being restored: no saves, no per-entity events.
    pub(crate) bulk_loading: bool,
}

impl EntityStore {
    pub fn new(
        config: StoreConfig,
        storage: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let save_timer = Debouncer::new(config.save_debounce_ms);
        Self {
            config,
            documents: Repository::new(),
            circles: Repository::new(),
            squares: Repository::new(),
            tabs: Repository::new(),
            square_links: ConnectionGraph::new(),
            circle_links: ConnectionGraph::new(),
            selection: Selection::default(),
            panel_visibility: PanelVisibility::new(),
            document_lists: HashMap::new(),
            bus: EventBus::new(),
            storage,
            clock,
            save_timer,
            bulk_loading: false,
        }
    }

    /// A store backed by process memory and the system clock.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(
            config,
            Box::new(MemoryStorage::new()),
            Box::new(SystemClock::default()),
        )
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ─── Event bus ───────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Raise an event on the bus from outside the store.
    ///
    /// Listeners see it like any other event, and the store applies its own
    /// reactions:
    ///
    /// | event               | reaction |
    /// |---------------------|----------|
    /// | `SQUARE_UPDATED`    | recompute the owning circle's connections |
    /// | `CIRCLE_UPDATED`    | recompute the panel's circle connections |
    /// | `CIRCLE_SELECTED`   | ensure a "Me" square, show the circle's squares, recompute, open the detail panel |
    /// | `CIRCLE_DESELECTED` | hide the circle's squares and clear its connections |
    ///
    /// A circle event that changes which circle is active goes through
    /// [`select_circle`](Self::select_circle) or
    /// [`deselect_circle`](Self::deselect_circle), so at most one circle is
    /// ever active and listeners see each transition once.
    pub fn dispatch(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::CircleSelected { circle_id }
                if self.selection.circle != Some(circle_id) && self.circles.contains(circle_id) =>
            {
                self.select_circle(circle_id);
            }
            StoreEvent::CircleDeselected { circle_id }
                if self.selection.circle == Some(circle_id) =>
            {
                self.deselect_circle();
            }
            event => self.emit(event),
        }
    }

    pub(crate) fn emit(&mut self, event: StoreEvent) {
        self.bus.publish(&event);
        self.react(&event);
    }

    fn react(&mut self, event: &StoreEvent) {
        match event {
            StoreEvent::SquareUpdated(square) => {
                self.recompute_connections(square.circle_id);
            }
            StoreEvent::CircleUpdated(circle) => {
                self.recompute_circle_connections(circle.circle_type);
            }
            StoreEvent::CircleSelected { circle_id } => self.show_circle(*circle_id),
            StoreEvent::CircleDeselected { circle_id } => self.hide_circle(*circle_id),
            _ => {}
        }
    }

    // ─── Generic access ──────────────────────────────────────────────────

    pub fn get<T: Stored>(&self, id: EntityId) -> Option<&T> {
        T::repository(self).get(id)
    }

    /// All records of a kind, in insertion order.
    pub fn all<'a, T: Stored + 'a>(&'a self) -> impl DoubleEndedIterator<Item = &'a T> + 'a {
        T::repository(self).iter()
    }

    pub fn count<T: Stored>(&self) -> usize {
        T::repository(self).len()
    }

    /// Merge `changes` into the record with `id`.
    ///
    /// Returns the updated record, or `None` if the id is unknown or the
    /// change set points at a parent that does not exist.
    pub fn update<T: Stored>(&mut self, id: EntityId, changes: T::Changes) -> Option<T> {
        if !T::accepts(self, id, &changes) {
            log::debug!("rejected {} update for {id}", T::KIND.as_str());
            return None;
        }
        let record = T::repository_mut(self).get_mut(id)?;
        let previous = record.clone();
        record.apply(changes);
        let current = record.clone();

        T::reconcile(self, &previous, &current);
        self.emit(T::updated(current));
        self.save();
        T::repository(self).get(id).cloned()
    }

    // ─── Documents ───────────────────────────────────────────────────────

    pub fn create_document(&mut self, draft: DocumentDraft) -> Document {
        let panel = draft.circle_type;
        let name = draft.name.unwrap_or_else(|| {
            let n = self.documents.iter().filter(|d| d.circle_type == panel).count();
            format!("Document {}", n + 1)
        });
        let document = Document {
            id: EntityId::with_prefix("document"),
            name,
            circle_type: panel,
            list_type: draft.list_type,
        };
        log::debug!("create document {} in {panel}", document.id);
        self.documents.insert(document.clone());
        self.emit(StoreEvent::DocumentCreated(document.clone()));
        self.save();
        document
    }

    /// Register a fully-formed document as-is. Re-registering an id replaces it.
    pub fn register_document(&mut self, document: Document) -> bool {
        let replaced = self.documents.insert(document.clone()).is_some();
        self.announce(document, replaced, StoreEvent::DocumentCreated, StoreEvent::DocumentUpdated);
        true
    }

    pub fn remove_document(&mut self, id: EntityId) -> bool {
        if self.purge_document(id).is_none() {
            return false;
        }
        self.save();
        true
    }

    fn purge_document(&mut self, id: EntityId) -> Option<Document> {
        let panel = self.documents.get(id)?.circle_type;
        let was_selected = self.selection.documents.get(&panel) == Some(&id);
        if was_selected {
            self.deselect_document(panel);
        }

        for circle_id in self.circles.ids_where(|c| c.document_id == id) {
            self.purge_circle(circle_id);
        }
        let removed = self.documents.remove(id)?;
        log::debug!("removed document {id}");
        self.emit(StoreEvent::DocumentDeleted(removed.clone()));

        let next = self.documents_for_panel(panel).first().map(|d| d.id);
        if was_selected && let Some(next) = next {
            self.select_document(panel, next);
        }
        Some(removed)
    }

    // ─── Circles ─────────────────────────────────────────────────────────

    /// Create a circle.
    ///
    /// Without an explicit `document_id` the circle goes to the panel's
    /// selected document, else its most recent document, else a new
    /// document that is created and selected on the spot. An explicit but
    /// unknown `document_id` fails the create.
    pub fn create_circle(&mut self, draft: CircleDraft) -> Option<Circle> {
        let document_id = match draft.document_id {
            Some(id) if self.documents.contains(id) => id,
            Some(id) => {
                log::warn!("create circle: unknown document {id}");
                return None;
            }
            None => self.resolve_document(draft.circle_type),
        };
        let panel = self.documents.get(document_id)?.circle_type;

        let name = draft.name.unwrap_or_else(|| {
            let n = self.circles.iter().filter(|c| c.document_id == document_id).count();
            format!("Circle {}", n + 1)
        });
        let circle = Circle {
            id: EntityId::with_prefix("circle"),
            x: draft.x,
            y: draft.y,
            color: draft.color.unwrap_or_else(|| DEFAULT_CIRCLE_COLOR.to_string()),
            colors: draft.colors,
            name,
            document_id,
            circle_type: panel,
            indicator: draft.indicator,
            disabled: draft.disabled,
            characteristics: draft.characteristics,
            square_count: 0,
            visible: self.selection.documents.get(&panel) == Some(&document_id),
            closest_square_name: None,
        };
        log::debug!("create circle {} in document {document_id}", circle.id);
        self.circles.insert(circle.clone());
        self.emit(StoreEvent::CircleCreated(circle.clone()));
        self.recompute_circle_connections(panel);
        self.save();
        self.circles.get(circle.id).cloned()
    }

    /// Register a fully-formed circle as-is. Fails if its document is unknown.
    pub fn register_circle(&mut self, mut circle: Circle) -> bool {
        let Some(document) = self.documents.get(circle.document_id) else {
            log::warn!(
                "register circle {}: unknown document {}",
                circle.id,
                circle.document_id
            );
            return false;
        };
        circle.circle_type = document.circle_type;
        circle.visible =
            self.selection.documents.get(&circle.circle_type) == Some(&circle.document_id);
        let replaced = self.circles.insert(circle.clone()).is_some();
        let id = circle.id;
        self.announce(circle, replaced, StoreEvent::CircleCreated, StoreEvent::CircleUpdated);
        self.refresh_square_count(id);
        true
    }

    pub fn remove_circle(&mut self, id: EntityId) -> bool {
        if self.purge_circle(id).is_none() {
            return false;
        }
        self.save();
        true
    }

    fn purge_circle(&mut self, id: EntityId) -> Option<Circle> {
        let panel = self.circles.get(id)?.circle_type;
        if self.selection.circle == Some(id) {
            self.deselect_circle();
        }

        for tab_id in self.tabs.ids_where(|t| t.circle_id == id) {
            self.purge_tab(tab_id, false);
        }
        for square_id in self.squares.ids_where(|s| s.circle_id == id) {
            self.purge_square(square_id, false);
        }
        self.circle_links.remove_node(id);
        let removed = self.circles.remove(id)?;
        log::debug!("removed circle {id}");
        self.emit(StoreEvent::CircleDeleted(removed.clone()));
        self.recompute_circle_connections(panel);
        Some(removed)
    }

    /// The document a new circle in `panel` should join, creating one if
    /// the panel has none.
    fn resolve_document(&mut self, panel: PanelId) -> EntityId {
        if let Some(&selected) = self.selection.documents.get(&panel) {
            return selected;
        }
        if let Some(latest) = self.documents_for_panel(panel).first() {
            return latest.id;
        }
        let created = self.create_document(DocumentDraft::new(panel));
        self.select_document(panel, created.id);
        created.id
    }

    // ─── Squares ─────────────────────────────────────────────────────────

    /// Create a square under `draft.circle_id`.
    ///
    /// Without a `tab_id` the square joins the selected tab when its circle
    /// is the selected circle. Asking for a second "Me" square returns the
    /// existing one.
    pub fn create_square(&mut self, draft: SquareDraft) -> Option<Square> {
        let circle_id = draft.circle_id;
        if !self.circles.contains(circle_id) {
            log::warn!("create square: unknown circle {circle_id}");
            return None;
        }
        if draft.is_me
            && let Some(existing) = self.me_square(circle_id)
        {
            return Some(existing.clone());
        }

        let tab_id = match draft.tab_id {
            Some(tab_id) if self.tab_belongs_to(tab_id, circle_id) => Some(tab_id),
            Some(tab_id) => {
                log::warn!("create square: tab {tab_id} is not a tab of circle {circle_id}");
                return None;
            }
            None if draft.is_me => None,
            None => self
                .selection
                .tab
                .filter(|_| self.selection.circle == Some(circle_id))
                .filter(|&tab| self.tab_belongs_to(tab, circle_id)),
        };

        let name = draft.name.unwrap_or_else(|| {
            if draft.is_me {
                ME_SQUARE_NAME.to_string()
            } else {
                "Square".to_string()
            }
        });
        let shown = self.selection.circle == Some(circle_id);
        let square = Square {
            id: EntityId::with_prefix("square"),
            x: draft.x,
            y: draft.y,
            color: draft.color.unwrap_or_else(|| DEFAULT_SQUARE_COLOR.to_string()),
            name,
            circle_id,
            tab_id,
            is_me: draft.is_me,
            visible: self.square_passes_filter(circle_id, draft.is_me, tab_id, shown),
            attribute: draft.attribute,
        };
        log::debug!("create square {} in circle {circle_id}", square.id);
        self.squares.insert(square.clone());
        self.refresh_square_count(circle_id);
        self.emit(StoreEvent::SquareCreated(square.clone()));
        self.recompute_connections(circle_id);
        self.save();
        self.squares.get(square.id).cloned()
    }

    /// Register a fully-formed square as-is. Fails if its circle is unknown.
    pub fn register_square(&mut self, square: Square) -> bool {
        if !self.circles.contains(square.circle_id) {
            log::warn!(
                "register square {}: unknown circle {}",
                square.id,
                square.circle_id
            );
            return false;
        }
        let circle_id = square.circle_id;
        let replaced = self.squares.insert(square.clone()).is_some();
        self.announce(square, replaced, StoreEvent::SquareCreated, StoreEvent::SquareUpdated);
        self.refresh_square_count(circle_id);
        true
    }

    pub fn remove_square(&mut self, id: EntityId) -> bool {
        if self.purge_square(id, true).is_none() {
            return false;
        }
        self.save();
        true
    }

    pub(crate) fn purge_square(&mut self, id: EntityId, recompute: bool) -> Option<Square> {
        if !self.squares.contains(id) {
            return None;
        }
        if self.selection.square == Some(id) {
            self.deselect_square();
        }
        self.square_links.remove_node(id);
        let removed = self.squares.remove(id)?;
        self.refresh_square_count(removed.circle_id);
        self.emit(StoreEvent::SquareDeleted(removed.clone()));
        if recompute {
            self.recompute_connections(removed.circle_id);
        }
        Some(removed)
    }

    // ─── Tabs ────────────────────────────────────────────────────────────

    pub fn create_tab(&mut self, draft: TabDraft) -> Option<Tab> {
        let circle_id = draft.circle_id;
        if !self.circles.contains(circle_id) {
            log::warn!("create tab: unknown circle {circle_id}");
            return None;
        }
        let existing: Vec<u32> = self
            .tabs
            .iter()
            .filter(|t| t.circle_id == circle_id)
            .map(|t| t.index)
            .collect();
        let next_index = existing.iter().max().map_or(0, |max| max + 1);
        let count = existing.len();
        let tab = Tab {
            id: EntityId::with_prefix("tab"),
            name: draft.name.unwrap_or_else(|| format!("Tab {}", count + 1)),
            index: draft.index.unwrap_or(next_index),
            circle_id,
            color: draft.color.unwrap_or_else(|| DEFAULT_TAB_COLOR.to_string()),
        };
        log::debug!("create tab {} in circle {circle_id}", tab.id);
        self.tabs.insert(tab.clone());
        self.emit(StoreEvent::TabCreated(tab.clone()));
        self.save();
        Some(tab)
    }

    /// Register a fully-formed tab as-is. Fails if its circle is unknown.
    pub fn register_tab(&mut self, tab: Tab) -> bool {
        if !self.circles.contains(tab.circle_id) {
            log::warn!("register tab {}: unknown circle {}", tab.id, tab.circle_id);
            return false;
        }
        let replaced = self.tabs.insert(tab.clone()).is_some();
        self.announce(tab, replaced, StoreEvent::TabCreated, StoreEvent::TabUpdated);
        true
    }

    pub fn remove_tab(&mut self, id: EntityId) -> bool {
        if self.purge_tab(id, true).is_none() {
            return false;
        }
        self.save();
        true
    }

    fn purge_tab(&mut self, id: EntityId, recompute: bool) -> Option<Tab> {
        let circle_id = self.tabs.get(id)?.circle_id;
        if self.selection.tab == Some(id) {
            self.deselect_tab();
        }
        for square_id in self.squares.ids_where(|s| s.tab_id == Some(id)) {
            self.purge_square(square_id, false);
        }
        let removed = self.tabs.remove(id)?;
        log::debug!("removed tab {id}");
        self.emit(StoreEvent::TabDeleted(removed.clone()));
        if recompute {
            self.recompute_connections(circle_id);
        }
        Some(removed)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Documents of a panel, most recently created first.
    pub fn documents_for_panel(&self, panel: PanelId) -> Vec<&Document> {
        self.documents
            .iter()
            .rev()
            .filter(|d| d.circle_type == panel)
            .collect()
    }

    pub fn circles_for_document(&self, document_id: EntityId) -> Vec<&Circle> {
        self.circles
            .iter()
            .filter(|c| c.document_id == document_id)
            .collect()
    }

    pub fn circles_for_panel(&self, panel: PanelId) -> Vec<&Circle> {
        self.circles
            .iter()
            .filter(|c| c.circle_type == panel)
            .collect()
    }

    pub fn squares_for_circle(&self, circle_id: EntityId) -> Vec<&Square> {
        self.squares
            .iter()
            .filter(|s| s.circle_id == circle_id)
            .collect()
    }

    /// Tabs of a circle ordered by `index`.
    pub fn tabs_for_circle(&self, circle_id: EntityId) -> Vec<&Tab> {
        let mut tabs: Vec<&Tab> = self
            .tabs
            .iter()
            .filter(|t| t.circle_id == circle_id)
            .collect();
        tabs.sort_by_key(|t| t.index);
        tabs
    }

    pub fn me_square(&self, circle_id: EntityId) -> Option<&Square> {
        self.squares
            .iter()
            .find(|s| s.circle_id == circle_id && s.is_me)
    }

    /// Every panel that has documents or is configured, in name order.
    pub fn panels(&self) -> Vec<PanelId> {
        let panels: BTreeSet<PanelId> = self
            .documents
            .iter()
            .map(|d| d.circle_type)
            .chain(self.config.panels.iter().copied())
            .collect();
        panels.into_iter().collect()
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn announce<T>(
        &mut self,
        record: T,
        replaced: bool,
        created: fn(T) -> StoreEvent,
        updated: fn(T) -> StoreEvent,
    ) {
        if self.bulk_loading {
            return;
        }
        let event = if replaced {
            updated(record)
        } else {
            created(record)
        };
        self.emit(event);
        self.save();
    }

    pub(crate) fn tab_belongs_to(&self, tab_id: EntityId, circle_id: EntityId) -> bool {
        self.tabs
            .get(tab_id)
            .is_some_and(|t| t.circle_id == circle_id)
    }

    pub(crate) fn refresh_square_count(&mut self, circle_id: EntityId) {
        let count = self
            .squares
            .iter()
            .filter(|s| s.circle_id == circle_id && !s.is_me)
            .count();
        if let Some(circle) = self.circles.get_mut(circle_id) {
            circle.square_count = count;
        }
    }
}

// ─── Per-kind hooks ──────────────────────────────────────────────────────

/// Store-side contract of an entity kind: where its records live and how
/// the store follows up on an update.
pub trait Stored: Entity + Sized {
    fn repository(store: &EntityStore) -> &Repository<Self>;
    fn repository_mut(store: &mut EntityStore) -> &mut Repository<Self>;
    fn updated(record: Self) -> StoreEvent;

    /// Whether `changes` can be applied to `id` (parents it names must exist).
    fn accepts(_store: &EntityStore, _id: EntityId, _changes: &Self::Changes) -> bool {
        true
    }

    /// Fix derived state after `previous` became `current`, before the
    /// update event is published.
    fn reconcile(_store: &mut EntityStore, _previous: &Self, _current: &Self) {}
}

impl Stored for Document {
    fn repository(store: &EntityStore) -> &Repository<Self> {
        &store.documents
    }

    fn repository_mut(store: &mut EntityStore) -> &mut Repository<Self> {
        &mut store.documents
    }

    fn updated(record: Self) -> StoreEvent {
        StoreEvent::DocumentUpdated(record)
    }
}

impl Stored for Circle {
    fn repository(store: &EntityStore) -> &Repository<Self> {
        &store.circles
    }

    fn repository_mut(store: &mut EntityStore) -> &mut Repository<Self> {
        &mut store.circles
    }

    fn updated(record: Self) -> StoreEvent {
        StoreEvent::CircleUpdated(record)
    }

    // A circle may only move to a document of its own panel.
    fn accepts(store: &EntityStore, id: EntityId, changes: &CircleChanges) -> bool {
        let Some(document_id) = changes.document_id else {
            return true;
        };
        match (store.circles.get(id), store.documents.get(document_id)) {
            (Some(circle), Some(document)) => document.circle_type == circle.circle_type,
            _ => false,
        }
    }

    fn reconcile(store: &mut EntityStore, previous: &Self, current: &Self) {
        if previous.document_id != current.document_id {
            let selected = store.selection.documents.get(&current.circle_type).copied();
            let visible = selected == Some(current.document_id);
            if let Some(circle) = store.circles.get_mut(current.id) {
                circle.visible = visible;
            }
            if !visible && store.selection.circle == Some(current.id) {
                store.deselect_circle();
            }
        }
    }
}

impl Stored for Square {
    fn repository(store: &EntityStore) -> &Repository<Self> {
        &store.squares
    }

    fn repository_mut(store: &mut EntityStore) -> &mut Repository<Self> {
        &mut store.squares
    }

    fn updated(record: Self) -> StoreEvent {
        StoreEvent::SquareUpdated(record)
    }

    fn accepts(store: &EntityStore, id: EntityId, changes: &SquareChanges) -> bool {
        let Some(square) = store.squares.get(id) else {
            return false;
        };
        let circle_id = changes.circle_id.unwrap_or(square.circle_id);
        if !store.circles.contains(circle_id) {
            return false;
        }
        // A moved "Me" square must not collide with the target's own.
        if square.is_me
            && circle_id != square.circle_id
            && store.me_square(circle_id).is_some()
        {
            return false;
        }
        let tab_id = changes.tab_id.unwrap_or(square.tab_id);
        tab_id.is_none_or(|tab| store.tab_belongs_to(tab, circle_id))
    }

    fn reconcile(store: &mut EntityStore, previous: &Self, current: &Self) {
        if previous.circle_id == current.circle_id && previous.tab_id == current.tab_id {
            return;
        }
        let shown = store.selection.circle == Some(current.circle_id);
        let visible =
            store.square_passes_filter(current.circle_id, current.is_me, current.tab_id, shown);
        if let Some(square) = store.squares.get_mut(current.id) {
            square.visible = visible;
        }
        if previous.circle_id != current.circle_id {
            if store.selection.square == Some(current.id) {
                store.deselect_square();
            }
            store.square_links.remove_node(current.id);
            store.refresh_square_count(previous.circle_id);
            store.refresh_square_count(current.circle_id);
            store.recompute_connections(previous.circle_id);
        }
    }
}

impl Stored for Tab {
    fn repository(store: &EntityStore) -> &Repository<Self> {
        &store.tabs
    }

    fn repository_mut(store: &mut EntityStore) -> &mut Repository<Self> {
        &mut store.tabs
    }

    fn updated(record: Self) -> StoreEvent {
        StoreEvent::TabUpdated(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore {
        EntityStore::in_memory(StoreConfig::default())
    }

    fn left() -> PanelId {
        PanelId::intern("left")
    }

    #[test]
    fn circle_without_document_creates_and_selects_one() {
        let mut store = store();
        let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();

        let docs = store.documents_for_panel(left());
        assert_eq!(docs.len(), 1);
        assert_eq!(circle.document_id, docs[0].id);
        assert_eq!(store.selected_document(left()), Some(docs[0].id));
        assert!(circle.visible);
    }

    #[test]
    fn circle_with_unknown_document_fails() {
        let mut store = store();
        let draft = CircleDraft::new(left(), 0.0, 0.0).in_document(EntityId::intern("doc_nope"));
        assert!(store.create_circle(draft).is_none());
        assert_eq!(store.count::<Circle>(), 0);
        assert_eq!(store.count::<Document>(), 0);
    }

    #[test]
    fn circle_goes_to_most_recent_document_when_none_selected() {
        let mut store = store();
        let older = store.create_document(DocumentDraft::new(left()).named("Older"));
        let newer = store.create_document(DocumentDraft::new(left()).named("Newer"));
        assert!(store.selected_document(left()).is_none());

        let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
        assert_eq!(circle.document_id, newer.id);
        assert_ne!(circle.document_id, older.id);
        assert!(!circle.visible, "nothing selected in the panel yet");
    }

    #[test]
    fn square_count_ignores_me() {
        let mut store = store();
        let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
        store.select_circle(circle.id);
        store.create_square(SquareDraft::new(circle.id, 1.0, 1.0));
        store.create_square(SquareDraft::new(circle.id, 2.0, 2.0));

        assert!(store.me_square(circle.id).is_some());
        assert_eq!(store.get::<Circle>(circle.id).unwrap().square_count, 2);
    }

    #[test]
    fn second_me_square_returns_existing() {
        let mut store = store();
        let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
        let mut draft = SquareDraft::new(circle.id, 0.0, 0.0);
        draft.is_me = true;
        let first = store.create_square(draft.clone()).unwrap();
        let second = store.create_square(draft).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.squares_for_circle(circle.id).len(), 1);
    }

    #[test]
    fn update_unknown_id_is_none() {
        let mut store = store();
        let result =
            store.update::<Square>(EntityId::intern("square_nope"), SquareChanges::moved_to(1.0, 1.0));
        assert!(result.is_none());
    }

    #[test]
    fn update_rejects_unknown_parent() {
        let mut store = store();
        let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
        let square = store.create_square(SquareDraft::new(circle.id, 0.0, 0.0)).unwrap();
        let changes = SquareChanges {
            circle_id: Some(EntityId::intern("circle_nope")),
            ..SquareChanges::default()
        };
        assert!(store.update::<Square>(square.id, changes).is_none());
        assert_eq!(store.get::<Square>(square.id).unwrap().circle_id, circle.id);
    }

    #[test]
    fn tabs_append_and_sort_by_index() {
        let mut store = store();
        let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
        let first = store.create_tab(TabDraft::new(circle.id)).unwrap();
        let mut front = TabDraft::new(circle.id).named("Front");
        front.index = Some(0);
        let second = store.create_tab(TabDraft::new(circle.id)).unwrap();
        store.create_tab(front);

        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        let names: Vec<&str> = store
            .tabs_for_circle(circle.id)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Tab 1", "Front", "Tab 2"]);
    }

    #[test]
    fn remove_unknown_ids_is_false() {
        let mut store = store();
        let ghost = EntityId::intern("ghost_id");
        assert!(!store.remove_document(ghost));
        assert!(!store.remove_circle(ghost));
        assert!(!store.remove_square(ghost));
        assert!(!store.remove_tab(ghost));
    }

    #[test]
    fn register_is_idempotent() {
        let mut store = store();
        let doc = store.create_document(DocumentDraft::new(left()));
        assert!(store.register_document(doc.clone()));
        assert!(store.register_document(doc));
        assert_eq!(store.count::<Document>(), 1);
    }
}
