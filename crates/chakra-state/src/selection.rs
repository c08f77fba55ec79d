//! Selection state and the visibility transitions it drives.
//!
//! Documents are selected per panel; circles, squares and tabs have one
//! global selection each. Selecting in a scope always deselects the previous
//! entity of that scope first.

use crate::events::StoreEvent;
use crate::store::EntityStore;
use chakra_core::id::{EntityId, PanelId};
use chakra_core::model::{Circle, Document, Square, SquareDraft, Tab};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub documents: BTreeMap<PanelId, EntityId>,
    pub circle: Option<EntityId>,
    pub square: Option<EntityId>,
    pub tab: Option<EntityId>,
}

impl EntityStore {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_document(&self, panel: PanelId) -> Option<EntityId> {
        self.selection.documents.get(&panel).copied()
    }

    pub fn selected_circle(&self) -> Option<EntityId> {
        self.selection.circle
    }

    pub fn selected_square(&self) -> Option<EntityId> {
        self.selection.square
    }

    pub fn selected_tab(&self) -> Option<EntityId> {
        self.selection.tab
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// Make `id` the selected document of `panel`.
    ///
    /// Only circles of the selected document stay visible in the panel.
    /// The choice is remembered as the panel's last viewed document.
    pub fn select_document(&mut self, panel: PanelId, id: EntityId) -> Option<Document> {
        let document = self.documents.get(id)?.clone();
        if document.circle_type != panel {
            log::warn!("document {id} belongs to {}, not {panel}", document.circle_type);
            return None;
        }
        if let Some(previous) = self.selected_document(panel)
            && previous != id
        {
            self.deselect_document(panel);
        }

        self.selection.documents.insert(panel, id);
        self.filter_circles_by_document(panel);
        self.emit(StoreEvent::DocumentSelected {
            panel,
            document_id: id,
        });
        self.remember_last_viewed(panel, id);
        self.recompute_circle_connections(panel);
        self.save();
        Some(document)
    }

    pub fn deselect_document(&mut self, panel: PanelId) -> bool {
        let Some(id) = self.selection.documents.remove(&panel) else {
            return false;
        };
        self.filter_circles_by_document(panel);
        self.emit(StoreEvent::DocumentDeselected {
            panel,
            document_id: id,
        });
        self.recompute_circle_connections(panel);
        self.save();
        true
    }

    /// Show the circles of the panel's selected document and hide the rest
    /// of that panel. Circles of other panels are left alone.
    pub(crate) fn filter_circles_by_document(&mut self, panel: PanelId) {
        let selected = self.selected_document(panel);
        for id in self.circles.ids_where(|c| c.circle_type == panel) {
            if let Some(circle) = self.circles.get_mut(id) {
                circle.visible = Some(circle.document_id) == selected;
            }
        }
        if let Some(circle_id) = self.selection.circle
            && self
                .circles
                .get(circle_id)
                .is_some_and(|c| c.circle_type == panel && !c.visible)
        {
            self.deselect_circle();
        }
    }

    /// Flip the document list of `panel` open or closed.
    pub fn toggle_document_list(&mut self, panel: PanelId) -> bool {
        let open = !self.document_lists.get(&panel).copied().unwrap_or(false);
        self.document_lists.insert(panel, open);
        self.emit(StoreEvent::DocumentListToggled { panel, open });
        open
    }

    pub fn document_list_open(&self, panel: PanelId) -> bool {
        self.document_lists.get(&panel).copied().unwrap_or(false)
    }

    // ─── Circles ─────────────────────────────────────────────────────────

    /// Make `id` the active circle. Its squares, "Me" square and connections
    /// are brought up by the store's reaction to `CIRCLE_SELECTED`.
    pub fn select_circle(&mut self, id: EntityId) -> Option<Circle> {
        if !self.circles.contains(id) {
            return None;
        }
        if self.selection.circle != Some(id) {
            self.deselect_circle();
            self.selection.circle = Some(id);
            self.emit(StoreEvent::CircleSelected { circle_id: id });
        }
        self.circles.get(id).cloned()
    }

    /// Clear the active circle, dropping the square and tab selections that
    /// belong to it. Its squares are hidden by the store's reaction to
    /// `CIRCLE_DESELECTED`.
    pub fn deselect_circle(&mut self) -> bool {
        let Some(id) = self.selection.circle.take() else {
            return false;
        };
        if let Some(square_id) = self.selection.square
            && self.squares.get(square_id).is_some_and(|s| s.circle_id == id)
        {
            self.deselect_square();
        }
        if let Some(tab_id) = self.selection.tab
            && self.tab_belongs_to(tab_id, id)
        {
            self.selection.tab = None;
            self.emit(StoreEvent::TabDeselected { tab_id });
        }
        self.emit(StoreEvent::CircleDeselected { circle_id: id });
        true
    }

    /// Reaction to `CIRCLE_SELECTED`.
    pub(crate) fn show_circle(&mut self, circle_id: EntityId) {
        if !self.circles.contains(circle_id) {
            return;
        }
        if self.me_square(circle_id).is_none() {
            let mut draft =
                SquareDraft::new(circle_id, self.config.me_square_x, self.config.me_square_y);
            draft.is_me = true;
            self.create_square(draft);
        }
        self.apply_square_visibility(circle_id, true);
        self.recompute_connections(circle_id);
        let panel = self.config.detail_panel;
        self.set_panel_visibility(panel, true);
    }

    /// Reaction to `CIRCLE_DESELECTED`.
    pub(crate) fn hide_circle(&mut self, circle_id: EntityId) {
        if !self.circles.contains(circle_id) {
            return;
        }
        self.apply_square_visibility(circle_id, false);
        self.clear_connections(circle_id);
    }

    // ─── Squares ─────────────────────────────────────────────────────────

    /// Make `id` the selected square. Any multi-selection held outside the
    /// store is told to clear.
    pub fn select_square(&mut self, id: EntityId) -> Option<Square> {
        if !self.squares.contains(id) {
            return None;
        }
        if let Some(previous) = self.selection.square
            && previous != id
        {
            self.deselect_square();
        }
        self.selection.square = Some(id);
        self.emit(StoreEvent::MultiSelectionCleared);
        self.emit(StoreEvent::SquareSelected { square_id: id });
        self.squares.get(id).cloned()
    }

    pub fn deselect_square(&mut self) -> bool {
        let Some(id) = self.selection.square.take() else {
            return false;
        };
        self.emit(StoreEvent::SquareDeselected { square_id: id });
        true
    }

    // ─── Tabs ────────────────────────────────────────────────────────────

    /// Make `id` the selected tab and narrow its circle's squares to that
    /// tab. The owning circle is selected first if it is not already.
    pub fn select_tab(&mut self, id: EntityId) -> Option<Tab> {
        let tab = self.tabs.get(id)?.clone();
        if self.selection.circle != Some(tab.circle_id) {
            self.select_circle(tab.circle_id);
        }
        if let Some(previous) = self.selection.tab
            && previous != id
        {
            self.selection.tab = None;
            self.emit(StoreEvent::TabDeselected { tab_id: previous });
        }

        self.selection.tab = Some(id);
        self.apply_square_visibility(tab.circle_id, true);
        self.recompute_connections(tab.circle_id);
        self.emit(StoreEvent::TabSelected {
            tab_id: id,
            circle_id: tab.circle_id,
        });
        Some(tab)
    }

    /// Clear the selected tab, showing all squares of its circle again.
    pub fn deselect_tab(&mut self) -> bool {
        let Some(id) = self.selection.tab.take() else {
            return false;
        };
        if let Some(circle_id) = self.tabs.get(id).map(|t| t.circle_id)
            && self.selection.circle == Some(circle_id)
        {
            self.apply_square_visibility(circle_id, true);
            self.recompute_connections(circle_id);
        }
        self.emit(StoreEvent::TabDeselected { tab_id: id });
        true
    }

    // ─── Visibility ──────────────────────────────────────────────────────

    /// Whether a square of `circle_id` is shown. Nothing is shown for a
    /// circle that is not up; otherwise the "Me" square always is and the
    /// rest pass through the selected tab of that circle, if any.
    pub(crate) fn square_passes_filter(
        &self,
        circle_id: EntityId,
        is_me: bool,
        tab_id: Option<EntityId>,
        shown: bool,
    ) -> bool {
        if !shown {
            return false;
        }
        if is_me {
            return true;
        }
        match self
            .selection
            .tab
            .filter(|&tab| self.tab_belongs_to(tab, circle_id))
        {
            Some(active) => tab_id == Some(active),
            None => true,
        }
    }

    pub(crate) fn apply_square_visibility(&mut self, circle_id: EntityId, shown: bool) {
        let flags: Vec<(EntityId, bool)> = self
            .squares
            .iter()
            .filter(|s| s.circle_id == circle_id)
            .map(|s| {
                (
                    s.id,
                    self.square_passes_filter(circle_id, s.is_me, s.tab_id, shown),
                )
            })
            .collect();
        for (id, visible) in flags {
            if let Some(square) = self.squares.get_mut(id) {
                square.visible = visible;
            }
        }
    }

    // ─── Panels ──────────────────────────────────────────────────────────

    /// Record a panel's visibility flag and persist the flags right away.
    pub fn set_panel_visibility(&mut self, panel: PanelId, visible: bool) {
        if self.panel_visibility.get(&panel) == Some(&visible) {
            return;
        }
        self.panel_visibility.insert(panel, visible);
        if !self.bulk_loading {
            let key = self.config.panel_visibility_key.clone();
            let flags = self.panel_visibility.clone();
            self.write_setting(&key, &flags);
        }
        self.emit(StoreEvent::PanelVisibilityChanged { panel, visible });
    }

    pub fn panel_visible(&self, panel: PanelId) -> bool {
        self.panel_visibility.get(&panel).copied().unwrap_or(false)
    }
}
