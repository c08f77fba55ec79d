//! Publish/subscribe bus for store change notifications.
//!
//! Views subscribe with a closure and re-query the store when an event
//! arrives. The store also reacts to a fixed set of events itself (see
//! `EntityStore::dispatch`), whether it raised them or an outside
//! collaborator did.

use chakra_core::id::{EntityId, PanelId};
use chakra_core::model::{Circle, Document, Square, Tab};
use serde::{Deserialize, Serialize};

/// Every notification the store publishes or reacts to.
///
/// Serialises as `{"type": "CIRCLE_CREATED", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreEvent {
    DocumentCreated(Document),
    DocumentUpdated(Document),
    DocumentDeleted(Document),
    #[serde(rename_all = "camelCase")]
    DocumentSelected {
        panel: PanelId,
        document_id: EntityId,
    },
    #[serde(rename_all = "camelCase")]
    DocumentDeselected {
        panel: PanelId,
        document_id: EntityId,
    },
    DocumentListToggled {
        panel: PanelId,
        open: bool,
    },

    CircleCreated(Circle),
    CircleUpdated(Circle),
    CircleDeleted(Circle),
    #[serde(rename_all = "camelCase")]
    CircleSelected {
        circle_id: EntityId,
    },
    #[serde(rename_all = "camelCase")]
    CircleDeselected {
        circle_id: EntityId,
    },

    SquareCreated(Square),
    SquareUpdated(Square),
    SquareDeleted(Square),
    #[serde(rename_all = "camelCase")]
    SquareSelected {
        square_id: EntityId,
    },
    #[serde(rename_all = "camelCase")]
    SquareDeselected {
        square_id: EntityId,
    },
    MultiSelectionCleared,

    TabCreated(Tab),
    TabUpdated(Tab),
    TabDeleted(Tab),
    #[serde(rename_all = "camelCase")]
    TabSelected {
        tab_id: EntityId,
        circle_id: EntityId,
    },
    #[serde(rename_all = "camelCase")]
    TabDeselected {
        tab_id: EntityId,
    },

    /// Connections of a circle (or of a panel's circles) were recomputed.
    #[serde(rename_all = "camelCase")]
    ConnectionUpdated {
        owner_id: String,
        connections: usize,
        closest_square_name: Option<String>,
    },

    StateLoaded {
        documents: usize,
        circles: usize,
        squares: usize,
        tabs: usize,
    },
    StateSaved {
        bytes: usize,
    },
    PanelVisibilityChanged {
        panel: PanelId,
        visible: bool,
    },
}

impl StoreEvent {
    /// The event's bus name, e.g. `SQUARE_UPDATED`.
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::DocumentCreated(_) => "DOCUMENT_CREATED",
            StoreEvent::DocumentUpdated(_) => "DOCUMENT_UPDATED",
            StoreEvent::DocumentDeleted(_) => "DOCUMENT_DELETED",
            StoreEvent::DocumentSelected { .. } => "DOCUMENT_SELECTED",
            StoreEvent::DocumentDeselected { .. } => "DOCUMENT_DESELECTED",
            StoreEvent::DocumentListToggled { .. } => "DOCUMENT_LIST_TOGGLED",
            StoreEvent::CircleCreated(_) => "CIRCLE_CREATED",
            StoreEvent::CircleUpdated(_) => "CIRCLE_UPDATED",
            StoreEvent::CircleDeleted(_) => "CIRCLE_DELETED",
            StoreEvent::CircleSelected { .. } => "CIRCLE_SELECTED",
            StoreEvent::CircleDeselected { .. } => "CIRCLE_DESELECTED",
            StoreEvent::SquareCreated(_) => "SQUARE_CREATED",
            StoreEvent::SquareUpdated(_) => "SQUARE_UPDATED",
            StoreEvent::SquareDeleted(_) => "SQUARE_DELETED",
            StoreEvent::SquareSelected { .. } => "SQUARE_SELECTED",
            StoreEvent::SquareDeselected { .. } => "SQUARE_DESELECTED",
            StoreEvent::MultiSelectionCleared => "MULTI_SELECTION_CLEARED",
            StoreEvent::TabCreated(_) => "TAB_CREATED",
            StoreEvent::TabUpdated(_) => "TAB_UPDATED",
            StoreEvent::TabDeleted(_) => "TAB_DELETED",
            StoreEvent::TabSelected { .. } => "TAB_SELECTED",
            StoreEvent::TabDeselected { .. } => "TAB_DESELECTED",
            StoreEvent::ConnectionUpdated { .. } => "CONNECTION_UPDATED",
            StoreEvent::StateLoaded { .. } => "STATE_LOADED",
            StoreEvent::StateSaved { .. } => "STATE_SAVED",
            StoreEvent::PanelVisibilityChanged { .. } => "PANEL_VISIBILITY_CHANGED",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Synchronous fan-out to subscribed listeners, in subscription order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: &StoreEvent) {
        log::trace!("publish {}", event.name());
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
