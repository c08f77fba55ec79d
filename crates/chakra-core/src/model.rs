//! Entity model for the Chakra Visualizer canvas.
//!
//! Ownership is a strict tree: a `Document` groups `Circle`s inside one
//! panel, a `Circle` owns its `Square`s and `Tab`s, and a `Tab` partitions
//! the squares of its circle. `Connection`s are derived edges between two
//! visible squares (or circles) and are never authoritative data.
//!
//! Every kind comes in three flavours:
//! - the record itself (`Circle`), as stored and persisted,
//! - a draft (`CircleDraft`) holding the caller-supplied fields for creation,
//! - a change set (`CircleChanges`) of optional fields merged by `update`.

use crate::id::{EntityId, PanelId};
use kurbo::Point;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

pub const DEFAULT_CIRCLE_COLOR: &str = "#4B0082";
pub const DEFAULT_SQUARE_COLOR: &str = "#FFFFFF";
pub const DEFAULT_TAB_COLOR: &str = "#808080";
pub const ME_SQUARE_NAME: &str = "Me";

/// Free-form per-circle attributes edited by the characteristics picker.
pub type Characteristics = serde_json::Map<String, serde_json::Value>;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in change sets.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ─── Entity contract ─────────────────────────────────────────────────────

/// The entity kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Document,
    Circle,
    Square,
    Tab,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Document => "document",
            EntityKind::Circle => "circle",
            EntityKind::Square => "square",
            EntityKind::Tab => "tab",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(EntityKind::Document),
            "circle" => Ok(EntityKind::Circle),
            "square" => Ok(EntityKind::Square),
            "tab" => Ok(EntityKind::Tab),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Common contract for stored records: a stable id and partial updates.
pub trait Entity: Clone {
    const KIND: EntityKind;

    /// Partial update merged by [`Entity::apply`].
    type Changes;

    fn id(&self) -> EntityId;

    /// Merge a change set into the record in place.
    fn apply(&mut self, changes: Self::Changes);
}

// ─── Document ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: EntityId,
    pub name: String,
    /// The panel / circle-type bucket this document belongs to.
    #[serde(alias = "panelId")]
    pub circle_type: PanelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub name: Option<String>,
    #[serde(alias = "panelId")]
    pub circle_type: PanelId,
    pub list_type: Option<String>,
}

impl DocumentDraft {
    pub fn new(circle_type: PanelId) -> Self {
        Self {
            name: None,
            circle_type,
            list_type: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentChanges {
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub list_type: Option<Option<String>>,
}

impl Entity for Document {
    const KIND: EntityKind = EntityKind::Document;
    type Changes = DocumentChanges;

    fn id(&self) -> EntityId {
        self.id
    }

    fn apply(&mut self, changes: DocumentChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(list_type) = changes.list_type {
            self.list_type = list_type;
        }
    }
}

// ─── Circle ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circle {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub color: String,
    #[serde(default)]
    pub colors: SmallVec<[String; 4]>,
    pub name: String,
    pub document_id: EntityId,
    pub circle_type: PanelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub characteristics: Characteristics,
    /// Number of non-"Me" squares owned by this circle. Derived.
    #[serde(default)]
    pub square_count: usize,
    /// Whether the panel filter currently shows this circle. Derived.
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    /// Name of the square closest to this circle's "Me" square. Derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_square_name: Option<String>,
}

fn visible_by_default() -> bool {
    true
}

impl Circle {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDraft {
    pub x: f64,
    pub y: f64,
    pub color: Option<String>,
    #[serde(default)]
    pub colors: SmallVec<[String; 4]>,
    pub name: Option<String>,
    /// Target document; resolved from the panel's selection when absent.
    pub document_id: Option<EntityId>,
    #[serde(alias = "panelId")]
    pub circle_type: PanelId,
    pub indicator: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub characteristics: Characteristics,
}

impl CircleDraft {
    pub fn new(circle_type: PanelId, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            color: None,
            colors: SmallVec::new(),
            name: None,
            document_id: None,
            circle_type,
            indicator: None,
            disabled: false,
            characteristics: Characteristics::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn in_document(mut self, document_id: EntityId) -> Self {
        self.document_id = Some(document_id);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircleChanges {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub color: Option<String>,
    pub colors: Option<SmallVec<[String; 4]>>,
    pub name: Option<String>,
    pub document_id: Option<EntityId>,
    #[serde(deserialize_with = "double_option")]
    pub indicator: Option<Option<String>>,
    pub disabled: Option<bool>,
    pub characteristics: Option<Characteristics>,
}

impl CircleChanges {
    pub fn moved_to(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

impl Entity for Circle {
    const KIND: EntityKind = EntityKind::Circle;
    type Changes = CircleChanges;

    fn id(&self) -> EntityId {
        self.id
    }

    fn apply(&mut self, changes: CircleChanges) {
        if let Some(x) = changes.x {
            self.x = x;
        }
        if let Some(y) = changes.y {
            self.y = y;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
        if let Some(colors) = changes.colors {
            self.colors = colors;
        }
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(document_id) = changes.document_id {
            self.document_id = document_id;
        }
        if let Some(indicator) = changes.indicator {
            self.indicator = indicator;
        }
        if let Some(disabled) = changes.disabled {
            self.disabled = disabled;
        }
        if let Some(characteristics) = changes.characteristics {
            self.characteristics = characteristics;
        }
    }
}

// ─── Square ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Square {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub name: String,
    pub circle_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<EntityId>,
    /// The circle's "self" node. At most one per circle.
    #[serde(default)]
    pub is_me: bool,
    #[serde(default)]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Square {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareDraft {
    pub x: f64,
    pub y: f64,
    pub color: Option<String>,
    pub name: Option<String>,
    pub circle_id: EntityId,
    pub tab_id: Option<EntityId>,
    #[serde(default)]
    pub is_me: bool,
    pub attribute: Option<String>,
}

impl SquareDraft {
    pub fn new(circle_id: EntityId, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            color: None,
            name: None,
            circle_id,
            tab_id: None,
            is_me: false,
            attribute: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn in_tab(mut self, tab_id: EntityId) -> Self {
        self.tab_id = Some(tab_id);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SquareChanges {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub color: Option<String>,
    pub name: Option<String>,
    pub circle_id: Option<EntityId>,
    #[serde(deserialize_with = "double_option")]
    pub tab_id: Option<Option<EntityId>>,
    #[serde(deserialize_with = "double_option")]
    pub attribute: Option<Option<String>>,
}

impl SquareChanges {
    pub fn moved_to(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

impl Entity for Square {
    const KIND: EntityKind = EntityKind::Square;
    type Changes = SquareChanges;

    fn id(&self) -> EntityId {
        self.id
    }

    fn apply(&mut self, changes: SquareChanges) {
        if let Some(x) = changes.x {
            self.x = x;
        }
        if let Some(y) = changes.y {
            self.y = y;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(circle_id) = changes.circle_id {
            self.circle_id = circle_id;
        }
        if let Some(tab_id) = changes.tab_id {
            self.tab_id = tab_id;
        }
        if let Some(attribute) = changes.attribute {
            self.attribute = attribute;
        }
    }
}

// ─── Tab ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: EntityId,
    pub name: String,
    pub index: u32,
    pub circle_id: EntityId,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDraft {
    pub name: Option<String>,
    /// Position among the circle's tabs; appended after the last when absent.
    pub index: Option<u32>,
    pub circle_id: EntityId,
    pub color: Option<String>,
}

impl TabDraft {
    pub fn new(circle_id: EntityId) -> Self {
        Self {
            name: None,
            index: None,
            circle_id,
            color: None,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabChanges {
    pub name: Option<String>,
    pub index: Option<u32>,
    pub color: Option<String>,
}

impl Entity for Tab {
    const KIND: EntityKind = EntityKind::Tab;
    type Changes = TabChanges;

    fn id(&self) -> EntityId {
        self.id
    }

    fn apply(&mut self, changes: TabChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(index) = changes.index {
            self.index = index;
        }
        if let Some(color) = changes.color {
            self.color = color;
        }
    }
}

// ─── Connection ──────────────────────────────────────────────────────────

/// A derived edge between two visible squares of one circle, or two visible
/// circles of one panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Order-independent key of the two endpoints (see `geometry::pair_key`).
    pub id: String,
    pub source_id: EntityId,
    pub target_id: EntityId,
    pub length: f64,
    pub is_visible: bool,
    pub is_highlighted: bool,
}

impl Connection {
    /// The endpoint opposite `id`, if `id` is an endpoint.
    pub fn other_end(&self, id: EntityId) -> Option<EntityId> {
        if self.source_id == id {
            Some(self.target_id)
        } else if self.target_id == id {
            Some(self.source_id)
        } else {
            None
        }
    }
}
