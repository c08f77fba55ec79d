//! Persisted snapshot format.
//!
//! The whole store is saved as one JSON blob:
//! `{documents[], circles[], squares[], tabs[], selectedDocumentIds{}}`.
//! Connections are derived and never written.

use crate::id::{EntityId, PanelId};
use crate::model::{Circle, Document, Square, Tab};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub documents: Vec<Document>,
    pub circles: Vec<Circle>,
    pub squares: Vec<Square>,
    pub tabs: Vec<Tab>,
    pub selected_document_ids: BTreeMap<PanelId, EntityId>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
            && self.circles.is_empty()
            && self.squares.is_empty()
            && self.tabs.is_empty()
    }
}

/// Last viewed document per panel, stored under its own key.
pub type LastViewed = BTreeMap<PanelId, EntityId>;

/// Panel visibility flags, stored under their own key.
pub type PanelVisibility = BTreeMap<PanelId, bool>;
