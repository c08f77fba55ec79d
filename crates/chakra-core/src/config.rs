//! Store configuration.
//!
//! Every field has a default, so a host only supplies the keys it wants to
//! override. Field names are camelCase to match the JSON the page passes in.

use crate::id::PanelId;
use serde::{Deserialize, Serialize};

/// Configuration for `EntityStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Connections longer than this are kept but flagged invisible. Default: **120**.
    pub max_line_length: f64,

    /// Quiet period before a debounced save is written. Default: **300 ms**.
    pub save_debounce_ms: u64,

    /// Key holding the JSON snapshot blob.
    pub storage_key: String,

    /// Key holding the last viewed document per panel.
    pub last_viewed_key: String,

    /// Key holding the panel visibility flags.
    pub panel_visibility_key: String,

    /// Panels that always get a default document after load.
    pub panels: Vec<PanelId>,

    /// Panel opened when a circle is selected.
    pub detail_panel: PanelId,

    /// Where an auto-created "Me" square is placed.
    pub me_square_x: f64,
    pub me_square_y: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120.0,
            save_debounce_ms: 300,
            storage_key: "chakraVisualizerData".into(),
            last_viewed_key: "chakraLastViewedDocuments".into(),
            panel_visibility_key: "chakraPanelVisibility".into(),
            panels: vec![PanelId::intern("left")],
            detail_panel: PanelId::intern("right"),
            me_square_x: 200.0,
            me_square_y: 200.0,
        }
    }
}

impl StoreConfig {
    /// Parse a (possibly partial) JSON configuration object.
    ///
    /// # Errors
    /// Returns a description of the problem if the JSON is malformed or a
    /// value is out of range.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: StoreConfig =
            serde_json::from_str(json).map_err(|e| format!("invalid store config: {e}"))?;
        if !config.max_line_length.is_finite() || config.max_line_length < 0.0 {
            return Err(format!(
                "invalid store config: maxLineLength must be a non-negative number, got {}",
                config.max_line_length
            ));
        }
        log::debug!(
            "store config: maxLineLength={}, debounce={}ms, panels={:?}",
            config.max_line_length,
            config.save_debounce_ms,
            config.panels
        );
        Ok(config)
    }
}
