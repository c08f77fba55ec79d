//! Integration tests: persisted snapshot format (chakra-core).
//!
//! The blob under `chakraVisualizerData` is shared with the page, so field
//! names and defaults must stay stable.

use chakra_core::{EntityId, PanelId, Snapshot, StoreConfig};
use pretty_assertions::assert_eq;

const SAVED: &str = r##"{
  "documents": [
    {"id": "document_a", "name": "Plans", "circleType": "left"}
  ],
  "circles": [
    {
      "id": "circle_a", "x": 100, "y": 50, "color": "#4B0082",
      "colors": ["#FF0000", "#00FF00"], "name": "Work",
      "documentId": "document_a", "circleType": "left",
      "characteristics": {"element": "fire"}, "squareCount": 1
    }
  ],
  "squares": [
    {"id": "square_me", "x": 200, "y": 200, "color": "#FFFFFF", "name": "Me",
     "circleId": "circle_a", "isMe": true},
    {"id": "square_b", "x": 10, "y": 10, "color": "#FFFFFF", "name": "Friend",
     "circleId": "circle_a", "tabId": "tab_a", "attribute": "close"}
  ],
  "tabs": [
    {"id": "tab_a", "name": "Team", "index": 0, "circleId": "circle_a", "color": "#808080"}
  ],
  "selectedDocumentIds": {"left": "document_a"}
}"##;

#[test]
fn page_snapshot_parses() {
    let snapshot = Snapshot::from_json(SAVED).unwrap();

    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.documents[0].circle_type, PanelId::intern("left"));

    let circle = &snapshot.circles[0];
    assert_eq!(circle.colors.as_slice(), ["#FF0000", "#00FF00"]);
    assert_eq!(circle.characteristics["element"], "fire");
    assert!(circle.visible, "visible defaults to true when absent");
    assert!(!circle.disabled);
    assert_eq!(circle.closest_square_name, None);

    let me = &snapshot.squares[0];
    assert!(me.is_me);
    assert_eq!(me.tab_id, None);
    assert!(!me.visible);
    let friend = &snapshot.squares[1];
    assert_eq!(friend.tab_id, Some(EntityId::intern("tab_a")));
    assert_eq!(friend.attribute.as_deref(), Some("close"));

    assert_eq!(
        snapshot.selected_document_ids.get(&PanelId::intern("left")),
        Some(&EntityId::intern("document_a"))
    );
}

#[test]
fn snapshot_survives_a_write_read_cycle() {
    let snapshot = Snapshot::from_json(SAVED).unwrap();
    let json = snapshot.to_json().unwrap();
    assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    assert!(json.contains(r#""selectedDocumentIds":{"left":"document_a"}"#));
    assert!(!json.contains("listType"), "absent optionals are omitted");
}

#[test]
fn config_overrides_only_given_keys() {
    let config = StoreConfig::from_json(r#"{"maxLineLength": 250, "panels": ["left", "right"]}"#)
        .unwrap();
    assert_eq!(config.max_line_length, 250.0);
    assert_eq!(
        config.panels,
        vec![PanelId::intern("left"), PanelId::intern("right")]
    );
    assert_eq!(config.save_debounce_ms, 300);
    assert_eq!(config.storage_key, "chakraVisualizerData");
}

#[test]
fn config_rejects_negative_threshold() {
    let err = StoreConfig::from_json(r#"{"maxLineLength": -1}"#).unwrap_err();
    assert!(err.contains("maxLineLength"));
}
