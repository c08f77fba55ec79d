//! Integration tests: cascading deletes (chakra-state).
//!
//! Removing a parent must remove every dependent first, deselect whatever
//! was selected, and only then publish the parent's delete event.

use chakra_core::model::*;
use chakra_core::{PanelId, StoreConfig};
use chakra_state::{EntityStore, StoreEvent};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn left() -> PanelId {
    PanelId::intern("left")
}

/// Record the bus names of every event published from now on.
fn record(store: &mut EntityStore) -> Rc<RefCell<Vec<&'static str>>> {
    let names = Rc::new(RefCell::new(Vec::new()));
    let sink = names.clone();
    store.subscribe(move |event: &StoreEvent| sink.borrow_mut().push(event.name()));
    names
}

fn position(names: &[&str], name: &str) -> usize {
    names
        .iter()
        .position(|n| *n == name)
        .unwrap_or_else(|| panic!("{name} was not published: {names:?}"))
}

// ─── Documents ───────────────────────────────────────────────────────────

#[test]
fn removing_document_cascades_to_circles_squares_and_tabs() {
    init_logging();
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let keep = store.create_document(DocumentDraft::new(left()).named("Keep"));
    let doomed = store.create_document(DocumentDraft::new(left()).named("Doomed"));
    store.select_document(left(), doomed.id);

    let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    assert_eq!(circle.document_id, doomed.id);
    store.select_circle(circle.id);
    let tab = store.create_tab(TabDraft::new(circle.id)).unwrap();
    store.create_square(SquareDraft::new(circle.id, 10.0, 10.0).in_tab(tab.id));
    store.create_square(SquareDraft::new(circle.id, 20.0, 20.0));

    let events = record(&mut store);
    assert!(store.remove_document(doomed.id));

    assert_eq!(store.count::<Circle>(), 0);
    assert_eq!(store.count::<Square>(), 0);
    assert_eq!(store.count::<Tab>(), 0);
    assert_eq!(store.count::<Document>(), 1);
    assert_eq!(store.selected_circle(), None);
    assert_eq!(store.selected_document(left()), Some(keep.id));

    let names = events.borrow();
    let deselected = position(&names, "CIRCLE_DESELECTED");
    let square_deleted = position(&names, "SQUARE_DELETED");
    let circle_deleted = position(&names, "CIRCLE_DELETED");
    let document_deleted = position(&names, "DOCUMENT_DELETED");
    assert!(deselected < circle_deleted);
    assert!(square_deleted < circle_deleted);
    assert!(circle_deleted < document_deleted);
    assert!(position(&names, "TAB_DELETED") < circle_deleted);
}

#[test]
fn removing_last_document_leaves_panel_unselected() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let only = store.create_document(DocumentDraft::new(left()));
    store.select_document(left(), only.id);

    assert!(store.remove_document(only.id));
    assert_eq!(store.selected_document(left()), None);
    assert!(!store.remove_document(only.id));
}

#[test]
fn removing_unselected_document_keeps_selection() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let a = store.create_document(DocumentDraft::new(left()));
    let b = store.create_document(DocumentDraft::new(left()));
    store.select_document(left(), a.id);

    assert!(store.remove_document(b.id));
    assert_eq!(store.selected_document(left()), Some(a.id));
}

// ─── Circles ─────────────────────────────────────────────────────────────

#[test]
fn removing_selected_circle_deselects_first() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    store.select_circle(circle.id);
    let square = store.create_square(SquareDraft::new(circle.id, 5.0, 5.0)).unwrap();
    store.select_square(square.id);

    let events = record(&mut store);
    assert!(store.remove_circle(circle.id));

    assert_eq!(store.selected_circle(), None);
    assert_eq!(store.selected_square(), None);
    assert!(store.squares_for_circle(circle.id).is_empty());
    assert!(store.connections_for_circle(circle.id).is_empty());

    let names = events.borrow();
    assert!(position(&names, "SQUARE_DESELECTED") < position(&names, "CIRCLE_DESELECTED"));
    assert!(position(&names, "CIRCLE_DESELECTED") < position(&names, "CIRCLE_DELETED"));
}

#[test]
fn removing_circle_drops_its_circle_connections() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let a = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    let b = store.create_circle(CircleDraft::new(left(), 30.0, 40.0)).unwrap();
    assert!(store.connection(a.id, b.id).is_some());

    assert!(store.remove_circle(b.id));
    assert!(store.connection(a.id, b.id).is_none());
    assert!(store.circle_connections_for_panel(left()).is_empty());
}

// ─── Tabs and squares ────────────────────────────────────────────────────

#[test]
fn removing_tab_removes_only_its_squares() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    let tab = store.create_tab(TabDraft::new(circle.id)).unwrap();
    let inside = store
        .create_square(SquareDraft::new(circle.id, 1.0, 1.0).in_tab(tab.id))
        .unwrap();
    let outside = store.create_square(SquareDraft::new(circle.id, 2.0, 2.0)).unwrap();
    assert_eq!(store.get::<Circle>(circle.id).unwrap().square_count, 2);

    assert!(store.remove_tab(tab.id));
    assert!(store.get::<Square>(inside.id).is_none());
    assert!(store.get::<Square>(outside.id).is_some());
    assert_eq!(store.get::<Circle>(circle.id).unwrap().square_count, 1);
}

#[test]
fn removing_selected_tab_clears_tab_selection() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    let tab = store.create_tab(TabDraft::new(circle.id)).unwrap();
    store.select_tab(tab.id);
    assert_eq!(store.selected_tab(), Some(tab.id));

    assert!(store.remove_tab(tab.id));
    assert_eq!(store.selected_tab(), None);
    assert_eq!(store.selected_circle(), Some(circle.id));
}

#[test]
fn moving_square_between_circles_updates_both_counts() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let a = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    let b = store.create_circle(CircleDraft::new(left(), 50.0, 0.0)).unwrap();
    let square = store.create_square(SquareDraft::new(a.id, 1.0, 1.0)).unwrap();

    let moved = store
        .update::<Square>(
            square.id,
            SquareChanges {
                circle_id: Some(b.id),
                ..SquareChanges::default()
            },
        )
        .unwrap();

    assert_eq!(moved.circle_id, b.id);
    assert_eq!(store.get::<Circle>(a.id).unwrap().square_count, 0);
    assert_eq!(store.get::<Circle>(b.id).unwrap().square_count, 1);
}

#[test]
fn removed_square_publishes_its_last_state() {
    let mut store = EntityStore::in_memory(StoreConfig::default());
    let circle = store.create_circle(CircleDraft::new(left(), 0.0, 0.0)).unwrap();
    let square = store
        .create_square(SquareDraft::new(circle.id, 7.0, 8.0).named("Friend"))
        .unwrap();

    let removed = Rc::new(RefCell::new(None));
    let sink = removed.clone();
    store.subscribe(move |event: &StoreEvent| {
        if let StoreEvent::SquareDeleted(square) = event {
            *sink.borrow_mut() = Some(square.clone());
        }
    });

    assert!(store.remove_square(square.id));
    assert_eq!(removed.borrow().as_ref().map(|s| s.name.as_str()), Some("Friend"));
}
