//! WASM bridge for the Chakra Visualizer: exposes the entity store to the page.
//!
//! Compiled via `wasm-pack build --target web`. Records cross the boundary
//! as JSON strings in the same camelCase shape the store persists; a failed
//! lookup or create returns `"null"`, a failed command returns `false`.

mod host;

use chakra_core::id::{EntityId, PanelId};
use chakra_core::model::*;
use chakra_core::{Snapshot, StoreConfig};
use chakra_state::{EntityStore, KeyValueStore, MemoryStorage, StoreEvent, Stored, SubscriptionId};
use host::{JsClock, LocalStorage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

/// The page-facing store handle.
///
/// Owns the `EntityStore` and the JS listeners subscribed to its bus.
#[wasm_bindgen]
pub struct ChakraStore {
    store: EntityStore,
    /// JS-visible subscription handles.
    subscriptions: HashMap<u32, SubscriptionId>,
    next_subscription: u32,
}

#[wasm_bindgen]
impl ChakraStore {
    /// Create a store from a (possibly empty or partial) JSON config,
    /// persisting to `localStorage` when the page allows it.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<ChakraStore, JsValue> {
        console_error_panic_hook_setup();
        init_logging();

        let config = if config_json.trim().is_empty() {
            StoreConfig::default()
        } else {
            StoreConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e))?
        };
        let storage: Box<dyn KeyValueStore> = match LocalStorage::open() {
            Ok(storage) => Box::new(storage),
            Err(err) => {
                log::warn!("{err}; state will not survive a reload");
                Box::new(MemoryStorage::new())
            }
        };
        Ok(Self::with_store(EntityStore::new(
            config,
            storage,
            Box::new(JsClock),
        )))
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Restore saved state. Returns whether a snapshot was found.
    pub fn load(&mut self) -> bool {
        self.store.load()
    }

    /// Write a pending save if its quiet window has passed. Call from an
    /// interval timer.
    pub fn tick(&mut self) -> bool {
        self.store.tick()
    }

    pub fn save_now(&mut self) -> bool {
        self.store.save_now()
    }

    pub fn has_pending_save(&self) -> bool {
        self.store.has_pending_save()
    }

    pub fn get_snapshot(&self) -> String {
        self.store
            .snapshot()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    pub fn load_snapshot(&mut self, json: &str) -> bool {
        match parse::<Snapshot>(json, "snapshot") {
            Some(snapshot) => {
                self.store.load_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    // ─── Event bus ───────────────────────────────────────────────────────

    /// Call `callback` with the JSON of every store event.
    ///
    /// The callback runs while the store is busy; it must not call back
    /// into the store synchronously (defer with a microtask instead).
    pub fn subscribe(&mut self, callback: js_sys::Function) -> u32 {
        let id = self.store.subscribe(move |event: &StoreEvent| {
            let json = JsValue::from_str(&to_json(event));
            if let Err(err) = callback.call1(&JsValue::NULL, &json) {
                log::error!("store listener threw: {err:?}");
            }
        });
        let handle = self.next_subscription;
        self.next_subscription += 1;
        self.subscriptions.insert(handle, id);
        handle
    }

    pub fn unsubscribe(&mut self, handle: u32) -> bool {
        self.subscriptions
            .remove(&handle)
            .is_some_and(|id| self.store.unsubscribe(id))
    }

    /// Raise an event on the store's bus, e.g. a square moved by a drag.
    pub fn dispatch(&mut self, event_json: &str) -> bool {
        match parse::<StoreEvent>(event_json, "event") {
            Some(event) => {
                self.store.dispatch(event);
                true
            }
            None => false,
        }
    }

    // ─── Create / register / update / remove ─────────────────────────────

    pub fn create_document(&mut self, draft_json: &str) -> String {
        parse::<DocumentDraft>(draft_json, "document draft")
            .map_or_else(null, |draft| to_json(&self.store.create_document(draft)))
    }

    pub fn create_circle(&mut self, draft_json: &str) -> String {
        parse::<CircleDraft>(draft_json, "circle draft")
            .map_or_else(null, |draft| to_json(&self.store.create_circle(draft)))
    }

    pub fn create_square(&mut self, draft_json: &str) -> String {
        parse::<SquareDraft>(draft_json, "square draft")
            .map_or_else(null, |draft| to_json(&self.store.create_square(draft)))
    }

    pub fn create_tab(&mut self, draft_json: &str) -> String {
        parse::<TabDraft>(draft_json, "tab draft")
            .map_or_else(null, |draft| to_json(&self.store.create_tab(draft)))
    }

    /// Register a fully-formed record of `kind` as-is.
    pub fn register(&mut self, kind: &str, json: &str) -> bool {
        let store = &mut self.store;
        match parse_kind(kind) {
            Some(EntityKind::Document) => {
                parse::<Document>(json, "document").is_some_and(|r| store.register_document(r))
            }
            Some(EntityKind::Circle) => {
                parse::<Circle>(json, "circle").is_some_and(|r| store.register_circle(r))
            }
            Some(EntityKind::Square) => {
                parse::<Square>(json, "square").is_some_and(|r| store.register_square(r))
            }
            Some(EntityKind::Tab) => {
                parse::<Tab>(json, "tab").is_some_and(|r| store.register_tab(r))
            }
            None => false,
        }
    }

    /// Merge a JSON change set into a record. Returns the updated record.
    pub fn update(&mut self, kind: &str, id: &str, changes_json: &str) -> String {
        let Some(id) = EntityId::lookup(id) else {
            return null();
        };
        match parse_kind(kind) {
            Some(EntityKind::Document) => update_json::<Document>(&mut self.store, id, changes_json),
            Some(EntityKind::Circle) => update_json::<Circle>(&mut self.store, id, changes_json),
            Some(EntityKind::Square) => update_json::<Square>(&mut self.store, id, changes_json),
            Some(EntityKind::Tab) => update_json::<Tab>(&mut self.store, id, changes_json),
            None => null(),
        }
    }

    pub fn remove(&mut self, kind: &str, id: &str) -> bool {
        let Some(id) = EntityId::lookup(id) else {
            return false;
        };
        match parse_kind(kind) {
            Some(EntityKind::Document) => self.store.remove_document(id),
            Some(EntityKind::Circle) => self.store.remove_circle(id),
            Some(EntityKind::Square) => self.store.remove_square(id),
            Some(EntityKind::Tab) => self.store.remove_tab(id),
            None => false,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, kind: &str, id: &str) -> String {
        let Some(id) = EntityId::lookup(id) else {
            return null();
        };
        match parse_kind(kind) {
            Some(EntityKind::Document) => to_json(&self.store.get::<Document>(id)),
            Some(EntityKind::Circle) => to_json(&self.store.get::<Circle>(id)),
            Some(EntityKind::Square) => to_json(&self.store.get::<Square>(id)),
            Some(EntityKind::Tab) => to_json(&self.store.get::<Tab>(id)),
            None => null(),
        }
    }

    /// Every record of `kind`, in insertion order.
    pub fn get_all(&self, kind: &str) -> String {
        match parse_kind(kind) {
            Some(EntityKind::Document) => all_json::<Document>(&self.store),
            Some(EntityKind::Circle) => all_json::<Circle>(&self.store),
            Some(EntityKind::Square) => all_json::<Square>(&self.store),
            Some(EntityKind::Tab) => all_json::<Tab>(&self.store),
            None => "[]".to_string(),
        }
    }

    pub fn documents_for_panel(&self, panel: &str) -> String {
        match PanelId::lookup(panel) {
            Some(id) => to_json(&self.store.documents_for_panel(id)),
            None => "[]".to_string(),
        }
    }

    pub fn circles_for_document(&self, document_id: &str) -> String {
        match EntityId::lookup(document_id) {
            Some(id) => to_json(&self.store.circles_for_document(id)),
            None => "[]".to_string(),
        }
    }

    pub fn circles_for_panel(&self, panel: &str) -> String {
        match PanelId::lookup(panel) {
            Some(id) => to_json(&self.store.circles_for_panel(id)),
            None => "[]".to_string(),
        }
    }

    pub fn squares_for_circle(&self, circle_id: &str) -> String {
        match EntityId::lookup(circle_id) {
            Some(id) => to_json(&self.store.squares_for_circle(id)),
            None => "[]".to_string(),
        }
    }

    pub fn tabs_for_circle(&self, circle_id: &str) -> String {
        match EntityId::lookup(circle_id) {
            Some(id) => to_json(&self.store.tabs_for_circle(id)),
            None => "[]".to_string(),
        }
    }

    pub fn me_square(&self, circle_id: &str) -> String {
        match EntityId::lookup(circle_id) {
            Some(id) => to_json(&self.store.me_square(id)),
            None => null(),
        }
    }

    pub fn connections_for_circle(&self, circle_id: &str) -> String {
        match EntityId::lookup(circle_id) {
            Some(id) => to_json(&self.store.connections_for_circle(id)),
            None => "[]".to_string(),
        }
    }

    pub fn circle_connections_for_panel(&self, panel: &str) -> String {
        match PanelId::lookup(panel) {
            Some(id) => to_json(&self.store.circle_connections_for_panel(id)),
            None => "[]".to_string(),
        }
    }

    pub fn connection(&self, a: &str, b: &str) -> String {
        match (EntityId::lookup(a), EntityId::lookup(b)) {
            (Some(a), Some(b)) => to_json(&self.store.connection(a, b)),
            _ => null(),
        }
    }

    pub fn panels(&self) -> String {
        to_json(&self.store.panels())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_document(&mut self, panel: &str, id: &str) -> bool {
        let Some(id) = EntityId::lookup(id) else {
            return false;
        };
        self.store
            .select_document(PanelId::intern(panel), id)
            .is_some()
    }

    pub fn deselect_document(&mut self, panel: &str) -> bool {
        PanelId::lookup(panel).is_some_and(|panel| self.store.deselect_document(panel))
    }

    pub fn select_circle(&mut self, id: &str) -> bool {
        EntityId::lookup(id).is_some_and(|id| self.store.select_circle(id).is_some())
    }

    pub fn deselect_circle(&mut self) -> bool {
        self.store.deselect_circle()
    }

    pub fn select_square(&mut self, id: &str) -> bool {
        EntityId::lookup(id).is_some_and(|id| self.store.select_square(id).is_some())
    }

    pub fn deselect_square(&mut self) -> bool {
        self.store.deselect_square()
    }

    pub fn select_tab(&mut self, id: &str) -> bool {
        EntityId::lookup(id).is_some_and(|id| self.store.select_tab(id).is_some())
    }

    pub fn deselect_tab(&mut self) -> bool {
        self.store.deselect_tab()
    }

    /// `{documents: {panel: id}, circle, square, tab}` with `null` for
    /// empty scopes.
    pub fn get_selection(&self) -> String {
        to_json(self.store.selection())
    }

    // ─── Panels ──────────────────────────────────────────────────────────

    pub fn set_panel_visibility(&mut self, panel: &str, visible: bool) {
        self.store.set_panel_visibility(PanelId::intern(panel), visible);
    }

    pub fn panel_visible(&self, panel: &str) -> bool {
        PanelId::lookup(panel).is_some_and(|panel| self.store.panel_visible(panel))
    }

    pub fn toggle_document_list(&mut self, panel: &str) -> bool {
        self.store.toggle_document_list(PanelId::intern(panel))
    }
}

impl ChakraStore {
    fn with_store(store: EntityStore) -> Self {
        Self {
            store,
            subscriptions: HashMap::new(),
            next_subscription: 0,
        }
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn null() -> String {
    "null".to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| null())
}

fn parse<T: DeserializeOwned>(json: &str, what: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("invalid {what} JSON: {err}");
            None
        }
    }
}

fn parse_kind(kind: &str) -> Option<EntityKind> {
    match kind.parse() {
        Ok(kind) => Some(kind),
        Err(err) => {
            log::warn!("{err}");
            None
        }
    }
}

fn update_json<T>(store: &mut EntityStore, id: EntityId, changes_json: &str) -> String
where
    T: Stored + Serialize,
    T::Changes: DeserializeOwned,
{
    parse::<T::Changes>(changes_json, T::KIND.as_str())
        .map_or_else(null, |changes| to_json(&store.update::<T>(id, changes)))
}

fn all_json<T: Stored + Serialize>(store: &EntityStore) -> String {
    to_json(&store.all::<T>().collect::<Vec<_>>())
}

fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            if let Err(err) = console_log::init_with_level(log::Level::Info) {
                web_sys::console::warn_1(&format!("console_log: {err}").into());
            }
        });
    }
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Chakra WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chakra_state::ManualClock;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn bridge() -> ChakraStore {
        ChakraStore::with_store(EntityStore::new(
            StoreConfig::default(),
            Box::new(MemoryStorage::new()),
            Box::new(ManualClock::new()),
        ))
    }

    fn value(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn create_and_query_through_json() {
        let mut bridge = bridge();
        let circle = value(&bridge.create_circle(r#"{"x":10,"y":20,"circleType":"left"}"#));
        let circle_id = circle["id"].as_str().unwrap().to_string();
        assert_eq!(circle["name"], "Circle 1");
        assert!(circle["documentId"].is_string());

        let square = value(&bridge.create_square(&format!(
            r#"{{"x":1,"y":2,"circleId":"{circle_id}","name":"Friend"}}"#
        )));
        assert_eq!(square["circleId"], circle_id.as_str());

        let squares = value(&bridge.squares_for_circle(&circle_id));
        assert_eq!(squares.as_array().unwrap().len(), 1);
        assert_eq!(value(&bridge.get("circle", &circle_id))["squareCount"], 1);
    }

    #[test]
    fn update_accepts_partial_change_sets() {
        let mut bridge = bridge();
        let doc = value(&bridge.create_document(r#"{"circleType":"left","name":"Old"}"#));
        let id = doc["id"].as_str().unwrap();

        let updated = value(&bridge.update("document", id, r#"{"name":"New"}"#));
        assert_eq!(updated["name"], "New");
        assert_eq!(updated["circleType"], "left");
    }

    #[test]
    fn bad_input_is_null_or_false() {
        let mut bridge = bridge();
        assert_eq!(bridge.create_circle("not json"), "null");
        assert_eq!(bridge.get("gem", "x"), "null");
        assert_eq!(bridge.get("circle", "circle_missing"), "null");
        assert_eq!(bridge.get_all("gem"), "[]");
        assert_eq!(
            bridge.create_square(r#"{"x":0,"y":0,"circleId":"circle_missing"}"#),
            "null"
        );
        assert!(!bridge.remove("square", "square_missing"));
        assert!(!bridge.dispatch(r#"{"type":"NOT_AN_EVENT"}"#));
        assert!(!bridge.select_circle("circle_missing"));
    }

    #[test]
    fn unknown_ids_are_not_interned() {
        let mut bridge = bridge();
        assert_eq!(bridge.get("circle", "circle_never_created"), "null");
        assert_eq!(bridge.squares_for_circle("circle_never_created"), "[]");
        assert_eq!(bridge.me_square("circle_never_created"), "null");
        assert!(!bridge.select_tab("tab_never_created"));
        assert!(!bridge.panel_visible("panel_never_named"));
        assert_eq!(EntityId::lookup("circle_never_created"), None);
        assert_eq!(EntityId::lookup("tab_never_created"), None);
        assert_eq!(PanelId::lookup("panel_never_named"), None);
    }

    #[test]
    fn selecting_circle_brings_up_me_square() {
        let mut bridge = bridge();
        let circle = value(&bridge.create_circle(r#"{"x":0,"y":0,"circleType":"left"}"#));
        let id = circle["id"].as_str().unwrap();

        assert!(bridge.select_circle(id));
        let me = value(&bridge.me_square(id));
        assert_eq!(me["isMe"], true);
        assert_eq!(me["visible"], true);

        let selection = value(&bridge.get_selection());
        assert_eq!(selection["circle"], id);
        assert_eq!(selection["square"], Value::Null);
        assert!(bridge.panel_visible("right"));
    }

    #[test]
    fn dispatch_runs_store_reactions() {
        let mut bridge = bridge();
        let circle = value(&bridge.create_circle(r#"{"x":0,"y":0,"circleType":"left"}"#));
        let id = circle["id"].as_str().unwrap();

        let event = format!(r#"{{"type":"CIRCLE_SELECTED","payload":{{"circleId":"{id}"}}}}"#);
        assert!(bridge.dispatch(&event));
        assert_ne!(bridge.me_square(id), "null");
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut bridge = bridge();
        bridge.create_circle(r#"{"x":0,"y":0,"circleType":"left","name":"Kept"}"#);
        let snapshot = bridge.get_snapshot();

        let mut other = self::bridge();
        assert!(other.load_snapshot(&snapshot));
        let circles = value(&other.get_all("circle"));
        assert_eq!(circles[0]["name"], "Kept");
        assert!(!other.load_snapshot("{oops"));
    }
}
