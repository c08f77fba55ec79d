pub mod config;
pub mod geometry;
pub mod id;
pub mod model;
pub mod snapshot;

pub use config::StoreConfig;
pub use id::{EntityId, PanelId};
pub use model::*;
pub use snapshot::Snapshot;

// Re-export kurbo's point so downstream crates don't need a direct dependency
pub use kurbo::Point;
