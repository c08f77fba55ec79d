pub mod connections;
pub mod debounce;
pub mod events;
pub mod persistence;
pub mod repository;
pub mod selection;
pub mod storage;
pub mod store;

pub use connections::ConnectionGraph;
pub use debounce::{Clock, Debouncer, ManualClock, SystemClock};
pub use events::{EventBus, StoreEvent, SubscriptionId};
pub use persistence::PersistError;
pub use repository::Repository;
pub use selection::Selection;
pub use storage::{KeyValueStore, MemoryStorage, StorageError};
pub use store::{EntityStore, Stored};
