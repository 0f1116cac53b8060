//! Observable entity stores for lectern.
//!
//! Sits between the application and `lectern-persist`:
//! - [`PresentationContext`] is the single thread allowed to read or change
//!   a cache
//! - [`PersistentStore`] keeps that cache in step with one persist adapter
//!   and forwards mutations to a [`SearchIndex`]
//! - [`DataManager`] registers one store per entity type and routes typed
//!   calls and multi-type imports to them
//!
//! Disk and index work run on tokio's blocking pool; only the final cache
//! change is marshaled to the presentation context.

mod config;
mod context;
mod error;
mod manager;
mod report;
mod search;
mod store;

pub use config::DataManagerConfig;
pub use context::PresentationContext;
pub use error::{SearchError, SearchResult, StoreError, StoreResult};
pub use manager::DataManager;
pub use report::ImportReport;
pub use search::{NoopSearchIndex, SearchIndex};
pub use store::{CacheChange, ExportDestination, PersistentStore, StoreState};
