//! Entity model for lectern.
//!
//! Defines the records the persistence layer stores one-per-file:
//! - [`Persistable`]: the contract every stored record fulfils (identity,
//!   name, timestamps, format/version tag, tags)
//! - [`DataKind`]: the name of an entity type, used for directory layout
//!   and registry lookups
//! - [`Song`] and [`Bible`]: the concrete record types
//!
//! Nothing here performs I/O; serialization formats are owned by the
//! providers in `lectern-persist`.

mod bible;
mod persistable;
mod song;

pub use bible::{Bible, Book, Chapter, Verse};
pub use persistable::{DataKind, Persistable};
pub use song::{Song, SongSection};
