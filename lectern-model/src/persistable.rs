use chrono::{DateTime, Utc};
use lectern_types::{EntityId, Tag};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt;

/// Name of an entity type (`"song"`, `"bible"`).
///
/// Doubles as the subdirectory name under the data root and as the key
/// the data manager registers stores under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataKind(&'static str);

impl DataKind {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A record stored as a single file by the persistence layer.
///
/// The identity returned by [`Persistable::id`] is assigned at creation and
/// never changes; it is the only input to the canonical file name and to
/// per-entity locking.
pub trait Persistable:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Entity type name.
    const KIND: DataKind;
    /// Format tag written alongside the data.
    const FORMAT: &'static str;
    /// Current serialization version of [`Self::FORMAT`].
    const VERSION: &'static str;

    fn id(&self) -> EntityId;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    fn created_at(&self) -> DateTime<Utc>;

    fn modified_at(&self) -> DateTime<Utc>;

    fn set_modified_at(&mut self, at: DateTime<Utc>);

    fn tags(&self) -> &BTreeSet<Tag>;

    fn tags_mut(&mut self) -> &mut BTreeSet<Tag>;

    /// Marks the record as modified now.
    fn touch(&mut self) {
        self.set_modified_at(Utc::now());
    }

    /// `(id, name)` pair for log lines.
    fn identify(&self) -> (EntityId, &str) {
        (self.id(), self.name())
    }
}
