use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};

use crate::devicegraph::{PtableType, Sid};

use super::{Encryption, Filesystem, Search, Size};

/// Partition type code.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PartitionId {
    Linux,
    Swap,
    Lvm,
    Raid,
    Esp,
    Prep,
    BiosBoot,
    WindowsBasicData,
}

/// An existing disk-like device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Drive {
    pub search: Search,
    pub alias: Option<String>,
    pub encryption: Option<Encryption>,
    /// Set only when the whole drive is formatted, without partition table.
    pub filesystem: Option<Filesystem>,
    pub ptable_type: Option<PtableType>,
    pub partitions: Vec<Partition>,
}

impl Drive {
    pub fn found_device(&self) -> Option<Sid> {
        self.search.found_device()
    }
}

/// One partition of a partition table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    /// No search means a new partition.
    pub search: Option<Search>,
    pub alias: Option<String>,
    pub id: Option<PartitionId>,
    pub size: Size,
    pub delete: bool,
    pub delete_if_needed: bool,
    pub encryption: Option<Encryption>,
    pub filesystem: Option<Filesystem>,
}

impl Partition {
    /// Deletes every existing partition.
    pub fn delete_all() -> Self {
        Self {
            search: Some(Search::match_all()),
            delete: true,
            ..Default::default()
        }
    }

    /// Shrinks every existing partition if needed.
    pub fn shrink_all() -> Self {
        Self {
            search: Some(Search::match_all()),
            size: Size::shrink_if_needed(),
            ..Default::default()
        }
    }

    pub fn is_delete_all(&self) -> bool {
        self.delete && self.search.as_ref().is_some_and(Search::is_match_all)
    }

    pub fn is_shrink_all(&self) -> bool {
        self.size.is_shrink_if_needed() && self.search.as_ref().is_some_and(Search::is_match_all)
    }

    /// Marks existing partitions for deletion rather than describing one.
    pub fn is_delete_marker(&self) -> bool {
        self.delete || self.delete_if_needed
    }

    pub fn found_device(&self) -> Option<Sid> {
        self.search.as_ref().and_then(Search::found_device)
    }

    /// The partition will be created.
    pub fn is_new(&self) -> bool {
        match &self.search {
            None => true,
            Some(search) => search.create_device(),
        }
    }

    pub fn mount_path(&self) -> Option<&str> {
        self.filesystem.as_ref().and_then(|f| f.path.as_deref())
    }
}
