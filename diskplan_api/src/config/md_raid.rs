use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};

use crate::{
    devicegraph::{PtableType, Sid},
    primitives::bytes::ByteCount,
};

use super::{Encryption, Filesystem, Partition, Search};

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MdLevel {
    Raid0,
    Raid1,
    Raid4,
    Raid5,
    Raid6,
    Raid10,
}

/// A software RAID, either reused through a search or created from member
/// devices given by alias.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MdRaid {
    pub search: Option<Search>,
    pub alias: Option<String>,
    pub name: Option<String>,
    pub level: Option<MdLevel>,
    pub chunk_size: Option<ByteCount>,
    pub devices: Vec<String>,
    pub encryption: Option<Encryption>,
    pub filesystem: Option<Filesystem>,
    pub ptable_type: Option<PtableType>,
    pub partitions: Vec<Partition>,
}

impl MdRaid {
    pub fn found_device(&self) -> Option<Sid> {
        self.search.as_ref().and_then(Search::found_device)
    }

    pub fn is_new(&self) -> bool {
        match &self.search {
            None => true,
            Some(search) => search.create_device(),
        }
    }
}
