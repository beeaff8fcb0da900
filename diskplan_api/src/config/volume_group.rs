use crate::primitives::bytes::ByteCount;

use super::{Encryption, Filesystem, Size};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeGroup {
    pub name: String,
    pub extent_size: Option<ByteCount>,
    /// Aliases of existing physical volumes to reuse.
    pub physical_volumes: Vec<String>,
    /// Aliases of devices on which new physical volumes are created.
    pub physical_volumes_devices: Vec<String>,
    /// Encryption of the new physical volumes only.
    pub physical_volumes_encryption: Option<Encryption>,
    pub logical_volumes: Vec<LogicalVolume>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogicalVolume {
    pub alias: Option<String>,
    pub name: Option<String>,
    pub size: Size,
    pub stripes: Option<u32>,
    pub stripe_size: Option<ByteCount>,
    pub pool: bool,
    /// Thin pool this volume is carved from.
    pub used_pool: Option<String>,
    pub encryption: Option<Encryption>,
    pub filesystem: Option<Filesystem>,
}

impl LogicalVolume {
    pub fn is_thin(&self) -> bool {
        self.used_pool.is_some()
    }

    pub fn mount_path(&self) -> Option<&str> {
        self.filesystem.as_ref().and_then(|f| f.path.as_deref())
    }
}

impl VolumeGroup {
    /// Every alias the group depends on, reused and new physical volumes.
    pub fn referenced_aliases(&self) -> impl Iterator<Item = &str> {
        self.physical_volumes
            .iter()
            .chain(self.physical_volumes_devices.iter())
            .map(String::as_str)
    }
}
