use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};

use crate::constants::ROOT_MOUNT_POINT_PATH;

/// Filesystem type. Btrfs carries its snapshot setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FilesystemType {
    Btrfs { snapshots: bool },
    Ext2,
    Ext3,
    Ext4,
    Xfs,
    Vfat,
    Swap,
    Exfat,
    Ntfs,
    Bcachefs,
}

impl FilesystemType {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn is_btrfs(&self) -> bool {
        matches!(self, Self::Btrfs { .. })
    }

    pub fn snapshots(&self) -> bool {
        matches!(self, Self::Btrfs { snapshots: true })
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MountBy {
    Device,
    Label,
    Uuid,
    Id,
    Path,
    PartLabel,
    PartUuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filesystem {
    /// Keep the existing filesystem of the matched device when possible.
    pub reuse: bool,
    pub path: Option<String>,
    pub fs_type: Option<FilesystemType>,
    pub label: Option<String>,
    pub mount_options: Vec<String>,
    pub mkfs_options: Vec<String>,
    pub mount_by: Option<MountBy>,
}

impl Filesystem {
    pub fn mounted_at(path: impl Into<String>, fs_type: FilesystemType) -> Self {
        Self {
            path: Some(path.into()),
            fs_type: Some(fs_type),
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.as_deref() == Some(ROOT_MOUNT_POINT_PATH)
    }
}
