use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::{Filesystem, FilesystemType, MountBy},
    is_default,
    product::VolumeTemplate,
};

use super::ConfigImporter;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemJson {
    #[serde(default, skip_serializing_if = "is_default")]
    pub reuse_if_possible: bool,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<FsTypeJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_by: Option<MountBy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mkfs_options: Vec<String>,

    /// Absent options take the product defaults for the mount path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_options: Option<Vec<String>>,
}

/// A type name, or `{"btrfs": {"snapshots": bool}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FsTypeJson {
    Name(String),
    Btrfs { btrfs: BtrfsJson },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BtrfsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<bool>,
}

fn template_snapshots(template: Option<&VolumeTemplate>) -> bool {
    template.is_some_and(|t| t.btrfs.snapshots)
}

impl ConfigImporter<'_> {
    pub(super) fn import_filesystem(&self, json: Option<FilesystemJson>) -> Option<Filesystem> {
        let json = json?;
        let template = match json.path.as_deref() {
            Some(path) => self.product.template_for(path),
            None => self.product.fallback_template(),
        };

        let fs_type = match json.fs_type {
            Some(FsTypeJson::Name(name)) => match FilesystemType::from_str(&name) {
                Ok(FilesystemType::Btrfs { .. }) => Some(FilesystemType::Btrfs {
                    snapshots: template_snapshots(template),
                }),
                Ok(fs_type) => Some(fs_type),
                Err(_) => {
                    warn!("Ignoring unknown filesystem type '{name}'");
                    template.and_then(VolumeTemplate::fs_type)
                }
            },
            Some(FsTypeJson::Btrfs { btrfs }) => Some(FilesystemType::Btrfs {
                snapshots: btrfs
                    .snapshots
                    .unwrap_or_else(|| template_snapshots(template)),
            }),
            None => template.and_then(VolumeTemplate::fs_type),
        };

        let mount_options = json
            .mount_options
            .unwrap_or_else(|| template.map(|t| t.mount_options.clone()).unwrap_or_default());

        Some(Filesystem {
            reuse: json.reuse_if_possible,
            path: json.path,
            fs_type,
            label: json.label,
            mount_options,
            mkfs_options: json.mkfs_options,
            mount_by: json.mount_by,
        })
    }
}

impl FilesystemJson {
    /// Btrfs is always written in its object form.
    pub fn export(filesystem: &Filesystem) -> Self {
        Self {
            reuse_if_possible: filesystem.reuse,
            fs_type: filesystem.fs_type.map(|fs_type| match fs_type {
                FilesystemType::Btrfs { snapshots } => FsTypeJson::Btrfs {
                    btrfs: BtrfsJson {
                        snapshots: Some(snapshots),
                    },
                },
                other => FsTypeJson::Name(other.name().to_owned()),
            }),
            label: filesystem.label.clone(),
            path: filesystem.path.clone(),
            mount_by: filesystem.mount_by,
            mkfs_options: filesystem.mkfs_options.clone(),
            mount_options: Some(filesystem.mount_options.clone()).filter(|o| !o.is_empty()),
        }
    }
}
