//! Reduced view handed to the proposal solver: which devices to use, what
//! may happen to their existing partitions and which volumes to create.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;
use strum_macros::IntoStaticStr;

use diskplan_api::{
    config::{Config, ConfigNode, Filesystem, Partition, Size, SizeMax},
    devicegraph::{Device, DeviceGraph, Sid},
    primitives::bytes::ByteCount,
};

use crate::{
    model,
    resolver::boot_device,
    space_policy::{self, SpacePolicy},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SolverSettings {
    pub target_devices: Vec<String>,
    pub boot: BootSettings,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionSettings>,

    pub space_actions: Vec<SpaceAction>,
    pub volumes: Vec<VolumeSettings>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootSettings {
    pub configure: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettings {
    pub method: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbkd_function: Option<&'static str>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SpaceActionKind {
    /// Delete unconditionally.
    ForceDelete,
    /// Delete only if the space is needed.
    Delete,
    Resize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceAction {
    pub device: String,
    pub action: SpaceActionKind,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSettings {
    pub mount_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<&'static str>,

    #[serde(skip_serializing_if = "crate::is_false")]
    pub snapshots: bool,

    pub min_size: ByteCount,

    /// Absent when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<ByteCount>,

    /// Existing device the volume lives on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    #[serde(skip_serializing_if = "crate::is_false")]
    pub reuse: bool,
}

/// Builds the solver settings of a layout solved against `graph`.
pub fn build_settings(config: &Config, graph: &DeviceGraph) -> SolverSettings {
    let name = |sid: Option<Sid>| sid.and_then(|sid| graph.get(sid)).map(|d| d.name.clone());

    let mut target_devices = Vec::new();
    for sid in config.nodes().filter_map(|node| node.found_device()) {
        target_devices.extend(name(Some(sid)));
    }

    SolverSettings {
        target_devices,
        boot: BootSettings {
            configure: config.boot.configure,
            device: name(boot_device(config)),
        },
        encryption: model::encryption(config).and_then(|e| {
            Some(EncryptionSettings {
                method: e.method?.name(),
                password: e.password.clone(),
                pbkd_function: e.pbkd_function.map(<&str>::from),
            })
        }),
        space_actions: space_actions(config, graph),
        volumes: volumes(config, graph),
    }
}

/// Actions on the existing partitions of every found drive and MD RAID,
/// at most one per partition.
fn space_actions(config: &Config, graph: &DeviceGraph) -> Vec<SpaceAction> {
    let mut seen = BTreeSet::new();
    let mut actions = Vec::new();

    for node in config.nodes() {
        let Some(sid) = node.found_device() else {
            continue;
        };
        let existing = graph.partitions_of(sid);
        let policy = space_policy::classify(node);
        debug!("Space policy of device {sid} is '{}'", <&str>::from(policy));

        let node_actions: Vec<(Sid, SpaceActionKind)> = match policy {
            SpacePolicy::Delete => existing
                .iter()
                .map(|p| (p.sid, SpaceActionKind::ForceDelete))
                .collect(),
            SpacePolicy::Resize => existing
                .iter()
                .filter(|p| p.shrinking_supported())
                .map(|p| (p.sid, SpaceActionKind::Resize))
                .collect(),
            SpacePolicy::Custom => node
                .partitions()
                .unwrap_or_default()
                .iter()
                .filter_map(|p| Some((p.found_device()?, custom_action(p)?)))
                .collect(),
            SpacePolicy::Keep => Vec::new(),
        };

        for (sid, action) in node_actions {
            let Some(device) = graph.get(sid) else {
                continue;
            };
            if seen.insert(sid) {
                actions.push(SpaceAction {
                    device: device.name.clone(),
                    action,
                });
            }
        }
    }

    actions
}

fn custom_action(partition: &Partition) -> Option<SpaceActionKind> {
    if partition.delete {
        Some(SpaceActionKind::ForceDelete)
    } else if partition.delete_if_needed {
        Some(SpaceActionKind::Delete)
    } else if !partition.size.default {
        Some(SpaceActionKind::Resize)
    } else {
        None
    }
}

/// Every mounted filesystem that will exist, with "current" sizes replaced by
/// the size of the device it lives on.
fn volumes(config: &Config, graph: &DeviceGraph) -> Vec<VolumeSettings> {
    let mut volumes = Vec::new();

    for node in config.nodes() {
        let found = node.found_device().and_then(|sid| graph.get(sid));
        let in_use = match node {
            ConfigNode::Drive(_) => found.is_some(),
            ConfigNode::MdRaid(md) => found.is_some() || md.is_new(),
            ConfigNode::VolumeGroup(_) => true,
        };
        if !in_use {
            debug!("Skipping the volumes of an unresolved device");
            continue;
        }

        if let Some(filesystem) = node.filesystem() {
            let size = found.map_or_else(Size::default, |d| Size::exact(d.size()));
            volumes.extend(volume(filesystem, &size, found));
        }

        for partition in node.partitions().unwrap_or_default() {
            if partition.is_delete_marker() {
                continue;
            }
            let found = partition.found_device().and_then(|sid| graph.get(sid));
            if found.is_none() && !partition.is_new() {
                continue;
            }
            if let Some(filesystem) = &partition.filesystem {
                volumes.extend(volume(filesystem, &partition.size, found));
            }
        }

        if let ConfigNode::VolumeGroup(volume_group) = node {
            for logical_volume in &volume_group.logical_volumes {
                if let Some(filesystem) = &logical_volume.filesystem {
                    volumes.extend(volume(filesystem, &logical_volume.size, None));
                }
            }
        }
    }

    volumes
}

fn volume(filesystem: &Filesystem, size: &Size, device: Option<&Device>) -> Option<VolumeSettings> {
    let mount_path = filesystem.path.clone()?;
    let size = match device {
        Some(device) => size.with_current(device.size()),
        None => *size,
    };

    Some(VolumeSettings {
        mount_path,
        fs_type: filesystem.fs_type.map(|t| t.name()),
        snapshots: filesystem.fs_type.is_some_and(|t| t.snapshots()),
        min_size: size.min.unwrap_or_default(),
        max_size: match size.max {
            Some(SizeMax::Bytes(max)) => Some(max),
            Some(SizeMax::Unlimited) | None => None,
        },
        device: device.map(|d| d.name.clone()),
        reuse: filesystem.reuse,
    })
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::json;

    use diskplan_api::{product::ProductConfig, wire};

    use super::*;
    use crate::resolver::resolve_config;

    const GRAPH: &str = indoc! {r#"
        {
          "devices": [
            {
              "sid": 10, "name": "/dev/vda", "kind": "disk", "block": { "size": "100 GiB" },
              "partitionTable": { "type": "gpt", "partitions": [11, 12, 13] }
            },
            {
              "sid": 11, "name": "/dev/vda1", "kind": "partition",
              "block": { "size": "1 GiB" }, "partition": { "number": 1 }
            },
            {
              "sid": 12, "name": "/dev/vda2", "kind": "partition",
              "block": { "size": "40 GiB", "shrinking": { "supported": "20 GiB" } },
              "partition": { "number": 2 }
            },
            {
              "sid": 13, "name": "/dev/vda3", "kind": "partition",
              "block": { "size": "30 GiB" }, "partition": { "number": 3 }
            },
            { "sid": 20, "name": "/dev/vdb", "kind": "disk", "block": { "size": "50 GiB" } }
          ]
        }
    "#};

    fn settings(contents: &str) -> serde_json::Value {
        let graph = DeviceGraph::from_json(GRAPH).unwrap();
        let config = wire::import_config(contents, &ProductConfig::default()).unwrap();
        let resolution = resolve_config(&config, &graph);
        serde_json::to_value(build_settings(&resolution.config, &graph)).unwrap()
    }

    #[test]
    fn test_unresolved_drive_has_no_volumes() {
        let settings = settings(indoc! {r#"
            {
              "drives": [
                {
                  "search": { "condition": { "name": "/dev/nvme9n1" }, "ifNotFound": "skip" },
                  "partitions": [{ "filesystem": { "path": "/srv", "type": "xfs" } }]
                },
                {
                  "search": { "condition": { "name": "/dev/nvme8n1" } },
                  "filesystem": { "path": "/data", "type": "xfs" },
                  "partitions": [{ "filesystem": { "path": "/home", "type": "xfs" } }]
                }
              ],
              "mdRaids": [
                {
                  "search": { "condition": { "name": "/dev/md9" }, "ifNotFound": "skip" },
                  "partitions": [{ "filesystem": { "path": "/var", "type": "xfs" } }]
                },
                {
                  "search": { "condition": { "name": "/dev/md8" }, "ifNotFound": "create" },
                  "partitions": [{ "filesystem": { "path": "/opt", "type": "xfs" } }]
                }
              ]
            }
        "#});

        assert_eq!(settings["targetDevices"], json!([]));
        assert_eq!(settings["spaceActions"], json!([]));
        assert_eq!(
            settings["volumes"],
            json!([{ "mountPath": "/opt", "fsType": "xfs", "minSize": 0 }])
        );
    }

    #[test]
    fn test_delete_policy() {
        let settings = settings(indoc! {r#"
            {
              "drives": [
                {
                  "search": "/dev/vda",
                  "partitions": [
                    { "search": "*", "delete": true },
                    { "filesystem": { "path": "/", "type": "ext4" }, "size": "20 GiB" }
                  ]
                },
                { "search": "/dev/vdb", "filesystem": { "path": "/srv", "type": "xfs" } }
              ]
            }
        "#});

        assert_eq!(settings["targetDevices"], json!(["/dev/vda", "/dev/vdb"]));
        assert_eq!(
            settings["spaceActions"],
            json!([
                { "device": "/dev/vda1", "action": "forceDelete" },
                { "device": "/dev/vda2", "action": "forceDelete" },
                { "device": "/dev/vda3", "action": "forceDelete" }
            ])
        );
        assert_eq!(
            settings["volumes"],
            json!([
                {
                    "mountPath": "/",
                    "fsType": "ext4",
                    "minSize": 20u64 << 30,
                    "maxSize": 20u64 << 30
                },
                {
                    "mountPath": "/srv",
                    "fsType": "xfs",
                    "minSize": 50u64 << 30,
                    "maxSize": 50u64 << 30,
                    "device": "/dev/vdb"
                }
            ])
        );
        assert_eq!(
            settings["boot"],
            json!({ "configure": true, "device": "/dev/vda" })
        );
    }

    #[test]
    fn test_resize_policy() {
        let settings = settings(indoc! {r#"
            {
              "drives": [
                {
                  "search": "/dev/vda",
                  "partitions": [{ "search": "*", "size": { "min": 0, "max": "current" } }]
                }
              ]
            }
        "#});

        assert_eq!(
            settings["spaceActions"],
            json!([{ "device": "/dev/vda2", "action": "resize" }])
        );
    }

    #[test]
    fn test_custom_policy() {
        let settings = settings(indoc! {r#"
            {
              "drives": [
                {
                  "search": "/dev/vda",
                  "partitions": [
                    { "search": { "condition": { "number": 3 } }, "deleteIfNeeded": true },
                    { "search": { "condition": { "number": 1 } }, "delete": true },
                    {
                      "search": { "condition": { "number": 2 } },
                      "size": { "min": "10 GiB", "max": "current" },
                      "filesystem": { "path": "/home", "reuseIfPossible": true }
                    }
                  ]
                }
              ]
            }
        "#});

        assert_eq!(
            settings["spaceActions"],
            json!([
                { "device": "/dev/vda3", "action": "delete" },
                { "device": "/dev/vda1", "action": "forceDelete" },
                { "device": "/dev/vda2", "action": "resize" }
            ])
        );
        assert_eq!(
            settings["volumes"],
            json!([{
                "mountPath": "/home",
                "minSize": 10u64 << 30,
                "maxSize": 40u64 << 30,
                "device": "/dev/vda2",
                "reuse": true
            }])
        );
    }

    #[test]
    fn test_encryption_and_logical_volumes() {
        let settings = settings(indoc! {r#"
            {
              "boot": { "configure": false },
              "drives": [{ "search": "/dev/vdb", "alias": "pv" }],
              "volumeGroups": [
                {
                  "name": "system",
                  "physicalVolumes": [
                    { "generate": { "targetDevices": ["pv"], "encryption": { "luks2": { "password": "s3cr3t" } } } }
                  ],
                  "logicalVolumes": [
                    { "filesystem": { "path": "/", "type": { "btrfs": { "snapshots": true } } }, "size": ["5 GiB"] }
                  ]
                }
              ]
            }
        "#});

        assert_eq!(
            settings["encryption"],
            json!({ "method": "luks2", "password": "s3cr3t" })
        );
        assert_eq!(settings["boot"], json!({ "configure": false }));
        assert_eq!(settings["spaceActions"], json!([]));
        assert_eq!(
            settings["volumes"],
            json!([{
                "mountPath": "/",
                "fsType": "btrfs",
                "snapshots": true,
                "minSize": 5u64 << 30
            }])
        );
    }
}
