//! Resolved view of a solved layout.
//!
//! Only entities that will exist after installation are kept: drives bound to
//! a device, MD RAIDs that were found or will be created, and partitions that
//! were found or will be created. Everything else is dropped from the view.

use serde::Serialize;

use diskplan_api::{
    config::{
        Config, ConfigNode, Drive, Encryption, Filesystem, FilesystemType, LogicalVolume, MdRaid,
        Partition, PartitionId, Size, SizeMax, VolumeGroup,
    },
    constants::ROOT_MOUNT_POINT_PATH,
    devicegraph::{DeviceGraph, PtableType, Sid},
    primitives::bytes::ByteCount,
    product::ProductConfig,
};

use crate::{
    resolver::boot_device,
    space_policy::{self, SpacePolicy},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub boot: BootModel,

    /// Encryption of the root volume, or the first one found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionModel>,

    pub drives: Vec<DriveModel>,
    pub md_raids: Vec<MdRaidModel>,
    pub volume_groups: Vec<VolumeGroupModel>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootModel {
    pub configure: bool,
    pub device: BootDeviceModel,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootDeviceModel {
    pub default: bool,

    /// Name of the device the boot alias resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionModel {
    pub method: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveModel {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemModel>,

    pub space_policy: SpacePolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptable_type: Option<PtableType>,

    pub partitions: Vec<PartitionModel>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MdRaidModel {
    /// Device name when found, the requested name otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemModel>,

    pub space_policy: SpacePolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptable_type: Option<PtableType>,

    pub partitions: Vec<PartitionModel>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<PartitionId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemModel>,

    pub size: SizeModel,
    pub delete: bool,
    pub delete_if_needed: bool,
    pub resize: bool,
    pub resize_if_needed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemModel {
    pub reuse: bool,

    /// The type is the one the product proposes for the mount path.
    pub default: bool,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SizeModel {
    pub default: bool,
    pub min: ByteCount,

    /// Absent when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<ByteCount>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeGroupModel {
    pub vg_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent_size: Option<ByteCount>,

    pub target_devices: Vec<String>,
    pub logical_volumes: Vec<LogicalVolumeModel>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogicalVolumeModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lv_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemModel>,

    pub size: SizeModel,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripes: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_size: Option<ByteCount>,
}

impl SizeModel {
    /// Bounds left as "current" take the size of `current`, or zero for the
    /// lower bound and unlimited for the upper one without a device.
    fn new(size: &Size, current: Option<ByteCount>) -> Self {
        let size = match current {
            Some(current) => size.with_current(current),
            None => *size,
        };
        Self {
            default: size.default,
            min: size.min.unwrap_or_default(),
            max: match size.max {
                Some(SizeMax::Bytes(max)) => Some(max),
                Some(SizeMax::Unlimited) | None => None,
            },
        }
    }
}

/// Builds the resolved view of a layout solved against `graph`.
pub fn build_model(config: &Config, graph: &DeviceGraph, product: &ProductConfig) -> Model {
    ModelBuilder { graph, product }.build(config)
}

struct ModelBuilder<'a> {
    graph: &'a DeviceGraph,
    product: &'a ProductConfig,
}

impl ModelBuilder<'_> {
    fn build(&self, config: &Config) -> Model {
        Model {
            boot: self.boot(config),
            encryption: encryption(config).map(|e| EncryptionModel {
                method: e.method.map(|m| m.name()).unwrap_or_default(),
                password: e.password.clone(),
            }),
            drives: config.drives.iter().filter_map(|d| self.drive(d)).collect(),
            md_raids: config
                .md_raids
                .iter()
                .filter_map(|md| self.md_raid(md))
                .collect(),
            volume_groups: config
                .volume_groups
                .iter()
                .map(|vg| self.volume_group(vg))
                .collect(),
        }
    }

    fn device_name(&self, sid: Option<Sid>) -> Option<String> {
        sid.and_then(|sid| self.graph.get(sid)).map(|d| d.name.clone())
    }

    fn device_size(&self, sid: Option<Sid>) -> Option<ByteCount> {
        sid.and_then(|sid| self.graph.get(sid)).map(|d| d.size())
    }

    fn boot(&self, config: &Config) -> BootModel {
        BootModel {
            configure: config.boot.configure,
            device: BootDeviceModel {
                default: config.boot.device.default,
                name: self.device_name(boot_device(config)),
            },
        }
    }

    fn drive(&self, drive: &Drive) -> Option<DriveModel> {
        let name = self.device_name(drive.found_device())?;
        Some(DriveModel {
            name,
            alias: drive.alias.clone(),
            mount_path: mount_path(drive.filesystem.as_ref()),
            filesystem: self.filesystem(drive.filesystem.as_ref()),
            space_policy: space_policy::classify(ConfigNode::Drive(drive)),
            ptable_type: drive.ptable_type,
            partitions: self.partitions(&drive.partitions),
        })
    }

    fn md_raid(&self, md: &MdRaid) -> Option<MdRaidModel> {
        if md.found_device().is_none() && !md.is_new() {
            return None;
        }
        Some(MdRaidModel {
            name: self
                .device_name(md.found_device())
                .or_else(|| md.name.clone()),
            alias: md.alias.clone(),
            mount_path: mount_path(md.filesystem.as_ref()),
            filesystem: self.filesystem(md.filesystem.as_ref()),
            space_policy: space_policy::classify(ConfigNode::MdRaid(md)),
            ptable_type: md.ptable_type,
            partitions: self.partitions(&md.partitions),
        })
    }

    fn partitions(&self, partitions: &[Partition]) -> Vec<PartitionModel> {
        partitions
            .iter()
            .filter(|p| (p.is_new() && !p.is_delete_marker()) || p.found_device().is_some())
            .map(|p| self.partition(p))
            .collect()
    }

    fn partition(&self, partition: &Partition) -> PartitionModel {
        let found = partition.found_device();
        let changes_size = found.is_some() && !partition.size.default;
        PartitionModel {
            name: self.device_name(found),
            alias: partition.alias.clone(),
            id: partition.id,
            mount_path: mount_path(partition.filesystem.as_ref()),
            filesystem: self.filesystem(partition.filesystem.as_ref()),
            size: SizeModel::new(&partition.size, self.device_size(found)),
            delete: partition.delete,
            delete_if_needed: partition.delete_if_needed,
            resize: changes_size && partition.size.is_exact(),
            resize_if_needed: changes_size && !partition.size.is_exact(),
        }
    }

    fn volume_group(&self, volume_group: &VolumeGroup) -> VolumeGroupModel {
        VolumeGroupModel {
            vg_name: volume_group.name.clone(),
            extent_size: volume_group.extent_size,
            target_devices: volume_group.physical_volumes_devices.clone(),
            logical_volumes: volume_group
                .logical_volumes
                .iter()
                .map(|lv| self.logical_volume(lv))
                .collect(),
        }
    }

    fn logical_volume(&self, logical_volume: &LogicalVolume) -> LogicalVolumeModel {
        LogicalVolumeModel {
            lv_name: logical_volume.name.clone(),
            alias: logical_volume.alias.clone(),
            mount_path: mount_path(logical_volume.filesystem.as_ref()),
            filesystem: self.filesystem(logical_volume.filesystem.as_ref()),
            size: SizeModel::new(&logical_volume.size, None),
            stripes: logical_volume.stripes,
            stripe_size: logical_volume.stripe_size,
        }
    }

    fn filesystem(&self, filesystem: Option<&Filesystem>) -> Option<FilesystemModel> {
        let filesystem = filesystem?;
        let proposed = match filesystem.path.as_deref() {
            Some(path) => self.product.template_for(path),
            None => self.product.fallback_template(),
        }
        .and_then(|t| t.fs_type());

        Some(FilesystemModel {
            reuse: filesystem.reuse,
            default: filesystem.fs_type.is_some() && filesystem.fs_type == proposed,
            fs_type: filesystem.fs_type.map(|t| self.fs_type_name(filesystem, t)),
            label: filesystem.label.clone(),
        })
    }

    fn fs_type_name(&self, filesystem: &Filesystem, fs_type: FilesystemType) -> String {
        match fs_type {
            FilesystemType::Btrfs { snapshots: true }
                if filesystem.is_root() && self.product.root_read_only() =>
            {
                "btrfsImmutable".to_owned()
            }
            FilesystemType::Btrfs { snapshots: true } => "btrfsSnapshots".to_owned(),
            other => other.name().to_owned(),
        }
    }
}

fn mount_path(filesystem: Option<&Filesystem>) -> Option<String> {
    filesystem.and_then(|f| f.path.clone())
}

/// Encryption of the entity holding the root filesystem. Without one, the
/// first encrypted drive or partition, then the first encrypted physical
/// volumes.
pub(crate) fn encryption(config: &Config) -> Option<&Encryption> {
    let has_method = |e: &&Encryption| e.method.is_some();
    let is_root = |f: Option<&Filesystem>| f.is_some_and(Filesystem::is_root);

    let root = config
        .node_with_mount_path(ROOT_MOUNT_POINT_PATH)
        .and_then(|node| match node {
            ConfigNode::Drive(drive) if is_root(drive.filesystem.as_ref()) => {
                drive.encryption.as_ref()
            }
            ConfigNode::MdRaid(md) if is_root(md.filesystem.as_ref()) => md.encryption.as_ref(),
            ConfigNode::VolumeGroup(vg) => vg
                .logical_volumes
                .iter()
                .find(|lv| lv.mount_path() == Some(ROOT_MOUNT_POINT_PATH))
                .and_then(|lv| lv.encryption.as_ref()),
            node => node
                .partitions()
                .unwrap_or_default()
                .iter()
                .find(|p| p.mount_path() == Some(ROOT_MOUNT_POINT_PATH))
                .and_then(|p| p.encryption.as_ref()),
        })
        .filter(has_method);

    root.or_else(|| {
        config
            .nodes()
            .flat_map(|node| {
                let direct = match node {
                    ConfigNode::Drive(drive) => drive.encryption.as_ref(),
                    ConfigNode::MdRaid(md) => md.encryption.as_ref(),
                    ConfigNode::VolumeGroup(_) => None,
                };
                direct.into_iter().chain(
                    node.partitions()
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|p| p.encryption.as_ref()),
                )
            })
            .find(has_method)
    })
    .or_else(|| {
        config
            .volume_groups
            .iter()
            .filter_map(|vg| vg.physical_volumes_encryption.as_ref())
            .find(has_method)
    })
}
