//! # Device graph snapshot
//!
//! Read-only inventory of the devices present on the target machine, as
//! reported by an external probe. The snapshot is deserialized from JSON and
//! validated by [`DeviceGraphBuilder`]:
//! - Every device sid is unique.
//! - Every reference (partition table entries, MD members, multipath wires,
//!   physical and logical volumes) points to an existing device of an
//!   acceptable kind.
//! - Every device is owned by at most one partition table or volume group.
//!
//! A [`DeviceGraph`] is never mutated after it has been built.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::{
    constants::{DEV_DISK_BY_ID, DEV_DISK_BY_PATH},
    error::{DiskplanError, InvalidInputError, ReportError},
    primitives::bytes::ByteCount,
};

/// Stable surrogate identity of a device. Survives re-probing even when the
/// display name changes.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct Sid(pub u32);

impl Display for Sid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DeviceKind {
    Disk,
    Multipath,
    Dasd,
    StrayBlockDevice,
    Partition,
    MdRaid,
    VolumeGroup,
    LogicalVolume,
}

impl DeviceKind {
    /// Whether devices of this kind are candidates for drive searches.
    pub fn is_disk_like(self) -> bool {
        matches!(
            self,
            Self::Disk | Self::Multipath | Self::Dasd | Self::StrayBlockDevice
        )
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(<&str>::from(self))
    }
}

bitflags::bitflags! {
    /// Capabilities exposed by a device record.
    #[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceCapabilities: u32 {
        const BLOCK = 1;
        const DRIVE = 1 << 1;
        const PARTITION = 1 << 2;
        const PARTITION_TABLE = 1 << 3;
        const FILESYSTEM = 1 << 4;
        const MD = 1 << 5;
        const MULTIPATH = 1 << 6;
        const VOLUME_GROUP = 1 << 7;
        const LOGICAL_VOLUME = 1 << 8;
        const ENCRYPTED = 1 << 9;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PtableType {
    Gpt,
    Msdos,
    Dasd,
}

/// Whether an existing device can be shrunk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Shrinking {
    /// The device can be shrunk by up to the given amount.
    Supported(ByteCount),
    /// The device cannot be shrunk, for the given reasons.
    Unsupported(Vec<String>),
}

impl Default for Shrinking {
    fn default() -> Self {
        Shrinking::Unsupported(Vec::new())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    #[serde(default)]
    pub start: u64,
    pub size: ByteCount,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub udev_ids: Vec<String>,
    #[serde(default)]
    pub udev_paths: Vec<String>,
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub shrinking: Shrinking,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveInfo {
    #[serde(rename = "type", default)]
    pub drive_type: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub driver: Vec<String>,
    #[serde(default)]
    pub bus: Option<String>,
    #[serde(default)]
    pub bus_id: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub sd_card: bool,
    #[serde(default)]
    pub dell_boss: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub number: u32,
    #[serde(default)]
    pub efi: bool,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnusedSlot {
    pub start: u64,
    pub size: ByteCount,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionTableInfo {
    #[serde(rename = "type")]
    pub ptable_type: PtableType,
    #[serde(default)]
    pub partitions: Vec<Sid>,
    #[serde(default)]
    pub unused_slots: Vec<UnusedSlot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemInfo {
    pub sid: Sid,
    #[serde(rename = "type")]
    pub fs_type: String,
    #[serde(default)]
    pub mount_path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MdInfo {
    #[serde(default)]
    pub uuid: Option<String>,
    pub level: String,
    #[serde(default)]
    pub devices: Vec<Sid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultipathInfo {
    pub wires: Vec<Sid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeGroupInfo {
    pub size: ByteCount,
    #[serde(default)]
    pub physical_volumes: Vec<Sid>,
    #[serde(default)]
    pub logical_volumes: Vec<Sid>,
}

/// One device record of the snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub sid: Sid,
    pub name: String,
    pub kind: DeviceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<DriveInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_table: Option<PartitionTableInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md: Option<MdInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipath: Option<MultipathInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_group: Option<VolumeGroupInfo>,
}

impl Device {
    pub fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::empty();
        caps.set(DeviceCapabilities::BLOCK, self.block.is_some());
        caps.set(
            DeviceCapabilities::DRIVE,
            self.drive.is_some() || self.kind.is_disk_like(),
        );
        caps.set(
            DeviceCapabilities::PARTITION,
            self.kind == DeviceKind::Partition && self.partition.is_some(),
        );
        caps.set(
            DeviceCapabilities::PARTITION_TABLE,
            self.partition_table.is_some(),
        );
        caps.set(DeviceCapabilities::FILESYSTEM, self.filesystem.is_some());
        caps.set(
            DeviceCapabilities::MD,
            self.kind == DeviceKind::MdRaid && self.md.is_some(),
        );
        caps.set(
            DeviceCapabilities::MULTIPATH,
            self.kind == DeviceKind::Multipath && self.multipath.is_some(),
        );
        caps.set(
            DeviceCapabilities::VOLUME_GROUP,
            self.kind == DeviceKind::VolumeGroup && self.volume_group.is_some(),
        );
        caps.set(
            DeviceCapabilities::LOGICAL_VOLUME,
            self.kind == DeviceKind::LogicalVolume,
        );
        caps.set(
            DeviceCapabilities::ENCRYPTED,
            self.block.as_ref().is_some_and(|b| b.encrypted),
        );
        caps
    }

    /// Size of the device. Volume groups report their total size.
    pub fn size(&self) -> ByteCount {
        self.block
            .as_ref()
            .map(|b| b.size)
            .or_else(|| self.volume_group.as_ref().map(|vg| vg.size))
            .unwrap_or_default()
    }

    /// Partition number, for partitions.
    pub fn number(&self) -> Option<u32> {
        self.partition.as_ref().map(|p| p.number)
    }

    /// Exact, case-sensitive name match against the kernel name and the
    /// udev by-id/by-path links.
    pub fn matches_name(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }

        let Some(block) = &self.block else {
            return false;
        };

        let link_matches = |dir: &str, links: &[String]| {
            name.strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .is_some_and(|link| links.iter().any(|l| l == link))
        };

        link_matches(DEV_DISK_BY_ID, &block.udev_ids)
            || link_matches(DEV_DISK_BY_PATH, &block.udev_paths)
    }

    pub fn shrinking_supported(&self) -> bool {
        matches!(
            self.block.as_ref().map(|b| &b.shrinking),
            Some(Shrinking::Supported(_))
        )
    }
}

#[derive(thiserror::Error, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceGraphError {
    #[error("Device sid {sid} is defined more than once")]
    DuplicateSid { sid: Sid },

    #[error("Device '{name}' of kind '{kind}' references non-existent device sid {target}")]
    NonExistentReference {
        name: String,
        kind: DeviceKind,
        target: Sid,
    },

    #[error("Device '{name}' of kind '{kind}' references device '{target_name}' of invalid kind '{target_kind}'")]
    InvalidReferenceKind {
        name: String,
        kind: DeviceKind,
        target_name: String,
        target_kind: DeviceKind,
    },

    #[error("Device '{target_name}' is owned by both '{owner_1}' and '{owner_2}'")]
    OwnedByMultiple {
        target_name: String,
        owner_1: String,
        owner_2: String,
    },
}

/// Serialized form of a snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceGraphSnapshot {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceGraphBuilder {
    devices: Vec<Device>,
}

impl DeviceGraphBuilder {
    pub fn add_device(&mut self, device: Device) {
        self.devices.push(device);
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.add_device(device);
        self
    }

    /// Builds the device graph, checking sid uniqueness and references.
    pub fn build(self) -> Result<DeviceGraph, DeviceGraphError> {
        let mut devices: BTreeMap<Sid, Device> = BTreeMap::new();
        for device in self.devices {
            let sid = device.sid;
            if devices.insert(sid, device).is_some() {
                return Err(DeviceGraphError::DuplicateSid { sid });
            }
        }

        let mut parents: BTreeMap<Sid, Sid> = BTreeMap::new();
        for device in devices.values() {
            if let Some(table) = &device.partition_table {
                for target in &table.partitions {
                    Self::check_reference(&devices, device, *target, &[DeviceKind::Partition])?;
                    Self::claim(&devices, &mut parents, device, *target)?;
                }
            }

            if let Some(vg) = &device.volume_group {
                for target in &vg.logical_volumes {
                    Self::check_reference(
                        &devices,
                        device,
                        *target,
                        &[DeviceKind::LogicalVolume],
                    )?;
                    Self::claim(&devices, &mut parents, device, *target)?;
                }
                for target in &vg.physical_volumes {
                    Self::check_reference(&devices, device, *target, &[])?;
                }
            }

            if let Some(md) = &device.md {
                for target in &md.devices {
                    Self::check_reference(&devices, device, *target, &[])?;
                }
            }

            if let Some(multipath) = &device.multipath {
                for target in &multipath.wires {
                    Self::check_reference(&devices, device, *target, &[])?;
                }
            }

            if let Some(fs) = &device.filesystem {
                // Filesystems carry their own sid, which must not collide
                // with a device sid.
                if fs.sid != device.sid && devices.contains_key(&fs.sid) {
                    return Err(DeviceGraphError::DuplicateSid { sid: fs.sid });
                }
            }
        }

        Ok(DeviceGraph { devices, parents })
    }

    /// Checks that `target` exists and, when `kinds` is not empty, that it is
    /// one of them.
    fn check_reference(
        devices: &BTreeMap<Sid, Device>,
        device: &Device,
        target: Sid,
        kinds: &[DeviceKind],
    ) -> Result<(), DeviceGraphError> {
        let Some(target_device) = devices.get(&target) else {
            return Err(DeviceGraphError::NonExistentReference {
                name: device.name.clone(),
                kind: device.kind,
                target,
            });
        };

        if !kinds.is_empty() && !kinds.contains(&target_device.kind) {
            return Err(DeviceGraphError::InvalidReferenceKind {
                name: device.name.clone(),
                kind: device.kind,
                target_name: target_device.name.clone(),
                target_kind: target_device.kind,
            });
        }

        Ok(())
    }

    fn claim(
        devices: &BTreeMap<Sid, Device>,
        parents: &mut BTreeMap<Sid, Sid>,
        owner: &Device,
        target: Sid,
    ) -> Result<(), DeviceGraphError> {
        if let Some(previous) = parents.insert(target, owner.sid) {
            let name_of = |sid: Sid| {
                devices
                    .get(&sid)
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| sid.to_string())
            };
            return Err(DeviceGraphError::OwnedByMultiple {
                target_name: name_of(target),
                owner_1: name_of(previous),
                owner_2: owner.name.clone(),
            });
        }
        Ok(())
    }
}

/// Validated, immutable device graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceGraph {
    devices: BTreeMap<Sid, Device>,
    /// Owner (partition table or volume group) of each nested device.
    parents: BTreeMap<Sid, Sid>,
}

impl DeviceGraph {
    pub fn from_snapshot(snapshot: DeviceGraphSnapshot) -> Result<Self, DiskplanError> {
        let mut builder = DeviceGraphBuilder::default();
        snapshot
            .devices
            .into_iter()
            .for_each(|d| builder.add_device(d));
        builder
            .build()
            .map_err(|e| DiskplanError::new(InvalidInputError::from(e)))
    }

    pub fn from_json(contents: &str) -> Result<Self, DiskplanError> {
        let snapshot: DeviceGraphSnapshot =
            serde_json::from_str(contents).structured(InvalidInputError::ParseDeviceGraph)?;
        Self::from_snapshot(snapshot)
    }

    pub fn get(&self, sid: Sid) -> Option<&Device> {
        self.devices.get(&sid)
    }

    /// Every device, ordered by sid.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Owner of a partition or logical volume.
    pub fn parent(&self, sid: Sid) -> Option<&Device> {
        self.parents.get(&sid).and_then(|p| self.get(*p))
    }

    /// Devices that can be matched by a drive search. Multipath wires are
    /// hidden behind their multipath device.
    pub fn disk_devices(&self) -> Vec<&Device> {
        let wires: BTreeSet<Sid> = self
            .devices()
            .filter_map(|d| d.multipath.as_ref())
            .flat_map(|m| m.wires.iter().copied())
            .collect();

        self.devices()
            .filter(|d| d.kind.is_disk_like() && !wires.contains(&d.sid))
            .collect()
    }

    pub fn md_raids(&self) -> Vec<&Device> {
        self.of_kind(DeviceKind::MdRaid)
    }

    pub fn volume_groups(&self) -> Vec<&Device> {
        self.of_kind(DeviceKind::VolumeGroup)
    }

    fn of_kind(&self, kind: DeviceKind) -> Vec<&Device> {
        self.devices().filter(|d| d.kind == kind).collect()
    }

    /// Existing partitions of a partitioned device, in table order.
    pub fn partitions_of(&self, sid: Sid) -> Vec<&Device> {
        self.resolve_all(
            self.get(sid)
                .and_then(|d| d.partition_table.as_ref())
                .map(|t| t.partitions.as_slice()),
        )
    }

    pub fn logical_volumes_of(&self, sid: Sid) -> Vec<&Device> {
        self.resolve_all(
            self.get(sid)
                .and_then(|d| d.volume_group.as_ref())
                .map(|vg| vg.logical_volumes.as_slice()),
        )
    }

    fn resolve_all(&self, sids: Option<&[Sid]>) -> Vec<&Device> {
        sids.unwrap_or_default()
            .iter()
            .filter_map(|sid| self.get(*sid))
            .collect()
    }
}
