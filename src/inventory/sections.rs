use serde::Serialize;

use diskplan_api::{
    devicegraph::{
        Device, DeviceCapabilities, DeviceGraph, PtableType, Shrinking, Sid, UnusedSlot,
    },
    primitives::bytes::ByteCount,
};

/// A group of properties rendered for devices exposing a capability.
pub trait Section: Sized {
    /// Capabilities a device needs for the section to be rendered.
    const REQUIRES: DeviceCapabilities;

    fn convert(device: &Device, graph: &DeviceGraph) -> Option<Self>;

    /// Renders the section when the device qualifies for it.
    fn from_device(device: &Device, graph: &DeviceGraph) -> Option<Self> {
        if !device.capabilities().contains(Self::REQUIRES) {
            return None;
        }
        Self::convert(device, graph)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockSection {
    pub start: u64,
    pub size: ByteCount,
    pub active: bool,
    pub encrypted: bool,
    pub udev_ids: Vec<String>,
    pub udev_paths: Vec<String>,
    pub systems: Vec<String>,
    pub shrinking: Shrinking,
}

impl Section for BlockSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::BLOCK;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        let block = device.block.as_ref()?;
        Some(Self {
            start: block.start,
            size: block.size,
            active: block.active,
            encrypted: block.encrypted,
            udev_ids: block.udev_ids.clone(),
            udev_paths: block.udev_paths.clone(),
            systems: block.systems.clone(),
            shrinking: block.shrinking.clone(),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveSection {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub drive_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub driver: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    pub sd_card: bool,
    pub dell_boss: bool,
}

impl Section for DriveSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::DRIVE;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        let drive = device.drive.clone().unwrap_or_default();
        Some(Self {
            drive_type: drive.drive_type,
            vendor: drive.vendor,
            model: drive.model,
            driver: drive.driver,
            bus: drive.bus,
            bus_id: drive.bus_id,
            transport: drive.transport,
            sd_card: drive.sd_card,
            dell_boss: drive.dell_boss,
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemSection {
    pub sid: Sid,
    #[serde(rename = "type")]
    pub fs_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Section for FilesystemSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::FILESYSTEM;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        let filesystem = device.filesystem.as_ref()?;
        Some(Self {
            sid: filesystem.sid,
            fs_type: filesystem.fs_type.clone(),
            mount_path: filesystem.mount_path.clone(),
            label: filesystem.label.clone(),
        })
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSection {
    pub efi: bool,
}

impl Section for PartitionSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::PARTITION;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        device
            .partition
            .as_ref()
            .map(|partition| Self { efi: partition.efi })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartitionTableSection {
    #[serde(rename = "type")]
    pub ptable_type: PtableType,
    pub partitions: Vec<Sid>,
    pub unused_slots: Vec<UnusedSlot>,
}

impl Section for PartitionTableSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::PARTITION_TABLE;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        let table = device.partition_table.as_ref()?;
        Some(Self {
            ptable_type: table.ptable_type,
            partitions: table.partitions.clone(),
            unused_slots: table.unused_slots.clone(),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MdSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub level: String,
    pub devices: Vec<Sid>,
}

impl Section for MdSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::MD;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        let md = device.md.as_ref()?;
        Some(Self {
            uuid: md.uuid.clone(),
            level: md.level.clone(),
            devices: md.devices.clone(),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultipathSection {
    pub wire_names: Vec<String>,
}

impl Section for MultipathSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::MULTIPATH;

    fn convert(device: &Device, graph: &DeviceGraph) -> Option<Self> {
        let multipath = device.multipath.as_ref()?;
        Some(Self {
            wire_names: multipath
                .wires
                .iter()
                .filter_map(|sid| graph.get(*sid))
                .map(|wire| wire.name.clone())
                .collect(),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeGroupSection {
    pub size: ByteCount,
    pub physical_volumes: Vec<Sid>,
}

impl Section for VolumeGroupSection {
    const REQUIRES: DeviceCapabilities = DeviceCapabilities::VOLUME_GROUP;

    fn convert(device: &Device, _graph: &DeviceGraph) -> Option<Self> {
        let volume_group = device.volume_group.as_ref()?;
        Some(Self {
            size: volume_group.size,
            physical_volumes: volume_group.physical_volumes.clone(),
        })
    }
}
