//! Display form of a device graph, independent of any layout.
//!
//! Every device renders its identity plus the sections it qualifies for.
//! Partitions and logical volumes are nested under their owner.

use log::trace;
use serde::Serialize;

use diskplan_api::devicegraph::{Device, DeviceGraph, DeviceKind, Sid};

mod sections;

pub use sections::{
    BlockSection, DriveSection, FilesystemSection, MdSection, MultipathSection, PartitionSection,
    PartitionTableSection, Section, VolumeGroupSection,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDevice {
    pub sid: Sid,
    pub name: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive: Option<DriveSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_table: Option<PartitionTableSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub md: Option<MdSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipath: Option<MultipathSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_group: Option<VolumeGroupSection>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<InventoryDevice>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logical_volumes: Vec<InventoryDevice>,
}

impl InventoryDevice {
    pub fn new(device: &Device, graph: &DeviceGraph) -> Self {
        trace!("Converting device '{}' ({})", device.name, device.sid);
        Self {
            sid: device.sid,
            name: device.name.clone(),
            description: description(device),
            block: Section::from_device(device, graph),
            drive: Section::from_device(device, graph),
            filesystem: Section::from_device(device, graph),
            partition: Section::from_device(device, graph),
            partition_table: Section::from_device(device, graph),
            md: Section::from_device(device, graph),
            multipath: Section::from_device(device, graph),
            volume_group: Section::from_device(device, graph),
            partitions: graph
                .partitions_of(device.sid)
                .into_iter()
                .map(|p| Self::new(p, graph))
                .collect(),
            logical_volumes: graph
                .logical_volumes_of(device.sid)
                .into_iter()
                .map(|lv| Self::new(lv, graph))
                .collect(),
        }
    }
}

/// Converts the top-level devices (disk-like devices, MD RAIDs and volume
/// groups), ordered by sid.
pub fn build_inventory(graph: &DeviceGraph) -> Vec<InventoryDevice> {
    let mut devices: Vec<&Device> = graph
        .disk_devices()
        .into_iter()
        .chain(graph.md_raids())
        .chain(graph.volume_groups())
        .collect();
    devices.sort_by_key(|d| d.sid);

    devices
        .into_iter()
        .map(|d| InventoryDevice::new(d, graph))
        .collect()
}

fn description(device: &Device) -> String {
    if let Some(description) = &device.description {
        return description.clone();
    }

    let model = device.drive.as_ref().and_then(|drive| {
        let parts: Vec<&str> = [drive.vendor.as_deref(), drive.model.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    });
    if let Some(model) = model {
        return model;
    }

    match device.kind {
        DeviceKind::Disk => "Disk",
        DeviceKind::Multipath => "Multipath device",
        DeviceKind::Dasd => "DASD device",
        DeviceKind::StrayBlockDevice => "Block device",
        DeviceKind::Partition => match &device.filesystem {
            Some(filesystem) => return format!("{} partition", filesystem.fs_type),
            None => "Partition",
        },
        DeviceKind::MdRaid => "Software RAID",
        DeviceKind::VolumeGroup => "LVM volume group",
        DeviceKind::LogicalVolume => "LVM logical volume",
    }
    .to_owned()
}
