use serde::{Deserialize, Serialize};

use crate::{
    config::{Drive, MdLevel, MdRaid, Partition, PartitionId},
    devicegraph::PtableType,
    is_default,
    primitives::bytes::ByteCount,
};

use super::{
    encryption::EncryptionJson, filesystem::FilesystemJson, generate::GenerateJson,
    search::SearchJson, size::SizeJson, ConfigImporter,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveJson {
    /// Absent means the first available disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptable_type: Option<PtableType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionJson>,
}

/// A partition entry, or a `generate` entry expanding to the product
/// volumes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartitionJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<GenerateJson>,

    /// Absent means a new partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PartitionId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeJson>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub delete: bool,

    #[serde(default, skip_serializing_if = "is_default")]
    pub delete_if_needed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemJson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MdRaidJson {
    /// Absent means a new RAID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<MdLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<ByteCount>,

    /// Aliases of the member devices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptable_type: Option<PtableType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionJson>,
}

impl ConfigImporter<'_> {
    pub(super) fn import_drive(&mut self, json: DriveJson) -> Drive {
        Drive {
            search: json.search.map(Into::into).unwrap_or_default(),
            alias: json.alias,
            encryption: self.import_encryption(json.encryption),
            filesystem: self.import_filesystem(json.filesystem),
            ptable_type: json.ptable_type,
            partitions: self.import_partitions(json.partitions),
        }
    }

    pub(super) fn import_md_raid(&mut self, json: MdRaidJson) -> MdRaid {
        MdRaid {
            search: json.search.map(Into::into),
            alias: json.alias,
            name: json.name,
            level: json.level,
            chunk_size: json.chunk_size,
            devices: json.devices,
            encryption: self.import_encryption(json.encryption),
            filesystem: self.import_filesystem(json.filesystem),
            ptable_type: json.ptable_type,
            partitions: self.import_partitions(json.partitions),
        }
    }

    fn import_partitions(&mut self, entries: Vec<PartitionJson>) -> Vec<Partition> {
        let mut partitions = Vec::new();
        for entry in entries {
            match entry.generate {
                Some(generate) => partitions.extend(self.generate_partitions(generate)),
                None => partitions.push(self.import_partition(entry)),
            }
        }
        partitions
    }

    fn import_partition(&self, json: PartitionJson) -> Partition {
        let filesystem = self.import_filesystem(json.filesystem);
        let size = self.import_size(
            json.size,
            filesystem.as_ref().and_then(|f| f.path.as_deref()),
        );
        Partition {
            search: json.search.map(Into::into),
            alias: json.alias,
            id: json.id,
            size,
            delete: json.delete,
            delete_if_needed: json.delete_if_needed,
            encryption: self.import_encryption(json.encryption),
            filesystem,
        }
    }
}

impl DriveJson {
    pub fn export(drive: &Drive) -> Self {
        Self {
            search: SearchJson::export(&drive.search, false),
            alias: drive.alias.clone(),
            encryption: drive.encryption.as_ref().and_then(EncryptionJson::export),
            filesystem: drive.filesystem.as_ref().map(FilesystemJson::export),
            ptable_type: drive.ptable_type,
            partitions: drive.partitions.iter().map(PartitionJson::export).collect(),
        }
    }
}

impl PartitionJson {
    /// A search equal to the default is kept, its absence would turn the
    /// partition into a new one.
    pub fn export(partition: &Partition) -> Self {
        Self {
            generate: None,
            search: partition
                .search
                .as_ref()
                .and_then(|s| SearchJson::export(s, true)),
            alias: partition.alias.clone(),
            id: partition.id,
            size: SizeJson::export(&partition.size),
            delete: partition.delete,
            delete_if_needed: partition.delete_if_needed,
            encryption: partition.encryption.as_ref().and_then(EncryptionJson::export),
            filesystem: partition.filesystem.as_ref().map(FilesystemJson::export),
        }
    }
}

impl MdRaidJson {
    pub fn export(md: &MdRaid) -> Self {
        Self {
            search: md.search.as_ref().and_then(|s| SearchJson::export(s, true)),
            alias: md.alias.clone(),
            name: md.name.clone(),
            level: md.level,
            chunk_size: md.chunk_size,
            devices: md.devices.clone(),
            encryption: md.encryption.as_ref().and_then(EncryptionJson::export),
            filesystem: md.filesystem.as_ref().map(FilesystemJson::export),
            ptable_type: md.ptable_type,
            partitions: md.partitions.iter().map(PartitionJson::export).collect(),
        }
    }
}
