use serde::{Deserialize, Serialize};

use crate::{
    config::{LogicalVolume, VolumeGroup},
    is_default,
    primitives::bytes::ByteCount,
};

use super::{
    encryption::EncryptionJson, filesystem::FilesystemJson, generate::GenerateJson,
    size::SizeJson, ConfigImporter,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeGroupJson {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent_size: Option<ByteCount>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub physical_volumes: Vec<PhysicalVolumeJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logical_volumes: Vec<LogicalVolumeJson>,
}

/// An existing physical volume by alias, or devices on which new physical
/// volumes are created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PhysicalVolumeJson {
    Alias(String),
    Generate { generate: PvGenerateJson },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PvGenerateJson {
    Aliases(Vec<String>),
    Settings(PvGenerateSettingsJson),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PvGenerateSettingsJson {
    #[serde(default)]
    pub target_devices: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionJson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogicalVolumeJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<GenerateJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripes: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_size: Option<ByteCount>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub pool: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_pool: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionJson>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<FilesystemJson>,
}

impl ConfigImporter<'_> {
    pub(super) fn import_volume_group(&mut self, json: VolumeGroupJson) -> VolumeGroup {
        let mut volume_group = VolumeGroup {
            name: json.name,
            extent_size: json.extent_size,
            ..Default::default()
        };

        for physical_volume in json.physical_volumes {
            match physical_volume {
                PhysicalVolumeJson::Alias(alias) => volume_group.physical_volumes.push(alias),
                PhysicalVolumeJson::Generate {
                    generate: PvGenerateJson::Aliases(aliases),
                } => volume_group.physical_volumes_devices.extend(aliases),
                PhysicalVolumeJson::Generate {
                    generate: PvGenerateJson::Settings(settings),
                } => {
                    volume_group
                        .physical_volumes_devices
                        .extend(settings.target_devices);
                    if let Some(encryption) = self.import_encryption(settings.encryption) {
                        volume_group.physical_volumes_encryption = Some(encryption);
                    }
                }
            }
        }

        for entry in json.logical_volumes {
            match entry.generate {
                Some(generate) => volume_group
                    .logical_volumes
                    .extend(self.generate_logical_volumes(generate)),
                None => volume_group
                    .logical_volumes
                    .push(self.import_logical_volume(entry)),
            }
        }

        volume_group
    }

    fn import_logical_volume(&self, json: LogicalVolumeJson) -> LogicalVolume {
        let filesystem = self.import_filesystem(json.filesystem);
        let size = self.import_size(
            json.size,
            filesystem.as_ref().and_then(|f| f.path.as_deref()),
        );
        LogicalVolume {
            alias: json.alias,
            name: json.name,
            size,
            stripes: json.stripes,
            stripe_size: json.stripe_size,
            pool: json.pool,
            used_pool: json.used_pool,
            encryption: self.import_encryption(json.encryption),
            filesystem,
        }
    }
}

impl VolumeGroupJson {
    /// New physical volumes are written as a `generate` entry, in its object
    /// form when they are encrypted.
    pub fn export(volume_group: &VolumeGroup) -> Self {
        let mut physical_volumes: Vec<PhysicalVolumeJson> = volume_group
            .physical_volumes
            .iter()
            .cloned()
            .map(PhysicalVolumeJson::Alias)
            .collect();

        if !volume_group.physical_volumes_devices.is_empty() {
            let devices = volume_group.physical_volumes_devices.clone();
            let encryption = volume_group
                .physical_volumes_encryption
                .as_ref()
                .and_then(EncryptionJson::export);
            let generate = match encryption {
                Some(encryption) => PvGenerateJson::Settings(PvGenerateSettingsJson {
                    target_devices: devices,
                    encryption: Some(encryption),
                }),
                None => PvGenerateJson::Aliases(devices),
            };
            physical_volumes.push(PhysicalVolumeJson::Generate { generate });
        }

        Self {
            name: volume_group.name.clone(),
            extent_size: volume_group.extent_size,
            physical_volumes,
            logical_volumes: volume_group
                .logical_volumes
                .iter()
                .map(LogicalVolumeJson::export)
                .collect(),
        }
    }
}

impl LogicalVolumeJson {
    pub fn export(logical_volume: &LogicalVolume) -> Self {
        Self {
            generate: None,
            alias: logical_volume.alias.clone(),
            name: logical_volume.name.clone(),
            size: SizeJson::export(&logical_volume.size),
            stripes: logical_volume.stripes,
            stripe_size: logical_volume.stripe_size,
            pool: logical_volume.pool,
            used_pool: logical_volume.used_pool.clone(),
            encryption: logical_volume
                .encryption
                .as_ref()
                .and_then(EncryptionJson::export),
            filesystem: logical_volume.filesystem.as_ref().map(FilesystemJson::export),
        }
    }
}
