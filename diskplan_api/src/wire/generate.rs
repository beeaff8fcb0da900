use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::config::{Config, Encryption, Filesystem, LogicalVolume, Partition, Size};

use super::{encryption::EncryptionJson, filesystem::FilesystemJson, ConfigImporter};

/// Which product volumes a `generate` entry expands to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerateMode {
    /// Every default volume of the product.
    #[default]
    Default,
    /// Only the volumes the product requires.
    Mandatory,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum GenerateJson {
    Mode(GenerateMode),
    Settings(GenerateSettingsJson),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSettingsJson {
    #[serde(default, alias = "logicalVolumes")]
    pub partitions: GenerateMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionJson>,
}

/// A volume synthesized from a product template.
struct GeneratedVolume {
    filesystem: Filesystem,
    size: Size,
}

impl ConfigImporter<'_> {
    /// Claims the product paths of the given mode that are not used yet.
    fn claim_paths(&mut self, mode: GenerateMode) -> Vec<String> {
        let paths: Vec<String> = match mode {
            GenerateMode::Default => self.product.default_paths(),
            GenerateMode::Mandatory => self.product.mandatory_paths(),
        }
        .into_iter()
        .map(str::to_owned)
        .collect();

        paths
            .into_iter()
            .filter(|path| self.used_paths.insert(path.clone()))
            .collect()
    }

    fn generated_volume(&self, path: String) -> Option<GeneratedVolume> {
        let filesystem = self.import_filesystem(Some(FilesystemJson {
            path: Some(path),
            ..Default::default()
        }))?;
        let size = self.default_size(filesystem.path.as_deref());
        Some(GeneratedVolume { filesystem, size })
    }

    fn expand(&mut self, json: GenerateJson) -> (Vec<GeneratedVolume>, Option<Encryption>) {
        let (mode, encryption) = match json {
            GenerateJson::Mode(mode) => (mode, None),
            GenerateJson::Settings(settings) => (
                settings.partitions,
                self.import_encryption(settings.encryption),
            ),
        };

        let volumes = self
            .claim_paths(mode)
            .into_iter()
            .filter_map(|path| self.generated_volume(path))
            .collect::<Vec<_>>();
        debug!(
            "Generated {} volume(s) for '{}' mode",
            volumes.len(),
            <&str>::from(mode)
        );
        (volumes, encryption)
    }

    pub(super) fn generate_partitions(&mut self, json: GenerateJson) -> Vec<Partition> {
        let (volumes, encryption) = self.expand(json);
        volumes
            .into_iter()
            .map(|volume| Partition {
                size: volume.size,
                encryption: encryption.clone(),
                filesystem: Some(volume.filesystem),
                ..Default::default()
            })
            .collect()
    }

    pub(super) fn generate_logical_volumes(&mut self, json: GenerateJson) -> Vec<LogicalVolume> {
        let (volumes, encryption) = self.expand(json);
        volumes
            .into_iter()
            .map(|volume| LogicalVolume {
                size: volume.size,
                encryption: encryption.clone(),
                filesystem: Some(volume.filesystem),
                ..Default::default()
            })
            .collect()
    }

    /// Adds every required product volume missing from the config: as a
    /// logical volume of the first volume group, otherwise as a partition of
    /// the first partitioned drive, otherwise of the first drive without a
    /// filesystem of its own.
    pub(super) fn add_missing_required(&mut self, config: &mut Config) {
        let present: Vec<String> = config.mount_paths().into_iter().map(str::to_owned).collect();
        self.used_paths.extend(present);

        for path in self.claim_paths(GenerateMode::Mandatory) {
            let Some(volume) = self.generated_volume(path.clone()) else {
                continue;
            };

            if let Some(volume_group) = config.volume_groups.first_mut() {
                warn!(
                    "Adding missing required volume '{path}' to volume group '{}'",
                    volume_group.name
                );
                volume_group.logical_volumes.push(LogicalVolume {
                    size: volume.size,
                    filesystem: Some(volume.filesystem),
                    ..Default::default()
                });
                continue;
            }

            let drive = config
                .drives
                .iter()
                .position(|d| !d.partitions.is_empty())
                .or_else(|| config.drives.first().filter(|d| d.filesystem.is_none()).map(|_| 0));
            match drive {
                Some(index) => {
                    warn!("Adding missing required volume '{path}' to drive #{index}");
                    config.drives[index].partitions.push(Partition {
                        size: volume.size,
                        filesystem: Some(volume.filesystem),
                        ..Default::default()
                    });
                }
                None => warn!("No place for the required volume '{path}', skipping it"),
            }
        }
    }
}
