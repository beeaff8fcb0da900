//! JSON form of the storage layout.
//!
//! Import fills absent fields with the product defaults and synthesizes the
//! volumes the product requires. Export omits every field that carries no
//! information beyond its default.

use std::collections::BTreeSet;

use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::{Boot, BootDevice, Config},
    error::{DiskplanError, InvalidInputError, ReportError},
    product::ProductConfig,
};

mod drive;
mod encryption;
mod filesystem;
mod generate;
mod search;
mod size;
mod volume_group;

pub use drive::{DriveJson, MdRaidJson, PartitionJson};
pub use encryption::{EncryptionJson, EncryptionSettingsJson};
pub use filesystem::{BtrfsJson, FilesystemJson, FsTypeJson};
pub use generate::{GenerateJson, GenerateMode, GenerateSettingsJson};
pub use search::{
    ConditionJson, MaxJson, SearchJson, SearchObjectJson, SizeCompareJson, SizeConditionJson,
    SortCriterionJson, SortDirectedJson, SortJson, SortOrder,
};
pub use size::{SizeJson, SizeObjectJson, SizeValueJson};
pub use volume_group::{
    LogicalVolumeJson, PhysicalVolumeJson, PvGenerateJson, PvGenerateSettingsJson,
    VolumeGroupJson,
};

/// Root of the JSON document. Unknown fields are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot: Option<BootJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drives: Vec<DriveJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub md_raids: Vec<MdRaidJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_groups: Vec<VolumeGroupJson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootJson {
    #[serde(default = "default_true")]
    pub configure: bool,

    /// Alias of the boot device. Absent means derived from the root volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Parses a JSON document, reporting the path of the offending field.
pub fn from_json<T: DeserializeOwned>(contents: &str) -> Result<T, DiskplanError> {
    let mut deserializer = serde_json::Deserializer::from_str(contents);
    let value = serde_path_to_error::deserialize(&mut deserializer)
        .structured(InvalidInputError::ParseConfig)?;
    deserializer
        .end()
        .structured(InvalidInputError::ParseConfig)?;
    Ok(value)
}

/// Parses and imports a JSON storage layout.
pub fn import_config(contents: &str, product: &ProductConfig) -> Result<Config, DiskplanError> {
    let json: ConfigJson = from_json(contents)?;
    Ok(ConfigImporter::new(product).import(json))
}

pub fn export_config(config: &Config) -> ConfigJson {
    ConfigJson::export(config)
}

/// Import state: the product giving the defaults and the mount paths that
/// are taken, so generated volumes never duplicate a path.
pub struct ConfigImporter<'a> {
    product: &'a ProductConfig,
    used_paths: BTreeSet<String>,
}

impl<'a> ConfigImporter<'a> {
    pub fn new(product: &'a ProductConfig) -> Self {
        Self {
            product,
            used_paths: BTreeSet::new(),
        }
    }

    pub fn import(mut self, json: ConfigJson) -> Config {
        self.used_paths = explicit_paths(&json);
        debug!("Mount paths given explicitly: {:?}", self.used_paths);

        let mut config = Config {
            boot: import_boot(json.boot),
            ..Default::default()
        };
        for drive in json.drives {
            let drive = self.import_drive(drive);
            config.drives.push(drive);
        }
        for md in json.md_raids {
            let md = self.import_md_raid(md);
            config.md_raids.push(md);
        }
        for volume_group in json.volume_groups {
            let volume_group = self.import_volume_group(volume_group);
            config.volume_groups.push(volume_group);
        }

        self.add_missing_required(&mut config);
        config
    }
}

fn import_boot(json: Option<BootJson>) -> Boot {
    let Some(json) = json else {
        return Boot::default();
    };
    Boot {
        configure: json.configure,
        device: match json.device {
            Some(alias) => BootDevice::explicit(alias),
            None => BootDevice::default(),
        },
    }
}

/// Mount paths written in the document, before any generation.
fn explicit_paths(json: &ConfigJson) -> BTreeSet<String> {
    let path = |f: &Option<FilesystemJson>| f.as_ref().and_then(|f| f.path.clone());

    let mut paths = BTreeSet::new();
    for drive in &json.drives {
        paths.extend(path(&drive.filesystem));
        paths.extend(drive.partitions.iter().filter_map(|p| path(&p.filesystem)));
    }
    for md in &json.md_raids {
        paths.extend(path(&md.filesystem));
        paths.extend(md.partitions.iter().filter_map(|p| path(&p.filesystem)));
    }
    for volume_group in &json.volume_groups {
        paths.extend(
            volume_group
                .logical_volumes
                .iter()
                .filter_map(|lv| path(&lv.filesystem)),
        );
    }
    paths
}

impl ConfigJson {
    pub fn export(config: &Config) -> Self {
        Self {
            boot: (config.boot != Boot::default()).then(|| BootJson {
                configure: config.boot.configure,
                device: if config.boot.device.default {
                    None
                } else {
                    config.boot.device.alias.clone()
                },
            }),
            drives: config.drives.iter().map(DriveJson::export).collect(),
            md_raids: config.md_raids.iter().map(MdRaidJson::export).collect(),
            volume_groups: config
                .volume_groups
                .iter()
                .map(VolumeGroupJson::export)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::json;

    use super::*;
    use crate::{
        config::{FilesystemType, Partition, Search, Size, SizeMax},
        error::ErrorKind,
        primitives::bytes::ByteCount,
    };

    const LAYOUT: &str = indoc! {r#"
        {
            "boot": { "configure": true, "device": "system" },
            "drives": [
                {
                    "search": "/dev/vda",
                    "alias": "system",
                    "partitions": [
                        { "search": "*", "size": { "min": 0, "max": "current" } },
                        { "alias": "pv", "id": "lvm", "size": ["10 GiB"] }
                    ]
                },
                {
                    "search": { "condition": { "size": { "greaterOrEqual": "100 GiB" } }, "ifNotFound": "skip" },
                    "filesystem": { "path": "/data", "type": "xfs" }
                }
            ],
            "volumeGroups": [
                {
                    "name": "system",
                    "physicalVolumes": ["pv"],
                    "logicalVolumes": [
                        { "alias": "home", "size": "20 GiB", "filesystem": { "path": "/home" } },
                        { "generate": "default" }
                    ]
                }
            ],
            "legacyAutoinstall": true
        }
    "#};

    #[test]
    fn test_import() {
        let config = import_config(LAYOUT, &ProductConfig::builtin()).unwrap();

        assert_eq!(config.boot.device, BootDevice::explicit("system"));
        assert_eq!(config.drives.len(), 2);
        assert!(config.drives[0].partitions[0].is_shrink_all());
        assert_eq!(
            config.drives[0].partitions[1].size,
            Size::range(ByteCount::gib(10), SizeMax::Unlimited)
        );
        assert_eq!(
            config.drives[1].filesystem.as_ref().unwrap().fs_type,
            Some(FilesystemType::Xfs)
        );

        // Generated volumes follow the explicit ones, nothing is added twice.
        assert_eq!(config.mount_paths(), vec!["/data", "/home", "/", "swap"]);
        let root = &config.volume_groups[0].logical_volumes[1];
        assert_eq!(
            root.filesystem.as_ref().unwrap().fs_type,
            Some(FilesystemType::Btrfs { snapshots: true })
        );
        assert!(root.size.default);
    }

    #[test]
    fn test_round_trip() {
        let product = ProductConfig::builtin();
        let config = import_config(LAYOUT, &product).unwrap();

        let exported = serde_json::to_string(&export_config(&config)).unwrap();
        let reimported = import_config(&exported, &product).unwrap();
        assert_eq!(reimported, config);
    }

    #[test]
    fn test_export_omits_defaults() {
        let config = Config {
            drives: vec![crate::config::Drive {
                partitions: vec![Partition {
                    search: Some(Search::by_name("/dev/vda1")),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(export_config(&config)).unwrap(),
            json!({
                "drives": [{ "partitions": [{ "search": { "condition": { "name": "/dev/vda1" } } }] }]
            })
        );
        assert_eq!(
            serde_json::to_value(export_config(&Config::default())).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_boot() {
        let product = ProductConfig::builtin();
        let config = import_config(r#"{ "boot": { "configure": false } }"#, &product).unwrap();
        assert!(!config.boot.configure);
        assert!(config.boot.device.default);
        assert_eq!(
            serde_json::to_value(export_config(&config)).unwrap(),
            json!({ "boot": { "configure": false } })
        );

        let config = import_config(r#"{ "boot": {} }"#, &product).unwrap();
        assert_eq!(config.boot, Boot::default());
    }

    #[test]
    fn test_parse_error_path() {
        let err = import_config(
            r#"{ "drives": [ { "partitions": [ {}, { "delete": "yes" } ] } ] }"#,
            &ProductConfig::builtin(),
        )
        .unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::ParseConfig)
        );
        let cause = err.cause().unwrap().to_string();
        assert!(
            cause.starts_with("drives[0].partitions[1].delete"),
            "unexpected cause: {cause}"
        );
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(import_config("{} {}", &ProductConfig::builtin()).is_err());
        assert!(import_config("", &ProductConfig::builtin()).is_err());
    }
}
