//! Product-level storage defaults.
//!
//! Volume templates are keyed by mount path; the template with an empty mount
//! path is the fallback for every other path.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    config::{EncryptionMethod, FilesystemType, PbkdFunction, SizeMax},
    constants::{ROOT_MOUNT_POINT_PATH, SWAP_MOUNT_POINT},
    error::{DiskplanError, InvalidInputError, ReportError},
    is_default,
    primitives::bytes::ByteCount,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductConfig {
    #[serde(default, skip_serializing_if = "is_default")]
    pub encryption: ProductEncryption,

    /// Mount paths proposed by default, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_templates: Vec<VolumeTemplate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductEncryption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<EncryptionMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbkd_function: Option<PbkdFunction>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeTemplate {
    #[serde(default)]
    pub mount_path: String,

    /// Default filesystem type name, e.g. "btrfs".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<String>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub btrfs: BtrfsTemplate,

    #[serde(default, skip_serializing_if = "is_default")]
    pub size: TemplateSize,

    #[serde(default, skip_serializing_if = "is_default")]
    pub outline: Outline,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mount_options: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BtrfsTemplate {
    #[serde(default)]
    pub snapshots: bool,

    #[serde(default)]
    pub read_only: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateSize {
    #[serde(default)]
    pub auto: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ByteCount>,

    /// No max means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ByteCount>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Outline {
    /// The volume must always be proposed.
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filesystems: Vec<String>,
}

impl VolumeTemplate {
    /// Default filesystem type, with the template's snapshot setting for
    /// btrfs. Unknown names are ignored.
    pub fn fs_type(&self) -> Option<FilesystemType> {
        let fs_type = FilesystemType::from_str(self.filesystem.as_deref()?).ok()?;
        Some(match fs_type {
            FilesystemType::Btrfs { .. } => FilesystemType::Btrfs {
                snapshots: self.btrfs.snapshots,
            },
            other => other,
        })
    }

    pub fn min_size(&self) -> Option<ByteCount> {
        self.size.min
    }

    pub fn max_size(&self) -> SizeMax {
        self.size
            .max
            .map(SizeMax::Bytes)
            .unwrap_or(SizeMax::Unlimited)
    }
}

impl ProductConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, DiskplanError> {
        serde_yaml::from_str(contents).structured(InvalidInputError::ParseProduct)
    }

    /// Template for a mount path, falling back to the default template.
    pub fn template_for(&self, mount_path: &str) -> Option<&VolumeTemplate> {
        self.volume_templates
            .iter()
            .find(|t| t.mount_path == mount_path)
            .or_else(|| self.fallback_template())
    }

    pub fn fallback_template(&self) -> Option<&VolumeTemplate> {
        self.volume_templates.iter().find(|t| t.mount_path.is_empty())
    }

    pub fn default_paths(&self) -> Vec<&str> {
        self.volumes.iter().map(String::as_str).collect()
    }

    /// Paths that must always be proposed.
    pub fn mandatory_paths(&self) -> Vec<&str> {
        self.volume_templates
            .iter()
            .filter(|t| t.outline.required && !t.mount_path.is_empty())
            .map(|t| t.mount_path.as_str())
            .collect()
    }

    /// Root is mounted read-only, which turns snapshots into an immutable
    /// root.
    pub fn root_read_only(&self) -> bool {
        self.volume_templates
            .iter()
            .find(|t| t.mount_path == ROOT_MOUNT_POINT_PATH)
            .is_some_and(|t| t.btrfs.read_only)
    }

    /// Built-in product used when none is given: btrfs root with snapshots,
    /// optional swap and an ext4 fallback.
    pub fn builtin() -> Self {
        Self {
            encryption: ProductEncryption {
                method: Some(EncryptionMethod::Luks2),
                pbkd_function: Some(PbkdFunction::Argon2id),
            },
            volumes: vec![ROOT_MOUNT_POINT_PATH.into(), SWAP_MOUNT_POINT.into()],
            volume_templates: vec![
                VolumeTemplate {
                    mount_path: ROOT_MOUNT_POINT_PATH.into(),
                    filesystem: Some("btrfs".into()),
                    btrfs: BtrfsTemplate {
                        snapshots: true,
                        read_only: false,
                    },
                    size: TemplateSize {
                        auto: true,
                        min: Some(ByteCount::gib(5)),
                        max: Some(ByteCount::gib(10)),
                    },
                    outline: Outline {
                        required: true,
                        filesystems: vec!["btrfs".into(), "ext4".into(), "xfs".into()],
                    },
                    mount_options: Vec::new(),
                },
                VolumeTemplate {
                    mount_path: SWAP_MOUNT_POINT.into(),
                    filesystem: Some("swap".into()),
                    size: TemplateSize {
                        auto: true,
                        min: Some(ByteCount::gib(1)),
                        max: Some(ByteCount::gib(2)),
                    },
                    outline: Outline {
                        required: false,
                        filesystems: vec!["swap".into()],
                    },
                    ..Default::default()
                },
                VolumeTemplate {
                    mount_path: String::new(),
                    filesystem: Some("ext4".into()),
                    size: TemplateSize {
                        auto: false,
                        min: Some(ByteCount::gib(1)),
                        max: None,
                    },
                    ..Default::default()
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_from_yaml() {
        let product = ProductConfig::from_yaml(indoc! {r#"
            encryption:
              method: luks2
              pbkdFunction: pbkdf2
            volumes: ["/", "/home"]
            volumeTemplates:
              - mountPath: /
                filesystem: btrfs
                btrfs:
                  snapshots: true
                  readOnly: true
                size:
                  auto: true
                  min: 5 GiB
                  max: 10 GiB
                outline:
                  required: true
              - mountPath: /home
                filesystem: xfs
                size:
                  min: 10 GiB
                mountOptions: ["noatime"]
              - filesystem: ext4
        "#})
        .unwrap();

        assert_eq!(product.encryption.method, Some(EncryptionMethod::Luks2));
        assert_eq!(product.encryption.pbkd_function, Some(PbkdFunction::Pbkdf2));
        assert_eq!(product.default_paths(), vec!["/", "/home"]);
        assert_eq!(product.mandatory_paths(), vec!["/"]);
        assert!(product.root_read_only());

        let root = product.template_for("/").unwrap();
        assert_eq!(root.fs_type(), Some(FilesystemType::Btrfs { snapshots: true }));
        assert_eq!(root.max_size(), SizeMax::Bytes(ByteCount::gib(10)));

        let home = product.template_for("/home").unwrap();
        assert_eq!(home.fs_type(), Some(FilesystemType::Xfs));
        assert_eq!(home.min_size(), Some(ByteCount::gib(10)));
        assert_eq!(home.max_size(), SizeMax::Unlimited);
        assert_eq!(home.mount_options, vec!["noatime"]);

        let other = product.template_for("/srv").unwrap();
        assert_eq!(other.fs_type(), Some(FilesystemType::Ext4));
    }

    #[test]
    fn test_unknown_field() {
        let error = ProductConfig::from_yaml("volumez: []").unwrap_err();
        assert_eq!(
            error.kind(),
            &crate::error::ErrorKind::InvalidInput(InvalidInputError::ParseProduct)
        );
    }

    #[test]
    fn test_builtin() {
        let product = ProductConfig::builtin();
        assert_eq!(product.mandatory_paths(), vec!["/"]);
        assert!(!product.root_read_only());
        assert_eq!(
            product.template_for("swap").and_then(VolumeTemplate::fs_type),
            Some(FilesystemType::Swap)
        );
        assert_eq!(
            product.template_for("/var").and_then(VolumeTemplate::fs_type),
            Some(FilesystemType::Ext4)
        );

        // The built-in product survives a YAML round trip.
        let yaml = serde_yaml::to_string(&product).unwrap();
        assert_eq!(ProductConfig::from_yaml(&yaml).unwrap(), product);
    }
}
