//! Declarative storage layout.
//!
//! Entities describe devices through searches instead of fixed identities.
//! A resolution pass binds each search to at most one concrete device; the
//! binding lives in [`Search::device`] and is never serialized.

use crate::devicegraph::Sid;

mod drive;
mod encryption;
mod filesystem;
mod md_raid;
mod search;
mod size;
mod volume_group;

pub use drive::{Drive, Partition, PartitionId};
pub use encryption::{Encryption, EncryptionMethod, PbkdFunction};
pub use filesystem::{Filesystem, FilesystemType, MountBy};
pub use md_raid::{MdLevel, MdRaid};
pub use search::{
    IfNotFound, Search, SearchCondition, SearchMax, SizeCondition, SizeOperator, SortCriterion,
    SortKey,
};
pub use size::{Size, SizeMax};
pub use volume_group::{LogicalVolume, VolumeGroup};

/// Root of the storage layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub boot: Boot,
    pub drives: Vec<Drive>,
    pub md_raids: Vec<MdRaid>,
    pub volume_groups: Vec<VolumeGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boot {
    /// Whether the boot partitions are set up at all.
    pub configure: bool,
    pub device: BootDevice,
}

impl Default for Boot {
    fn default() -> Self {
        Self {
            configure: true,
            device: BootDevice::default(),
        }
    }
}

/// Device holding the boot partitions.
///
/// With `default` set the alias is derived from the location of the root
/// filesystem during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootDevice {
    pub default: bool,
    pub alias: Option<String>,
}

impl Default for BootDevice {
    fn default() -> Self {
        Self {
            default: true,
            alias: None,
        }
    }
}

impl BootDevice {
    pub fn explicit(alias: impl Into<String>) -> Self {
        Self {
            default: false,
            alias: Some(alias.into()),
        }
    }
}

/// A top-level entity of the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigNode<'a> {
    Drive(&'a Drive),
    MdRaid(&'a MdRaid),
    VolumeGroup(&'a VolumeGroup),
}

impl<'a> ConfigNode<'a> {
    /// Partitions of the node. Volume groups carry none.
    pub fn partitions(&self) -> Option<&'a [Partition]> {
        match self {
            Self::Drive(drive) => Some(drive.partitions.as_slice()),
            Self::MdRaid(md) => Some(md.partitions.as_slice()),
            Self::VolumeGroup(_) => None,
        }
    }

    pub fn alias(&self) -> Option<&'a str> {
        match self {
            Self::Drive(drive) => drive.alias.as_deref(),
            Self::MdRaid(md) => md.alias.as_deref(),
            Self::VolumeGroup(_) => None,
        }
    }

    /// Filesystem formatted directly on the node.
    pub fn filesystem(&self) -> Option<&'a Filesystem> {
        match self {
            Self::Drive(drive) => drive.filesystem.as_ref(),
            Self::MdRaid(md) => md.filesystem.as_ref(),
            Self::VolumeGroup(_) => None,
        }
    }

    pub fn found_device(&self) -> Option<Sid> {
        match self {
            Self::Drive(drive) => drive.found_device(),
            Self::MdRaid(md) => md.found_device(),
            Self::VolumeGroup(_) => None,
        }
    }

    pub fn as_drive(&self) -> Option<&'a Drive> {
        match self {
            Self::Drive(drive) => Some(drive),
            _ => None,
        }
    }

    pub fn as_md_raid(&self) -> Option<&'a MdRaid> {
        match self {
            Self::MdRaid(md) => Some(md),
            _ => None,
        }
    }

    pub fn as_volume_group(&self) -> Option<&'a VolumeGroup> {
        match self {
            Self::VolumeGroup(vg) => Some(vg),
            _ => None,
        }
    }

    /// Whether the node or one of its volumes is mounted at `path`.
    pub fn holds_mount_path(&self, path: &str) -> bool {
        let direct = self
            .filesystem()
            .is_some_and(|f| f.path.as_deref() == Some(path));
        let partitions = self
            .partitions()
            .unwrap_or_default()
            .iter()
            .any(|p| p.mount_path() == Some(path));
        let volumes = self.as_volume_group().is_some_and(|vg| {
            vg.logical_volumes
                .iter()
                .any(|lv| lv.mount_path() == Some(path))
        });
        direct || partitions || volumes
    }
}

/// An entity found by alias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AliasTarget<'a> {
    Drive(&'a Drive),
    MdRaid(&'a MdRaid),
    Partition {
        owner: ConfigNode<'a>,
        partition: &'a Partition,
    },
    LogicalVolume {
        volume_group: &'a VolumeGroup,
        logical_volume: &'a LogicalVolume,
    },
}

impl Config {
    /// Drives, MD RAIDs and volume groups, in that order.
    pub fn nodes(&self) -> impl Iterator<Item = ConfigNode<'_>> {
        self.drives
            .iter()
            .map(ConfigNode::Drive)
            .chain(self.md_raids.iter().map(ConfigNode::MdRaid))
            .chain(self.volume_groups.iter().map(ConfigNode::VolumeGroup))
    }

    /// First entity carrying the given alias.
    pub fn find_alias(&self, alias: &str) -> Option<AliasTarget<'_>> {
        let matches = |a: &Option<String>| a.as_deref() == Some(alias);

        for node in self.nodes() {
            match node {
                ConfigNode::Drive(drive) if matches(&drive.alias) => {
                    return Some(AliasTarget::Drive(drive))
                }
                ConfigNode::MdRaid(md) if matches(&md.alias) => return Some(AliasTarget::MdRaid(md)),
                ConfigNode::VolumeGroup(vg) => {
                    if let Some(lv) = vg.logical_volumes.iter().find(|lv| matches(&lv.alias)) {
                        return Some(AliasTarget::LogicalVolume {
                            volume_group: vg,
                            logical_volume: lv,
                        });
                    }
                }
                _ => (),
            }

            if let Some(partition) = node
                .partitions()
                .unwrap_or_default()
                .iter()
                .find(|p| matches(&p.alias))
            {
                return Some(AliasTarget::Partition {
                    owner: node,
                    partition,
                });
            }
        }

        None
    }

    /// Every alias in use.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases = Vec::new();
        for node in self.nodes() {
            aliases.extend(node.alias());
            for partition in node.partitions().unwrap_or_default() {
                aliases.extend(partition.alias.as_deref());
            }
            if let Some(vg) = node.as_volume_group() {
                aliases.extend(vg.logical_volumes.iter().filter_map(|lv| lv.alias.as_deref()));
            }
        }
        aliases
    }

    /// Mount paths of every filesystem, in declaration order.
    pub fn mount_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        for node in self.nodes() {
            paths.extend(node.filesystem().and_then(|f| f.path.as_deref()));
            paths.extend(
                node.partitions()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(Partition::mount_path),
            );
            if let Some(vg) = node.as_volume_group() {
                paths.extend(vg.logical_volumes.iter().filter_map(LogicalVolume::mount_path));
            }
        }
        paths
    }

    /// Node holding the filesystem mounted at `path`.
    pub fn node_with_mount_path(&self, path: &str) -> Option<ConfigNode<'_>> {
        self.nodes().find(|n| n.holds_mount_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            drives: vec![Drive {
                alias: Some("disk".into()),
                partitions: vec![
                    Partition {
                        alias: Some("pv".into()),
                        ..Default::default()
                    },
                    Partition {
                        filesystem: Some(Filesystem::mounted_at("/boot", FilesystemType::Ext4)),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            md_raids: vec![MdRaid {
                alias: Some("md".into()),
                filesystem: Some(Filesystem::mounted_at("/srv", FilesystemType::Xfs)),
                ..Default::default()
            }],
            volume_groups: vec![VolumeGroup {
                name: "system".into(),
                physical_volumes: vec!["pv".into()],
                logical_volumes: vec![LogicalVolume {
                    alias: Some("root".into()),
                    filesystem: Some(Filesystem::mounted_at(
                        "/",
                        FilesystemType::Btrfs { snapshots: true },
                    )),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_node_accessors() {
        let config = sample();
        let nodes: Vec<ConfigNode> = config.nodes().collect();
        assert_eq!(nodes.len(), 3);

        assert_eq!(nodes[0].partitions().map(<[Partition]>::len), Some(2));
        assert_eq!(nodes[1].partitions().map(<[Partition]>::len), Some(0));
        assert_eq!(nodes[2].partitions(), None);

        assert_eq!(nodes[0].alias(), Some("disk"));
        assert_eq!(nodes[2].alias(), None);
        assert!(nodes[1].filesystem().is_some());
        assert!(nodes[2].as_volume_group().is_some());
        assert!(nodes[0].as_md_raid().is_none());
    }

    #[test]
    fn test_find_alias() {
        let config = sample();
        assert!(matches!(config.find_alias("disk"), Some(AliasTarget::Drive(_))));
        assert!(matches!(config.find_alias("md"), Some(AliasTarget::MdRaid(_))));
        assert!(matches!(
            config.find_alias("pv"),
            Some(AliasTarget::Partition {
                owner: ConfigNode::Drive(_),
                ..
            })
        ));
        assert!(matches!(
            config.find_alias("root"),
            Some(AliasTarget::LogicalVolume { .. })
        ));
        assert!(config.find_alias("missing").is_none());
        assert_eq!(config.aliases(), vec!["disk", "pv", "md", "root"]);
    }

    #[test]
    fn test_mount_paths() {
        let config = sample();
        assert_eq!(config.mount_paths(), vec!["/boot", "/srv", "/"]);
        assert!(matches!(
            config.node_with_mount_path("/"),
            Some(ConfigNode::VolumeGroup(_))
        ));
        assert!(matches!(
            config.node_with_mount_path("/boot"),
            Some(ConfigNode::Drive(_))
        ));
        assert!(config.node_with_mount_path("/home").is_none());
    }
}
