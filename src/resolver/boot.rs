use std::collections::BTreeSet;

use log::{debug, info};

use diskplan_api::{
    config::{AliasTarget, Config, ConfigNode, Drive},
    constants::{BOOT_ALIAS_PREFIX, ROOT_MOUNT_POINT_PATH},
    devicegraph::Sid,
};

use crate::issues::{Issue, IssueKind};

use super::is_dropped;

/// Checks an explicit boot device, or derives it from the location of the
/// root filesystem.
pub(super) fn resolve_boot(config: &mut Config, issues: &mut Vec<Issue>) {
    if !config.boot.configure {
        debug!("Boot configuration disabled");
        return;
    }

    if !config.boot.device.default {
        let Some(alias) = config.boot.device.alias.clone() else {
            return;
        };
        match config.find_alias(&alias) {
            None => issues.push(
                Issue::error(
                    IssueKind::BootDeviceNotFound,
                    format!("There is no boot device with alias '{alias}'"),
                )
                .with_alias(Some(&alias)),
            ),
            Some(target) if is_dropped(target) => issues.push(
                Issue::error(
                    IssueKind::BootDeviceNotFound,
                    format!("The boot device with alias '{alias}' was not found"),
                )
                .with_alias(Some(&alias)),
            ),
            Some(_) => (),
        }
        return;
    }

    let Some(index) = root_drive(config) else {
        debug!("No drive holds the root filesystem, boot device left unset");
        config.boot.device.alias = None;
        return;
    };

    let alias = ensure_alias(config, index);
    info!("Using drive '{alias}' as boot device");
    config.boot.device.alias = Some(alias);
}

/// Device bound to the boot alias of a solved layout.
pub fn boot_device(config: &Config) -> Option<Sid> {
    let alias = config.boot.device.alias.as_deref()?;
    match config.find_alias(alias)? {
        AliasTarget::Drive(drive) => drive.found_device(),
        AliasTarget::MdRaid(md) => md.found_device(),
        _ => None,
    }
}

/// Index of the drive that gets the boot partitions: the first partitioned
/// drive the root filesystem is allocated on, following volume groups and MD
/// RAIDs.
///
/// Nothing is derived when root sits on a directly formatted drive, or on a
/// volume group or MD RAID made of whole drives.
fn root_drive(config: &Config) -> Option<usize> {
    let node = config.node_with_mount_path(ROOT_MOUNT_POINT_PATH)?;
    let mut visited = BTreeSet::new();
    let drive = partitioned_drive(config, node, false, &mut visited)?;
    config.drives.iter().position(|d| std::ptr::eq(d, drive))
}

/// A drive qualifies when it has partitions, or when it is a target for
/// new physical volumes and gets partitioned anyway.
fn partitioned_drive<'a>(
    config: &'a Config,
    node: ConfigNode<'a>,
    is_target: bool,
    visited: &mut BTreeSet<&'a str>,
) -> Option<&'a Drive> {
    match node {
        ConfigNode::Drive(drive) => (!drive.partitions.is_empty() || is_target).then_some(drive),
        ConfigNode::MdRaid(md) => first_partitioned_drive(config, &md.devices, false, visited),
        ConfigNode::VolumeGroup(vg) => {
            first_partitioned_drive(config, &vg.physical_volumes_devices, true, visited)
                .or_else(|| first_partitioned_drive(config, &vg.physical_volumes, false, visited))
        }
    }
}

fn first_partitioned_drive<'a>(
    config: &'a Config,
    aliases: &'a [String],
    is_target: bool,
    visited: &mut BTreeSet<&'a str>,
) -> Option<&'a Drive> {
    for alias in aliases {
        if !visited.insert(alias.as_str()) {
            debug!("Alias '{alias}' already followed");
            continue;
        }
        let Some(node) = node_of_alias(config, alias, is_target) else {
            continue;
        };
        if let Some(drive) = partitioned_drive(config, node, is_target, visited) {
            return Some(drive);
        }
    }
    None
}

/// Node with the given alias or holding an entity with it. A whole drive is
/// only usable as a target, a directly used drive cannot hold partitions.
fn node_of_alias<'a>(config: &'a Config, alias: &str, is_target: bool) -> Option<ConfigNode<'a>> {
    match config.find_alias(alias)? {
        AliasTarget::Drive(drive) => is_target.then_some(ConfigNode::Drive(drive)),
        AliasTarget::MdRaid(md) => Some(ConfigNode::MdRaid(md)),
        AliasTarget::Partition { owner, .. } => Some(owner),
        AliasTarget::LogicalVolume { volume_group, .. } => {
            Some(ConfigNode::VolumeGroup(volume_group))
        }
    }
}

/// Returns the alias of the drive, assigning a new one if it has none.
fn ensure_alias(config: &mut Config, index: usize) -> String {
    if let Some(alias) = &config.drives[index].alias {
        return alias.clone();
    }

    let taken: BTreeSet<String> = config.aliases().into_iter().map(str::to_owned).collect();
    let alias = std::iter::once(BOOT_ALIAS_PREFIX.to_owned())
        .chain((1..).map(|n| format!("{BOOT_ALIAS_PREFIX}-{n}")))
        .find(|a| !taken.contains(a))
        .unwrap_or_else(|| BOOT_ALIAS_PREFIX.to_owned());
    config.drives[index].alias = Some(alias.clone());
    alias
}
