//! Resolution pass: binds every search of a layout to devices of a device
//! graph.
//!
//! Drives are matched against the disk-like devices in declaration order,
//! partitions against the partitions of their resolved drive, MD RAIDs
//! against the existing RAIDs. A search matching several devices expands its
//! entity into one copy per device. Problems are collected as issues, the
//! pass always produces a solved layout.

use log::{debug, info};

use diskplan_api::{
    config::{AliasTarget, Config, ConfigNode, Drive, IfNotFound, MdRaid, Partition, Search},
    devicegraph::{DeviceGraph, Sid},
};

use crate::issues::{Issue, IssueKind};

mod boot;
pub mod search;
mod volume_groups;


pub use boot::boot_device;
use search::{ConsumedDevices, SearchOutcome};

/// Solved layout and the issues found while solving it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub config: Config,
    pub issues: Vec<Issue>,
}

impl Resolution {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(Issue::is_error)
    }
}

/// Resolves a layout against a device graph. Bindings present in `config`
/// are discarded first.
pub fn resolve_config(config: &Config, graph: &DeviceGraph) -> Resolution {
    let mut config = config.clone();
    clear_bindings(&mut config);

    let mut resolver = Resolver {
        graph,
        issues: Vec::new(),
    };

    config.drives = resolver.resolve_drives(std::mem::take(&mut config.drives));
    config.md_raids = resolver.resolve_md_raids(std::mem::take(&mut config.md_raids));
    volume_groups::check_volume_groups(&config, &mut resolver.issues);
    boot::resolve_boot(&mut config, &mut resolver.issues);

    info!(
        "Resolved {} drive(s) and {} MD RAID(s) with {} issue(s)",
        config.drives.iter().filter(|d| d.found_device().is_some()).count(),
        config.md_raids.len(),
        resolver.issues.len()
    );

    Resolution {
        config,
        issues: resolver.issues,
    }
}

fn clear_bindings(config: &mut Config) {
    let clear = |search: &mut Search| *search = search.without_binding();
    let clear_partitions = |partitions: &mut Vec<Partition>| {
        partitions
            .iter_mut()
            .filter_map(|p| p.search.as_mut())
            .for_each(clear)
    };

    for drive in &mut config.drives {
        clear(&mut drive.search);
        clear_partitions(&mut drive.partitions);
    }
    for md in &mut config.md_raids {
        if let Some(search) = md.search.as_mut() {
            clear(search);
        }
        clear_partitions(&mut md.partitions);
    }
}

struct Resolver<'a> {
    graph: &'a DeviceGraph,
    issues: Vec<Issue>,
}

impl Resolver<'_> {
    fn resolve_drives(&mut self, drives: Vec<Drive>) -> Vec<Drive> {
        let pool = self.graph.disk_devices();
        let mut consumed = ConsumedDevices::default();
        let mut resolved = Vec::new();

        for (index, drive) in drives.into_iter().enumerate() {
            match search::resolve(&drive.search, &pool, &mut consumed) {
                SearchOutcome::Found(sids) => {
                    for sid in sids {
                        let mut copy = drive.clone();
                        copy.search.bind(sid);
                        copy.partitions = self.resolve_partitions(copy.partitions, sid);
                        resolved.push(copy);
                    }
                }
                SearchOutcome::NotFound(if_not_found) => {
                    let mut drive = drive;
                    drive.search.mark_not_found();
                    mark_partitions_not_found(&mut drive.partitions);

                    // A drive is never created, `create` fails like `error`.
                    if if_not_found == IfNotFound::Skip {
                        debug!("Skipping drive #{index}, no device matched");
                    } else {
                        self.issues.push(
                            Issue::error(
                                IssueKind::DriveNotFound,
                                format!("No device found for drive #{index}"),
                            )
                            .with_alias(drive.alias.as_deref()),
                        );
                    }
                    resolved.push(drive);
                }
            }
        }

        resolved
    }

    fn resolve_md_raids(&mut self, md_raids: Vec<MdRaid>) -> Vec<MdRaid> {
        let pool = self.graph.md_raids();
        let mut consumed = ConsumedDevices::default();
        let mut resolved = Vec::new();

        for (index, md) in md_raids.into_iter().enumerate() {
            let Some(search) = &md.search else {
                debug!("MD RAID #{index} will be created");
                resolved.push(md);
                continue;
            };

            match search::resolve(search, &pool, &mut consumed) {
                SearchOutcome::Found(sids) => {
                    for sid in sids {
                        let mut copy = md.clone();
                        if let Some(search) = copy.search.as_mut() {
                            search.bind(sid);
                        }
                        copy.partitions = self.resolve_partitions(copy.partitions, sid);
                        resolved.push(copy);
                    }
                }
                SearchOutcome::NotFound(if_not_found) => {
                    let mut md = md;
                    if let Some(search) = md.search.as_mut() {
                        search.mark_not_found();
                    }
                    match if_not_found {
                        IfNotFound::Create => debug!("MD RAID #{index} not found, creating it"),
                        IfNotFound::Skip => {
                            mark_partitions_not_found(&mut md.partitions);
                            debug!("Skipping MD RAID #{index}, no device matched");
                        }
                        IfNotFound::Error => {
                            mark_partitions_not_found(&mut md.partitions);
                            self.issues.push(
                                Issue::error(
                                    IssueKind::MdRaidNotFound,
                                    format!("No device found for MD RAID #{index}"),
                                )
                                .with_alias(md.alias.as_deref()),
                            );
                        }
                    }
                    resolved.push(md);
                }
            }
        }

        resolved
    }

    /// Resolves partition searches against the partitions of `device`. Each
    /// device has its own consumed set.
    fn resolve_partitions(&mut self, partitions: Vec<Partition>, device: Sid) -> Vec<Partition> {
        let pool = self.graph.partitions_of(device);
        let mut consumed = ConsumedDevices::default();
        let mut resolved = Vec::new();

        for partition in partitions {
            let Some(search) = &partition.search else {
                resolved.push(partition);
                continue;
            };

            match search::resolve(search, &pool, &mut consumed) {
                SearchOutcome::Found(sids) => {
                    for sid in sids {
                        let mut copy = partition.clone();
                        if let Some(search) = copy.search.as_mut() {
                            search.bind(sid);
                        }
                        resolved.push(copy);
                    }
                }
                SearchOutcome::NotFound(if_not_found) => {
                    let mut partition = partition;
                    if let Some(search) = partition.search.as_mut() {
                        search.mark_not_found();
                    }
                    if if_not_found == IfNotFound::Error {
                        self.issues.push(
                            Issue::error(
                                IssueKind::PartitionNotFound,
                                format!("No partition found on device {device}"),
                            )
                            .with_alias(partition.alias.as_deref()),
                        );
                    }
                    resolved.push(partition);
                }
            }
        }

        resolved
    }
}

/// Whether the entity behind an alias was dropped by the resolution pass.
pub(super) fn is_dropped(target: AliasTarget) -> bool {
    let node_dropped = |node: ConfigNode| match node {
        ConfigNode::Drive(drive) => drive.search.solved && drive.found_device().is_none(),
        ConfigNode::MdRaid(md) => md.search.as_ref().is_some_and(|s| s.skip_device()),
        ConfigNode::VolumeGroup(_) => false,
    };

    match target {
        AliasTarget::Drive(drive) => node_dropped(ConfigNode::Drive(drive)),
        AliasTarget::MdRaid(md) => node_dropped(ConfigNode::MdRaid(md)),
        AliasTarget::Partition { owner, partition } => {
            node_dropped(owner) || partition.search.as_ref().is_some_and(|s| s.skip_device())
        }
        AliasTarget::LogicalVolume { .. } => false,
    }
}

/// Partitions of an unresolved device cannot be matched either.
fn mark_partitions_not_found(partitions: &mut [Partition]) {
    partitions
        .iter_mut()
        .filter_map(|p| p.search.as_mut())
        .for_each(Search::mark_not_found);
}
