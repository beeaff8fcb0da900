use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use diskplan_api::config::{ConfigNode, Partition};

/// Net effect of a node's partition entries on the existing partitions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SpacePolicy {
    /// Every existing partition goes away.
    Delete,
    /// Existing partitions are shrunk as needed.
    Resize,
    /// Existing partitions are handled one by one.
    Custom,
    Keep,
}

/// Whether a partition entry acts on an existing partition it was bound to.
fn acts_on_existing(partition: &Partition) -> bool {
    partition.found_device().is_some()
        && (partition.delete || partition.delete_if_needed || !partition.size.default)
}

/// Classifies a node. The first matching rule wins:
///
/// 1. a filesystem on the whole device, or a "delete all" entry: `Delete`
/// 2. a "shrink all" entry: `Resize`
/// 3. a bound entry deleting or resizing its partition: `Custom`
/// 4. anything else: `Keep`
///
/// Volume groups carry no partitions and always keep.
pub fn classify(node: ConfigNode) -> SpacePolicy {
    let Some(partitions) = node.partitions() else {
        return SpacePolicy::Keep;
    };

    if node.filesystem().is_some() || partitions.iter().any(Partition::is_delete_all) {
        SpacePolicy::Delete
    } else if partitions.iter().any(Partition::is_shrink_all) {
        SpacePolicy::Resize
    } else if partitions.iter().any(acts_on_existing) {
        SpacePolicy::Custom
    } else {
        SpacePolicy::Keep
    }
}
