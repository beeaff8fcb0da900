use diskplan_api::config::Config;

use crate::issues::{Issue, IssueKind};

use super::is_dropped;

/// Volume groups reference other entities by alias. Dangling references only
/// cost the group a physical volume, so they are warnings.
pub(super) fn check_volume_groups(config: &Config, issues: &mut Vec<Issue>) {
    for volume_group in &config.volume_groups {
        for alias in volume_group.referenced_aliases() {
            match config.find_alias(alias) {
                None => issues.push(
                    Issue::warning(
                        IssueKind::UnknownAlias,
                        format!(
                            "Volume group '{}' uses the unknown alias '{alias}'",
                            volume_group.name
                        ),
                    )
                    .with_alias(Some(alias)),
                ),
                Some(target) if is_dropped(target) => issues.push(
                    Issue::warning(
                        IssueKind::UnresolvedPhysicalVolume,
                        format!(
                            "The device with alias '{alias}' of volume group '{}' was not found",
                            volume_group.name
                        ),
                    )
                    .with_alias(Some(alias)),
                ),
                Some(_) => (),
            }
        }

        for logical_volume in &volume_group.logical_volumes {
            let Some(pool) = logical_volume.used_pool.as_deref() else {
                continue;
            };
            let exists = volume_group
                .logical_volumes
                .iter()
                .any(|lv| lv.pool && lv.alias.as_deref() == Some(pool));
            if !exists {
                issues.push(
                    Issue::warning(
                        IssueKind::UnknownThinPool,
                        format!(
                            "Volume group '{}' has no thin pool with alias '{pool}'",
                            volume_group.name
                        ),
                    )
                    .with_alias(logical_volume.alias.as_deref()),
                );
            }
        }
    }
}
