use std::{collections::BTreeSet, path::Path};

use log::{debug, info, warn};

use diskplan_api::{
    config::Config,
    error::{DiskplanError, InternalError, ReportError},
    product::ProductConfig,
    wire,
};

use crate::input;

/// Imports a storage layout file, failing when it cannot be parsed.
///
/// Layout problems that only a device graph can reveal are left to the
/// resolver.
pub fn validate_config_file(path: &Path, product: &ProductConfig) -> Result<(), DiskplanError> {
    info!("Validating storage layout file: {}", path.display());
    let config = input::load_config(path, product)?;

    for duplicate in duplicates(config.aliases()) {
        warn!("Alias '{duplicate}' is used more than once");
    }
    for duplicate in duplicates(config.mount_paths()) {
        warn!("Mount path '{duplicate}' is used more than once");
    }

    info!("Storage layout is valid");
    debug!("Imported layout:\n{}", to_json(&config)?);
    Ok(())
}

fn duplicates<'a>(values: Vec<&'a str>) -> BTreeSet<&'a str> {
    let mut seen = BTreeSet::new();
    values
        .into_iter()
        .filter(|value| !seen.insert(*value))
        .collect()
}

fn to_json(config: &Config) -> Result<String, DiskplanError> {
    serde_json::to_string_pretty(&wire::export_config(config))
        .structured(InternalError::SerializeOutput)
}
