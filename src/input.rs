//! Loading of the documents given on the command line.

use std::{fs, path::Path};

use log::debug;

use diskplan_api::{
    config::Config,
    devicegraph::DeviceGraph,
    error::{DiskplanError, DiskplanResultExt, InvalidInputError, ReportError},
    product::ProductConfig,
    wire,
};

fn read(path: &Path, kind: InvalidInputError) -> Result<String, DiskplanError> {
    debug!("Reading '{}'", path.display());
    fs::read_to_string(path).structured(kind)
}

/// Loads a JSON storage layout and imports it with the product defaults.
pub fn load_config(path: &Path, product: &ProductConfig) -> Result<Config, DiskplanError> {
    let contents = read(
        path,
        InvalidInputError::LoadConfig {
            path: path.display().to_string(),
        },
    )?;
    wire::import_config(&contents, product)
        .message(format!("Invalid storage layout '{}'", path.display()))
}

pub fn load_device_graph(path: &Path) -> Result<DeviceGraph, DiskplanError> {
    let contents = read(
        path,
        InvalidInputError::LoadDeviceGraph {
            path: path.display().to_string(),
        },
    )?;
    DeviceGraph::from_json(&contents)
        .message(format!("Invalid device graph '{}'", path.display()))
}

/// Loads a YAML product definition, or the built-in product when no path is
/// given.
pub fn load_product(path: Option<&Path>) -> Result<ProductConfig, DiskplanError> {
    let Some(path) = path else {
        debug!("Using the built-in product");
        return Ok(ProductConfig::builtin());
    };

    let contents = read(
        path,
        InvalidInputError::LoadProduct {
            path: path.display().to_string(),
        },
    )?;
    ProductConfig::from_yaml(&contents)
        .message(format!("Invalid product definition '{}'", path.display()))
}
