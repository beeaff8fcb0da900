use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::DISKPLAN_VERSION;

#[derive(Parser, Debug)]
#[clap(version = DISKPLAN_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Warn)]
    pub verbosity: LevelFilter,

    /// Also write every log as a JSON line to this file
    #[arg(global = true, long)]
    pub log_file: Option<PathBuf>,

    /// Product definition (YAML) providing the default volumes
    ///
    /// When absent, the built-in product is used.
    #[arg(global = true, long)]
    pub product: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Resolve a storage layout against a device graph
    Resolve {
        /// Storage layout (JSON)
        config: PathBuf,

        /// Device graph snapshot (JSON)
        devicegraph: PathBuf,

        /// Print the solved layout instead of the resolved view
        #[clap(long)]
        solved: bool,
    },

    /// Print the settings handed to the partitioning solver
    Settings {
        /// Storage layout (JSON)
        config: PathBuf,

        /// Device graph snapshot (JSON)
        devicegraph: PathBuf,
    },

    /// Print the devices of a device graph
    Inventory {
        /// Device graph snapshot (JSON)
        devicegraph: PathBuf,
    },

    /// Import a storage layout with the product defaults and print it again
    Normalize {
        /// Storage layout (JSON)
        config: PathBuf,
    },

    /// Check that a storage layout can be imported
    Validate {
        /// Storage layout (JSON)
        config: PathBuf,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Resolve { .. } => "resolve",
            Commands::Settings { .. } => "settings",
            Commands::Inventory { .. } => "inventory",
            Commands::Normalize { .. } => "normalize",
            Commands::Validate { .. } => "validate",
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["diskplan", "inventory", "graph.json"]).unwrap();
        assert_eq!(cli.verbosity, LevelFilter::Warn);
        assert_eq!(cli.log_file, None);
        assert_eq!(cli.product, None);
        assert_eq!(
            cli.command,
            Commands::Inventory {
                devicegraph: "graph.json".into()
            }
        );
        assert_eq!(cli.command.to_string(), "inventory");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "diskplan",
            "resolve",
            "config.json",
            "graph.json",
            "--solved",
            "-v",
            "debug",
            "--product",
            "product.yaml",
            "--log-file",
            "/tmp/diskplan.log",
        ])
        .unwrap();

        assert_eq!(cli.verbosity, LevelFilter::Debug);
        assert_eq!(cli.product, Some("product.yaml".into()));
        assert_eq!(cli.log_file, Some("/tmp/diskplan.log".into()));
        assert_eq!(
            cli.command,
            Commands::Resolve {
                config: "config.json".into(),
                devicegraph: "graph.json".into(),
                solved: true,
            }
        );
    }

    #[test]
    fn test_missing_argument() {
        assert!(Cli::try_parse_from(["diskplan", "settings", "config.json"]).is_err());
        assert!(Cli::try_parse_from(["diskplan"]).is_err());
    }
}
