use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// The layout cannot be used as requested.
    Error,
    Warning,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IssueKind {
    DriveNotFound,
    PartitionNotFound,
    MdRaidNotFound,
    BootDeviceNotFound,
    UnknownAlias,
    UnresolvedPhysicalVolume,
    UnknownThinPool,
}

/// Problem found while resolving a layout. Resolution goes on regardless.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Issue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            alias: None,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, message)
        }
    }

    pub fn with_alias(self, alias: Option<&str>) -> Self {
        Self {
            alias: alias.map(str::to_owned),
            ..self
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Logs the issue at the level matching its severity.
    pub fn log(&self) {
        match self.severity {
            Severity::Error => log::error!("{}: {}", <&str>::from(self.kind), self.message),
            Severity::Warning => log::warn!("{}: {}", <&str>::from(self.kind), self.message),
        }
    }
}
