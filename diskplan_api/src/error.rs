use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

use serde::{ser::SerializeStruct, Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::devicegraph::DeviceGraphError;

/// User provided input was invalid.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidInputError {
    #[error("Failed to load storage configuration from '{path}'")]
    LoadConfig { path: String },
    #[error("Failed to parse storage configuration")]
    ParseConfig,
    #[error("Failed to load device graph from '{path}'")]
    LoadDeviceGraph { path: String },
    #[error("Failed to parse device graph")]
    ParseDeviceGraph,
    #[error("Invalid device graph: {0}")]
    InvalidDeviceGraph(#[from] DeviceGraphError),
    #[error("Failed to load product configuration from '{path}'")]
    LoadProduct { path: String },
    #[error("Failed to parse product configuration")]
    ParseProduct,
}

#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InternalError {
    #[error("Internal error: {0}")]
    Internal(&'static str),
    #[error("Failed to serialize output")]
    SerializeOutput,
}

/// Each variant of `ErrorKind` corresponds to a different category of error.
#[derive(Debug, Eq, thiserror::Error, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// The caller provided a document that could not be used.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// A bug was encountered.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct DiskplanErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct DiskplanError(Box<DiskplanErrorInner>);
impl DiskplanError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        DiskplanError(Box::new(DiskplanErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    #[track_caller]
    pub fn internal(msg: &'static str) -> Self {
        Self::new(InternalError::Internal(msg))
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// Returns the underlying cause, if any.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.0.source.as_ref()
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured DiskplanError.
    fn structured(self, kind: K) -> Result<T, DiskplanError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, DiskplanError> {
        match self {
            Some(t) => Ok(t),
            None => Err(DiskplanError(Box::new(DiskplanErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: None,
                context: Vec::new(),
            }))),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, DiskplanError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(DiskplanError(Box::new(DiskplanErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: Some(e.into()),
                context: Vec::new(),
            }))),
        }
    }
}

pub trait DiskplanResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, DiskplanError>;
}

impl<T> DiskplanResultExt<T> for Result<T, DiskplanError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, DiskplanError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }
}

impl Serialize for DiskplanError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("diskplan-error", 5)?;
        state.serialize_field("message", &self.0.kind.to_string())?;
        match self.0.kind {
            ErrorKind::InvalidInput(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Internal(ref e) => state.serialize_field("error", e)?,
        }
        state.serialize_field("category", <&str>::from(&self.0.kind))?;
        state.serialize_field(
            "location",
            &format!("{}:{}", self.0.location.file(), self.0.location.line()),
        )?;
        match self.0.source {
            Some(ref e) => state.serialize_field("cause", &Some(format!("{:#}", e)))?,
            None => state.serialize_field("cause", &None::<String>)?,
        }
        state.end()
    }
}

impl Debug for DiskplanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                write!(f, "{: >5}: {context}", i)?;
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            let mut index = 0;
            while let Some(e) = source {
                for (i, line) in e.to_string().split('\n').enumerate() {
                    if i == 0 {
                        write!(f, "{: >5}: ", index)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_serialize() {
        let error: Result<(), _> = Err(anyhow!("missing field `drives`"))
            .structured(InvalidInputError::ParseConfig)
            .message("Failed to import configuration");
        let error = error.unwrap_err();

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["message"], json!("Failed to parse storage configuration"));
        assert_eq!(value["error"], json!("parse-config"));
        assert_eq!(value["category"], json!("invalid-input"));
        assert_eq!(value["cause"], json!("missing field `drives`"));
        assert!(value["location"].as_str().unwrap().contains("error.rs"));
    }

    #[test]
    fn test_error_structured_option() {
        let missing: Option<u32> = None;
        let error = missing
            .structured(InvalidInputError::LoadConfig {
                path: "/tmp/config.json".into(),
            })
            .unwrap_err();
        assert_eq!(
            error.kind(),
            &ErrorKind::InvalidInput(InvalidInputError::LoadConfig {
                path: "/tmp/config.json".into()
            })
        );
        assert!(error.cause().is_none());

        assert_eq!(Some(3).structured(InternalError::SerializeOutput).unwrap(), 3);
    }

    #[test]
    fn test_error_debug() {
        let error = Err::<(), _>(DiskplanError::internal("unreachable"))
            .message("While resolving")
            .unwrap_err();
        let rendered = format!("{error:?}");
        assert!(rendered.starts_with("Internal error: unreachable at "));
        assert!(rendered.contains("Context:"));
        assert!(rendered.contains("    0: While resolving at "));
    }
}
