use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::{Size, SizeMax},
    constants::{SIZE_CURRENT, SIZE_UNLIMITED},
    primitives::bytes::ByteCount,
};

use super::ConfigImporter;

/// One size bound: bytes, `"current"` or `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeValueJson {
    Bytes(ByteCount),
    Current,
    Unlimited,
}

impl<'de> Deserialize<'de> for SizeValueJson {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) if s == SIZE_CURRENT => Ok(SizeValueJson::Current),
            serde_json::Value::String(s) if s == SIZE_UNLIMITED => Ok(SizeValueJson::Unlimited),
            serde_json::Value::String(s) => ByteCount::from_str(&s)
                .map(SizeValueJson::Bytes)
                .map_err(|e| serde::de::Error::custom(format!("invalid size: {e}"))),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(|n| SizeValueJson::Bytes(ByteCount(n)))
                .ok_or_else(|| serde::de::Error::custom("invalid size, expected unsigned integer")),
            _ => Err(serde::de::Error::custom("invalid size")),
        }
    }
}

impl Serialize for SizeValueJson {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SizeValueJson::Bytes(bytes) => bytes.serialize(serializer),
            SizeValueJson::Current => serializer.serialize_str(SIZE_CURRENT),
            SizeValueJson::Unlimited => serializer.serialize_str(SIZE_UNLIMITED),
        }
    }
}

/// A single value fixes the size, a list is `[min, max]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SizeJson {
    Value(SizeValueJson),
    Range(Vec<SizeValueJson>),
    Object(SizeObjectJson),
}

/// A missing max means unlimited.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SizeObjectJson {
    pub min: SizeValueJson,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<SizeValueJson>,
}

fn min_bound(value: SizeValueJson) -> Option<ByteCount> {
    match value {
        SizeValueJson::Bytes(bytes) => Some(bytes),
        SizeValueJson::Current => None,
        SizeValueJson::Unlimited => {
            warn!("Ignoring '{SIZE_UNLIMITED}' as minimum size, using the current size instead");
            None
        }
    }
}

fn max_bound(value: Option<SizeValueJson>) -> Option<SizeMax> {
    match value {
        None | Some(SizeValueJson::Unlimited) => Some(SizeMax::Unlimited),
        Some(SizeValueJson::Current) => None,
        Some(SizeValueJson::Bytes(bytes)) => Some(SizeMax::Bytes(bytes)),
    }
}

impl SizeJson {
    /// Converts the wire size. An empty range carries no information and
    /// yields `None`.
    pub fn import(self) -> Option<Size> {
        let (min, max) = match self {
            SizeJson::Value(value) => (min_bound(value), max_bound(Some(value))),
            SizeJson::Range(values) => {
                let mut values = values.into_iter();
                let min = values.next()?;
                (min_bound(min), max_bound(values.next()))
            }
            SizeJson::Object(object) => (min_bound(object.min), max_bound(object.max)),
        };

        Some(Size {
            default: false,
            min,
            max,
        })
    }

    /// Default sizes are not exported.
    pub fn export(size: &Size) -> Option<Self> {
        if size.default {
            return None;
        }

        Some(SizeJson::Object(SizeObjectJson {
            min: size
                .min
                .map(SizeValueJson::Bytes)
                .unwrap_or(SizeValueJson::Current),
            max: match size.max {
                None => Some(SizeValueJson::Current),
                Some(SizeMax::Unlimited) => None,
                Some(SizeMax::Bytes(bytes)) => Some(SizeValueJson::Bytes(bytes)),
            },
        }))
    }
}

impl ConfigImporter<'_> {
    /// Imports a size, taking the product limits for the mount path when
    /// none is given.
    pub(super) fn import_size(&self, json: Option<SizeJson>, mount_path: Option<&str>) -> Size {
        json.and_then(SizeJson::import)
            .unwrap_or_else(|| self.default_size(mount_path))
    }

    pub(super) fn default_size(&self, mount_path: Option<&str>) -> Size {
        let template = match mount_path {
            Some(path) => self.product.template_for(path),
            None => self.product.fallback_template(),
        };
        match template {
            Some(template) => {
                Size::product_default(template.min_size(), Some(template.max_size()))
            }
            None => Size::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn import(value: serde_json::Value) -> Option<Size> {
        serde_json::from_value::<SizeJson>(value).unwrap().import()
    }

    #[test]
    fn test_import_forms() {
        assert_eq!(import(json!("10 GiB")), Some(Size::exact(ByteCount::gib(10))));
        assert_eq!(import(json!(4096)), Some(Size::exact(ByteCount(4096))));
        assert_eq!(
            import(json!(["1 GiB"])),
            Some(Size::range(ByteCount::gib(1), SizeMax::Unlimited))
        );
        assert_eq!(
            import(json!(["1 GiB", "2 GiB"])),
            Some(Size::range(ByteCount::gib(1), SizeMax::Bytes(ByteCount::gib(2))))
        );
        assert_eq!(
            import(json!({ "min": "1 GiB" })),
            Some(Size::range(ByteCount::gib(1), SizeMax::Unlimited))
        );
        assert_eq!(
            import(json!({ "min": 0, "max": "current" })),
            Some(Size::shrink_if_needed())
        );
        assert_eq!(
            import(json!({ "min": "current", "max": "unlimited" })),
            Some(Size {
                default: false,
                min: None,
                max: Some(SizeMax::Unlimited)
            })
        );
        assert_eq!(
            import(json!("current")),
            Some(Size {
                default: false,
                min: None,
                max: None
            })
        );
        assert_eq!(import(json!([])), None);
    }

    #[test]
    fn test_product_default() {
        let product = crate::product::ProductConfig::builtin();
        let importer = ConfigImporter::new(&product);
        assert_eq!(
            importer.import_size(None, Some("/")),
            Size::product_default(
                Some(ByteCount::gib(5)),
                Some(SizeMax::Bytes(ByteCount::gib(10)))
            )
        );
        assert_eq!(
            importer.import_size(None, Some("/var")),
            Size::product_default(Some(ByteCount::gib(1)), Some(SizeMax::Unlimited))
        );
        assert_eq!(
            importer.import_size(Some(SizeJson::Range(Vec::new())), None),
            Size::product_default(Some(ByteCount::gib(1)), Some(SizeMax::Unlimited))
        );
        assert_eq!(
            importer.import_size(
                Some(SizeJson::Value(SizeValueJson::Bytes(ByteCount::gib(3)))),
                Some("/")
            ),
            Size::exact(ByteCount::gib(3))
        );
    }

    #[test]
    fn test_invalid() {
        for value in [
            json!("huge"),
            json!(-5),
            json!({ "max": "1 GiB" }),
            json!(true),
            json!([["1 GiB"]]),
        ] {
            assert!(
                serde_json::from_value::<SizeJson>(value.clone()).is_err(),
                "'{value}' should be rejected"
            );
        }
    }

    #[test]
    fn test_export() {
        assert_eq!(SizeJson::export(&Size::default()), None);
        assert_eq!(
            serde_json::to_value(SizeJson::export(&Size::shrink_if_needed())).unwrap(),
            json!({ "min": 0, "max": "current" })
        );
        assert_eq!(
            serde_json::to_value(SizeJson::export(&Size::range(
                ByteCount::gib(1),
                SizeMax::Unlimited
            )))
            .unwrap(),
            json!({ "min": 1073741824 })
        );
        assert_eq!(
            serde_json::to_value(SizeJson::export(&Size {
                default: false,
                min: None,
                max: Some(SizeMax::Bytes(ByteCount(512)))
            }))
            .unwrap(),
            json!({ "min": "current", "max": 512 })
        );
    }
}
