use std::{collections::BTreeMap, str::FromStr};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{Encryption, EncryptionMethod, PbkdFunction};

use super::ConfigImporter;

/// Either a bare method name, used for the swap methods, or a single-entry
/// object keyed by the method name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum EncryptionJson {
    Method(String),
    Settings(BTreeMap<String, EncryptionSettingsJson>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionSettingsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbkd_function: Option<PbkdFunction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apqns: Vec<String>,
}

fn parse_method(name: &str) -> Option<EncryptionMethod> {
    match EncryptionMethod::from_str(name) {
        Ok(method) => Some(method),
        Err(_) => {
            warn!("Ignoring unknown encryption method '{name}'");
            None
        }
    }
}

impl ConfigImporter<'_> {
    /// Unknown methods leave the device unencrypted. LUKS2 takes the product
    /// key derivation function unless one is given.
    pub(super) fn import_encryption(&self, json: Option<EncryptionJson>) -> Option<Encryption> {
        let (method, settings) = match json? {
            EncryptionJson::Method(name) => {
                (parse_method(&name)?, EncryptionSettingsJson::default())
            }
            EncryptionJson::Settings(map) => {
                if map.len() != 1 {
                    warn!(
                        "Ignoring encryption with {} methods, expected exactly one",
                        map.len()
                    );
                    return None;
                }
                let (name, settings) = map.into_iter().next()?;
                (parse_method(&name)?, settings)
            }
        };

        let pbkd_function = settings.pbkd_function.or_else(|| {
            (method == EncryptionMethod::Luks2)
                .then_some(self.product.encryption.pbkd_function)
                .flatten()
        });

        Some(Encryption {
            method: Some(method),
            password: settings.password,
            pbkd_function,
            label: settings.label,
            cipher: settings.cipher,
            key_size: settings.key_size,
            apqns: settings.apqns,
        })
    }
}

impl EncryptionJson {
    /// Swap methods are written as a bare name. Nothing is written without a
    /// method.
    pub fn export(encryption: &Encryption) -> Option<Self> {
        let method = encryption.method?;
        if method.is_swap() {
            return Some(EncryptionJson::Method(method.name().to_owned()));
        }

        let settings = EncryptionSettingsJson {
            password: encryption.password.clone(),
            key_size: encryption.key_size,
            pbkd_function: encryption.pbkd_function,
            cipher: encryption.cipher.clone(),
            label: encryption.label.clone(),
            apqns: encryption.apqns.clone(),
        };
        Some(EncryptionJson::Settings(BTreeMap::from([(
            method.name().to_owned(),
            settings,
        )])))
    }
}

#[cfg(test)]
mod tests {
    use maplit::btreemap;
    use serde_json::json;

    use super::*;
    use crate::product::ProductConfig;

    fn import(value: serde_json::Value) -> Option<Encryption> {
        let product = ProductConfig::builtin();
        let importer = ConfigImporter::new(&product);
        importer.import_encryption(Some(serde_json::from_value(value).unwrap()))
    }

    #[test]
    fn test_export_settings() {
        let encryption = Encryption {
            key_size: Some(256),
            apqns: vec!["01.0001".into()],
            ..Encryption::new(EncryptionMethod::PervasiveLuks2).with_password("secret")
        };

        assert_eq!(
            EncryptionJson::export(&encryption),
            Some(EncryptionJson::Settings(btreemap! {
                "pervasiveLuks2".to_owned() => EncryptionSettingsJson {
                    password: Some("secret".into()),
                    key_size: Some(256),
                    apqns: vec!["01.0001".into()],
                    ..Default::default()
                }
            }))
        );
    }

    #[test]
    fn test_import() {
        assert_eq!(
            import(json!({ "luks2": { "password": "secret" } })),
            Some(Encryption {
                pbkd_function: Some(PbkdFunction::Argon2id),
                ..Encryption::new(EncryptionMethod::Luks2).with_password("secret")
            })
        );
        assert_eq!(
            import(json!({ "luks1": { "password": "secret", "keySize": 512, "cipher": "aes" } })),
            Some(Encryption {
                key_size: Some(512),
                cipher: Some("aes".into()),
                ..Encryption::new(EncryptionMethod::Luks1).with_password("secret")
            })
        );
        assert_eq!(
            import(json!({ "luks2": { "pbkdFunction": "pbkdf2" } })),
            Some(Encryption {
                pbkd_function: Some(PbkdFunction::Pbkdf2),
                ..Encryption::new(EncryptionMethod::Luks2)
            })
        );
        assert_eq!(
            import(json!("randomSwap")),
            Some(Encryption::new(EncryptionMethod::RandomSwap))
        );
    }

    #[test]
    fn test_import_ignored() {
        assert_eq!(import(json!("rot13")), None);
        assert_eq!(import(json!({ "luks9": {} })), None);
        assert_eq!(import(json!({})), None);
        assert_eq!(import(json!({ "luks1": {}, "luks2": {} })), None);
        assert!(
            serde_json::from_value::<EncryptionJson>(json!({ "luks2": { "keySize": "big" } }))
                .is_err()
        );
    }

    #[test]
    fn test_export() {
        assert_eq!(EncryptionJson::export(&Encryption::default()), None);
        assert_eq!(
            serde_json::to_value(EncryptionJson::export(&Encryption::new(
                EncryptionMethod::SecureSwap
            )))
            .unwrap(),
            json!("secureSwap")
        );
        assert_eq!(
            serde_json::to_value(EncryptionJson::export(
                &Encryption::new(EncryptionMethod::TpmFde).with_password("secret")
            ))
            .unwrap(),
            json!({ "tpmFde": { "password": "secret" } })
        );
    }
}
