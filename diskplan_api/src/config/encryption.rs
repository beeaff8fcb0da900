use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum EncryptionMethod {
    Luks1,
    Luks2,
    PervasiveLuks2,
    TpmFde,
    RandomSwap,
    ProtectedSwap,
    SecureSwap,
}

impl EncryptionMethod {
    /// Methods only usable for swap, which take no settings.
    pub fn is_swap(self) -> bool {
        matches!(
            self,
            Self::RandomSwap | Self::ProtectedSwap | Self::SecureSwap
        )
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PbkdFunction {
    Pbkdf2,
    Argon2i,
    Argon2id,
}

/// Encryption of a device. Without a method there is no encryption.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Encryption {
    pub method: Option<EncryptionMethod>,
    pub password: Option<String>,
    pub pbkd_function: Option<PbkdFunction>,
    pub label: Option<String>,
    pub cipher: Option<String>,
    pub key_size: Option<u32>,
    pub apqns: Vec<String>,
}

impl Encryption {
    pub fn new(method: EncryptionMethod) -> Self {
        Self {
            method: Some(method),
            ..Default::default()
        }
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..self
        }
    }

    pub fn is_swap(&self) -> bool {
        self.method.is_some_and(EncryptionMethod::is_swap)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(EncryptionMethod::PervasiveLuks2.name(), "pervasiveLuks2");
        assert_eq!(EncryptionMethod::TpmFde.name(), "tpmFde");
        assert_eq!(
            EncryptionMethod::from_str("randomSwap").unwrap(),
            EncryptionMethod::RandomSwap
        );
        assert!(EncryptionMethod::from_str("luks3").is_err());

        assert!(EncryptionMethod::RandomSwap.is_swap());
        assert!(EncryptionMethod::SecureSwap.is_swap());
        assert!(!EncryptionMethod::Luks2.is_swap());
        assert!(!Encryption::default().is_swap());
    }
}
