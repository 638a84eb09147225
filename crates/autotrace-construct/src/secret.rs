//! Deferred secret values
//!
//! A [`SecretValue`] is either a plaintext literal or a dynamic reference
//! resolved at deploy time (`{{resolve:<service>:<value>}}`). Its `Debug`
//! output never contains the underlying value.

use crate::construct::{App, ConstructId, ConstructKind};
use crate::error::ConstructError;
use serde::{Deserialize, Deserializer};
use std::fmt;

const REFERENCE_PREFIX: &str = "{{resolve:";
const REFERENCE_SUFFIX: &str = "}}";

/// Backends a dynamic reference can resolve against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicReferenceService {
    SecretsManager,
    Ssm,
    SsmSecure,
}

impl DynamicReferenceService {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecretsManager => "secretsmanager",
            Self::Ssm => "ssm",
            Self::SsmSecure => "ssm-secure",
        }
    }

    fn parse(service: &str) -> Option<Self> {
        match service {
            "secretsmanager" => Some(Self::SecretsManager),
            "ssm" => Some(Self::Ssm),
            "ssm-secure" => Some(Self::SsmSecure),
            _ => None,
        }
    }
}

impl fmt::Display for DynamicReferenceService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{{resolve:...}}` reference
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DynamicReference {
    service: DynamicReferenceService,
    value: String,
}

impl DynamicReference {
    #[must_use]
    pub fn new(service: DynamicReferenceService, value: impl Into<String>) -> Self {
        Self {
            service,
            value: value.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn service(&self) -> DynamicReferenceService {
        self.service
    }

    /// The reference without the service, e.g. `name:SecretString:field::`
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Rendered `{{resolve:<service>:<value>}}` token
    #[must_use]
    pub fn to_token(&self) -> String {
        format!("{REFERENCE_PREFIX}{}:{}{REFERENCE_SUFFIX}", self.service, self.value)
    }
}

impl fmt::Debug for DynamicReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicReference")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Options of a secrets-manager backed value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsManagerSecretOptions {
    pub json_field: Option<String>,
    pub version_stage: Option<String>,
    pub version_id: Option<String>,
}

impl SecretsManagerSecretOptions {
    #[inline]
    #[must_use]
    pub fn with_json_field(mut self, field: impl Into<String>) -> Self {
        self.json_field = Some(field.into());
        self
    }
}

/// A value that must not end up in logs
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    raw: String,
    reference: Option<DynamicReference>,
}

impl SecretValue {
    /// Wrap a literal; it will appear in the template as-is
    #[must_use]
    pub fn unsafe_plain_text(value: impl Into<String>) -> Self {
        Self {
            raw: value.into(),
            reference: None,
        }
    }

    /// Reference to a secrets-manager secret
    #[must_use]
    pub fn secrets_manager(secret_id: impl AsRef<str>, options: SecretsManagerSecretOptions) -> Self {
        let value = format!(
            "{}:SecretString:{}:{}:{}",
            secret_id.as_ref(),
            options.json_field.as_deref().unwrap_or_default(),
            options.version_stage.as_deref().unwrap_or_default(),
            options.version_id.as_deref().unwrap_or_default(),
        );
        Self::cfn_dynamic_reference(DynamicReference::new(
            DynamicReferenceService::SecretsManager,
            value,
        ))
    }

    /// Reference to an SSM secure-string parameter
    #[must_use]
    pub fn ssm_secure(parameter_name: impl AsRef<str>, version: Option<u32>) -> Self {
        let value = match version {
            Some(version) => format!("{}:{version}", parameter_name.as_ref()),
            None => parameter_name.as_ref().to_string(),
        };
        Self::cfn_dynamic_reference(DynamicReference::new(DynamicReferenceService::SsmSecure, value))
    }

    #[must_use]
    pub fn cfn_dynamic_reference(reference: DynamicReference) -> Self {
        Self {
            raw: reference.to_token(),
            reference: Some(reference),
        }
    }

    /// Interpret a raw string, recognising dynamic references of known services
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let reference = raw
            .strip_prefix(REFERENCE_PREFIX)
            .and_then(|rest| rest.strip_suffix(REFERENCE_SUFFIX))
            .and_then(|body| body.split_once(':'))
            .and_then(|(service, value)| {
                DynamicReferenceService::parse(service).map(|s| DynamicReference::new(s, value))
            });
        Self { raw, reference }
    }

    /// The raw string: the literal, or the rendered reference token
    #[inline]
    #[must_use]
    pub fn unsafe_unwrap(&self) -> &str {
        &self.raw
    }

    #[inline]
    #[must_use]
    pub fn dynamic_reference(&self) -> Option<&DynamicReference> {
        self.reference.as_ref()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from_raw)
    }
}

/// A secret or parameter referenced by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedSecret {
    SecretsManager {
        secret_name: String,
    },
    SsmSecureParameter {
        parameter_name: String,
        version: Option<u32>,
    },
}

impl App {
    /// Import an existing secret under `scope`
    ///
    /// # Errors
    /// `ConstructError::DuplicateId` if `scope` already has a child named `local_id`
    pub fn import_secret(
        &mut self,
        scope: ConstructId,
        local_id: impl Into<String>,
        secret: ImportedSecret,
    ) -> Result<ConstructId, ConstructError> {
        self.add_child(scope, local_id, ConstructKind::ImportedSecret(secret))
    }

    #[must_use]
    pub fn imported_secret(&self, id: ConstructId) -> Option<&ImportedSecret> {
        match self.kind(id)? {
            ConstructKind::ImportedSecret(secret) => Some(secret),
            _ => None,
        }
    }
}
