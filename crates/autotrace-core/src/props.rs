//! Instrumentation configuration
//!
//! Every options struct has a `Default` matching the documented defaults,
//! `with_*` builders, and camelCase serde support so a configuration can be
//! kept in a JSON or YAML document next to the infrastructure code.

use crate::error::ConfigError;
use autotrace_construct::SecretValue;
use serde::{Deserialize, Serialize};

/// Options shared by every entry point of one [`AutoTrace`](crate::AutoTrace)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTraceProps {
    /// Tracer token; a dynamic reference is bound natively on ECS
    pub token: SecretValue,
}

impl AutoTraceProps {
    #[must_use]
    pub fn new(token: SecretValue) -> Self {
        Self { token }
    }

    /// Parse from a JSON document
    ///
    /// # Errors
    /// `ConfigError::Json` if the document is malformed
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options of [`AutoTrace::trace_function`](crate::AutoTrace::trace_function)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceFunctionProps {
    /// Value of the user tag, if any
    pub tag: Option<String>,
    /// Add the provenance tag
    pub apply_auto_trace_tag: bool,
    /// Pinned layer version; the latest known version otherwise
    pub layer_version: Option<u32>,
    /// Context-header propagation setting to write, if any
    pub propagate_w3c: Option<bool>,
}

impl Default for TraceFunctionProps {
    fn default() -> Self {
        Self {
            tag: None,
            apply_auto_trace_tag: true,
            layer_version: None,
            propagate_w3c: Some(false),
        }
    }
}

impl TraceFunctionProps {
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_auto_trace_tag(mut self, apply: bool) -> Self {
        self.apply_auto_trace_tag = apply;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_layer_version(mut self, version: u32) -> Self {
        self.layer_version = Some(version);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_propagate_w3c(mut self, propagate: Option<bool>) -> Self {
        self.propagate_w3c = propagate;
        self
    }
}

/// Options of the ECS entry points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceTaskDefinitionProps {
    pub tag: Option<String>,
    pub apply_auto_trace_tag: bool,
    /// Injector image; [`DEFAULT_INJECTOR_IMAGE`](crate::constants::DEFAULT_INJECTOR_IMAGE) otherwise
    pub injector_image: Option<String>,
}

impl Default for TraceTaskDefinitionProps {
    fn default() -> Self {
        Self {
            tag: None,
            apply_auto_trace_tag: true,
            injector_image: None,
        }
    }
}

impl TraceTaskDefinitionProps {
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_auto_trace_tag(mut self, apply: bool) -> Self {
        self.apply_auto_trace_tag = apply;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_injector_image(mut self, image: impl Into<String>) -> Self {
        self.injector_image = Some(image.into());
        self
    }
}

/// Options of [`AutoTrace::trace_everything`](crate::AutoTrace::trace_everything)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceEverythingProps {
    pub trace_lambda: bool,
    pub trace_ecs: bool,
    pub tag: Option<String>,
    pub apply_auto_trace_tag: bool,
    pub lambda_nodejs_layer_version: Option<u32>,
    pub lambda_python_layer_version: Option<u32>,
    pub propagate_w3c: bool,
    pub injector_image: Option<String>,
}

impl Default for TraceEverythingProps {
    fn default() -> Self {
        Self {
            trace_lambda: true,
            trace_ecs: true,
            tag: None,
            apply_auto_trace_tag: true,
            lambda_nodejs_layer_version: None,
            lambda_python_layer_version: None,
            propagate_w3c: true,
            injector_image: None,
        }
    }
}

impl TraceEverythingProps {
    /// Parse from a JSON document; missing fields take their defaults
    ///
    /// # Errors
    /// `ConfigError::Json` if the document is malformed
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse from a YAML document; missing fields take their defaults
    ///
    /// # Errors
    /// `ConfigError::Yaml` if the document is malformed
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    #[inline]
    #[must_use]
    pub fn with_trace_lambda(mut self, enabled: bool) -> Self {
        self.trace_lambda = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_trace_ecs(mut self, enabled: bool) -> Self {
        self.trace_ecs = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_auto_trace_tag(mut self, apply: bool) -> Self {
        self.apply_auto_trace_tag = apply;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_nodejs_layer_version(mut self, version: u32) -> Self {
        self.lambda_nodejs_layer_version = Some(version);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_python_layer_version(mut self, version: u32) -> Self {
        self.lambda_python_layer_version = Some(version);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_propagate_w3c(mut self, propagate: bool) -> Self {
        self.propagate_w3c = propagate;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_injector_image(mut self, image: impl Into<String>) -> Self {
        self.injector_image = Some(image.into());
        self
    }
}
