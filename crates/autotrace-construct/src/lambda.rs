//! Lambda functions
//!
//! A [`Function`] node owns its layers and environment. Its handler and the
//! rendered runtime live on a low-level [`CfnFunction`] child called
//! `Resource`, reachable through the narrow [`EntryPoint`] accessor.

use crate::construct::{App, ConstructId, ConstructKind};
use crate::error::ConstructError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Local id of the low-level function resource
pub(crate) const RESOURCE_ID: &str = "Resource";

/// Runtime identifier, e.g. `nodejs16.x`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Runtime(Cow<'static, str>);

impl Runtime {
    pub const NODEJS_10_X: Self = Self(Cow::Borrowed("nodejs10.x"));
    pub const NODEJS_12_X: Self = Self(Cow::Borrowed("nodejs12.x"));
    pub const NODEJS_14_X: Self = Self(Cow::Borrowed("nodejs14.x"));
    pub const NODEJS_16_X: Self = Self(Cow::Borrowed("nodejs16.x"));
    pub const NODEJS_18_X: Self = Self(Cow::Borrowed("nodejs18.x"));
    pub const PYTHON_3_7: Self = Self(Cow::Borrowed("python3.7"));
    pub const PYTHON_3_8: Self = Self(Cow::Borrowed("python3.8"));
    pub const PYTHON_3_9: Self = Self(Cow::Borrowed("python3.9"));
    pub const PYTHON_3_10: Self = Self(Cow::Borrowed("python3.10"));
    pub const JAVA_11: Self = Self(Cow::Borrowed("java11"));
    pub const GO_1_X: Self = Self(Cow::Borrowed("go1.x"));
    pub const DOTNET_6: Self = Self(Cow::Borrowed("dotnet6"));
    pub const PROVIDED_AL2: Self = Self(Cow::Borrowed("provided.al2"));

    /// Runtime not known to this crate
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which construct a function was created through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionFlavor {
    #[default]
    Generic,
    /// Bundled Node.js function; the runtime may be left to its default
    Nodejs,
    Python,
}

impl FunctionFlavor {
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Generic => "Function",
            Self::Nodejs => "NodejsFunction",
            Self::Python => "PythonFunction",
        }
    }
}

/// Reference to a published layer version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerVersion {
    arn: String,
}

impl LayerVersion {
    #[must_use]
    pub fn from_layer_version_arn(arn: impl Into<String>) -> Self {
        Self { arn: arn.into() }
    }

    #[inline]
    #[must_use]
    pub fn arn(&self) -> &str {
        &self.arn
    }
}

/// Function construction options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionProps {
    pub runtime: Option<Runtime>,
    pub handler: String,
    pub flavor: FunctionFlavor,
    pub environment: IndexMap<String, String>,
    pub layers: Vec<LayerVersion>,
}

impl FunctionProps {
    #[must_use]
    pub fn new(runtime: Runtime, handler: impl Into<String>) -> Self {
        Self {
            runtime: Some(runtime),
            handler: handler.into(),
            ..Self::default()
        }
    }

    /// Node.js function relying on the default runtime
    #[must_use]
    pub fn nodejs(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            flavor: FunctionFlavor::Nodejs,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn python(runtime: Runtime, handler: impl Into<String>) -> Self {
        Self {
            runtime: Some(runtime),
            handler: handler.into(),
            flavor: FunctionFlavor::Python,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_layer(mut self, layer: LayerVersion) -> Self {
        self.layers.push(layer);
        self
    }
}

/// A Lambda function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    runtime: Option<Runtime>,
    flavor: FunctionFlavor,
    layers: Vec<LayerVersion>,
    environment: Option<IndexMap<String, String>>,
}

impl Function {
    /// Declared runtime; `None` when left to the construct's default
    #[inline]
    #[must_use]
    pub fn runtime(&self) -> Option<&Runtime> {
        self.runtime.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn flavor(&self) -> FunctionFlavor {
        self.flavor
    }

    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[LayerVersion] {
        &self.layers
    }

    /// Append layers; no de-duplication takes place
    pub fn add_layers(&mut self, layers: impl IntoIterator<Item = LayerVersion>) {
        self.layers.extend(layers);
    }

    #[inline]
    #[must_use]
    pub fn environment(&self) -> Option<&IndexMap<String, String>> {
        self.environment.as_ref()
    }

    /// Set an environment variable, overwriting any previous value
    pub fn add_environment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
    }

    /// Drop the whole environment block
    pub fn remove_environment(&mut self) -> Option<IndexMap<String, String>> {
        self.environment.take()
    }
}

/// Read and rewrite access to a function's handler
pub trait EntryPoint {
    fn entry_point(&self) -> &str;

    /// Replace the handler, returning the previous one
    fn replace_entry_point(&mut self, handler: String) -> String;
}

/// Low-level function resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfnFunction {
    handler: String,
    runtime: String,
}

impl CfnFunction {
    /// Runtime as rendered into the template
    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &str {
        &self.runtime
    }
}

impl EntryPoint for CfnFunction {
    fn entry_point(&self) -> &str {
        &self.handler
    }

    fn replace_entry_point(&mut self, handler: String) -> String {
        std::mem::replace(&mut self.handler, handler)
    }
}

impl App {
    /// Add a function and its low-level resource under `scope`
    ///
    /// # Errors
    /// - `ConstructError::DuplicateId` if the id is taken
    /// - `ConstructError::InvalidProps` if a generic function has no runtime
    pub fn add_function(
        &mut self,
        scope: ConstructId,
        local_id: impl Into<String>,
        props: FunctionProps,
    ) -> Result<ConstructId, ConstructError> {
        let rendered_runtime = match (&props.runtime, props.flavor) {
            (Some(runtime), _) => runtime.name().to_string(),
            (None, FunctionFlavor::Nodejs) => Runtime::NODEJS_14_X.name().to_string(),
            (None, FunctionFlavor::Python) => Runtime::PYTHON_3_7.name().to_string(),
            (None, FunctionFlavor::Generic) => {
                return Err(ConstructError::invalid_props("a Function requires a runtime"))
            }
        };
        let runtime = match props.flavor {
            FunctionFlavor::Python => Some(props.runtime.unwrap_or(Runtime::PYTHON_3_7)),
            _ => props.runtime,
        };

        let function = self.add_child(
            scope,
            local_id,
            ConstructKind::Function(Function {
                runtime,
                flavor: props.flavor,
                layers: props.layers,
                environment: Some(props.environment),
            }),
        )?;
        self.add_child(
            function,
            RESOURCE_ID,
            ConstructKind::CfnFunction(CfnFunction {
                handler: props.handler,
                runtime: rendered_runtime,
            }),
        )?;

        Ok(function)
    }

    #[must_use]
    pub fn function(&self, id: ConstructId) -> Option<&Function> {
        match self.kind(id)? {
            ConstructKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Mutable access to a function
    ///
    /// # Errors
    /// `ConstructError::UnexpectedKind` if `id` is not a function
    pub fn function_mut(&mut self, id: ConstructId) -> Result<&mut Function, ConstructError> {
        self.expect_kind_mut(id, "Function", |kind| match kind {
            ConstructKind::Function(function) => Some(function),
            _ => None,
        })
    }

    /// The `Resource` child of a function, if still present
    #[must_use]
    pub fn function_resource(&self, function: ConstructId) -> Option<ConstructId> {
        self.find_child(function, RESOURCE_ID)
            .ok()
            .flatten()
            .filter(|id| matches!(self.kind(*id), Some(ConstructKind::CfnFunction(_))))
    }

    #[must_use]
    pub fn cfn_function(&self, id: ConstructId) -> Option<&CfnFunction> {
        match self.kind(id)? {
            ConstructKind::CfnFunction(cfn) => Some(cfn),
            _ => None,
        }
    }

    /// Handler accessor of a function
    #[must_use]
    pub fn entry_point(&self, function: ConstructId) -> Option<&dyn EntryPoint> {
        let resource = self.function_resource(function)?;
        self.cfn_function(resource).map(|cfn| cfn as &dyn EntryPoint)
    }

    /// Mutable handler accessor of a function
    pub fn entry_point_mut(&mut self, function: ConstructId) -> Option<&mut dyn EntryPoint> {
        let resource = self.function_resource(function)?;
        match self.kind_mut(resource)? {
            ConstructKind::CfnFunction(cfn) => Some(cfn as &mut dyn EntryPoint),
            _ => None,
        }
    }
}
