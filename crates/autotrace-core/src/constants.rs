//! Fixed names and values written by the instrumenters
//!
//! Validations re-derive their expectations from these, never from the
//! mutated resources.

/// Name of this package, as recorded in the provenance tag
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Account publishing the tracer layers
pub const LAYER_ACCOUNT_ID: &str = "114300393969";

/// Injector image used when none is configured
pub const DEFAULT_INJECTOR_IMAGE: &str = "public.ecr.aws/lumigo/lumigo-autotrace:v14";

/// Provenance tag value: `{package}@{version}`
#[must_use]
pub fn auto_trace_tag_value() -> String {
    format!("{PACKAGE_NAME}@{}", crate::VERSION)
}

/// Tracer layer names
pub mod layers {
    pub const NODE: &str = "lumigo-node-tracer";
    pub const PYTHON: &str = "lumigo-python-tracer";
}

/// Environment variables
pub mod env_vars {
    pub const TRACER_TOKEN: &str = "LUMIGO_TRACER_TOKEN";
    pub const EXEC_WRAPPER: &str = "AWS_LAMBDA_EXEC_WRAPPER";
    pub const EXEC_WRAPPER_VALUE: &str = "/opt/lumigo_wrapper";
    pub const ORIGINAL_HANDLER: &str = "LUMIGO_ORIGINAL_HANDLER";
    pub const PROPAGATE_W3C: &str = "LUMIGO_PROPAGATE_W3C";
    pub const INJECTOR: &str = "LD_PRELOAD";
    pub const INJECTOR_VALUE: &str = "/opt/lumigo/injector/lumigo_injector.so";
    pub const TARGET_DIRECTORY: &str = "TARGET_DIRECTORY";
}

/// Tag keys
pub mod tags {
    pub const AUTO_TRACE: &str = "lumigo:auto-trace";
    pub const USER: &str = "LUMIGO_TAG";
}

/// Handler the Python tracer dispatches through
pub const PYTHON_HANDLER: &str = "lumigo_tracer._handler";

/// ECS injector wiring
pub mod injector {
    pub const CONTAINER_NAME: &str = "lumigo-injector";
    pub const VOLUME_NAME: &str = "lumigo-injector";
    /// Where application containers see the injector's files
    pub const MOUNT_PATH: &str = "/opt/lumigo";
    /// Where the injector writes them
    pub const TARGET_DIRECTORY: &str = "/target";
    /// Construct id of an imported secrets-manager token
    pub const SECRET_ID: &str = "AutoTraceTokenSecret";
    /// Construct id of an imported SSM token parameter
    pub const PARAMETER_ID: &str = "AutoTraceTokenParameter";
}
