//! Compute-resource instrumenter
//!
//! Attaches the tracer layer to a function and wires its environment. Every
//! environment write is an overwrite; the layer attachment is not
//! deduplicated, so a second run surfaces as a validation failure.

use crate::classifier::{classify, TracerLayer};
use crate::constants::{auto_trace_tag_value, env_vars, PYTHON_HANDLER};
use crate::error::{AutoTraceError, AutoTraceResult};
use crate::layers::resolve_layer_arn;
use crate::props::TraceFunctionProps;
use crate::tagging::{apply_trace_tags, TagSink};
use crate::validation;
use autotrace_construct::{App, ConstructError, ConstructId, LayerVersion, SecretValue};

/// Instrument a single function
///
/// # Errors
/// - `AutoTraceError::UnsupportedRuntime` if no tracer exists for the runtime
/// - `AutoTraceError::UnsupportedRegion` if nothing is pinned and no layer
///   version is published in the function's region
/// - `AutoTraceError::Construct` if the function's handler resource is gone
pub(crate) fn trace_function(
    app: &mut App,
    function: ConstructId,
    token: &SecretValue,
    props: &TraceFunctionProps,
    tags: &dyn TagSink,
) -> AutoTraceResult<()> {
    let target = app.function(function).ok_or(ConstructError::NotFound(function))?;
    let Some(layer) = classify(target) else {
        return Err(AutoTraceError::unsupported_runtime(target.runtime()));
    };

    let region = app.region_of(function).to_string();
    let arn = resolve_layer_arn(layer, &region, props.layer_version)?;
    tracing::debug!(path = %app.path(function), %arn, "attaching tracer layer");

    let target = app.function_mut(function)?;
    target.add_layers([LayerVersion::from_layer_version_arn(arn)]);
    target.add_environment(env_vars::TRACER_TOKEN, token.unsafe_unwrap());

    match layer {
        TracerLayer::Node => {
            target.add_environment(env_vars::EXEC_WRAPPER, env_vars::EXEC_WRAPPER_VALUE);
        }
        TracerLayer::Python => redirect_handler(app, function)?,
    }

    if let Some(propagate) = props.propagate_w3c {
        app.function_mut(function)?
            .add_environment(env_vars::PROPAGATE_W3C, propagate.to_string());
    }

    apply_trace_tags(
        tags,
        app,
        function,
        props.apply_auto_trace_tag,
        props.tag.as_deref(),
    );

    validation::lambda::register(app, function, layer, props.propagate_w3c)?;

    tracing::info!(path = %app.path(function), %layer, "function traced");
    app.add_info(
        function,
        format!(
            "This function has been modified with auto-tracing by the '{}' package.",
            auto_trace_tag_value()
        ),
    );

    Ok(())
}

/// Point the handler at the Python tracer, keeping the original in the
/// environment
fn redirect_handler(app: &mut App, function: ConstructId) -> AutoTraceResult<()> {
    let path = app.path(function);
    let Some(entry_point) = app.entry_point_mut(function) else {
        return Err(ConstructError::invalid_props(format!("[{path}] has no handler resource")).into());
    };

    // Already redirected: the stored original must survive.
    if entry_point.entry_point() == PYTHON_HANDLER {
        tracing::debug!(%path, "handler already redirected");
        return Ok(());
    }

    let original = entry_point.replace_entry_point(PYTHON_HANDLER.to_string());
    tracing::debug!(%path, %original, "redirecting handler");
    app.function_mut(function)?
        .add_environment(env_vars::ORIGINAL_HANDLER, original);

    Ok(())
}
