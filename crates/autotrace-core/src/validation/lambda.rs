//! Checks for traced functions

use super::ValidationIssues;
use crate::classifier::TracerLayer;
use crate::constants::{env_vars, PACKAGE_NAME, PYTHON_HANDLER};
use crate::layers::layer_arn_prefix;
use autotrace_construct::{App, ConstructError, ConstructId, Function};

/// Register every check matching what `trace_function` wrote
///
/// # Errors
/// `ConstructError::NotFound` if the function is gone
pub(crate) fn register(
    app: &mut App,
    function: ConstructId,
    layer: TracerLayer,
    propagate_w3c: Option<bool>,
) -> Result<(), ConstructError> {
    let region = app.region_of(function).to_string();
    app.add_validation(function, move |app: &App| {
        exactly_one_layer(app, function, &region)
    })?;
    app.add_validation(function, move |app: &App| {
        env_var_not_blank(app, function, env_vars::TRACER_TOKEN)
    })?;

    match layer {
        TracerLayer::Node => {
            app.add_validation(function, move |app: &App| {
                env_var_equals(app, function, env_vars::EXEC_WRAPPER, env_vars::EXEC_WRAPPER_VALUE)
            })?;
        }
        TracerLayer::Python => {
            app.add_validation(function, move |app: &App| {
                env_var_not_blank(app, function, env_vars::ORIGINAL_HANDLER)
            })?;
            app.add_validation(function, move |app: &App| handler_redirected(app, function))?;
        }
    }

    if let Some(expected) = propagate_w3c {
        app.add_validation(function, move |app: &App| {
            env_var_equals(app, function, env_vars::PROPAGATE_W3C, &expected.to_string())
        })?;
    }

    Ok(())
}

/// Exactly one layer from the tracer account is attached
pub fn exactly_one_layer(app: &App, function: ConstructId, region: &str) -> ValidationIssues {
    let Some(function) = app.function(function) else {
        return Vec::new();
    };

    let prefix = layer_arn_prefix(region);
    let matching: Vec<&str> = function
        .layers()
        .iter()
        .map(|layer| layer.arn())
        .filter(|arn| arn.starts_with(&prefix))
        .collect();

    match matching.len() {
        0 => vec!["The function does not have the tracer layer installed.".to_string()],
        1 => Vec::new(),
        _ => {
            let arns: Vec<String> = matching.iter().map(|arn| format!("'{arn}'")).collect();
            vec![format!("Multiple tracer layers found: {}", arns.join(","))]
        }
    }
}

fn environment_of(app: &App, function: ConstructId) -> Result<Option<&Function>, ValidationIssues> {
    match app.function(function) {
        None => Ok(None),
        Some(f) if f.environment().is_none() => Err(vec![format!(
            "No 'environment' property found on this Lambda; consider upgrading your '{PACKAGE_NAME}' package."
        )]),
        Some(f) => Ok(Some(f)),
    }
}

/// An environment variable is set and not blank
pub fn env_var_not_blank(app: &App, function: ConstructId, name: &str) -> ValidationIssues {
    let function = match environment_of(app, function) {
        Ok(Some(function)) => function,
        Ok(None) => return Vec::new(),
        Err(issues) => return issues,
    };

    match function.environment().and_then(|env| env.get(name)) {
        None => vec![format!("The '{name}' environment variable is not set.")],
        Some(value) if value.trim().is_empty() => {
            vec![format!("The '{name}' environment variable has a blank value.")]
        }
        Some(_) => Vec::new(),
    }
}

/// An environment variable is set to an exact value
pub fn env_var_equals(
    app: &App,
    function: ConstructId,
    name: &str,
    expected: &str,
) -> ValidationIssues {
    let function = match environment_of(app, function) {
        Ok(Some(function)) => function,
        Ok(None) => return Vec::new(),
        Err(issues) => return issues,
    };

    match function.environment().and_then(|env| env.get(name)) {
        None => vec![format!("The '{name}' environment variable is not set.")],
        Some(value) if value != expected => vec![format!(
            "The '{name}' environment variable has a different value than the expected '{expected}'."
        )],
        Some(_) => Vec::new(),
    }
}

/// The handler dispatches through the Python tracer
pub fn handler_redirected(app: &App, function: ConstructId) -> ValidationIssues {
    if app.function(function).is_none() {
        return Vec::new();
    }
    match app.entry_point(function) {
        Some(entry_point) if entry_point.entry_point() == PYTHON_HANDLER => Vec::new(),
        _ => vec![format!("The handler is not set to the tracer's '{PYTHON_HANDLER}'.")],
    }
}
