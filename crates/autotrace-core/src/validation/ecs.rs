//! Checks for traced task definitions and their containers
//!
//! Container-level issues are prefixed with `Container '{name}': `. Token
//! checks never print the token itself.

use super::ValidationIssues;
use crate::constants::{env_vars, injector};
use autotrace_construct::{App, ConstructError, ConstructId, ContainerDefinition, ContainerDependencyCondition};

/// How the token was delivered to application containers
#[derive(Clone)]
pub(crate) enum ExpectedToken {
    Secret,
    /// Plaintext value; never rendered into issue messages
    PlainText(String),
}

/// Register task-level checks and per-container checks for `containers`
///
/// # Errors
/// `ConstructError::NotFound` if a node is gone
pub(crate) fn register(
    app: &mut App,
    task_definition: ConstructId,
    injector_container: ConstructId,
    containers: &[ConstructId],
    token: &ExpectedToken,
) -> Result<(), ConstructError> {
    app.add_validation(task_definition, move |app: &App| {
        injector_volume(app, task_definition)
    })?;
    app.add_validation(task_definition, move |app: &App| {
        injector_container_count(app, task_definition)
    })?;

    for &container in containers {
        app.add_validation(container, move |app: &App| injector_mount_point(app, container))?;
        app.add_validation(container, move |app: &App| {
            injector_dependency(app, container, injector_container)
        })?;
        app.add_validation(container, move |app: &App| injector_env_var(app, container))?;
        match token.clone() {
            ExpectedToken::Secret => {
                app.add_validation(container, move |app: &App| token_secret(app, container))?;
            }
            ExpectedToken::PlainText(expected) => {
                app.add_validation(container, move |app: &App| {
                    token_env_var(app, container, &expected)
                })?;
            }
        }
    }

    Ok(())
}

/// Exactly one injector container exists
pub fn injector_container_count(app: &App, task_definition: ConstructId) -> ValidationIssues {
    let count = app
        .containers_of(task_definition)
        .iter()
        .filter(|(_, c)| c.container_name() == injector::CONTAINER_NAME)
        .count();

    match count {
        0 => vec![format!(
            "No container called '{}' found; did you modify the task definition after adding tracing to it?",
            injector::CONTAINER_NAME
        )],
        1 => Vec::new(),
        n => vec![format!(
            "{n} containers called '{}' found; did you set tracing up multiple times for this task definition?",
            injector::CONTAINER_NAME
        )],
    }
}

/// Exactly one injector volume exists, with no storage backend
pub fn injector_volume(app: &App, task_definition: ConstructId) -> ValidationIssues {
    let Some(td) = app.task_definition(task_definition) else {
        return Vec::new();
    };
    let volumes: Vec<_> = td
        .volumes()
        .iter()
        .filter(|v| v.name == injector::VOLUME_NAME)
        .collect();

    let volume = match volumes.as_slice() {
        [] => {
            return vec![format!(
                "No volume called '{}' found; did you modify the task definition after adding tracing to it?",
                injector::VOLUME_NAME
            )]
        }
        [volume] => volume,
        many => {
            return vec![format!(
                "{} volumes called '{}' found; did you set tracing up multiple times for this task definition?",
                many.len(),
                injector::VOLUME_NAME
            )]
        }
    };

    let mut issues = Vec::new();
    if volume.docker_volume_configuration.is_some() {
        issues.push(format!(
            "The '{}' volume has 'dockerVolumeConfiguration's attached to it; did you modify the task definition after adding tracing to it?",
            injector::VOLUME_NAME
        ));
    }
    if volume.efs_volume_configuration.is_some() {
        issues.push(format!(
            "The '{}' volume has 'efsVolumeConfiguration's attached to it; did you modify the task definition after adding tracing to it?",
            injector::VOLUME_NAME
        ));
    }
    issues
}

fn container_issues(
    app: &App,
    container: ConstructId,
    check: impl FnOnce(&ContainerDefinition) -> Vec<String>,
) -> ValidationIssues {
    let Some(definition) = app.container(container) else {
        return Vec::new();
    };
    check(definition)
        .into_iter()
        .map(|issue| format!("Container '{}': {issue}", definition.container_name()))
        .collect()
}

/// The injector volume is mounted read-only at the expected path
pub fn injector_mount_point(app: &App, container: ConstructId) -> ValidationIssues {
    container_issues(app, container, |definition| {
        let Some(mount_point) = definition
            .mount_points()
            .iter()
            .find(|m| m.source_volume == injector::VOLUME_NAME)
        else {
            return vec![format!("No mount point '{}' found", injector::VOLUME_NAME)];
        };

        let mut issues = Vec::new();
        if !mount_point.read_only {
            issues.push(format!(
                "The mount point for the '{}' volume is not set to read-only",
                injector::VOLUME_NAME
            ));
        }
        if mount_point.container_path != injector::MOUNT_PATH {
            issues.push(format!(
                "The container path of the mount point for the '{}' volume is not set to '{}'",
                injector::VOLUME_NAME,
                injector::MOUNT_PATH
            ));
        }
        issues
    })
}

/// The container waits for the injector to complete
pub fn injector_dependency(
    app: &App,
    container: ConstructId,
    injector_container: ConstructId,
) -> ValidationIssues {
    let injector_def = app.container(injector_container);
    let injector_name = injector_def.map_or(injector::CONTAINER_NAME, ContainerDefinition::container_name);

    container_issues(app, container, |definition| {
        let condition = definition
            .container_dependencies()
            .iter()
            .find(|d| d.container == injector_container)
            .map(|d| d.condition);

        // A dependency on a removed injector is dangling.
        if injector_def.is_some() && condition == Some(ContainerDependencyCondition::Complete) {
            Vec::new()
        } else {
            vec![format!(
                "The container dependency condition of the '{}' on the '{injector_name}' is not set to '{}'",
                definition.container_name(),
                ContainerDependencyCondition::Complete
            )]
        }
    })
}

/// The loader variable points at the injected library
pub fn injector_env_var(app: &App, container: ConstructId) -> ValidationIssues {
    container_issues(app, container, |definition| {
        if definition.environment().get(env_vars::INJECTOR).map(String::as_str)
            == Some(env_vars::INJECTOR_VALUE)
        {
            Vec::new()
        } else {
            vec![format!(
                "The '{}' does not have the expected value '{}'",
                env_vars::INJECTOR,
                env_vars::INJECTOR_VALUE
            )]
        }
    })
}

/// The token is bound as a container secret and not also set as plaintext
pub fn token_secret(app: &App, container: ConstructId) -> ValidationIssues {
    container_issues(app, container, |definition| {
        let mut issues = Vec::new();
        if !definition.secrets().iter().any(|s| s.name == env_vars::TRACER_TOKEN) {
            issues.push(format!(
                "The '{}' is not mounted as a secret built from the token passed to AutoTrace",
                env_vars::TRACER_TOKEN
            ));
        }
        if definition.environment().contains_key(env_vars::TRACER_TOKEN) {
            issues.push(format!(
                "The '{}' is also set as a plaintext environment variable",
                env_vars::TRACER_TOKEN
            ));
        }
        issues
    })
}

/// The token is set as plaintext with the expected value and not also
/// bound as a secret
pub fn token_env_var(app: &App, container: ConstructId, expected: &str) -> ValidationIssues {
    container_issues(app, container, |definition| {
        let mut issues = Vec::new();
        if definition.environment().get(env_vars::TRACER_TOKEN).map(String::as_str) != Some(expected) {
            issues.push(format!(
                "The '{}' does not have the expected value provided in the token passed to AutoTrace",
                env_vars::TRACER_TOKEN
            ));
        }
        if definition.secrets().iter().any(|s| s.name == env_vars::TRACER_TOKEN) {
            issues.push(format!(
                "The '{}' is also mounted as a secret",
                env_vars::TRACER_TOKEN
            ));
        }
        issues
    })
}
