//! Container-workload instrumenter
//!
//! Wires an injector sidecar into a task definition: a shared volume, the
//! injector container writing into it, and a read-only mount plus loader
//! variable on every other container. Every addition is guarded by an
//! existence check, so re-running on the same task definition is a no-op.

use crate::constants::{env_vars, injector, DEFAULT_INJECTOR_IMAGE};
use crate::error::AutoTraceResult;
use crate::props::TraceTaskDefinitionProps;
use crate::tagging::{apply_trace_tags, TagSink};
use crate::validation::{self, ecs::ExpectedToken};
use autotrace_construct::{
    App, ConstructError, ConstructId, ContainerDefinitionOptions, ContainerDependency,
    ContainerDependencyCondition, ContainerImage, DynamicReferenceService, EcsSecret,
    ImportedSecret, MountPoint, SecretValue, Volume,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Token bindings resolved per task definition
///
/// `None` records that the token fell back to plaintext.
pub(crate) type SecretCache = DashMap<ConstructId, Option<EcsSecret>>;

/// Instrument a task definition
///
/// # Errors
/// - `ConstructError::UnexpectedKind` if `task_definition` is not a task definition
/// - `ConstructError::DuplicateId` if an id the instrumenter needs is taken
pub(crate) fn trace_task_definition(
    app: &mut App,
    task_definition: ConstructId,
    token: &SecretValue,
    props: &TraceTaskDefinitionProps,
    secrets: &SecretCache,
    tags: &dyn TagSink,
) -> AutoTraceResult<()> {
    ensure_volume(app, task_definition)?;
    let injector_container = ensure_injector_container(app, task_definition, props)?;
    ensure_injector_mount(app, injector_container)?;

    let secret = resolve_cached(app, task_definition, token, secrets)?;

    let containers: Vec<ConstructId> = app
        .containers_of(task_definition)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| *id != injector_container)
        .collect();

    for &container in &containers {
        wire_container(app, container, injector_container, token, secret.as_ref())?;
    }

    let expected = match secret {
        Some(_) => ExpectedToken::Secret,
        None => ExpectedToken::PlainText(token.unsafe_unwrap().to_string()),
    };
    validation::ecs::register(app, task_definition, injector_container, &containers, &expected)?;

    apply_trace_tags(
        tags,
        app,
        task_definition,
        props.apply_auto_trace_tag,
        props.tag.as_deref(),
    );

    tracing::info!(
        path = %app.path(task_definition),
        containers = containers.len(),
        "task definition traced"
    );
    Ok(())
}

/// Instrument the task definition of a service or scheduled task, tagging
/// the owner instead of the task definition
pub(crate) fn trace_workload(
    app: &mut App,
    owner: ConstructId,
    task_definition: ConstructId,
    token: &SecretValue,
    props: &TraceTaskDefinitionProps,
    secrets: &SecretCache,
    tags: &dyn TagSink,
) -> AutoTraceResult<()> {
    let untagged = TraceTaskDefinitionProps {
        tag: None,
        apply_auto_trace_tag: false,
        injector_image: props.injector_image.clone(),
    };
    trace_task_definition(app, task_definition, token, &untagged, secrets, tags)?;

    apply_trace_tags(
        tags,
        app,
        owner,
        props.apply_auto_trace_tag,
        props.tag.as_deref(),
    );
    Ok(())
}

fn ensure_volume(app: &mut App, task_definition: ConstructId) -> Result<(), ConstructError> {
    let td = app.task_definition_mut(task_definition)?;
    if !td.volumes().iter().any(|v| v.name == injector::VOLUME_NAME) {
        tracing::debug!(%task_definition, "adding injector volume");
        td.add_volume(Volume::named(injector::VOLUME_NAME));
    }
    Ok(())
}

fn ensure_injector_container(
    app: &mut App,
    task_definition: ConstructId,
    props: &TraceTaskDefinitionProps,
) -> Result<ConstructId, ConstructError> {
    let existing = app
        .containers_of(task_definition)
        .into_iter()
        .find(|(_, c)| c.container_name() == injector::CONTAINER_NAME)
        .map(|(id, _)| id);
    if let Some(id) = existing {
        return Ok(id);
    }

    let image = props.injector_image.as_deref().unwrap_or(DEFAULT_INJECTOR_IMAGE);
    tracing::debug!(%task_definition, image, "adding injector container");
    app.add_container(
        task_definition,
        injector::CONTAINER_NAME,
        ContainerDefinitionOptions::new(ContainerImage::from_registry(image))
            .with_container_name(injector::CONTAINER_NAME)
            .with_environment(env_vars::TARGET_DIRECTORY, injector::TARGET_DIRECTORY)
            .with_essential(false),
    )
}

fn ensure_injector_mount(app: &mut App, injector_container: ConstructId) -> Result<(), ConstructError> {
    let container = app.container_mut(injector_container)?;
    if !container
        .mount_points()
        .iter()
        .any(|m| m.source_volume == injector::VOLUME_NAME)
    {
        container.add_mount_points([MountPoint {
            source_volume: injector::VOLUME_NAME.to_string(),
            container_path: injector::TARGET_DIRECTORY.to_string(),
            read_only: false,
        }]);
    }
    Ok(())
}

fn wire_container(
    app: &mut App,
    container: ConstructId,
    injector_container: ConstructId,
    token: &SecretValue,
    secret: Option<&EcsSecret>,
) -> Result<(), ConstructError> {
    let definition = app.container_mut(container)?;

    if !definition
        .container_dependencies()
        .iter()
        .any(|d| d.container == injector_container)
    {
        definition.add_container_dependencies([ContainerDependency {
            container: injector_container,
            condition: ContainerDependencyCondition::Complete,
        }]);
    }

    if !definition
        .mount_points()
        .iter()
        .any(|m| m.source_volume == injector::VOLUME_NAME)
    {
        definition.add_mount_points([MountPoint {
            source_volume: injector::VOLUME_NAME.to_string(),
            container_path: injector::MOUNT_PATH.to_string(),
            read_only: true,
        }]);
    }

    definition.add_environment(env_vars::INJECTOR, env_vars::INJECTOR_VALUE);

    // The token is delivered one way only.
    match secret {
        Some(secret) => {
            if definition.remove_environment(env_vars::TRACER_TOKEN).is_some() {
                tracing::debug!(
                    container = definition.container_name(),
                    "dropped plaintext token in favour of the secret binding"
                );
            }
            if !definition.secrets().iter().any(|s| s.name == env_vars::TRACER_TOKEN) {
                definition.add_secret(env_vars::TRACER_TOKEN, secret.clone());
            }
        }
        None => {
            if definition.remove_secrets(env_vars::TRACER_TOKEN) > 0 {
                tracing::debug!(
                    container = definition.container_name(),
                    "dropped token secret binding in favour of the plaintext value"
                );
            }
            definition.add_environment(env_vars::TRACER_TOKEN, token.unsafe_unwrap());
        }
    }

    tracing::debug!(container = definition.container_name(), "container wired to injector");
    Ok(())
}

/// Resolve the token binding at most once per task definition
fn resolve_cached(
    app: &mut App,
    task_definition: ConstructId,
    token: &SecretValue,
    secrets: &SecretCache,
) -> Result<Option<EcsSecret>, ConstructError> {
    match secrets.entry(task_definition) {
        Entry::Occupied(entry) => Ok(entry.get().clone()),
        Entry::Vacant(entry) => {
            let secret = resolve_token_secret(app, task_definition, token)?;
            entry.insert(secret.clone());
            Ok(secret)
        }
    }
}

/// Turn a dynamic-reference token into a native secret binding
///
/// Only structured references qualify; a literal that merely looks like one
/// stays plaintext. Secrets-manager references yield `{name, field}`, SSM
/// secure references `{name, version}`.
fn resolve_token_secret(
    app: &mut App,
    task_definition: ConstructId,
    token: &SecretValue,
) -> Result<Option<EcsSecret>, ConstructError> {
    let Some(reference) = token.dynamic_reference() else {
        return Ok(None);
    };

    match reference.service() {
        DynamicReferenceService::SecretsManager => {
            if let Some((secret_name, field)) = secrets_manager_binding(reference.value()) {
                let imported = ImportedSecret::SecretsManager {
                    secret_name: secret_name.to_string(),
                };
                app.import_secret(task_definition, injector::SECRET_ID, imported.clone())?;
                tracing::debug!(%task_definition, secret_name, "token bound to secrets-manager secret");
                return Ok(Some(EcsSecret::from_imported(&imported, field.map(str::to_string))));
            }
        }
        DynamicReferenceService::SsmSecure => {
            if let Some((parameter_name, version)) = ssm_secure_binding(reference.value()) {
                let imported = ImportedSecret::SsmSecureParameter {
                    parameter_name: parameter_name.to_string(),
                    version,
                };
                app.import_secret(task_definition, injector::PARAMETER_ID, imported.clone())?;
                tracing::debug!(%task_definition, parameter_name, "token bound to ssm parameter");
                return Ok(Some(EcsSecret::from_imported(&imported, None)));
            }
        }
        DynamicReferenceService::Ssm => {}
    }

    tracing::warn!(
        service = %reference.service(),
        "unsupported dynamic reference in the tracer token; falling back to a plaintext environment variable"
    );
    Ok(None)
}

/// Split `<id>[:SecretString:<field>:<stage>:<version>]` into id and field
///
/// The id may itself be an ARN, so it is never split on `:`.
fn secrets_manager_binding(value: &str) -> Option<(&str, Option<&str>)> {
    let (secret_id, field) = match value.split_once(":SecretString:") {
        Some((secret_id, rest)) => (secret_id, rest.split(':').next().filter(|f| !f.is_empty())),
        None => (value, None),
    };
    (!secret_id.is_empty()).then_some((secret_id, field))
}

/// Split `<name>[:<version>]`; a trailing segment that is not a number
/// belongs to the name
fn ssm_secure_binding(value: &str) -> Option<(&str, Option<u32>)> {
    let (name, version) = match value.rsplit_once(':') {
        Some((name, version)) => match version.parse::<u32>() {
            Ok(version) => (name, Some(version)),
            Err(_) => (value, None),
        },
        None => (value, None),
    };
    (!name.is_empty()).then_some((name, version))
}
