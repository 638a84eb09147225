//! Testing utilities for AutoTrace workspace
//!
//! Shared fixtures for construct trees and tracing initialisation.

#![allow(missing_docs)]

use autotrace_construct::{
    App, ConstructId, ContainerDefinitionOptions, ContainerImage, FunctionProps, Runtime,
    ScheduledTaskKind, ScheduledTaskProps, ServiceKind, ServiceProps, StackProps,
    TaskDefinitionProps,
};
use tracing_subscriber::EnvFilter;

pub const TEST_REGION: &str = "eu-west-1";
pub const TEST_IMAGE: &str = "public.ecr.aws/docker/library/nginx:latest";

/// Install a test-writer subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An app with a single stack in `region`
pub fn app_with_stack(region: &str) -> (App, ConstructId) {
    init_tracing();
    let mut app = App::new();
    let stack = app.add_stack("TestStack", StackProps::in_region(region)).unwrap();
    (app, stack)
}

pub fn add_function(app: &mut App, scope: ConstructId, id: &str, runtime: Runtime) -> ConstructId {
    let handler = if runtime.name().starts_with("python") {
        "app.handler"
    } else {
        "index.handler"
    };
    app.add_function(scope, id, FunctionProps::new(runtime, handler)).unwrap()
}

pub fn add_node_function(app: &mut App, scope: ConstructId, id: &str) -> ConstructId {
    add_function(app, scope, id, Runtime::NODEJS_16_X)
}

pub fn add_python_function(app: &mut App, scope: ConstructId, id: &str) -> ConstructId {
    add_function(app, scope, id, Runtime::PYTHON_3_9)
}

/// A Fargate task definition with one container per name
pub fn add_task_definition(
    app: &mut App,
    scope: ConstructId,
    id: &str,
    containers: &[&str],
) -> ConstructId {
    let task_definition = app
        .add_task_definition(scope, id, TaskDefinitionProps::fargate())
        .unwrap();
    for name in containers {
        app.add_container(
            task_definition,
            *name,
            ContainerDefinitionOptions::new(ContainerImage::from_registry(TEST_IMAGE)),
        )
        .unwrap();
    }
    task_definition
}

/// A pattern service building its own task definition from [`TEST_IMAGE`]
pub fn add_pattern_service(app: &mut App, scope: ConstructId, id: &str, kind: ServiceKind) -> ConstructId {
    app.add_service(
        scope,
        id,
        ServiceProps::new(kind).with_task_image(ContainerImage::from_registry(TEST_IMAGE)),
    )
    .unwrap()
}

/// A plain Fargate service over a fresh task definition
pub fn add_fargate_service(app: &mut App, scope: ConstructId, id: &str) -> ConstructId {
    let task_definition = add_task_definition(app, scope, &format!("{id}TaskDef"), &["app"]);
    app.add_service(
        scope,
        id,
        ServiceProps::new(ServiceKind::Fargate).with_task_definition(task_definition),
    )
    .unwrap()
}

pub fn add_scheduled_fargate_task(app: &mut App, scope: ConstructId, id: &str) -> ConstructId {
    app.add_scheduled_task(
        scope,
        id,
        ScheduledTaskProps::new(ScheduledTaskKind::Fargate, "rate(1 hour)")
            .with_task_image(ContainerImage::from_registry(TEST_IMAGE)),
    )
    .unwrap()
}
