//! Task definition, service and scheduled task tracing

use autotrace_construct::{
    App, ConstructId, ContainerDependencyCondition, DockerVolumeConfiguration, EcsSecret,
    SecretValue, SecretsManagerSecretOptions, ServiceKind,
};
use autotrace_core::constants::{env_vars, injector, tags, DEFAULT_INJECTOR_IMAGE};
use autotrace_core::{AutoTrace, AutoTraceProps, TraceEverythingProps, TraceTaskDefinitionProps};
use autotrace_test_utils::{
    add_fargate_service, add_pattern_service, add_scheduled_fargate_task, add_task_definition,
    app_with_stack,
};
use pretty_assertions::assert_eq;

fn auto_trace(token: SecretValue) -> AutoTrace {
    AutoTrace::new(AutoTraceProps::new(token))
}

fn plain() -> AutoTrace {
    auto_trace(SecretValue::unsafe_plain_text("xxx"))
}

fn application_containers(app: &App, task_definition: ConstructId) -> Vec<ConstructId> {
    app.containers_of(task_definition)
        .into_iter()
        .filter(|(_, c)| c.container_name() != injector::CONTAINER_NAME)
        .map(|(id, _)| id)
        .collect()
}

#[test]
fn task_definition_is_wired() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["api", "worker"]);

    plain()
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    let assembly = app.synth().unwrap();
    let props = &assembly.stacks[0].template["Resources"]["TaskDef"]["Properties"];
    let containers = props["ContainerDefinitions"].as_array().unwrap();
    assert_eq!(containers.len(), 3);

    let injector_def = containers
        .iter()
        .find(|c| c["Name"] == injector::CONTAINER_NAME)
        .unwrap();
    assert_eq!(injector_def["Image"], DEFAULT_INJECTOR_IMAGE);
    assert_eq!(injector_def["Essential"], false);
    assert_eq!(injector_def["Environment"][0]["Name"], env_vars::TARGET_DIRECTORY);
    assert_eq!(injector_def["Environment"][0]["Value"], "/target");
    assert_eq!(injector_def["MountPoints"][0]["containerPath"], "/target");
    assert_eq!(injector_def["MountPoints"][0]["readOnly"], false);

    for name in ["api", "worker"] {
        let container = containers.iter().find(|c| c["Name"] == name).unwrap();
        assert_eq!(container["DependsOn"][0]["ContainerName"], injector::CONTAINER_NAME);
        assert_eq!(container["DependsOn"][0]["Condition"], "COMPLETE");
        assert_eq!(container["MountPoints"][0]["sourceVolume"], injector::VOLUME_NAME);
        assert_eq!(container["MountPoints"][0]["containerPath"], "/opt/lumigo");
        assert_eq!(container["MountPoints"][0]["readOnly"], true);
    }

    assert_eq!(props["Volumes"].as_array().unwrap().len(), 1);
    assert_eq!(props["Volumes"][0]["name"], injector::VOLUME_NAME);
}

#[test]
fn plaintext_token_lands_in_environment() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);

    plain()
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    for container in application_containers(&app, td) {
        let container = app.container(container).unwrap();
        assert_eq!(
            container.environment().get(env_vars::TRACER_TOKEN).map(String::as_str),
            Some("xxx")
        );
        assert_eq!(
            container.environment().get(env_vars::INJECTOR).map(String::as_str),
            Some(env_vars::INJECTOR_VALUE)
        );
        assert!(container.secrets().is_empty());
    }
}

#[test]
fn secrets_manager_token_becomes_a_secret() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);
    let token = SecretValue::secrets_manager("T", SecretsManagerSecretOptions::default().with_json_field("F"));

    auto_trace(token)
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    let app_container = application_containers(&app, td)[0];
    let container = app.container(app_container).unwrap();
    assert_eq!(container.secrets().len(), 1);
    assert_eq!(container.secrets()[0].name, env_vars::TRACER_TOKEN);
    assert_eq!(
        container.secrets()[0].secret,
        EcsSecret::SecretsManager {
            secret_name: "T".into(),
            field: Some("F".into()),
        }
    );
    assert!(container.environment().get(env_vars::TRACER_TOKEN).is_none());

    let assembly = app.synth().unwrap();
    let rendered = &assembly.stacks[0].template["Resources"]["TaskDef"]["Properties"]
        ["ContainerDefinitions"][0]["Secrets"][0];
    assert_eq!(rendered["Name"], env_vars::TRACER_TOKEN);
    assert_eq!(
        rendered["ValueFrom"],
        "arn:aws:secretsmanager:eu-west-1:${AWS::AccountId}:secret:T:F::"
    );
}

#[test]
fn ssm_secure_token_becomes_a_secret() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);

    auto_trace(SecretValue::ssm_secure("T", Some(3)))
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    let app_container = application_containers(&app, td)[0];
    assert_eq!(
        app.container(app_container).unwrap().secrets()[0].secret,
        EcsSecret::SsmParameter {
            parameter_name: "T".into(),
            version: Some(3),
        }
    );
    assert!(app.find_child(td, injector::PARAMETER_ID).unwrap().is_some());
    assert!(app.synth().is_ok());
}

#[test]
fn literal_tokens_stay_plaintext() {
    for literal in [
        "{{resolve:secretsmanager:T:SecretString:F::}}",
        "abc{{resolve:ssm-secure:P:3}}xyz",
    ] {
        let (mut app, stack) = app_with_stack("eu-west-1");
        let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);

        auto_trace(SecretValue::unsafe_plain_text(literal))
            .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
            .unwrap();

        let container = app.container(application_containers(&app, td)[0]).unwrap();
        assert!(container.secrets().is_empty(), "{literal}");
        assert_eq!(
            container.environment().get(env_vars::TRACER_TOKEN).map(String::as_str),
            Some(literal)
        );
        assert!(app.synth().is_ok());
    }
}

#[test]
fn secret_referenced_by_arn_is_bound_whole() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);
    let arn = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:T-AbCdEf";
    let token = SecretValue::secrets_manager(arn, SecretsManagerSecretOptions::default().with_json_field("F"));

    auto_trace(token)
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    let container = app.container(application_containers(&app, td)[0]).unwrap();
    assert_eq!(
        container.secrets()[0].secret,
        EcsSecret::SecretsManager {
            secret_name: arn.into(),
            field: Some("F".into()),
        }
    );

    let assembly = app.synth().unwrap();
    let rendered = &assembly.stacks[0].template["Resources"]["TaskDef"]["Properties"]
        ["ContainerDefinitions"][0]["Secrets"][0];
    assert_eq!(rendered["ValueFrom"], format!("{arn}:F::"));
}

#[test]
fn secret_binding_replaces_plaintext_token() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);
    let app_container = application_containers(&app, td)[0];
    app.container_mut(app_container)
        .unwrap()
        .add_environment(env_vars::TRACER_TOKEN, "stale");

    let token = SecretValue::secrets_manager("T", SecretsManagerSecretOptions::default().with_json_field("F"));
    auto_trace(token)
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    let container = app.container(app_container).unwrap();
    assert_eq!(container.secrets().len(), 1);
    assert!(container.environment().get(env_vars::TRACER_TOKEN).is_none());
    assert!(app.synth().is_ok());

    // Re-adding the plaintext value after tracing is caught at synth.
    app.container_mut(app_container)
        .unwrap()
        .add_environment(env_vars::TRACER_TOKEN, "stale");
    let err = app.synth().unwrap_err();
    assert_eq!(
        err.validation_messages(),
        vec!["Container 'app': The 'LUMIGO_TRACER_TOKEN' is also set as a plaintext environment variable"]
    );
}

#[test]
fn direct_then_traversal_is_idempotent() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);
    let auto_trace = auto_trace(SecretValue::ssm_secure("T", None));

    auto_trace
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();
    auto_trace
        .trace_everything(&mut app, stack, TraceEverythingProps::default())
        .unwrap();
    app.synth().unwrap();

    assert_eq!(app.containers_of(td).len(), 2);
    assert_eq!(app.task_definition(td).unwrap().volumes().len(), 1);
    let container = app.container(application_containers(&app, td)[0]).unwrap();
    assert_eq!(container.mount_points().len(), 1);
    assert_eq!(container.container_dependencies().len(), 1);
    assert_eq!(container.secrets().len(), 1);
}

#[test]
fn service_wrapper_tags_the_service() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let service = add_fargate_service(&mut app, stack, "Api");
    let td = app.service(service).unwrap().task_definition();

    plain()
        .trace_service(&mut app, service, TraceTaskDefinitionProps::default().with_tag("api"))
        .unwrap();
    app.synth().unwrap();

    assert_eq!(app.tag_manager(service).unwrap().get(tags::USER), Some("api"));
    assert!(app.tag_manager(service).unwrap().get(tags::AUTO_TRACE).is_some());
    assert!(!app.tag_manager(td).unwrap().has_tags());
    assert_eq!(app.containers_of(td).len(), 2);
}

#[test]
fn pattern_services_are_traced() {
    for kind in ServiceKind::ALL.into_iter().filter(|k| k.is_pattern()) {
        let (mut app, stack) = app_with_stack("eu-west-1");
        let service = add_pattern_service(&mut app, stack, "Web", kind);

        plain()
            .trace_service(&mut app, service, TraceTaskDefinitionProps::default())
            .unwrap();

        let td = app.service(service).unwrap().task_definition();
        assert_eq!(app.containers_of(td).len(), 2, "{}", kind.type_name());
        assert!(app.synth().is_ok(), "{}", kind.type_name());
    }
}

#[test]
fn scheduled_task_is_traced() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let task = add_scheduled_fargate_task(&mut app, stack, "Nightly");

    plain()
        .trace_scheduled_task(&mut app, task, TraceTaskDefinitionProps::default().with_tag("batch"))
        .unwrap();
    let assembly = app.synth().unwrap();

    let td = app.scheduled_task(task).unwrap().task_definition();
    assert_eq!(app.containers_of(td).len(), 2);
    assert_eq!(app.tag_manager(task).unwrap().get(tags::USER), Some("batch"));
    assert_eq!(
        assembly.stacks[0].resources_of_type("AWS::Events::Rule").len(),
        1
    );
}

#[test]
fn extension_adapter_traces_task_definition() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);
    let extension = plain().as_task_definition_extension(
        TraceTaskDefinitionProps::default().with_injector_image("registry.local/injector:1"),
    );

    app.add_task_definition_extension(td, &extension).unwrap();

    let (_, injector_def) = app
        .containers_of(td)
        .into_iter()
        .find(|(_, c)| c.container_name() == injector::CONTAINER_NAME)
        .unwrap();
    assert_eq!(injector_def.image().name(), "registry.local/injector:1");
    assert!(app.synth().is_ok());
}

#[test]
fn existing_injector_container_is_reused() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);
    let auto_trace = plain();

    auto_trace
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();
    let first: Vec<_> = app.containers_of(td).into_iter().map(|(id, _)| id).collect();

    auto_trace
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();
    let second: Vec<_> = app.containers_of(td).into_iter().map(|(id, _)| id).collect();

    assert_eq!(first, second);
}

#[test]
fn removed_injector_is_reported() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);

    plain()
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    let (injector_id, _) = app
        .containers_of(td)
        .into_iter()
        .find(|(_, c)| c.container_name() == injector::CONTAINER_NAME)
        .unwrap();
    app.remove_container(td, injector_id).unwrap();

    let err = app.synth().unwrap_err();
    let messages = err.validation_messages();
    assert!(messages.contains(
        &"No container called 'lumigo-injector' found; did you modify the task definition after adding tracing to it?"
    ));
    assert!(messages.contains(
        &"Container 'app': The container dependency condition of the 'app' on the 'lumigo-injector' is not set to 'COMPLETE'"
    ));
}

#[test]
fn tampered_volume_and_mount_are_reported() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);

    plain()
        .trace_task_definition(&mut app, td, TraceTaskDefinitionProps::default())
        .unwrap();

    app.task_definition_mut(td).unwrap().volumes_mut()[0].docker_volume_configuration =
        Some(DockerVolumeConfiguration {
            driver: "local".into(),
            scope: None,
            autoprovision: false,
        });
    let app_container = application_containers(&app, td)[0];
    {
        let container = app.container_mut(app_container).unwrap();
        container.mount_points_mut()[0].read_only = false;
        container.container_dependencies_mut()[0].condition = ContainerDependencyCondition::Start;
        container.add_environment(env_vars::INJECTOR, "/usr/lib/other.so");
        container.add_environment(env_vars::TRACER_TOKEN, "yyy");
    }

    let err = app.synth().unwrap_err();
    assert_eq!(
        err.validation_messages(),
        vec![
            "The 'lumigo-injector' volume has 'dockerVolumeConfiguration's attached to it; \
             did you modify the task definition after adding tracing to it?",
            "Container 'app': The mount point for the 'lumigo-injector' volume is not set to read-only",
            "Container 'app': The container dependency condition of the 'app' on the 'lumigo-injector' \
             is not set to 'COMPLETE'",
            "Container 'app': The 'LD_PRELOAD' does not have the expected value \
             '/opt/lumigo/injector/lumigo_injector.so'",
            "Container 'app': The 'LUMIGO_TRACER_TOKEN' does not have the expected value provided \
             in the token passed to AutoTrace",
        ]
    );
    assert!(!err.to_string().contains("xxx"));
}
