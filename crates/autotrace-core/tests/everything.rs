//! Whole-graph tracing at synth

use autotrace_construct::{AnnotationLevel, EcsSecret, Runtime, SecretValue, ServiceKind, SynthError};
use autotrace_core::constants::{env_vars, tags};
use autotrace_core::{AutoTrace, AutoTraceProps, TraceEverythingProps};
use autotrace_test_utils::{
    add_fargate_service, add_function, add_node_function, add_pattern_service,
    add_python_function, add_scheduled_fargate_task, add_task_definition, app_with_stack,
};
use pretty_assertions::assert_eq;

fn auto_trace() -> AutoTrace {
    AutoTrace::new(AutoTraceProps::new(SecretValue::unsafe_plain_text("xxx")))
}

#[test]
fn unsupported_runtime_degrades_to_info() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let java = add_function(&mut app, stack, "Java", Runtime::JAVA_11);
    let node = add_node_function(&mut app, stack, "Node");

    auto_trace()
        .trace_everything(&mut app, stack, TraceEverythingProps::default())
        .unwrap();
    let assembly = app.synth().unwrap();

    let java_fn = app.function(java).unwrap();
    assert!(java_fn.layers().is_empty());
    assert!(java_fn.environment().unwrap().is_empty());
    assert!(!app.tag_manager(java).unwrap().has_tags());

    let node_fn = app.function(node).unwrap();
    assert_eq!(node_fn.layers().len(), 1);
    assert_eq!(
        node_fn.environment().unwrap().get(env_vars::PROPAGATE_W3C).map(String::as_str),
        Some("true")
    );
    assert!(app.tag_manager(node).unwrap().get(tags::AUTO_TRACE).is_some());

    let infos: Vec<_> = assembly.stacks[0]
        .messages_at(AnnotationLevel::Info)
        .map(|m| (m.path.as_str(), m.message.as_str()))
        .collect();
    assert!(infos.contains(&(
        "TestStack/Java",
        "The 'java11' runtime cannot be automatically traced."
    )));
}

#[test]
fn traces_every_workload_kind() {
    let (mut app, stack) = app_with_stack("us-east-1");
    let node = add_node_function(&mut app, stack, "Node");
    let python = add_python_function(&mut app, stack, "Python");
    let td = add_task_definition(&mut app, stack, "Standalone", &["app"]);
    let service = add_fargate_service(&mut app, stack, "Api");
    let web = add_pattern_service(&mut app, stack, "Web", ServiceKind::ApplicationLoadBalancedFargate);
    let nightly = add_scheduled_fargate_task(&mut app, stack, "Nightly");

    let root = app.root();
    auto_trace()
        .trace_everything(&mut app, root, TraceEverythingProps::default().with_tag("prod"))
        .unwrap();
    app.synth().unwrap();

    for function in [node, python] {
        assert_eq!(app.function(function).unwrap().layers().len(), 1);
    }

    let task_definitions = [
        td,
        app.service(service).unwrap().task_definition(),
        app.service(web).unwrap().task_definition(),
        app.scheduled_task(nightly).unwrap().task_definition(),
    ];
    for task_definition in task_definitions {
        assert_eq!(app.containers_of(task_definition).len(), 2);
        assert_eq!(app.task_definition(task_definition).unwrap().volumes().len(), 1);
    }

    for owner in [service, web, nightly] {
        assert_eq!(app.tag_manager(owner).unwrap().get(tags::USER), Some("prod"));
    }
}

#[test]
fn opt_outs_are_honoured() {
    let (mut app, stack) = app_with_stack("eu-west-1");
    let node = add_node_function(&mut app, stack, "Node");
    let td = add_task_definition(&mut app, stack, "TaskDef", &["app"]);

    auto_trace()
        .trace_everything(
            &mut app,
            stack,
            TraceEverythingProps::default().with_trace_lambda(false),
        )
        .unwrap();
    app.synth().unwrap();

    assert!(app.function(node).unwrap().layers().is_empty());
    assert_eq!(app.containers_of(td).len(), 2);
}

#[test]
fn unsupported_region_aborts_synth() {
    let (mut app, stack) = app_with_stack("ap-southeast-3");
    add_node_function(&mut app, stack, "Node");

    auto_trace()
        .trace_everything(&mut app, stack, TraceEverythingProps::default())
        .unwrap();
    let err = app.synth().unwrap_err();

    assert!(matches!(err, SynthError::Aspect { .. }));
    assert!(err
        .to_string()
        .contains("The 'lumigo-node-tracer' layer is not supported in the 'ap-southeast-3' region."));
}

#[test]
fn pinned_versions_allow_unlisted_regions() {
    let (mut app, stack) = app_with_stack("ap-southeast-3");
    let node = add_node_function(&mut app, stack, "Node");
    let python = add_python_function(&mut app, stack, "Python");

    auto_trace()
        .trace_everything(
            &mut app,
            stack,
            TraceEverythingProps::default()
                .with_nodejs_layer_version(10)
                .with_python_layer_version(20),
        )
        .unwrap();
    app.synth().unwrap();

    assert!(app.function(node).unwrap().layers()[0].arn().ends_with("lumigo-node-tracer:10"));
    assert!(app.function(python).unwrap().layers()[0].arn().ends_with("lumigo-python-tracer:20"));
}

#[test]
fn configuration_documents() {
    let props = TraceEverythingProps::from_yaml_str(
        "traceLambda: false\ntag: staging\ninjectorImage: registry.local/injector:2\n",
    )
    .unwrap();
    let auto_trace = AutoTrace::new(
        AutoTraceProps::from_json_str(r#"{"token": "{{resolve:secretsmanager:T:SecretString:F::}}"}"#)
            .unwrap(),
    );

    let (mut app, stack) = app_with_stack("eu-west-1");
    let node = add_node_function(&mut app, stack, "Node");
    let service = add_fargate_service(&mut app, stack, "Api");
    let td = app.service(service).unwrap().task_definition();

    auto_trace.trace_everything(&mut app, stack, props).unwrap();
    app.synth().unwrap();

    assert!(app.function(node).unwrap().layers().is_empty());
    assert_eq!(app.tag_manager(service).unwrap().get(tags::USER), Some("staging"));

    let containers = app.containers_of(td);
    let (_, injector_def) = containers
        .iter()
        .find(|(_, c)| c.container_name() == "lumigo-injector")
        .unwrap();
    assert_eq!(injector_def.image().name(), "registry.local/injector:2");

    let (_, app_container) = containers
        .iter()
        .find(|(_, c)| c.container_name() == "app")
        .unwrap();
    assert_eq!(
        app_container.secrets()[0].secret,
        EcsSecret::SecretsManager {
            secret_name: "T".into(),
            field: Some("F".into()),
        }
    );
}
