//! Whole-graph traversal
//!
//! Registered as an aspect by [`AutoTrace::trace_everything`](crate::AutoTrace::trace_everything)
//! and dispatched per node kind. Aspects cannot register aspects, so tags are
//! written straight into tag stores through [`DirectTagging`].

use crate::auto_trace::AutoTrace;
use crate::classifier::{classify, TracerLayer};
use crate::error::AutoTraceError;
use crate::props::{TraceEverythingProps, TraceFunctionProps, TraceTaskDefinitionProps};
use crate::tagging::{apply_trace_tags, DirectTagging};
use crate::{ecs, lambda};
use autotrace_construct::{App, Aspect, ConstructId, ConstructKind};

pub(crate) struct TraceEverything {
    auto_trace: AutoTrace,
    props: TraceEverythingProps,
}

impl TraceEverything {
    pub(crate) fn new(auto_trace: AutoTrace, props: TraceEverythingProps) -> Self {
        Self { auto_trace, props }
    }

    fn function_props(&self, layer: Option<TracerLayer>) -> TraceFunctionProps {
        let layer_version = match layer {
            Some(TracerLayer::Node) => self.props.lambda_nodejs_layer_version,
            Some(TracerLayer::Python) => self.props.lambda_python_layer_version,
            None => None,
        };
        TraceFunctionProps {
            tag: None,
            apply_auto_trace_tag: false,
            layer_version,
            propagate_w3c: Some(self.props.propagate_w3c),
        }
    }

    fn task_definition_props(&self) -> TraceTaskDefinitionProps {
        TraceTaskDefinitionProps {
            tag: None,
            apply_auto_trace_tag: false,
            injector_image: self.props.injector_image.clone(),
        }
    }

    fn visit_function(&self, app: &mut App, function: ConstructId) -> Result<(), AutoTraceError> {
        let layer = app.function(function).and_then(classify);
        let props = self.function_props(layer);

        match lambda::trace_function(app, function, self.auto_trace.token(), &props, &DirectTagging) {
            Ok(()) => {}
            Err(AutoTraceError::UnsupportedRuntime { runtime }) => {
                tracing::debug!(path = %app.path(function), %runtime, "skipping function");
                app.add_info(
                    function,
                    format!("The '{runtime}' runtime cannot be automatically traced."),
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        self.tag(app, function);
        Ok(())
    }

    fn visit_workload(
        &self,
        app: &mut App,
        owner: ConstructId,
        task_definition: ConstructId,
    ) -> Result<(), AutoTraceError> {
        ecs::trace_workload(
            app,
            owner,
            task_definition,
            self.auto_trace.token(),
            &self.task_definition_props(),
            self.auto_trace.secrets(),
            &DirectTagging,
        )?;
        self.tag(app, owner);
        Ok(())
    }

    fn tag(&self, app: &mut App, node: ConstructId) {
        apply_trace_tags(
            &DirectTagging,
            app,
            node,
            self.props.apply_auto_trace_tag,
            self.props.tag.as_deref(),
        );
    }
}

impl Aspect for TraceEverything {
    fn visit(&self, app: &mut App, node: ConstructId) -> anyhow::Result<()> {
        let Some(kind) = app.kind(node) else {
            return Ok(());
        };

        match kind {
            ConstructKind::Function(_) if self.props.trace_lambda => self.visit_function(app, node)?,
            ConstructKind::TaskDefinition(_) if self.props.trace_ecs => {
                self.visit_workload(app, node, node)?;
            }
            ConstructKind::Service(service) if self.props.trace_ecs => {
                let task_definition = service.task_definition();
                self.visit_workload(app, node, task_definition)?;
            }
            ConstructKind::ScheduledTask(task) if self.props.trace_ecs => {
                let task_definition = task.task_definition();
                self.visit_workload(app, node, task_definition)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{env_vars, tags};
    use crate::props::AutoTraceProps;
    use autotrace_construct::{
        AnnotationLevel, FunctionProps, Runtime, SecretValue, StackProps, TaskDefinitionProps,
    };
    use pretty_assertions::assert_eq;

    fn auto_trace() -> AutoTrace {
        AutoTrace::new(AutoTraceProps::new(SecretValue::unsafe_plain_text("xxx")))
    }

    #[test]
    fn unsupported_runtime_becomes_info() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-west-1")).unwrap();
        let java = app
            .add_function(stack, "Java", FunctionProps::new(Runtime::JAVA_11, "Handler"))
            .unwrap();

        let aspect = TraceEverything::new(auto_trace(), TraceEverythingProps::default());
        aspect.visit(&mut app, java).unwrap();

        let annotation = &app.annotations(java)[0];
        assert_eq!(annotation.level, AnnotationLevel::Info);
        assert_eq!(annotation.message, "The 'java11' runtime cannot be automatically traced.");
        assert!(app.tag_manager(java).unwrap().get(tags::AUTO_TRACE).is_none());
    }

    #[test]
    fn pins_are_picked_per_layer() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-west-1")).unwrap();
        let python = app
            .add_function(stack, "Py", FunctionProps::python(Runtime::PYTHON_3_10, "app.handler"))
            .unwrap();

        let props = TraceEverythingProps::default()
            .with_nodejs_layer_version(1)
            .with_python_layer_version(2);
        TraceEverything::new(auto_trace(), props).visit(&mut app, python).unwrap();

        let function = app.function(python).unwrap();
        assert!(function.layers()[0].arn().ends_with("lumigo-python-tracer:2"));
        assert_eq!(
            function.environment().unwrap().get(env_vars::PROPAGATE_W3C).map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn opt_outs_skip_nodes() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-west-1")).unwrap();
        let td = app.add_task_definition(stack, "TaskDef", TaskDefinitionProps::ec2()).unwrap();

        let props = TraceEverythingProps::default().with_trace_ecs(false);
        TraceEverything::new(auto_trace(), props).visit(&mut app, td).unwrap();

        assert!(app.task_definition(td).unwrap().volumes().is_empty());
    }

    #[test]
    fn tags_are_written_directly() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-west-1")).unwrap();
        let td = app.add_task_definition(stack, "TaskDef", TaskDefinitionProps::fargate()).unwrap();

        let props = TraceEverythingProps::default().with_tag("prod");
        TraceEverything::new(auto_trace(), props).visit(&mut app, td).unwrap();

        let store = app.tag_manager(td).unwrap();
        assert_eq!(store.get(tags::USER), Some("prod"));
        assert!(store.get(tags::AUTO_TRACE).is_some());
        assert_eq!(app.aspect_count(), 0);
    }
}
