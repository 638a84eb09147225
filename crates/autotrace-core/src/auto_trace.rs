//! Public entry points
//!
//! [`AutoTrace`] holds the tracer token and the per-task-definition secret
//! cache shared by every call made through it, whether direct or from the
//! whole-graph traversal.

use crate::ecs::{self, SecretCache};
use crate::error::{AutoTraceError, AutoTraceResult};
use crate::lambda;
use crate::orchestrator::TraceEverything;
use crate::props::{AutoTraceProps, TraceEverythingProps, TraceFunctionProps, TraceTaskDefinitionProps};
use crate::tagging::AspectTagging;
use autotrace_construct::{App, ConstructError, ConstructId, ConstructKind, SecretValue, TaskDefinitionExtension};
use std::sync::Arc;

/// Auto-tracing instrumentation
///
/// Cloning is cheap; clones share the secret cache.
///
/// # Example
///
/// ```rust
/// use autotrace_core::{AutoTrace, AutoTraceProps, TraceEverythingProps};
/// use autotrace_construct::{App, FunctionProps, Runtime, SecretValue, StackProps};
///
/// let mut app = App::new();
/// let stack = app.add_stack("Stack", StackProps::in_region("eu-west-1")).unwrap();
/// app.add_function(stack, "Handler", FunctionProps::new(Runtime::NODEJS_16_X, "index.handler"))
///     .unwrap();
///
/// let auto_trace = AutoTrace::new(AutoTraceProps::new(SecretValue::unsafe_plain_text("t_123")));
/// auto_trace.trace_everything(&mut app, stack, TraceEverythingProps::default()).unwrap();
///
/// let assembly = app.synth().unwrap();
/// assert_eq!(assembly.stacks[0].resources_of_type("AWS::Lambda::Function").len(), 1);
/// ```
#[derive(Clone)]
pub struct AutoTrace {
    token: SecretValue,
    secrets: Arc<SecretCache>,
}

impl std::fmt::Debug for AutoTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoTrace")
            .field("token", &self.token)
            .field("cached_secrets", &self.secrets.len())
            .finish()
    }
}

impl AutoTrace {
    #[must_use]
    pub fn new(props: AutoTraceProps) -> Self {
        Self {
            token: props.token,
            secrets: Arc::new(SecretCache::new()),
        }
    }

    pub(crate) fn token(&self) -> &SecretValue {
        &self.token
    }

    pub(crate) fn secrets(&self) -> &SecretCache {
        &self.secrets
    }

    /// Trace a single function
    ///
    /// # Errors
    /// - `AutoTraceError::WrongTargetType` if `function` is not a function
    /// - `AutoTraceError::UnsupportedRuntime` if no tracer exists for its runtime
    /// - `AutoTraceError::UnsupportedRegion` if no layer version is known for
    ///   its region and none is pinned
    pub fn trace_function(
        &self,
        app: &mut App,
        function: ConstructId,
        props: TraceFunctionProps,
    ) -> AutoTraceResult<()> {
        expect_target(app, function, "trace_function", "Function", |kind| {
            matches!(kind, ConstructKind::Function(_))
        })?;
        lambda::trace_function(app, function, &self.token, &props, &AspectTagging)
    }

    /// Trace a task definition
    ///
    /// # Errors
    /// - `AutoTraceError::WrongTargetType` if `task_definition` is not a task definition
    /// - `AutoTraceError::Construct` if the token secret cannot be imported
    pub fn trace_task_definition(
        &self,
        app: &mut App,
        task_definition: ConstructId,
        props: TraceTaskDefinitionProps,
    ) -> AutoTraceResult<()> {
        expect_target(app, task_definition, "trace_task_definition", "TaskDefinition", |kind| {
            matches!(kind, ConstructKind::TaskDefinition(_))
        })?;
        ecs::trace_task_definition(
            app,
            task_definition,
            &self.token,
            &props,
            &self.secrets,
            &AspectTagging,
        )
    }

    /// Trace the task definition of a service, tagging the service
    ///
    /// # Errors
    /// As [`trace_task_definition`](Self::trace_task_definition), with
    /// `WrongTargetType` if `service` is not a service
    pub fn trace_service(
        &self,
        app: &mut App,
        service: ConstructId,
        props: TraceTaskDefinitionProps,
    ) -> AutoTraceResult<()> {
        expect_target(app, service, "trace_service", "Service", |kind| {
            matches!(kind, ConstructKind::Service(_))
        })?;
        let task_definition = app
            .service(service)
            .ok_or(ConstructError::NotFound(service))?
            .task_definition();
        ecs::trace_workload(
            app,
            service,
            task_definition,
            &self.token,
            &props,
            &self.secrets,
            &AspectTagging,
        )
    }

    /// Trace the task definition of a scheduled task, tagging the scheduled task
    ///
    /// # Errors
    /// As [`trace_task_definition`](Self::trace_task_definition), with
    /// `WrongTargetType` if `scheduled_task` is not a scheduled task
    pub fn trace_scheduled_task(
        &self,
        app: &mut App,
        scheduled_task: ConstructId,
        props: TraceTaskDefinitionProps,
    ) -> AutoTraceResult<()> {
        expect_target(app, scheduled_task, "trace_scheduled_task", "ScheduledTask", |kind| {
            matches!(kind, ConstructKind::ScheduledTask(_))
        })?;
        let task_definition = app
            .scheduled_task(scheduled_task)
            .ok_or(ConstructError::NotFound(scheduled_task))?
            .task_definition();
        ecs::trace_workload(
            app,
            scheduled_task,
            task_definition,
            &self.token,
            &props,
            &self.secrets,
            &AspectTagging,
        )
    }

    /// Trace every function and ECS workload below `root` at synth
    ///
    /// Functions with runtimes no tracer exists for get an informational
    /// annotation instead of failing the synth.
    ///
    /// # Errors
    /// `AutoTraceError::WrongTargetType` unless `root` is an app or a stack
    pub fn trace_everything(
        &self,
        app: &mut App,
        root: ConstructId,
        props: TraceEverythingProps,
    ) -> AutoTraceResult<()> {
        expect_target(app, root, "trace_everything", "Stack or App", |kind| {
            matches!(kind, ConstructKind::App | ConstructKind::Stack(_))
        })?;
        tracing::debug!(path = %app.path(root), "registering whole-graph tracing");
        app.add_aspect(root, TraceEverything::new(self.clone(), props));
        Ok(())
    }

    /// Adapter for [`App::add_task_definition_extension`]
    #[must_use]
    pub fn as_task_definition_extension(&self, props: TraceTaskDefinitionProps) -> TracingExtension {
        TracingExtension {
            auto_trace: self.clone(),
            props,
        }
    }
}

/// Task definition extension applying [`AutoTrace::trace_task_definition`]
#[derive(Debug, Clone)]
pub struct TracingExtension {
    auto_trace: AutoTrace,
    props: TraceTaskDefinitionProps,
}

impl TaskDefinitionExtension for TracingExtension {
    fn extend(&self, app: &mut App, task_definition: ConstructId) -> anyhow::Result<()> {
        self.auto_trace
            .trace_task_definition(app, task_definition, self.props.clone())?;
        Ok(())
    }
}

fn expect_target(
    app: &App,
    target: ConstructId,
    method: &'static str,
    expected: &'static str,
    accepts: impl FnOnce(&ConstructKind) -> bool,
) -> AutoTraceResult<()> {
    let kind = app.kind(target).ok_or(ConstructError::NotFound(target))?;
    if accepts(kind) {
        return Ok(());
    }

    Err(AutoTraceError::WrongTargetType {
        method,
        expected,
        actual: kind.type_name(),
        hint: entry_point_for(kind).filter(|hint| *hint != method),
    })
}

/// The entry point accepting this kind of construct
fn entry_point_for(kind: &ConstructKind) -> Option<&'static str> {
    match kind {
        ConstructKind::App | ConstructKind::Stack(_) => Some("trace_everything"),
        ConstructKind::Function(_) => Some("trace_function"),
        ConstructKind::TaskDefinition(_) => Some("trace_task_definition"),
        ConstructKind::Service(_) => Some("trace_service"),
        ConstructKind::ScheduledTask(_) => Some("trace_scheduled_task"),
        _ => None,
    }
}
