//! Synthesis
//!
//! `synth` runs aspects, then validations, then renders one JSON template per
//! stack. Nothing is rendered if either of the first two phases fails.

use crate::aspect::AnnotationLevel;
use crate::construct::{App, ConstructId, ConstructKind};
use crate::ecs::{ContainerDefinition, TaskDefinition};
use crate::error::SynthError;
use crate::lambda::{EntryPoint, Function};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// A message collected from a node's annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyMessage {
    pub path: String,
    pub level: AnnotationLevel,
    pub message: String,
}

/// Rendered stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackArtifact {
    pub stack_name: String,
    pub region: String,
    pub template: Value,
    pub messages: Vec<AssemblyMessage>,
}

impl StackArtifact {
    /// Resources of a given type, keyed by logical id
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.template["Resources"]
            .as_object()
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, r)| r["Type"] == resource_type)
                    .map(|(id, r)| (id.as_str(), r))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Messages of one severity
    pub fn messages_at(&self, level: AnnotationLevel) -> impl Iterator<Item = &AssemblyMessage> {
        self.messages.iter().filter(move |m| m.level == level)
    }
}

/// Output of a successful synth
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudAssembly {
    pub stacks: Vec<StackArtifact>,
}

impl CloudAssembly {
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&StackArtifact> {
        self.stacks.iter().find(|s| s.stack_name == name)
    }
}

impl App {
    /// Apply aspects, run validations and render every stack
    ///
    /// # Errors
    /// - `SynthError::Aspect` if an aspect fails
    /// - `SynthError::Validation` if any validation reports issues
    pub fn synth(&mut self) -> Result<CloudAssembly, SynthError> {
        self.invoke_aspects()
            .map_err(|(node, source)| SynthError::Aspect {
                path: self.path(node),
                source,
            })?;

        let failures = self.validate_all();
        if !failures.is_empty() {
            return Err(SynthError::Validation { failures });
        }

        let stacks = self
            .children(self.root())
            .iter()
            .filter(|id| self.stack(**id).is_some())
            .map(|stack| self.render_stack(*stack))
            .collect();

        Ok(CloudAssembly { stacks })
    }

    fn render_stack(&self, stack: ConstructId) -> StackArtifact {
        let mut resources = Map::new();
        let mut messages = Vec::new();

        for id in self.descendants(stack) {
            for annotation in self.annotations(id) {
                messages.push(AssemblyMessage {
                    path: self.path(id),
                    level: annotation.level,
                    message: annotation.message.clone(),
                });
            }

            let rendered = match self.kind(id) {
                Some(ConstructKind::Function(function)) => Some(self.render_function(id, function)),
                Some(ConstructKind::TaskDefinition(td)) => Some(self.render_task_definition(id, td)),
                Some(ConstructKind::Service(service)) if !service.kind().is_pattern() => Some(json!({
                    "Type": "AWS::ECS::Service",
                    "Properties": {
                        "LaunchType": service.kind().compatibility().as_str(),
                        "TaskDefinition": { "Ref": self.logical_id(service.task_definition()) },
                        "Tags": self.render_tags(id),
                    },
                })),
                Some(ConstructKind::ScheduledTask(task)) => Some(json!({
                    "Type": "AWS::Events::Rule",
                    "Properties": {
                        "ScheduleExpression": task.schedule_expression(),
                        "Targets": [{
                            "EcsParameters": {
                                "LaunchType": task.kind().compatibility().as_str(),
                                "TaskDefinitionArn": { "Ref": self.logical_id(task.task_definition()) },
                            },
                        }],
                        "Tags": self.render_tags(id),
                    },
                })),
                _ => None,
            };

            if let Some(resource) = rendered {
                resources.insert(self.logical_id(id), resource);
            }
        }

        StackArtifact {
            stack_name: self.node(stack).map(|n| n.local_id().to_string()).unwrap_or_default(),
            region: self.region_of(stack).to_string(),
            template: json!({ "Resources": resources }),
            messages,
        }
    }

    fn render_function(&self, id: ConstructId, function: &Function) -> Value {
        let (handler, runtime) = self
            .function_resource(id)
            .and_then(|r| self.cfn_function(r))
            .map(|cfn| (cfn.entry_point().to_string(), cfn.runtime().to_string()))
            .unwrap_or_default();

        let mut properties = json!({
            "Handler": handler,
            "Runtime": runtime,
            "Tags": self.render_tags(id),
        });
        if !function.layers().is_empty() {
            properties["Layers"] = json!(function.layers().iter().map(|l| l.arn()).collect::<Vec<_>>());
        }
        if let Some(environment) = function.environment() {
            properties["Environment"] = json!({ "Variables": environment });
        }

        json!({ "Type": "AWS::Lambda::Function", "Properties": properties })
    }

    fn render_task_definition(&self, id: ConstructId, td: &TaskDefinition) -> Value {
        let containers: Vec<Value> = self
            .containers_of(id)
            .into_iter()
            .map(|(_, container)| self.render_container(id, container))
            .collect();

        json!({
            "Type": "AWS::ECS::TaskDefinition",
            "Properties": {
                "Family": td.family(),
                "RequiresCompatibilities": [td.compatibility().as_str()],
                "ContainerDefinitions": containers,
                "Volumes": td.volumes(),
                "Tags": self.render_tags(id),
            },
        })
    }

    fn render_container(&self, task_definition: ConstructId, container: &ContainerDefinition) -> Value {
        let stack = self.stack_of(task_definition).and_then(|s| self.stack(s));
        let region = self.region_of(task_definition);
        let account = self.account_of(task_definition);
        let partition = stack.map_or("aws", |s| s.partition());

        let environment: Vec<Value> = container
            .environment()
            .iter()
            .map(|(name, value)| json!({ "Name": name, "Value": value }))
            .collect();
        let secrets: Vec<Value> = container
            .secrets()
            .iter()
            .map(|s| json!({ "Name": s.name, "ValueFrom": s.secret.value_from(partition, region, account) }))
            .collect();
        let depends_on: Vec<Value> = container
            .container_dependencies()
            .iter()
            .map(|dep| {
                json!({
                    "ContainerName": self.container(dep.container).map(ContainerDefinition::container_name),
                    "Condition": dep.condition,
                })
            })
            .collect();

        json!({
            "Name": container.container_name(),
            "Image": container.image().name(),
            "Essential": container.essential(),
            "Environment": environment,
            "Secrets": secrets,
            "MountPoints": container.mount_points(),
            "DependsOn": depends_on,
        })
    }

    /// Tags of a resource, inherited from every taggable ancestor
    fn render_tags(&self, id: ConstructId) -> Value {
        let mut effective = BTreeMap::new();
        for scope in self.scopes(id) {
            if let Some(tags) = self.tag_manager(scope) {
                effective.extend(tags.iter());
            }
        }
        json!(effective
            .into_iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect::<Vec<_>>())
    }

    /// Logical id: alphanumeric path below the enclosing stack
    #[must_use]
    pub fn logical_id(&self, id: ConstructId) -> String {
        let skip = self.stack_of(id).map_or(0, |stack| self.scopes(stack).len());
        self.scopes(id)
            .into_iter()
            .skip(skip)
            .filter_map(|scope| self.node(scope))
            .flat_map(|node| node.local_id().chars().filter(char::is_ascii_alphanumeric).collect::<Vec<_>>())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{
        ContainerDefinitionOptions, ContainerImage, ServiceKind, ServiceProps, TaskDefinitionProps,
    };
    use crate::lambda::{FunctionProps, Runtime};
    use crate::stack::StackProps;
    use crate::tags::Tags;

    #[test]
    fn renders_functions_with_inherited_tags() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-central-1")).unwrap();
        let f = app
            .add_function(stack, "Handler", FunctionProps::new(Runtime::NODEJS_16_X, "index.handler"))
            .unwrap();
        Tags::of(stack).add(&mut app, "team", "core");

        let assembly = app.synth().unwrap();
        let artifact = assembly.stack("Stack").unwrap();
        let functions = artifact.resources_of_type("AWS::Lambda::Function");

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].0, app.logical_id(f));
        assert_eq!(functions[0].1["Properties"]["Handler"], "index.handler");
        assert_eq!(functions[0].1["Properties"]["Tags"][0]["Key"], "team");
    }

    #[test]
    fn pattern_service_renders_inner_service_only() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-central-1")).unwrap();
        app.add_service(
            stack,
            "Web",
            ServiceProps::new(ServiceKind::NetworkLoadBalancedEc2)
                .with_task_image(ContainerImage::from_registry("nginx")),
        )
        .unwrap();

        let assembly = app.synth().unwrap();
        let artifact = &assembly.stacks[0];
        let services = artifact.resources_of_type("AWS::ECS::Service");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].0, "WebService");
        assert_eq!(services[0].1["Properties"]["TaskDefinition"]["Ref"], "WebTaskDef");
    }

    #[test]
    fn failed_validation_prevents_rendering() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::default()).unwrap();
        let td = app.add_task_definition(stack, "TaskDef", TaskDefinitionProps::fargate()).unwrap();
        app.add_container(td, "app", ContainerDefinitionOptions::new(ContainerImage::from_registry("x")))
            .unwrap();
        app.add_validation(td, |_: &App| vec!["nope".to_string()]).unwrap();

        let err = app.synth().unwrap_err();
        assert_eq!(err.validation_messages(), vec!["nope"]);
    }

    #[test]
    fn annotations_become_messages() {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::default()).unwrap();
        app.add_info(stack, "hello");

        let assembly = app.synth().unwrap();
        let infos: Vec<_> = assembly.stacks[0].messages_at(AnnotationLevel::Info).collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].message, "hello");
    }
}
