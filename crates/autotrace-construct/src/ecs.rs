//! ECS workloads
//!
//! Task definitions own their containers as child constructs and their
//! volumes as plain values. Services and scheduled tasks point at a task
//! definition by [`ConstructId`]; pattern services create their own task
//! definition (and an inner plain service) when given an image instead.

use crate::construct::{App, ConstructId, ConstructKind};
use crate::error::ConstructError;
use crate::secret::ImportedSecret;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Launch type of a task definition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compatibility {
    Ec2,
    #[default]
    Fargate,
}

impl Compatibility {
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Ec2 => "Ec2TaskDefinition",
            Self::Fargate => "FargateTaskDefinition",
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Ec2 => "EC2",
            Self::Fargate => "FARGATE",
        }
    }
}

/// Image a container runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerImage(String);

impl ContainerImage {
    #[must_use]
    pub fn from_registry(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    pub source_volume: String,
    pub container_path: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerDependencyCondition {
    Start,
    Complete,
    Success,
    Healthy,
}

impl fmt::Display for ContainerDependencyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "START",
            Self::Complete => "COMPLETE",
            Self::Success => "SUCCESS",
            Self::Healthy => "HEALTHY",
        })
    }
}

/// Startup ordering edge between two containers of the same task definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerDependency {
    /// The container depended upon
    pub container: ConstructId,
    pub condition: ContainerDependencyCondition,
}

/// Native secret binding of a container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EcsSecret {
    SecretsManager {
        secret_name: String,
        field: Option<String>,
    },
    SsmParameter {
        parameter_name: String,
        version: Option<u32>,
    },
}

impl EcsSecret {
    /// Binding backed by an imported secret or parameter
    ///
    /// `field` only applies to secrets-manager secrets.
    #[must_use]
    pub fn from_imported(secret: &ImportedSecret, field: Option<String>) -> Self {
        match secret {
            ImportedSecret::SecretsManager { secret_name } => Self::SecretsManager {
                secret_name: secret_name.clone(),
                field,
            },
            ImportedSecret::SsmSecureParameter {
                parameter_name,
                version,
            } => Self::SsmParameter {
                parameter_name: parameter_name.clone(),
                version: *version,
            },
        }
    }

    /// `valueFrom` ARN of the binding
    #[must_use]
    pub fn value_from(&self, partition: &str, region: &str, account: &str) -> String {
        match self {
            Self::SecretsManager { secret_name, field } => {
                let arn = if secret_name.starts_with("arn:") {
                    secret_name.clone()
                } else {
                    format!("arn:{partition}:secretsmanager:{region}:{account}:secret:{secret_name}")
                };
                match field {
                    Some(field) => format!("{arn}:{field}::"),
                    None => arn,
                }
            }
            Self::SsmParameter { parameter_name, .. } if parameter_name.starts_with("arn:") => {
                parameter_name.clone()
            }
            Self::SsmParameter { parameter_name, .. } => {
                let separator = if parameter_name.starts_with('/') { "" } else { "/" };
                format!("arn:{partition}:ssm:{region}:{account}:parameter{separator}{parameter_name}")
            }
        }
    }
}

/// Named secret attached to a container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerSecret {
    pub name: String,
    pub secret: EcsSecret,
}

/// Container construction options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDefinitionOptions {
    pub image: ContainerImage,
    /// Defaults to the construct id
    pub container_name: Option<String>,
    pub environment: IndexMap<String, String>,
    pub essential: bool,
}

impl ContainerDefinitionOptions {
    #[must_use]
    pub fn new(image: ContainerImage) -> Self {
        Self {
            image,
            container_name: None,
            environment: IndexMap::new(),
            essential: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_essential(mut self, essential: bool) -> Self {
        self.essential = essential;
        self
    }
}

/// A container of a task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDefinition {
    container_name: String,
    image: ContainerImage,
    environment: IndexMap<String, String>,
    secrets: Vec<ContainerSecret>,
    mount_points: Vec<MountPoint>,
    container_dependencies: Vec<ContainerDependency>,
    essential: bool,
}

impl ContainerDefinition {
    #[inline]
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    #[inline]
    #[must_use]
    pub fn image(&self) -> &ContainerImage {
        &self.image
    }

    #[inline]
    #[must_use]
    pub fn essential(&self) -> bool {
        self.essential
    }

    #[inline]
    #[must_use]
    pub fn environment(&self) -> &IndexMap<String, String> {
        &self.environment
    }

    /// Set an environment variable, overwriting any previous value
    pub fn add_environment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.insert(key.into(), value.into());
    }

    pub fn remove_environment(&mut self, key: &str) -> Option<String> {
        self.environment.shift_remove(key)
    }

    #[inline]
    #[must_use]
    pub fn secrets(&self) -> &[ContainerSecret] {
        &self.secrets
    }

    /// Drop every secret called `name`, returning how many were removed
    pub fn remove_secrets(&mut self, name: &str) -> usize {
        let before = self.secrets.len();
        self.secrets.retain(|s| s.name != name);
        before - self.secrets.len()
    }

    /// Attach a secret; existing entries with the same name are kept
    pub fn add_secret(&mut self, name: impl Into<String>, secret: EcsSecret) {
        self.secrets.push(ContainerSecret {
            name: name.into(),
            secret,
        });
    }

    #[inline]
    #[must_use]
    pub fn mount_points(&self) -> &[MountPoint] {
        &self.mount_points
    }

    pub fn add_mount_points(&mut self, mount_points: impl IntoIterator<Item = MountPoint>) {
        self.mount_points.extend(mount_points);
    }

    pub fn mount_points_mut(&mut self) -> &mut Vec<MountPoint> {
        &mut self.mount_points
    }

    #[inline]
    #[must_use]
    pub fn container_dependencies(&self) -> &[ContainerDependency] {
        &self.container_dependencies
    }

    pub fn add_container_dependencies(
        &mut self,
        dependencies: impl IntoIterator<Item = ContainerDependency>,
    ) {
        self.container_dependencies.extend(dependencies);
    }

    pub fn container_dependencies_mut(&mut self) -> &mut Vec<ContainerDependency> {
        &mut self.container_dependencies
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerVolumeConfiguration {
    pub driver: String,
    pub scope: Option<String>,
    pub autoprovision: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfsVolumeConfiguration {
    pub file_system_id: String,
    pub root_directory: Option<String>,
}

/// Task-level volume
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub docker_volume_configuration: Option<DockerVolumeConfiguration>,
    pub efs_volume_configuration: Option<EfsVolumeConfiguration>,
}

impl Volume {
    /// Bind-mount style volume with no storage backend
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docker_volume_configuration: None,
            efs_volume_configuration: None,
        }
    }
}

/// Task definition construction options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDefinitionProps {
    pub compatibility: Compatibility,
    pub family: Option<String>,
}

impl TaskDefinitionProps {
    #[must_use]
    pub fn fargate() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ec2() -> Self {
        Self {
            compatibility: Compatibility::Ec2,
            family: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }
}

/// A task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    compatibility: Compatibility,
    family: Option<String>,
    containers: Vec<ConstructId>,
    volumes: Vec<Volume>,
}

impl TaskDefinition {
    #[inline]
    #[must_use]
    pub fn compatibility(&self) -> Compatibility {
        self.compatibility
    }

    #[inline]
    #[must_use]
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    /// Container nodes, in insertion order
    #[inline]
    #[must_use]
    pub fn containers(&self) -> &[ConstructId] {
        &self.containers
    }

    #[inline]
    #[must_use]
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Add a volume; no de-duplication takes place
    pub fn add_volume(&mut self, volume: Volume) {
        self.volumes.push(volume);
    }

    pub fn volumes_mut(&mut self) -> &mut Vec<Volume> {
        &mut self.volumes
    }
}

/// Flavors of ECS service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Ec2,
    Fargate,
    ApplicationLoadBalancedEc2,
    ApplicationLoadBalancedFargate,
    ApplicationMultipleTargetGroupsEc2,
    ApplicationMultipleTargetGroupsFargate,
    NetworkLoadBalancedEc2,
    NetworkLoadBalancedFargate,
    NetworkMultipleTargetGroupsEc2,
    NetworkMultipleTargetGroupsFargate,
    QueueProcessingEc2,
    QueueProcessingFargate,
}

impl ServiceKind {
    pub const ALL: [Self; 12] = [
        Self::Ec2,
        Self::Fargate,
        Self::ApplicationLoadBalancedEc2,
        Self::ApplicationLoadBalancedFargate,
        Self::ApplicationMultipleTargetGroupsEc2,
        Self::ApplicationMultipleTargetGroupsFargate,
        Self::NetworkLoadBalancedEc2,
        Self::NetworkLoadBalancedFargate,
        Self::NetworkMultipleTargetGroupsEc2,
        Self::NetworkMultipleTargetGroupsFargate,
        Self::QueueProcessingEc2,
        Self::QueueProcessingFargate,
    ];

    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Ec2 => "Ec2Service",
            Self::Fargate => "FargateService",
            Self::ApplicationLoadBalancedEc2 => "ApplicationLoadBalancedEc2Service",
            Self::ApplicationLoadBalancedFargate => "ApplicationLoadBalancedFargateService",
            Self::ApplicationMultipleTargetGroupsEc2 => "ApplicationMultipleTargetGroupsEc2Service",
            Self::ApplicationMultipleTargetGroupsFargate => {
                "ApplicationMultipleTargetGroupsFargateService"
            }
            Self::NetworkLoadBalancedEc2 => "NetworkLoadBalancedEc2Service",
            Self::NetworkLoadBalancedFargate => "NetworkLoadBalancedFargateService",
            Self::NetworkMultipleTargetGroupsEc2 => "NetworkMultipleTargetGroupsEc2Service",
            Self::NetworkMultipleTargetGroupsFargate => "NetworkMultipleTargetGroupsFargateService",
            Self::QueueProcessingEc2 => "QueueProcessingEc2Service",
            Self::QueueProcessingFargate => "QueueProcessingFargateService",
        }
    }

    #[must_use]
    pub fn compatibility(self) -> Compatibility {
        match self {
            Self::Ec2
            | Self::ApplicationLoadBalancedEc2
            | Self::ApplicationMultipleTargetGroupsEc2
            | Self::NetworkLoadBalancedEc2
            | Self::NetworkMultipleTargetGroupsEc2
            | Self::QueueProcessingEc2 => Compatibility::Ec2,
            _ => Compatibility::Fargate,
        }
    }

    /// Whether this is a higher-level pattern wrapping a plain service
    #[must_use]
    pub fn is_pattern(self) -> bool {
        !matches!(self, Self::Ec2 | Self::Fargate)
    }

    fn plain(self) -> Self {
        match self.compatibility() {
            Compatibility::Ec2 => Self::Ec2,
            Compatibility::Fargate => Self::Fargate,
        }
    }
}

/// Service construction options
///
/// Either an existing task definition or, for pattern services and
/// scheduled tasks, an image from which one is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProps {
    pub kind: ServiceKind,
    pub task_definition: Option<ConstructId>,
    pub task_image: Option<ContainerImage>,
}

impl ServiceProps {
    #[must_use]
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            task_definition: None,
            task_image: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_task_definition(mut self, task_definition: ConstructId) -> Self {
        self.task_definition = Some(task_definition);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_task_image(mut self, image: ContainerImage) -> Self {
        self.task_image = Some(image);
        self
    }
}

/// An ECS service (plain or pattern)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    kind: ServiceKind,
    task_definition: ConstructId,
}

impl Service {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn task_definition(&self) -> ConstructId {
        self.task_definition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduledTaskKind {
    Ec2,
    Fargate,
}

impl ScheduledTaskKind {
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Ec2 => "ScheduledEc2Task",
            Self::Fargate => "ScheduledFargateTask",
        }
    }

    #[must_use]
    pub fn compatibility(self) -> Compatibility {
        match self {
            Self::Ec2 => Compatibility::Ec2,
            Self::Fargate => Compatibility::Fargate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTaskProps {
    pub kind: ScheduledTaskKind,
    pub schedule_expression: String,
    pub task_definition: Option<ConstructId>,
    pub task_image: Option<ContainerImage>,
}

impl ScheduledTaskProps {
    #[must_use]
    pub fn new(kind: ScheduledTaskKind, schedule_expression: impl Into<String>) -> Self {
        Self {
            kind,
            schedule_expression: schedule_expression.into(),
            task_definition: None,
            task_image: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_task_definition(mut self, task_definition: ConstructId) -> Self {
        self.task_definition = Some(task_definition);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_task_image(mut self, image: ContainerImage) -> Self {
        self.task_image = Some(image);
        self
    }
}

/// A task run on a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    kind: ScheduledTaskKind,
    schedule_expression: String,
    task_definition: ConstructId,
}

impl ScheduledTask {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ScheduledTaskKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn schedule_expression(&self) -> &str {
        &self.schedule_expression
    }

    #[inline]
    #[must_use]
    pub fn task_definition(&self) -> ConstructId {
        self.task_definition
    }
}

/// Something that can be applied to a task definition
pub trait TaskDefinitionExtension {
    /// Apply to `task_definition`
    ///
    /// # Errors
    /// Implementation-defined.
    fn extend(&self, app: &mut App, task_definition: ConstructId) -> anyhow::Result<()>;
}

const DEFAULT_TASK_DEFINITION_ID: &str = "TaskDef";
const DEFAULT_CONTAINER_ID: &str = "web";

impl App {
    /// Add a task definition under `scope`
    ///
    /// # Errors
    /// `ConstructError::DuplicateId` if the id is taken
    pub fn add_task_definition(
        &mut self,
        scope: ConstructId,
        local_id: impl Into<String>,
        props: TaskDefinitionProps,
    ) -> Result<ConstructId, ConstructError> {
        self.add_child(
            scope,
            local_id,
            ConstructKind::TaskDefinition(TaskDefinition {
                compatibility: props.compatibility,
                family: props.family,
                containers: Vec::new(),
                volumes: Vec::new(),
            }),
        )
    }

    /// Add a container to a task definition
    ///
    /// # Errors
    /// - `ConstructError::UnexpectedKind` if `task_definition` is not a task definition
    /// - `ConstructError::DuplicateId` if the id is taken
    pub fn add_container(
        &mut self,
        task_definition: ConstructId,
        local_id: impl Into<String>,
        options: ContainerDefinitionOptions,
    ) -> Result<ConstructId, ConstructError> {
        self.task_definition_mut(task_definition)?;

        let local_id = local_id.into();
        let container_name = options.container_name.unwrap_or_else(|| local_id.clone());
        let container = self.add_child(
            task_definition,
            local_id,
            ConstructKind::ContainerDefinition(ContainerDefinition {
                container_name,
                image: options.image,
                environment: options.environment,
                secrets: Vec::new(),
                mount_points: Vec::new(),
                container_dependencies: Vec::new(),
                essential: options.essential,
            }),
        )?;
        self.task_definition_mut(task_definition)?.containers.push(container);

        Ok(container)
    }

    /// Remove a container from its task definition
    ///
    /// # Errors
    /// `ConstructError::UnexpectedKind` if either id has the wrong kind
    pub fn remove_container(
        &mut self,
        task_definition: ConstructId,
        container: ConstructId,
    ) -> Result<(), ConstructError> {
        self.container(container)
            .ok_or(ConstructError::NotFound(container))?;
        self.task_definition_mut(task_definition)?
            .containers
            .retain(|c| *c != container);
        self.remove_node(container)
    }

    /// Apply an extension to a task definition right away
    ///
    /// # Errors
    /// Whatever the extension returns
    pub fn add_task_definition_extension(
        &mut self,
        task_definition: ConstructId,
        extension: &dyn TaskDefinitionExtension,
    ) -> anyhow::Result<()> {
        self.task_definition_mut(task_definition)?;
        extension.extend(self, task_definition)
    }

    /// Add a service under `scope`
    ///
    /// # Errors
    /// - `ConstructError::InvalidProps` if neither a task definition nor an
    ///   image is given, or an image is given to a plain service
    /// - `ConstructError::DuplicateId` if an id is taken
    pub fn add_service(
        &mut self,
        scope: ConstructId,
        local_id: impl Into<String>,
        props: ServiceProps,
    ) -> Result<ConstructId, ConstructError> {
        let kind = props.kind;
        if !kind.is_pattern() && props.task_image.is_some() {
            return Err(ConstructError::invalid_props(format!(
                "a {} requires an existing task definition",
                kind.type_name()
            )));
        }
        let placeholder = self.root();
        let service = self.add_child(
            scope,
            local_id,
            ConstructKind::Service(Service {
                kind,
                task_definition: placeholder,
            }),
        )?;

        let task_definition = match self.resolve_task_definition(
            service,
            kind.compatibility(),
            props.task_definition,
            props.task_image,
        ) {
            Ok(task_definition) => task_definition,
            Err(e) => {
                self.remove_node(service)?;
                return Err(e);
            }
        };
        self.service_mut(service)?.task_definition = task_definition;

        if kind.is_pattern() {
            self.add_child(
                service,
                "Service",
                ConstructKind::Service(Service {
                    kind: kind.plain(),
                    task_definition,
                }),
            )?;
        }

        Ok(service)
    }

    /// Add a scheduled task under `scope`
    ///
    /// # Errors
    /// - `ConstructError::InvalidProps` if neither a task definition nor an image is given
    /// - `ConstructError::DuplicateId` if an id is taken
    pub fn add_scheduled_task(
        &mut self,
        scope: ConstructId,
        local_id: impl Into<String>,
        props: ScheduledTaskProps,
    ) -> Result<ConstructId, ConstructError> {
        let placeholder = self.root();
        let task = self.add_child(
            scope,
            local_id,
            ConstructKind::ScheduledTask(ScheduledTask {
                kind: props.kind,
                schedule_expression: props.schedule_expression,
                task_definition: placeholder,
            }),
        )?;

        let task_definition = match self.resolve_task_definition(
            task,
            props.kind.compatibility(),
            props.task_definition,
            props.task_image,
        ) {
            Ok(task_definition) => task_definition,
            Err(e) => {
                self.remove_node(task)?;
                return Err(e);
            }
        };
        self.expect_kind_mut(task, "ScheduledTask", |kind| match kind {
            ConstructKind::ScheduledTask(scheduled) => Some(scheduled),
            _ => None,
        })?
        .task_definition = task_definition;

        Ok(task)
    }

    fn resolve_task_definition(
        &mut self,
        owner: ConstructId,
        compatibility: Compatibility,
        existing: Option<ConstructId>,
        image: Option<ContainerImage>,
    ) -> Result<ConstructId, ConstructError> {
        match (existing, image) {
            (Some(task_definition), _) => {
                self.task_definition(task_definition)
                    .ok_or(ConstructError::NotFound(task_definition))?;
                Ok(task_definition)
            }
            (None, Some(image)) => {
                let task_definition = self.add_task_definition(
                    owner,
                    DEFAULT_TASK_DEFINITION_ID,
                    TaskDefinitionProps {
                        compatibility,
                        family: None,
                    },
                )?;
                self.add_container(
                    task_definition,
                    DEFAULT_CONTAINER_ID,
                    ContainerDefinitionOptions::new(image),
                )?;
                Ok(task_definition)
            }
            (None, None) => Err(ConstructError::invalid_props(format!(
                "[{}] needs either a task definition or a task image",
                self.path(owner)
            ))),
        }
    }

    #[must_use]
    pub fn task_definition(&self, id: ConstructId) -> Option<&TaskDefinition> {
        match self.kind(id)? {
            ConstructKind::TaskDefinition(task_definition) => Some(task_definition),
            _ => None,
        }
    }

    /// Mutable access to a task definition
    ///
    /// # Errors
    /// `ConstructError::UnexpectedKind` if `id` is not a task definition
    pub fn task_definition_mut(
        &mut self,
        id: ConstructId,
    ) -> Result<&mut TaskDefinition, ConstructError> {
        self.expect_kind_mut(id, "TaskDefinition", |kind| match kind {
            ConstructKind::TaskDefinition(task_definition) => Some(task_definition),
            _ => None,
        })
    }

    #[must_use]
    pub fn container(&self, id: ConstructId) -> Option<&ContainerDefinition> {
        match self.kind(id)? {
            ConstructKind::ContainerDefinition(container) => Some(container),
            _ => None,
        }
    }

    /// Mutable access to a container
    ///
    /// # Errors
    /// `ConstructError::UnexpectedKind` if `id` is not a container
    pub fn container_mut(
        &mut self,
        id: ConstructId,
    ) -> Result<&mut ContainerDefinition, ConstructError> {
        self.expect_kind_mut(id, "ContainerDefinition", |kind| match kind {
            ConstructKind::ContainerDefinition(container) => Some(container),
            _ => None,
        })
    }

    /// Containers of a task definition with their node ids
    #[must_use]
    pub fn containers_of(&self, task_definition: ConstructId) -> Vec<(ConstructId, &ContainerDefinition)> {
        self.task_definition(task_definition)
            .map(|td| {
                td.containers
                    .iter()
                    .filter_map(|id| self.container(*id).map(|c| (*id, c)))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn service(&self, id: ConstructId) -> Option<&Service> {
        match self.kind(id)? {
            ConstructKind::Service(service) => Some(service),
            _ => None,
        }
    }

    fn service_mut(&mut self, id: ConstructId) -> Result<&mut Service, ConstructError> {
        self.expect_kind_mut(id, "Service", |kind| match kind {
            ConstructKind::Service(service) => Some(service),
            _ => None,
        })
    }

    #[must_use]
    pub fn scheduled_task(&self, id: ConstructId) -> Option<&ScheduledTask> {
        match self.kind(id)? {
            ConstructKind::ScheduledTask(task) => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackProps;
    use pretty_assertions::assert_eq;

    fn app_with_stack() -> (App, ConstructId) {
        let mut app = App::new();
        let stack = app.add_stack("Stack", StackProps::in_region("eu-west-1")).unwrap();
        (app, stack)
    }

    #[test]
    fn containers_are_children_in_order() {
        let (mut app, stack) = app_with_stack();
        let td = app.add_task_definition(stack, "TaskDef", TaskDefinitionProps::fargate()).unwrap();
        let a = app
            .add_container(td, "a", ContainerDefinitionOptions::new(ContainerImage::from_registry("nginx")))
            .unwrap();
        let b = app
            .add_container(
                td,
                "b",
                ContainerDefinitionOptions::new(ContainerImage::from_registry("redis"))
                    .with_container_name("cache"),
            )
            .unwrap();

        assert_eq!(app.task_definition(td).unwrap().containers(), &[a, b]);
        assert_eq!(app.container(b).unwrap().container_name(), "cache");
        assert_eq!(app.path(b), "Stack/TaskDef/b");
    }

    #[test]
    fn pattern_service_creates_task_definition_and_inner_service() {
        let (mut app, stack) = app_with_stack();
        let service = app
            .add_service(
                stack,
                "Web",
                ServiceProps::new(ServiceKind::ApplicationLoadBalancedFargate)
                    .with_task_image(ContainerImage::from_registry("nginx")),
            )
            .unwrap();

        let td = app.service(service).unwrap().task_definition();
        assert_eq!(app.path(td), "Stack/Web/TaskDef");
        assert_eq!(app.task_definition(td).unwrap().compatibility(), Compatibility::Fargate);

        let inner = app.find_child(service, "Service").unwrap().unwrap();
        assert_eq!(app.service(inner).unwrap().kind(), ServiceKind::Fargate);
        assert_eq!(app.service(inner).unwrap().task_definition(), td);
    }

    #[test]
    fn plain_service_needs_task_definition() {
        let (mut app, stack) = app_with_stack();
        let err = app.add_service(stack, "Svc", ServiceProps::new(ServiceKind::Ec2)).unwrap_err();
        assert!(matches!(err, ConstructError::InvalidProps(_)));
        assert!(app.find_child(stack, "Svc").unwrap().is_none());
    }

    #[test]
    fn scheduled_task_with_image() {
        let (mut app, stack) = app_with_stack();
        let task = app
            .add_scheduled_task(
                stack,
                "Cron",
                ScheduledTaskProps::new(ScheduledTaskKind::Ec2, "rate(1 day)")
                    .with_task_image(ContainerImage::from_registry("busybox")),
            )
            .unwrap();

        let td = app.scheduled_task(task).unwrap().task_definition();
        assert_eq!(app.task_definition(td).unwrap().compatibility(), Compatibility::Ec2);
        assert_eq!(app.containers_of(td).len(), 1);
    }

    #[test]
    fn remove_container_detaches_it() {
        let (mut app, stack) = app_with_stack();
        let td = app.add_task_definition(stack, "TaskDef", TaskDefinitionProps::ec2()).unwrap();
        let a = app
            .add_container(td, "a", ContainerDefinitionOptions::new(ContainerImage::from_registry("nginx")))
            .unwrap();

        app.remove_container(td, a).unwrap();
        assert!(app.task_definition(td).unwrap().containers().is_empty());
        assert!(app.container(a).is_none());
    }

    #[test]
    fn secret_arns() {
        let sm = EcsSecret::SecretsManager {
            secret_name: "token".into(),
            field: Some("value".into()),
        };
        assert_eq!(
            sm.value_from("aws", "eu-west-1", "123"),
            "arn:aws:secretsmanager:eu-west-1:123:secret:token:value::"
        );

        let ssm = EcsSecret::SsmParameter {
            parameter_name: "/team/token".into(),
            version: Some(3),
        };
        assert_eq!(
            ssm.value_from("aws", "eu-west-1", "123"),
            "arn:aws:ssm:eu-west-1:123:parameter/team/token"
        );

        let by_arn = EcsSecret::SecretsManager {
            secret_name: "arn:aws:secretsmanager:eu-west-1:123:secret:token-AbCdEf".into(),
            field: Some("value".into()),
        };
        assert_eq!(
            by_arn.value_from("aws", "us-east-1", "456"),
            "arn:aws:secretsmanager:eu-west-1:123:secret:token-AbCdEf:value::"
        );
    }

    #[test]
    fn secrets_are_not_deduplicated() {
        let (mut app, stack) = app_with_stack();
        let td = app.add_task_definition(stack, "TaskDef", TaskDefinitionProps::ec2()).unwrap();
        let a = app
            .add_container(td, "a", ContainerDefinitionOptions::new(ContainerImage::from_registry("nginx")))
            .unwrap();
        let secret = EcsSecret::SsmParameter {
            parameter_name: "p".into(),
            version: None,
        };

        let container = app.container_mut(a).unwrap();
        container.add_secret("TOKEN", secret.clone());
        container.add_secret("TOKEN", secret);
        assert_eq!(app.container(a).unwrap().secrets().len(), 2);

        assert_eq!(app.container_mut(a).unwrap().remove_secrets("TOKEN"), 2);
        assert!(app.container(a).unwrap().secrets().is_empty());
    }

    #[test]
    fn dependency_condition_renders_uppercase() {
        assert_eq!(ContainerDependencyCondition::Complete.to_string(), "COMPLETE");
    }
}
