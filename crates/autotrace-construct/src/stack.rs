//! Stacks: the deployment environment of everything below them

use crate::construct::{App, ConstructId, ConstructKind};
use crate::error::ConstructError;
use serde::{Deserialize, Serialize};

/// Rendered in place of a region that is only known at deploy time
pub const UNRESOLVED_REGION: &str = "${AWS::Region}";

/// Rendered in place of an account that is only known at deploy time
pub const UNRESOLVED_ACCOUNT: &str = "${AWS::AccountId}";

/// Stack construction options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProps {
    pub region: Option<String>,
    pub account: Option<String>,
}

impl StackProps {
    /// Stack pinned to a region
    #[must_use]
    pub fn in_region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            account: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

/// A deployment unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    region: Option<String>,
    account: Option<String>,
}

impl Stack {
    /// Region, or the deploy-time pseudo value when environment-agnostic
    #[must_use]
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(UNRESOLVED_REGION)
    }

    #[must_use]
    pub fn account(&self) -> &str {
        self.account.as_deref().unwrap_or(UNRESOLVED_ACCOUNT)
    }

    #[must_use]
    pub fn partition(&self) -> &'static str {
        partition_for_region(self.region())
    }
}

/// AWS partition a region belongs to
#[must_use]
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else {
        "aws"
    }
}

impl App {
    /// Add a stack directly under the app root
    ///
    /// # Errors
    /// `ConstructError::DuplicateId` if a stack with that id exists
    pub fn add_stack(
        &mut self,
        local_id: impl Into<String>,
        props: StackProps,
    ) -> Result<ConstructId, ConstructError> {
        let root = self.root();
        self.add_child(
            root,
            local_id,
            ConstructKind::Stack(Stack {
                region: props.region,
                account: props.account,
            }),
        )
    }

    #[must_use]
    pub fn stack(&self, id: ConstructId) -> Option<&Stack> {
        match self.kind(id)? {
            ConstructKind::Stack(stack) => Some(stack),
            _ => None,
        }
    }

    /// Nearest enclosing stack, including `id` itself
    #[must_use]
    pub fn stack_of(&self, id: ConstructId) -> Option<ConstructId> {
        let mut current = Some(id);
        while let Some(c) = current {
            if self.stack(c).is_some() {
                return Some(c);
            }
            current = self.parent(c);
        }
        None
    }

    /// Deployment region of a node
    #[must_use]
    pub fn region_of(&self, id: ConstructId) -> &str {
        self.stack_of(id)
            .and_then(|s| self.stack(s))
            .map_or(UNRESOLVED_REGION, Stack::region)
    }

    /// Deployment account of a node
    #[must_use]
    pub fn account_of(&self, id: ConstructId) -> &str {
        self.stack_of(id)
            .and_then(|s| self.stack(s))
            .map_or(UNRESOLVED_ACCOUNT, Stack::account)
    }
}
