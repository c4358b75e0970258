//! Compiled nodes and the forest
//!
//! Nodes are immutable once compiled and shared through `Arc`, so a forest
//! can be evaluated from many tasks at once. Per-target bookkeeping such as
//! last execution times lives in the runtime, keyed by [`NodeId`].

use std::fmt;
use std::slice;
use std::sync::Arc;

use trellis_core::{
    ActionConfig, DynAction, DynRequirement, DynTrigger, RequirementConfig, TriggerConfig,
};
use ulid::Ulid;

/// Unique identity of a compiled node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Ulid);

impl NodeId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A guard test
pub struct RequirementNode {
    id: NodeId,
    identifier: String,
    config: RequirementConfig,
    requirement: Arc<dyn DynRequirement>,
}

impl RequirementNode {
    pub fn new(
        identifier: impl Into<String>,
        config: RequirementConfig,
        requirement: Arc<dyn DynRequirement>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            identifier: identifier.into(),
            config,
            requirement,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn config(&self) -> &RequirementConfig {
        &self.config
    }

    pub fn requirement(&self) -> &dyn DynRequirement {
        self.requirement.as_ref()
    }
}

impl fmt::Debug for RequirementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequirementNode")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("config", &self.config)
            .field("target_type", &self.requirement.target_type())
            .finish()
    }
}

/// An action with its guards and nested follow-up actions
pub struct ActionNode {
    id: NodeId,
    identifier: String,
    config: ActionConfig,
    action: Arc<dyn DynAction>,
    requirements: Vec<Arc<RequirementNode>>,
    children: Vec<Arc<ActionNode>>,
}

impl ActionNode {
    pub fn new(
        identifier: impl Into<String>,
        config: ActionConfig,
        action: Arc<dyn DynAction>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            identifier: identifier.into(),
            config,
            action,
            requirements: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_requirements(mut self, requirements: Vec<Arc<RequirementNode>>) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_children(mut self, children: Vec<Arc<ActionNode>>) -> Self {
        self.children = children;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    pub fn action(&self) -> &dyn DynAction {
        self.action.as_ref()
    }

    /// Guards tested before the body runs
    pub fn requirements(&self) -> &[Arc<RequirementNode>] {
        &self.requirements
    }

    /// Actions run after this one succeeds
    pub fn children(&self) -> &[Arc<ActionNode>] {
        &self.children
    }
}

impl fmt::Debug for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionNode")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("config", &self.config)
            .field("target_type", &self.action.target_type())
            .field("requirements", &self.requirements)
            .field("children", &self.children)
            .finish()
    }
}

/// A trigger with its guards and the actions it runs when fired
pub struct TriggerNode {
    id: NodeId,
    identifier: String,
    aliases: Vec<String>,
    config: TriggerConfig,
    trigger: Arc<dyn DynTrigger>,
    requirements: Vec<Arc<RequirementNode>>,
    actions: Vec<Arc<ActionNode>>,
}

impl TriggerNode {
    pub fn new(
        identifier: impl Into<String>,
        config: TriggerConfig,
        trigger: Arc<dyn DynTrigger>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            identifier: identifier.into(),
            aliases: Vec::new(),
            config,
            trigger,
            requirements: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_requirements(mut self, requirements: Vec<Arc<RequirementNode>>) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Arc<ActionNode>>) -> Self {
        self.actions = actions;
        self
    }

    /// Other names the trigger component is registered under
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn trigger(&self) -> &dyn DynTrigger {
        self.trigger.as_ref()
    }

    pub fn requirements(&self) -> &[Arc<RequirementNode>] {
        &self.requirements
    }

    pub fn actions(&self) -> &[Arc<ActionNode>] {
        &self.actions
    }

    /// Whether this trigger fires for the given identifier (case-insensitive)
    pub fn matches(&self, identifier: &str) -> bool {
        self.identifier.eq_ignore_ascii_case(identifier)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(identifier))
    }
}

impl fmt::Debug for TriggerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerNode")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("aliases", &self.aliases)
            .field("config", &self.config)
            .field("target_type", &self.trigger.target_type())
            .field("requirements", &self.requirements)
            .field("actions", &self.actions)
            .finish()
    }
}

/// A top-level forest entry
#[derive(Debug, Clone)]
pub enum ForestNode {
    Action(Arc<ActionNode>),
    Trigger(Arc<TriggerNode>),
    Requirement(Arc<RequirementNode>),
}

impl ForestNode {
    pub fn id(&self) -> NodeId {
        match self {
            ForestNode::Action(node) => node.id(),
            ForestNode::Trigger(node) => node.id(),
            ForestNode::Requirement(node) => node.id(),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            ForestNode::Action(node) => node.identifier(),
            ForestNode::Trigger(node) => node.identifier(),
            ForestNode::Requirement(node) => node.identifier(),
        }
    }

    pub fn as_action(&self) -> Option<&Arc<ActionNode>> {
        match self {
            ForestNode::Action(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<&Arc<TriggerNode>> {
        match self {
            ForestNode::Trigger(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_requirement(&self) -> Option<&Arc<RequirementNode>> {
        match self {
            ForestNode::Requirement(node) => Some(node),
            _ => None,
        }
    }
}

/// Ordered top-level nodes of a compiled script
///
/// Holds actions and triggers, or only requirements when the script
/// consisted of nothing else.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<ForestNode>,
}

impl Forest {
    pub fn new(nodes: Vec<ForestNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ForestNode] {
        &self.nodes
    }

    pub fn iter(&self) -> slice::Iter<'_, ForestNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Arc<ActionNode>> {
        self.nodes.iter().filter_map(ForestNode::as_action)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Arc<TriggerNode>> {
        self.nodes.iter().filter_map(ForestNode::as_trigger)
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Arc<RequirementNode>> {
        self.nodes.iter().filter_map(ForestNode::as_requirement)
    }

    /// Triggers listening to `identifier`
    pub fn triggers_for<'a>(
        &'a self,
        identifier: &'a str,
    ) -> impl Iterator<Item = &'a Arc<TriggerNode>> + 'a {
        self.triggers().filter(move |t| t.matches(identifier))
    }

    /// Whether the forest only holds requirements
    pub fn is_filter(&self) -> bool {
        !self.nodes.is_empty()
            && self
                .nodes
                .iter()
                .all(|n| matches!(n, ForestNode::Requirement(_)))
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a ForestNode;
    type IntoIter = slice::Iter<'a, ForestNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
