//! Forest compiler
//!
//! Structure is inferred from directive kind and adjacency alone:
//!
//! - requirements collect until the next action or trigger adopts them
//! - an action directly following an action (no requirement in between)
//!   becomes a nested child of the first one
//! - triggers in a row stay open together until an action arrives, and that
//!   action and any following ones attach to all of them
//! - requirements left at the end of the script are dropped
//!
//! A script made only of requirements compiles to a flat list of them.

use std::mem;
use std::sync::Arc;

use tracing::debug;
use trellis_core::{bind, Configurable, Directive, DirectiveKind};

use crate::error::{CompileError, CompileResult, DirectiveError};
use crate::node::{ActionNode, Forest, ForestNode, RequirementNode, TriggerNode};
use crate::parser::{default_parsers, LineParser};
use crate::registry::{Factory, Registry};
use crate::stream::DirectiveStream;

/// Compiles scripts against a component registry
pub struct Compiler {
    registry: Arc<Registry>,
    parsers: Vec<Box<dyn LineParser>>,
}

struct PendingAction {
    node: ActionNode,
    children: Vec<usize>,
}

struct PendingTrigger {
    node: TriggerNode,
    actions: Vec<usize>,
}

enum Root {
    Action(usize),
    Trigger(usize),
}

impl Compiler {
    /// Compiler with the standard `!`, `?` and `@` line parsers
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_parsers(registry, default_parsers())
    }

    pub fn with_parsers(registry: Arc<Registry>, parsers: Vec<Box<dyn LineParser>>) -> Self {
        Self { registry, parsers }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Parse script lines into a directive stream
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> CompileResult<DirectiveStream> {
        DirectiveStream::parse(lines, &self.parsers)
    }

    /// Parse and compile script lines
    pub fn compile_lines<S: AsRef<str>>(&self, lines: &[S]) -> CompileResult<Forest> {
        let stream = self.parse(lines)?;
        self.compile(&stream)
    }

    /// Compile a directive stream into a forest in a single pass
    pub fn compile(&self, stream: &DirectiveStream) -> CompileResult<Forest> {
        let total = stream.total_lines();

        let mut actions: Vec<PendingAction> = Vec::new();
        let mut triggers: Vec<PendingTrigger> = Vec::new();
        let mut roots: Vec<Root> = Vec::new();

        let mut requirements: Vec<Arc<RequirementNode>> = Vec::new();
        let mut pending_requirements: Vec<Arc<RequirementNode>> = Vec::new();
        let mut current_action: Option<usize> = None;
        let mut open_triggers: Vec<usize> = Vec::new();
        let mut open_triggers_have_actions = false;

        for directive in stream {
            match directive.kind() {
                DirectiveKind::Requirement => {
                    let node = Arc::new(self.requirement_node(directive, total)?);
                    requirements.push(Arc::clone(&node));
                    pending_requirements.push(node);
                    current_action = None;
                }
                DirectiveKind::Action => {
                    let node = self.action_node(directive, total)?;
                    let index = actions.len();

                    if let Some(parent) = current_action {
                        actions.push(PendingAction {
                            node,
                            children: Vec::new(),
                        });
                        actions[parent].children.push(index);
                        continue;
                    }

                    actions.push(PendingAction {
                        node: node.with_requirements(mem::take(&mut pending_requirements)),
                        children: Vec::new(),
                    });
                    if open_triggers.is_empty() {
                        roots.push(Root::Action(index));
                    } else {
                        for trigger in &open_triggers {
                            triggers[*trigger].actions.push(index);
                        }
                        open_triggers_have_actions = true;
                    }
                    current_action = Some(index);
                }
                DirectiveKind::Trigger => {
                    let node = self
                        .trigger_node(directive, total)?
                        .with_requirements(mem::take(&mut pending_requirements));
                    let index = triggers.len();
                    triggers.push(PendingTrigger {
                        node,
                        actions: Vec::new(),
                    });

                    if open_triggers_have_actions {
                        open_triggers.clear();
                        open_triggers_have_actions = false;
                    }
                    open_triggers.push(index);
                    roots.push(Root::Trigger(index));
                    current_action = None;
                }
            }
        }

        if !pending_requirements.is_empty() {
            debug!(
                dropped = pending_requirements.len(),
                "Dropping trailing requirements"
            );
        }

        let forest = if roots.is_empty() && requirements.len() == stream.len() {
            Forest::new(
                requirements
                    .into_iter()
                    .map(ForestNode::Requirement)
                    .collect(),
            )
        } else {
            assemble(actions, triggers, roots)
        };

        debug!(
            directives = stream.len(),
            roots = forest.len(),
            "Compiled forest"
        );
        Ok(forest)
    }

    fn requirement_node(
        &self,
        directive: &Directive,
        total: usize,
    ) -> CompileResult<RequirementNode> {
        let factory = self.registry.requirement(directive.identifier());
        let (config, requirement) = instantiate(directive, total, factory)?;
        Ok(RequirementNode::new(
            directive.identifier(),
            config,
            requirement,
        ))
    }

    fn action_node(&self, directive: &Directive, total: usize) -> CompileResult<ActionNode> {
        let factory = self.registry.action(directive.identifier());
        let (config, action) = instantiate(directive, total, factory)?;
        Ok(ActionNode::new(directive.identifier(), config, action))
    }

    fn trigger_node(&self, directive: &Directive, total: usize) -> CompileResult<TriggerNode> {
        let factory = self.registry.trigger(directive.identifier());
        let aliases = factory
            .as_ref()
            .map(|f| f.meta().names().map(str::to_string).collect())
            .unwrap_or_default();
        let (config, trigger) = instantiate(directive, total, factory)?;
        Ok(TriggerNode::new(directive.identifier(), config, trigger).with_aliases(aliases))
    }
}

/// Bind a directive's node options and create its component
fn instantiate<C, T>(
    directive: &Directive,
    total: usize,
    factory: Option<Arc<Factory<T>>>,
) -> CompileResult<(C, Arc<T>)>
where
    C: Configurable,
    T: ?Sized,
{
    let at = |err: DirectiveError| CompileError::at(directive.source_index(), total, err);

    let factory = factory.ok_or_else(|| {
        at(DirectiveError::UnknownIdentifier {
            kind: directive.kind(),
            identifier: directive.identifier().to_string(),
        })
    })?;
    let config = bind::<C>(directive.node_options()).map_err(|e| at(e.into()))?;
    let component = factory
        .create(directive.options())
        .map_err(|e| at(e.into()))?;
    Ok((config, component))
}

/// Freeze pending nodes into shared nodes, keeping root order
fn assemble(
    actions: Vec<PendingAction>,
    triggers: Vec<PendingTrigger>,
    roots: Vec<Root>,
) -> Forest {
    // Children always come after their parent, so building back to front
    // has every child ready before its parent.
    let mut built: Vec<Option<Arc<ActionNode>>> = vec![None; actions.len()];
    for (index, pending) in actions.into_iter().enumerate().rev() {
        let children = pending
            .children
            .iter()
            .filter_map(|child| built[*child].clone())
            .collect();
        built[index] = Some(Arc::new(pending.node.with_children(children)));
    }

    let mut frozen_triggers: Vec<Option<Arc<TriggerNode>>> = triggers
        .into_iter()
        .map(|pending| {
            let actions = pending
                .actions
                .iter()
                .filter_map(|action| built[*action].clone())
                .collect();
            Some(Arc::new(pending.node.with_actions(actions)))
        })
        .collect();

    let nodes = roots
        .into_iter()
        .filter_map(|root| match root {
            Root::Action(index) => built[index].take().map(ForestNode::Action),
            Root::Trigger(index) => frozen_triggers[index].take().map(ForestNode::Trigger),
        })
        .collect();
    Forest::new(nodes)
}
