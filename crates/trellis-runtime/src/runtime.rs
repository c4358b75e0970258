//! Execution runtime
//!
//! Walks compiled nodes against a [`Target`]. Nothing here returns an error:
//! type mismatches, cooldowns and failed requirements all come back as
//! [`Outcome`] values.

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::iter;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use trellis_core::{
    Clock, CombinedOutcome, ExecutionContext, FutureOutcome, Outcome, SystemClock, Target,
    TriggerData,
};
use trellis_flow::{ActionNode, Forest, RequirementNode, TriggerNode};

use crate::scheduler::Scheduler;
use crate::store::{Claim, ExecutionStore, Policy};

struct Inner {
    store: ExecutionStore,
    clock: Arc<dyn Clock>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

/// Evaluates forests and nodes; cheap to clone
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

/// Builder for [`Runtime`]
#[derive(Default)]
pub struct RuntimeBuilder {
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl RuntimeBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            inner: Arc::new(Inner {
                store: ExecutionStore::new(),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                scheduler: self.scheduler,
            }),
        }
    }
}

impl Runtime {
    /// Runtime on the system clock without a scheduler
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub fn store(&self) -> &ExecutionStore {
        &self.inner.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub fn has_scheduler(&self) -> bool {
        self.inner.scheduler.is_some()
    }

    /// Test a single requirement
    pub fn test_requirement(
        &self,
        node: &RequirementNode,
        target: &Target,
        ctx: &ExecutionContext,
    ) -> Outcome {
        let requirement = node.requirement();
        if !requirement.accepts(target) {
            trace!(
                requirement = node.identifier(),
                expected = requirement.target_type(),
                actual = target.type_name(),
                "Skipping requirement for target type"
            );
            return Outcome::Empty;
        }

        let config = node.config();
        if config.check_once && self.store().has_passed(node.id(), target.id()) {
            return Outcome::success();
        }

        let mut outcome = requirement.test(target, ctx);
        if config.negated {
            outcome = outcome.negate();
        }
        if config.check_once && outcome.is_success() {
            self.store().mark_passed(node.id(), target.id(), self.now());
        }
        trace!(
            requirement = node.identifier(),
            target = target.id(),
            status = %outcome.status(),
            "Tested requirement"
        );
        outcome
    }

    /// Conjunction of every requirement
    pub fn test_requirements(
        &self,
        nodes: &[Arc<RequirementNode>],
        target: &Target,
        ctx: &ExecutionContext,
    ) -> CombinedOutcome {
        nodes
            .iter()
            .map(|node| self.test_requirement(node, target, ctx))
            .collect()
    }

    /// Execute an action with its guards, policies and nested children
    ///
    /// The returned future is already complete unless the action has a delay
    /// and a scheduler is configured.
    pub fn execute_action(
        &self,
        node: &Arc<ActionNode>,
        target: &Target,
        ctx: &ExecutionContext,
    ) -> FutureOutcome {
        if !node.action().accepts(target) {
            trace!(
                action = node.identifier(),
                expected = node.action().target_type(),
                actual = target.type_name(),
                "Skipping action for target type"
            );
            return FutureOutcome::completed(Outcome::Empty);
        }

        let claim = match self.store().claim(
            node.id(),
            target.id(),
            Policy::from(node.config()),
            self.now(),
        ) {
            Ok(claim) => claim,
            Err(denial) => {
                debug!(
                    action = node.identifier(),
                    target = target.id(),
                    %denial,
                    "Action denied"
                );
                return FutureOutcome::completed(Outcome::failure(denial.to_string()));
            }
        };

        let requirements = self.test_requirements(node.requirements(), target, ctx);
        if requirements.is_failure() {
            debug!(
                action = node.identifier(),
                target = target.id(),
                "Action requirements failed"
            );
            claim.release();
            return FutureOutcome::completed(requirements.into_outcome());
        }

        let delay = node.config().delay;
        match &self.inner.scheduler {
            Some(scheduler) if !delay.is_zero() => {
                debug!(
                    action = node.identifier(),
                    target = target.id(),
                    ?delay,
                    "Deferring action"
                );
                let future = FutureOutcome::pending();
                let done = future.clone();
                let runtime = self.clone();
                let node = Arc::clone(node);
                let target = target.clone();
                let ctx = ctx.clone();
                scheduler.run_later(
                    delay,
                    Box::new(move || {
                        runtime
                            .run_action(&node, &target, &ctx, claim)
                            .on_complete(move |outcome| {
                                done.complete(outcome.clone());
                            });
                    }),
                );
                future
            }
            _ => self.run_action(node, target, ctx, claim),
        }
    }

    /// Run the body, then the children if it did not fail
    fn run_action(
        &self,
        node: &Arc<ActionNode>,
        target: &Target,
        ctx: &ExecutionContext,
        claim: Claim,
    ) -> FutureOutcome {
        let outcome = run_body(node.identifier(), || node.action().execute(target, ctx));
        if outcome.is_failure() {
            debug!(
                action = node.identifier(),
                target = target.id(),
                "Action failed"
            );
            claim.release();
            return FutureOutcome::completed(outcome);
        }

        claim.commit(self.now());
        trace!(
            action = node.identifier(),
            target = target.id(),
            children = node.children().len(),
            "Executed action"
        );

        let children = node
            .children()
            .iter()
            .map(|child| self.execute_action(child, target, ctx));
        FutureOutcome::all(iter::once(FutureOutcome::completed(outcome)).chain(children))
    }

    /// Check a trigger firing without running its actions
    pub fn test_trigger(&self, node: &TriggerNode, target: &Target, data: &TriggerData) -> Outcome {
        if !node.trigger().accepts(target) {
            return Outcome::Empty;
        }
        let matched = node.trigger().test(target, data);
        if matched.is_failure() {
            return matched;
        }
        let ctx = ExecutionContext::with_trigger(data.clone());
        self.test_requirements(node.requirements(), target, &ctx)
            .into_outcome()
    }

    /// Fire a trigger: check its policies and guards, then run its actions
    pub fn fire_trigger(
        &self,
        node: &Arc<TriggerNode>,
        target: &Target,
        data: &TriggerData,
    ) -> FutureOutcome {
        if !node.trigger().accepts(target) {
            trace!(
                trigger = node.identifier(),
                actual = target.type_name(),
                "Skipping trigger for target type"
            );
            return FutureOutcome::completed(Outcome::Empty);
        }

        let matched = node.trigger().test(target, data);
        if matched.is_failure() {
            trace!(trigger = node.identifier(), "Trigger data did not match");
            return FutureOutcome::completed(matched);
        }

        let claim = match self.store().claim(
            node.id(),
            target.id(),
            Policy::from(node.config()),
            self.now(),
        ) {
            Ok(claim) => claim,
            Err(denial) => {
                debug!(
                    trigger = node.identifier(),
                    target = target.id(),
                    %denial,
                    "Trigger denied"
                );
                return FutureOutcome::completed(Outcome::failure(denial.to_string()));
            }
        };

        let ctx = ExecutionContext::with_trigger(data.clone());
        let requirements = self.test_requirements(node.requirements(), target, &ctx);
        if requirements.is_failure() {
            debug!(
                trigger = node.identifier(),
                target = target.id(),
                "Trigger requirements failed"
            );
            claim.release();
            return FutureOutcome::completed(requirements.into_outcome());
        }
        claim.commit(self.now());

        debug!(
            trigger = node.identifier(),
            target = target.id(),
            actions = node.actions().len(),
            "Trigger fired"
        );
        let actions = node
            .actions()
            .iter()
            .map(|action| self.execute_action(action, target, &ctx));
        FutureOutcome::all(
            iter::once(FutureOutcome::completed(requirements.into_outcome())).chain(actions),
        )
    }

    /// Conjunction of the top-level requirements of a forest
    pub fn test(
        &self,
        forest: &Forest,
        target: &Target,
        ctx: &ExecutionContext,
    ) -> CombinedOutcome {
        forest
            .requirements()
            .map(|node| self.test_requirement(node, target, ctx))
            .collect()
    }

    /// Execute every top-level action of a forest
    ///
    /// Triggers only run when fired.
    pub fn execute(
        &self,
        forest: &Forest,
        target: &Target,
        ctx: &ExecutionContext,
    ) -> FutureOutcome {
        FutureOutcome::all(
            forest
                .actions()
                .map(|node| self.execute_action(node, target, ctx))
                .collect::<Vec<_>>(),
        )
    }

    /// Fire every trigger of a forest listening to `data.identifier`
    pub fn trigger(&self, forest: &Forest, target: &Target, data: &TriggerData) -> FutureOutcome {
        FutureOutcome::all(
            forest
                .triggers_for(&data.identifier)
                .map(|node| self.fire_trigger(node, target, data))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("clock", &self.inner.clock)
            .field("scheduler", &self.inner.scheduler.is_some())
            .finish()
    }
}

/// Run an action body, turning a panic into a failure
fn run_body<F>(identifier: &str, body: F) -> Outcome
where
    F: FnOnce() -> Outcome,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(action = identifier, %message, "Action panicked");
            Outcome::failure(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "action panicked".to_string()
    }
}
