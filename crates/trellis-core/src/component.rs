//! Component traits
//!
//! Actions, requirements and triggers are authored as plain structs that are
//! their own config: the struct's [`Configurable`] schema declares which
//! options a script line may set. Each component declares the target type it
//! applies to; the runtime never hands it a target of another type.
//!
//! The `Dyn*` traits are the type-erased forms stored in compiled nodes and
//! are implemented automatically.

use std::any::type_name;

use crate::context::{ExecutionContext, TriggerData};
use crate::options::Configurable;
use crate::outcome::Outcome;
use crate::target::Target;

/// Something that happens to a target
///
/// The action should do the pure execution; all filtering happens through
/// the requirements attached in the script.
pub trait Action: Configurable {
    type Target: Send + Sync + 'static;

    fn execute(&self, target: &Self::Target, ctx: &ExecutionContext) -> Outcome;
}

/// A test a target must pass before actions run or triggers fire
pub trait Requirement: Configurable {
    type Target: Send + Sync + 'static;

    fn test(&self, target: &Self::Target, ctx: &ExecutionContext) -> Outcome;
}

/// A named event source actions can be attached to
///
/// The host fires triggers by identifier; `test` lets a configured trigger
/// reject firings whose data does not match its options.
pub trait Trigger: Configurable {
    type Target: Send + Sync + 'static;

    fn test(&self, _target: &Self::Target, _data: &TriggerData) -> Outcome {
        Outcome::success()
    }
}

/// Type-erased [`Action`]
pub trait DynAction: Send + Sync {
    fn target_type(&self) -> &'static str;
    fn accepts(&self, target: &Target) -> bool;
    fn execute(&self, target: &Target, ctx: &ExecutionContext) -> Outcome;
}

impl<A: Action> DynAction for A {
    fn target_type(&self) -> &'static str {
        type_name::<A::Target>()
    }

    fn accepts(&self, target: &Target) -> bool {
        target.is::<A::Target>()
    }

    fn execute(&self, target: &Target, ctx: &ExecutionContext) -> Outcome {
        match target.downcast_ref::<A::Target>() {
            Some(value) => Action::execute(self, value, ctx),
            None => Outcome::Empty,
        }
    }
}

/// Type-erased [`Requirement`]
pub trait DynRequirement: Send + Sync {
    fn target_type(&self) -> &'static str;
    fn accepts(&self, target: &Target) -> bool;
    fn test(&self, target: &Target, ctx: &ExecutionContext) -> Outcome;
}

impl<R: Requirement> DynRequirement for R {
    fn target_type(&self) -> &'static str {
        type_name::<R::Target>()
    }

    fn accepts(&self, target: &Target) -> bool {
        target.is::<R::Target>()
    }

    fn test(&self, target: &Target, ctx: &ExecutionContext) -> Outcome {
        match target.downcast_ref::<R::Target>() {
            Some(value) => Requirement::test(self, value, ctx),
            None => Outcome::Empty,
        }
    }
}

/// Type-erased [`Trigger`]
pub trait DynTrigger: Send + Sync {
    fn target_type(&self) -> &'static str;
    fn accepts(&self, target: &Target) -> bool;
    fn test(&self, target: &Target, data: &TriggerData) -> Outcome;
}

impl<T: Trigger> DynTrigger for T {
    fn target_type(&self) -> &'static str {
        type_name::<T::Target>()
    }

    fn accepts(&self, target: &Target) -> bool {
        target.is::<T::Target>()
    }

    fn test(&self, target: &Target, data: &TriggerData) -> Outcome {
        match target.downcast_ref::<T::Target>() {
            Some(value) => Trigger::test(self, value, data),
            None => Outcome::Empty,
        }
    }
}
