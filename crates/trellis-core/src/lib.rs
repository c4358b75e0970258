//! Core types for trellis
//!
//! This crate provides the fundamental types shared by the flow compiler and
//! the execution runtime: the [`Outcome`] algebra, deferred [`FutureOutcome`]s,
//! [`Target`] handles, parsed [`Directive`]s, the option binder and the
//! component traits scripts are built from.

mod clock;
mod component;
mod context;
mod directive;
mod duration;
mod future;
mod node_config;
mod options;
mod outcome;
mod target;

pub use clock::{Clock, ManualClock, SystemClock};
pub use component::{Action, DynAction, DynRequirement, DynTrigger, Requirement, Trigger};
pub use context::{ExecutionContext, TriggerData};
pub use directive::{Directive, DirectiveKind};
pub use duration::{format_duration, parse_duration};
pub use future::FutureOutcome;
pub use node_config::{ActionConfig, RequirementConfig, TriggerConfig};
pub use options::{
    bind, parse_duration_value, parse_flag, parse_value, BindError, BindResult, ConfigOption,
    ConfigSchema, Configurable,
};
pub use outcome::{CombinedOutcome, Outcome, Status};
pub use target::{Target, TargetRegistry};
