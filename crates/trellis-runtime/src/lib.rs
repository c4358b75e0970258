//! Script execution
//!
//! Runs compiled [`trellis_flow::Forest`]s against targets.
//!
//! # Key Types
//!
//! - [`Runtime`] - evaluates requirements, executes actions and fires triggers
//! - [`ExecutionStore`] - last execution times per node and target
//! - [`Scheduler`] - deferred execution of delayed actions
//! - [`Engine`] - loaded scripts, target adapters and trigger dispatch

pub mod engine;
pub mod runtime;
pub mod scheduler;
pub mod store;

pub use engine::{Engine, EngineError, EngineResult, Script, TriggerEvent};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{Scheduler, Task, TokioScheduler};
pub use store::{Claim, Denial, ExecutionStore, Policy};
