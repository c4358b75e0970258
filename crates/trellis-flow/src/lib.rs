//! Script compilation
//!
//! This crate turns script lines into a [`Forest`] of executable nodes.
//!
//! # Pipeline
//!
//! ```text
//! lines ──LineParser──▶ DirectiveStream ──Compiler + Registry──▶ Forest
//! ```
//!
//! - [`LineParser`] splits one line into a [`trellis_core::Directive`]
//! - [`Registry`] resolves directive identifiers to component factories
//! - [`Compiler`] infers the node structure from directive order
//!
//! # Example
//!
//! ```text
//! ?alive
//! @join(cooldown=1m)
//! !greet "welcome back"
//! !give item=bread
//! ```
//!
//! compiles to one `join` trigger guarded by `alive`, running `greet` with
//! `give` nested under it.

pub mod compiler;
pub mod error;
pub mod node;
pub mod parser;
pub mod registry;
pub mod stream;

pub use compiler::Compiler;
pub use error::{CompileError, CompileResult, DirectiveError, ParseError, ParseResult};
pub use node::{ActionNode, Forest, ForestNode, NodeId, RequirementNode, TriggerNode};
pub use parser::{default_parsers, FlowLineParser, LineParser};
pub use registry::{
    ActionFactory, AnyFactory, ComponentMeta, Factory, OptionMeta, Registry, RequirementFactory,
    TriggerFactory,
};
pub use stream::DirectiveStream;
