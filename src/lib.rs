//! # Chainflow
//!
//! Async chain-of-responsibility pipelines that run in your process.
//!
//! Declare an ordered sequence of message-processing steps (including
//! parallel fork/merge sections), compile it once, and run the compiled
//! chain as many times as you like, each run against its own dependency
//! scope.
//!
//! - **Compile once, run many** - declarations fold into nested
//!   continuations at build time; runs pay no per-call reflection
//! - **Chain of responsibility** - each step receives the message and the
//!   rest of the chain, and stops the chain by simply not continuing it
//! - **Fork/merge barrier** - branches run concurrently and are all joined
//!   before anything declared after `merge` executes
//! - **Per-run scopes** - step instances and dependencies are resolved from
//!   a scope created for each run and released when it finishes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chainflow::{branch, ChainBuilder, Registry};
//!
//! let chain = ChainBuilder::new()
//!     .add_step::<Authenticate>()
//!     .fork([
//!         branch(|b| b.add_step::<AuditTrail>()),
//!         branch(|b| b.add_step::<Analytics>()),
//!     ])?
//!     .merge()
//!     .add_step::<Dispatch>()
//!     .build_with(Registry::new().scoped(RequestState::default))?;
//!
//! let outcome = chain.run(message).await?;
//! ```
//!
//! ## Inline steps
//!
//! Steps can be plain async closures; a continuation parameter and up to two
//! `Arc<T>` dependency parameters are bound by type from the run's scope:
//!
//! ```rust,ignore
//! let chain = ChainBuilder::new()
//!     .add_fn(|order: Order, next: Next<Order>| async move {
//!         if order.total > 0 {
//!             next(order).await?;
//!         }
//!         Ok(())
//!     })
//!     .build()?;
//! ```

pub mod builder;
pub mod chain;
pub mod error;
pub mod handler;
pub mod inline;
pub mod registry;
pub mod resolver;

mod compile;

pub use builder::{branch, Branch, ChainBuilder, ForkBuilder};
pub use chain::{Chain, Outcome};
pub use error::ChainError;
pub use handler::{Completion, Handler, Message, Next, StepError};
pub use inline::{InlinePlan, InlineStep};
pub use registry::Registry;
pub use resolver::{Resolver, Scope};
