//! Error taxonomy for chain configuration, compilation, and execution.

use thiserror::Error;

/// Error returned by chain configuration, compilation, or execution.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Builder misuse, raised at configuration time, never during a run.
    #[error("invalid chain configuration: {0}")]
    Configuration(String),

    /// The active scope could not produce a required step or dependency.
    #[error("no instance available for `{type_name}`")]
    Resolution {
        /// The type that could not be resolved.
        type_name: &'static str,
    },

    /// An internal compile invariant was violated. Indicates a bug in
    /// chainflow, not a user error.
    #[error("chain composition bug: {0}")]
    Composition(&'static str),

    /// A step's own logic failed. Terminates every step declared after it.
    #[error("step '{step}' failed: {source}")]
    Step {
        /// The failing step's name.
        step: &'static str,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// One or more fork branches failed; the post-merge continuation did not run.
    #[error("{} of {total} fork branches failed", .failures.len())]
    Fork {
        /// Every branch failure, in branch declaration order.
        failures: Vec<ChainError>,
        /// Total number of branches at the fork.
        total: usize,
    },
}
