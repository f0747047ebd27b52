//! Failover error taxonomy.

use thiserror::Error;

use crate::health::AvailabilityError;
use crate::routing::RouteError;

/// Everything that turns a failover request into an error response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    #[error("Action (up or down) parameter not passed")]
    MissingAction,

    #[error("Invalid action specified: {0}")]
    InvalidAction(String),

    #[error("Group name not passed")]
    MissingGroup,

    #[error("Group {0} not found in configuration")]
    UnknownGroup(String),

    #[error("Peer group {peer} of group {group} not found in configuration")]
    UnknownPeerGroup { group: String, peer: String },

    #[error("Group {0} is not down; refusing to fail over")]
    GroupNotDown(String),

    #[error("Cannot fail over group {group}: peer group {peer} is also down")]
    PeerGroupDown { group: String, peer: String },

    #[error("Failed {step}: {source}{}", completed_suffix(.completed))]
    Mutation {
        /// The step that failed.
        step: String,
        /// Status lines of the steps applied before the failure.
        completed: String,
        #[source]
        source: RouteError,
    },
}

fn completed_suffix(completed: &str) -> String {
    if completed.is_empty() {
        String::new()
    } else {
        format!("\nCompleted before failure:\n{}", completed)
    }
}

impl From<AvailabilityError> for FailoverError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::UnknownGroup(name) => FailoverError::UnknownGroup(name),
        }
    }
}

impl FailoverError {
    /// True for split-brain guard refusals, as opposed to input or
    /// configuration errors.
    pub fn is_guard_violation(&self) -> bool {
        matches!(
            self,
            FailoverError::GroupNotDown(_) | FailoverError::PeerGroupDown { .. }
        )
    }
}
