//! Session process configuration.

use serde::{Deserialize, Serialize};
use strata_core::InstrumentKind;

use crate::error::{SessionError, SessionResult};

/// Session process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inbound queue capacity for each process in the session tree.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// One contract repository is spawned per listed kind.
    #[serde(default = "default_repository_kinds")]
    pub repository_kinds: Vec<InstrumentKind>,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_repository_kinds() -> Vec<InstrumentKind> {
    vec![InstrumentKind::Future]
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            repository_kinds: default_repository_kinds(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> SessionResult<()> {
        if self.channel_capacity == 0 {
            return Err(SessionError::InvalidConfig(
                "channel_capacity must be positive".to_string(),
            ));
        }
        for (i, kind) in self.repository_kinds.iter().enumerate() {
            if self.repository_kinds[..i].contains(kind) {
                return Err(SessionError::InvalidConfig(format!(
                    "duplicate repository kind: {kind}"
                )));
            }
        }
        Ok(())
    }
}
