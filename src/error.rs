use std::fmt;

use thiserror::Error;

/// The fetch stage a reconciliation run was in when its source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Rollups,
    Replies,
    Meetings,
    Statuses,
}

impl FetchStage {
    pub fn as_str(&self) -> &str {
        match self {
            FetchStage::Rollups => "rollups",
            FetchStage::Replies => "replies",
            FetchStage::Meetings => "meetings",
            FetchStage::Statuses => "statuses",
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// A fetch stage failed entirely. Fatal: the run aborts with no partial
    /// aggregate set.
    #[error("source unavailable during {stage} fetch: {cause}")]
    SourceUnavailable {
        stage: FetchStage,
        cause: anyhow::Error,
    },

    /// A newer invocation started before this run completed; its result was
    /// dropped rather than surfaced as stale data.
    #[error("reconciliation run superseded by a newer invocation")]
    Superseded,
}

pub type EngineResult<T> = Result<T, EngineError>;
