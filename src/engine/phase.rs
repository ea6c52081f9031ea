use std::fmt;

/// Where a run is. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Initializing,
    InitialAnalysis,
    /// 1-based iteration
    Exploring { iteration: usize },
    Synthesizing,
    Done,
}

impl EnginePhase {
    fn rank(self) -> (u8, usize) {
        match self {
            Self::Initializing => (0, 0),
            Self::InitialAnalysis => (1, 0),
            Self::Exploring { iteration } => (2, iteration),
            Self::Synthesizing => (3, 0),
            Self::Done => (4, 0),
        }
    }

    /// Whether moving from `self` to `next` goes forward.
    pub fn can_advance_to(self, next: EnginePhase) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::InitialAnalysis => write!(f, "initial-analysis"),
            Self::Exploring { iteration } => write!(f, "exploring ({})", iteration),
            Self::Synthesizing => write!(f, "synthesizing"),
            Self::Done => write!(f, "done"),
        }
    }
}
