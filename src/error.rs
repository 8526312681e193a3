use thiserror::Error;

use crate::kernel::TransitionError;
use crate::{Pid, Tick};

pub type SimResult<T> = Result<T, SimulationError>;

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    /// The dispatcher tried to move a process along an edge the state machine does not have.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("simulation did not drain within {limit} ticks")]
    TickLimitExceeded { limit: Tick },

    #[error("clock overflow advancing {by} ticks from {time}")]
    ClockOverflow { time: Tick, by: Tick },

    #[error("pid {0} was already admitted")]
    DuplicatePid(Pid),
}
