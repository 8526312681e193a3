//! Scheduling core of a simulated microkernel.
//!
//! A single dispatcher drives every unit of work through the ready queue,
//! a best-fit memory manager and a set of simulated I/O devices, one
//! discrete tick at a time.

pub mod config;
pub mod error;
pub mod io;
pub mod kernel;

pub use config::{ConfigError, SimulationConfig};
pub use error::{SimResult, SimulationError};
pub use kernel::{
    Dispatcher, FcfsScheduler, MemoryManager, Process, ProcessState, RoundRobinScheduler,
    Scheduler, SchedulingPolicy, SimulationReport,
};

/// Identifier of a unit of work.
pub type Pid = u32;

/// One unit of simulated time.
pub type Tick = u32;
