mod dispatcher;
mod memory;
mod process;
mod process_control_block;
mod report;
mod short_term_scheduler;

pub use dispatcher::Dispatcher;
pub use memory::{MemoryBlock, MemoryManager, MemorySnapshot};
pub use process::Process;
pub use process_control_block::{
    ProcessControlBlock, ProcessEvent, ProcessState, Transition, TransitionError, WaitReason,
};
pub use report::{AverageMetrics, ProcessMetrics, SimulationReport, TraceEvent};
pub use short_term_scheduler::{
    scheduler_for, FcfsScheduler, RoundRobinScheduler, Scheduler, SchedulingPolicy,
};
