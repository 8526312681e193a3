use std::collections::VecDeque;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::{Process, ProcessEvent, Transition, TransitionError};
use crate::Pid;

/// How long the dispatcher lets a process run once it is picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SchedulingPolicy {
    /// Run to completion, or until the first I/O request fires.
    #[default]
    Fcfs,
    /// Run for at most `quantum` ticks per visit.
    RoundRobin { quantum: NonZeroU32 },
}

/// The ready queue seen by the dispatcher.
pub trait Scheduler {
    /// Moves a new process to READY and appends it.
    fn add_process(&mut self, process: Process) -> Result<Transition, TransitionError>;

    fn get_next_process(&mut self) -> Option<Process>;

    fn has_process(&self) -> bool;

    /// Appends a process without touching its state.
    fn requeue(&mut self, process: Process);

    fn policy(&self) -> SchedulingPolicy;

    /// Pids in dispatch order.
    fn ready_pids(&self) -> Vec<Pid>;
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn add_process(&mut self, process: Process) -> Result<Transition, TransitionError> {
        (**self).add_process(process)
    }

    fn get_next_process(&mut self) -> Option<Process> {
        (**self).get_next_process()
    }

    fn has_process(&self) -> bool {
        (**self).has_process()
    }

    fn requeue(&mut self, process: Process) {
        (**self).requeue(process)
    }

    fn policy(&self) -> SchedulingPolicy {
        (**self).policy()
    }

    fn ready_pids(&self) -> Vec<Pid> {
        (**self).ready_pids()
    }
}

/// Strict FIFO shared by both policies.
#[derive(Debug, Default)]
struct ReadyQueue {
    queue: VecDeque<Process>,
}

impl ReadyQueue {
    fn admit(&mut self, mut process: Process) -> Result<Transition, TransitionError> {
        let transition = process.pcb_mut().transition(ProcessEvent::Admit)?;
        self.queue.push_back(process);
        Ok(transition)
    }

    fn pids(&self) -> Vec<Pid> {
        self.queue.iter().map(Process::get_pid).collect()
    }
}

#[derive(Debug, Default)]
pub struct FcfsScheduler {
    ready: ReadyQueue,
}

impl FcfsScheduler {
    pub fn new() -> FcfsScheduler {
        FcfsScheduler::default()
    }
}

impl Scheduler for FcfsScheduler {
    fn add_process(&mut self, process: Process) -> Result<Transition, TransitionError> {
        self.ready.admit(process)
    }

    fn get_next_process(&mut self) -> Option<Process> {
        self.ready.queue.pop_front()
    }

    fn has_process(&self) -> bool {
        !self.ready.queue.is_empty()
    }

    fn requeue(&mut self, process: Process) {
        self.ready.queue.push_back(process);
    }

    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::Fcfs
    }

    fn ready_pids(&self) -> Vec<Pid> {
        self.ready.pids()
    }
}

#[derive(Debug)]
pub struct RoundRobinScheduler {
    ready: ReadyQueue,
    quantum: NonZeroU32,
}

impl RoundRobinScheduler {
    pub fn new(quantum: NonZeroU32) -> RoundRobinScheduler {
        RoundRobinScheduler {
            ready: ReadyQueue::default(),
            quantum,
        }
    }

    pub fn get_quantum(&self) -> NonZeroU32 {
        self.quantum
    }
}

impl Scheduler for RoundRobinScheduler {
    fn add_process(&mut self, process: Process) -> Result<Transition, TransitionError> {
        self.ready.admit(process)
    }

    fn get_next_process(&mut self) -> Option<Process> {
        self.ready.queue.pop_front()
    }

    fn has_process(&self) -> bool {
        !self.ready.queue.is_empty()
    }

    fn requeue(&mut self, process: Process) {
        self.ready.queue.push_back(process);
    }

    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::RoundRobin {
            quantum: self.quantum,
        }
    }

    fn ready_pids(&self) -> Vec<Pid> {
        self.ready.pids()
    }
}

/// Builds the scheduler matching `policy`.
pub fn scheduler_for(policy: SchedulingPolicy) -> Box<dyn Scheduler> {
    match policy {
        SchedulingPolicy::Fcfs => Box::new(FcfsScheduler::new()),
        SchedulingPolicy::RoundRobin { quantum } => Box::new(RoundRobinScheduler::new(quantum)),
    }
}
