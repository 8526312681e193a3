use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{Pid, Tick};

/// Why a process is parked outside the ready queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitReason {
    Memory,
    Io { device: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Waiting(WaitReason),
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::New => write!(f, "NEW"),
            ProcessState::Ready => write!(f, "READY"),
            ProcessState::Running => write!(f, "RUNNING"),
            ProcessState::Waiting(WaitReason::Memory) => write!(f, "WAITING(memory)"),
            ProcessState::Waiting(WaitReason::Io { device }) => write!(f, "WAITING(io:{device})"),
            ProcessState::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// Something that happened to a process and may move it to another state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessEvent {
    Admit,
    Dispatch,
    Preempt,
    BlockOnMemory,
    BlockOnIo(String),
    Wake,
    Exit,
}

impl ProcessState {
    /// Looks up the state reached from `self` on `event`. `None` means the
    /// edge does not exist.
    pub fn on(&self, event: &ProcessEvent) -> Option<ProcessState> {
        use ProcessEvent as E;
        use ProcessState as S;

        match (self, event) {
            (S::New, E::Admit) => Some(S::Ready),
            (S::Ready, E::Dispatch) => Some(S::Running),
            (S::Ready, E::BlockOnMemory) => Some(S::Waiting(WaitReason::Memory)),
            (S::Running, E::BlockOnIo(device)) => Some(S::Waiting(WaitReason::Io {
                device: device.clone(),
            })),
            (S::Running, E::Preempt) => Some(S::Ready),
            (S::Running, E::Exit) => Some(S::Terminated),
            (S::Waiting(_), E::Wake) => Some(S::Ready),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("pid {pid}: no transition from {from} on {event:?}")]
    Illegal {
        pid: Pid,
        from: ProcessState,
        event: ProcessEvent,
    },
}

/// A state change that actually happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub pid: Pid,
    pub from: ProcessState,
    pub to: ProcessState,
}

/// The process control block. Holds identity, execution state and the
/// timestamps the final metrics are computed from.
#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pid: Pid,
    state: ProcessState,

    arrival_time: Tick,
    burst_time: Tick,
    remaining_time: Tick,

    memory_required: usize,
    memory_base: Option<usize>,

    completion_time: Option<Tick>,
    first_run_time: Option<Tick>,
}

impl ProcessControlBlock {
    pub fn new(
        pid: Pid,
        arrival_time: Tick,
        burst_time: Tick,
        memory_required: usize,
    ) -> ProcessControlBlock {
        ProcessControlBlock {
            pid,
            state: ProcessState::New,
            arrival_time,
            burst_time,
            remaining_time: burst_time,
            memory_required,
            memory_base: None,
            completion_time: None,
            first_run_time: None,
        }
    }

    pub fn get_pid(&self) -> Pid {
        self.pid
    }

    pub fn get_state(&self) -> &ProcessState {
        &self.state
    }

    pub fn get_arrival_time(&self) -> Tick {
        self.arrival_time
    }

    pub fn get_burst_time(&self) -> Tick {
        self.burst_time
    }

    pub fn get_remaining_time(&self) -> Tick {
        self.remaining_time
    }

    /// CPU time consumed so far.
    pub fn get_consumed_time(&self) -> Tick {
        self.burst_time - self.remaining_time
    }

    pub fn get_memory_required(&self) -> usize {
        self.memory_required
    }

    pub fn get_memory_base(&self) -> Option<usize> {
        self.memory_base
    }

    pub fn get_completion_time(&self) -> Option<Tick> {
        self.completion_time
    }

    pub fn get_first_run_time(&self) -> Option<Tick> {
        self.first_run_time
    }

    pub fn has_memory(&self) -> bool {
        self.memory_base.is_some()
    }

    pub fn allocate_memory(&mut self, base: usize) {
        self.memory_base = Some(base);
    }

    pub fn free_memory(&mut self) {
        self.memory_base = None;
    }

    /// Consumes up to `time` units of the remaining burst.
    pub fn reduce_time(&mut self, time: Tick) {
        self.remaining_time = self.remaining_time.saturating_sub(time);
    }

    pub fn mark_first_run(&mut self, current_time: Tick) {
        if self.first_run_time.is_none() {
            self.first_run_time = Some(current_time);
        }
    }

    pub fn mark_completion(&mut self, current_time: Tick) {
        self.completion_time = Some(current_time);
    }

    /// Applies `event` through the transition table. The state is left
    /// untouched when the edge does not exist.
    pub fn transition(&mut self, event: ProcessEvent) -> Result<Transition, TransitionError> {
        let next = self.state.on(&event).ok_or_else(|| TransitionError::Illegal {
            pid: self.pid,
            from: self.state.clone(),
            event,
        })?;

        debug!(pid = self.pid, from = %self.state, to = %next, "state transition");

        let from = std::mem::replace(&mut self.state, next.clone());
        Ok(Transition {
            pid: self.pid,
            from,
            to: next,
        })
    }

    pub fn get_turnaround_time(&self) -> Option<i64> {
        self.completion_time
            .map(|completion| i64::from(completion) - i64::from(self.arrival_time))
    }

    pub fn get_waiting_time(&self) -> Option<i64> {
        self.get_turnaround_time()
            .map(|turnaround| turnaround - i64::from(self.burst_time))
    }

    pub fn get_response_time(&self) -> Option<i64> {
        self.first_run_time
            .map(|first_run| i64::from(first_run) - i64::from(self.arrival_time))
    }
}
