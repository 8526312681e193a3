use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, trace};

use super::{
    AverageMetrics, MemoryManager, Process, ProcessEvent, ProcessMetrics, ProcessState, Scheduler,
    SchedulingPolicy, SimulationReport, TraceEvent, WaitReason,
};
use crate::error::{SimResult, SimulationError};
use crate::io::{IoManager, IoRequest};
use crate::{Pid, Tick};

/// The control loop. Owns every resource a process can sit in and moves
/// processes between them one iteration at a time.
pub struct Dispatcher<S: Scheduler> {
    scheduler: S,
    memory: MemoryManager,
    io_manager: IoManager,
    waiting_for_memory: VecDeque<Process>,
    completed: Vec<Process>,
    current_time: Tick,
    idle_ticks: Tick,
    max_ticks: Option<Tick>,
    admitted: HashSet<Pid>,
    trace: Vec<TraceEvent>,
}

impl<S: Scheduler> Dispatcher<S> {
    pub fn new(scheduler: S, memory: MemoryManager, io_manager: IoManager) -> Dispatcher<S> {
        Dispatcher {
            scheduler,
            memory,
            io_manager,
            waiting_for_memory: VecDeque::new(),
            completed: Vec::new(),
            current_time: 0,
            idle_ticks: 0,
            max_ticks: None,
            admitted: HashSet::new(),
            trace: Vec::new(),
        }
    }

    /// Abandons the run once the clock passes `limit`.
    pub fn with_tick_limit(mut self, limit: Tick) -> Dispatcher<S> {
        self.max_ticks = Some(limit);
        self
    }

    pub fn current_time(&self) -> Tick {
        self.current_time
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn io_manager(&self) -> &IoManager {
        &self.io_manager
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn memory_waiters(&self) -> Vec<Pid> {
        self.waiting_for_memory.iter().map(Process::get_pid).collect()
    }

    pub fn completed(&self) -> &[Process] {
        &self.completed
    }

    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Hands a new process to the scheduler. Pids must be unique for the
    /// whole run.
    pub fn admit(&mut self, process: Process) -> SimResult<()> {
        let pid = process.get_pid();
        if self.admitted.contains(&pid) {
            return Err(SimulationError::DuplicatePid(pid));
        }

        let transition = self.scheduler.add_process(process)?;
        self.admitted.insert(pid);
        self.trace.push(TraceEvent::transition(self.current_time, transition));
        Ok(())
    }

    pub fn has_work(&self) -> bool {
        self.scheduler.has_process()
            || !self.waiting_for_memory.is_empty()
            || self.io_manager.has_pending_io()
    }

    /// Runs iterations until every queue and device has drained.
    pub fn run(&mut self) -> SimResult<SimulationReport> {
        info!(policy = ?self.scheduler.policy(), "starting dispatch loop");

        while self.has_work() {
            self.step()?;
        }

        let report = self.report();
        info!(
            completed = report.completed.len(),
            total_time = report.total_time,
            idle_ticks = report.idle_ticks,
            "dispatch loop drained"
        );
        Ok(report)
    }

    /// One iteration: I/O completions, then memory waiters, then at most one
    /// dispatch.
    pub fn step(&mut self) -> SimResult<()> {
        if let Some(limit) = self.max_ticks {
            if self.current_time > limit {
                return Err(SimulationError::TickLimitExceeded { limit });
            }
        }

        self.io_manager.process_io();
        self.handle_io_completions()?;
        self.try_unblock_processes()?;

        let Some(mut process) = self.scheduler.get_next_process() else {
            trace!(time = self.current_time, "cpu idle");
            self.advance_clock(1)?;
            self.idle_ticks += 1;
            return Ok(());
        };

        if !process.pcb().has_memory() && !self.grant_memory(&mut process) {
            debug!(pid = process.get_pid(), "waiting for memory");
            self.apply(&mut process, ProcessEvent::BlockOnMemory)?;
            self.waiting_for_memory.push_back(process);
            return Ok(());
        }

        self.apply(&mut process, ProcessEvent::Dispatch)?;
        process.pcb_mut().mark_first_run(self.current_time);

        let due_io = if process.should_request_io() {
            process.get_next_io_request()
        } else {
            None
        };

        match self.scheduler.policy() {
            SchedulingPolicy::Fcfs => match due_io {
                Some(request) => {
                    let run = process.pcb().get_remaining_time() / 2;
                    self.run_slice(&mut process, run)?;
                    self.block_on_io(process, request)
                }
                None => {
                    let run = process.pcb().get_remaining_time();
                    self.run_slice(&mut process, run)?;
                    self.terminate(process)
                }
            },
            SchedulingPolicy::RoundRobin { quantum } => {
                let slice = quantum.get().min(process.pcb().get_remaining_time());
                match due_io {
                    Some(request) => {
                        self.run_slice(&mut process, slice.min(1))?;
                        self.block_on_io(process, request)
                    }
                    None => {
                        self.run_slice(&mut process, slice)?;
                        if process.pcb().get_remaining_time() == 0 {
                            self.terminate(process)
                        } else {
                            self.apply(&mut process, ProcessEvent::Preempt)?;
                            self.scheduler.requeue(process);
                            Ok(())
                        }
                    }
                }
            }
        }
    }

    pub fn report(&self) -> SimulationReport {
        let completed: Vec<ProcessMetrics> = self
            .completed
            .iter()
            .filter_map(ProcessMetrics::from_process)
            .collect();

        SimulationReport {
            trace: self.trace.clone(),
            averages: AverageMetrics::from_metrics(&completed),
            completed,
            total_time: self.current_time,
            idle_ticks: self.idle_ticks,
        }
    }

    fn apply(&mut self, process: &mut Process, event: ProcessEvent) -> SimResult<()> {
        let transition = process.pcb_mut().transition(event)?;
        self.trace.push(TraceEvent::transition(self.current_time, transition));
        Ok(())
    }

    fn grant_memory(&mut self, process: &mut Process) -> bool {
        let required = process.pcb().get_memory_required();
        match self.memory.allocate(process.pcb_mut(), required) {
            Some(block) => {
                self.trace.push(TraceEvent::MemoryAllocated {
                    time: self.current_time,
                    pid: process.get_pid(),
                    block,
                });
                true
            }
            None => false,
        }
    }

    fn advance_clock(&mut self, by: Tick) -> SimResult<()> {
        self.current_time = self
            .current_time
            .checked_add(by)
            .ok_or(SimulationError::ClockOverflow {
                time: self.current_time,
                by,
            })?;
        Ok(())
    }

    fn run_slice(&mut self, process: &mut Process, duration: Tick) -> SimResult<()> {
        let start = self.current_time;
        self.advance_clock(duration)?;
        process.run_for(duration);

        debug!(
            pid = process.get_pid(),
            duration,
            remaining = process.pcb().get_remaining_time(),
            time = self.current_time,
            "ran slice"
        );
        self.trace.push(TraceEvent::Ran {
            time: start,
            pid: process.get_pid(),
            duration,
            remaining: process.pcb().get_remaining_time(),
        });
        Ok(())
    }

    /// Parks `process` on I/O. Its memory stays allocated.
    fn block_on_io(&mut self, mut process: Process, request: IoRequest) -> SimResult<()> {
        self.apply(&mut process, ProcessEvent::BlockOnIo(request.device_name.clone()))?;
        self.trace.push(TraceEvent::IoSubmitted {
            time: self.current_time,
            pid: process.get_pid(),
            device: request.device_name.clone(),
            operation: request.operation,
            duration: request.duration,
        });
        self.io_manager.submit_request(request, process);
        Ok(())
    }

    fn terminate(&mut self, mut process: Process) -> SimResult<()> {
        self.apply(&mut process, ProcessEvent::Exit)?;
        process.pcb_mut().mark_completion(self.current_time);

        if let Some(block) = self.memory.free(process.pcb_mut()) {
            self.trace.push(TraceEvent::MemoryFreed {
                time: self.current_time,
                pid: process.get_pid(),
                block,
            });
        }

        info!(pid = process.get_pid(), time = self.current_time, "process terminated");
        self.completed.push(process);
        self.try_unblock_processes()
    }

    fn handle_io_completions(&mut self) -> SimResult<()> {
        for mut process in self.io_manager.get_completed_io() {
            if let ProcessState::Waiting(WaitReason::Io { device }) = process.pcb().get_state() {
                self.trace.push(TraceEvent::IoCompleted {
                    time: self.current_time,
                    pid: process.get_pid(),
                    device: device.clone(),
                });
            }
            self.apply(&mut process, ProcessEvent::Wake)?;
            self.scheduler.requeue(process);
        }
        Ok(())
    }

    /// Retries every process waiting for memory exactly once, in queue
    /// order. Failures go back to the tail in the same order.
    fn try_unblock_processes(&mut self) -> SimResult<()> {
        let waiters = self.waiting_for_memory.len();

        for _ in 0..waiters {
            let Some(mut process) = self.waiting_for_memory.pop_front() else {
                break;
            };

            if self.grant_memory(&mut process) {
                self.apply(&mut process, ProcessEvent::Wake)?;
                self.scheduler.requeue(process);
            } else {
                self.waiting_for_memory.push_back(process);
            }
        }
        Ok(())
    }
}
