use serde::Serialize;

use super::{MemoryBlock, Process, ProcessState, Transition};
use crate::io::IoOperation;
use crate::{Pid, Tick};

/// One entry of the ordered run trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Transition {
        time: Tick,
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
    },
    /// A slice of CPU time; `time` is the instant the slice started.
    Ran {
        time: Tick,
        pid: Pid,
        duration: Tick,
        remaining: Tick,
    },
    MemoryAllocated {
        time: Tick,
        pid: Pid,
        block: MemoryBlock,
    },
    MemoryFreed {
        time: Tick,
        pid: Pid,
        block: MemoryBlock,
    },
    IoSubmitted {
        time: Tick,
        pid: Pid,
        device: String,
        operation: IoOperation,
        duration: Tick,
    },
    IoCompleted {
        time: Tick,
        pid: Pid,
        device: String,
    },
}

impl TraceEvent {
    pub fn transition(time: Tick, transition: Transition) -> TraceEvent {
        TraceEvent::Transition {
            time,
            pid: transition.pid,
            from: transition.from,
            to: transition.to,
        }
    }

    pub fn pid(&self) -> Pid {
        match self {
            TraceEvent::Transition { pid, .. }
            | TraceEvent::Ran { pid, .. }
            | TraceEvent::MemoryAllocated { pid, .. }
            | TraceEvent::MemoryFreed { pid, .. }
            | TraceEvent::IoSubmitted { pid, .. }
            | TraceEvent::IoCompleted { pid, .. } => *pid,
        }
    }
}

/// Final figures for one terminated process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessMetrics {
    pub pid: Pid,
    pub arrival_time: Tick,
    pub burst_time: Tick,
    pub completion_time: Tick,
    pub turnaround: i64,
    pub waiting: i64,
    pub response: i64,
}

impl ProcessMetrics {
    /// `None` until the process has both run and completed.
    pub fn from_process(process: &Process) -> Option<ProcessMetrics> {
        let pcb = process.pcb();
        Some(ProcessMetrics {
            pid: pcb.get_pid(),
            arrival_time: pcb.get_arrival_time(),
            burst_time: pcb.get_burst_time(),
            completion_time: pcb.get_completion_time()?,
            turnaround: pcb.get_turnaround_time()?,
            waiting: pcb.get_waiting_time()?,
            response: pcb.get_response_time()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub turnaround: f64,
    pub waiting: f64,
    pub response: f64,
}

impl AverageMetrics {
    pub fn from_metrics(metrics: &[ProcessMetrics]) -> Option<AverageMetrics> {
        if metrics.is_empty() {
            return None;
        }

        let count = metrics.len() as f64;
        let mean = |value: fn(&ProcessMetrics) -> i64| {
            metrics.iter().map(value).sum::<i64>() as f64 / count
        };

        Some(AverageMetrics {
            turnaround: mean(|m| m.turnaround),
            waiting: mean(|m| m.waiting),
            response: mean(|m| m.response),
        })
    }
}

/// Everything a run produced, for the reporting layer to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub trace: Vec<TraceEvent>,
    /// In completion order.
    pub completed: Vec<ProcessMetrics>,
    pub averages: Option<AverageMetrics>,
    pub total_time: Tick,
    pub idle_ticks: Tick,
}

impl SimulationReport {
    pub fn metrics_for(&self, pid: Pid) -> Option<&ProcessMetrics> {
        self.completed.iter().find(|metrics| metrics.pid == pid)
    }

    /// Share of the run during which a process held the CPU.
    pub fn cpu_utilization(&self) -> f64 {
        if self.total_time == 0 {
            return 0.0;
        }
        f64::from(self.total_time - self.idle_ticks) / f64::from(self.total_time)
    }

    /// `(pid, duration, remaining)` for every CPU slice, in dispatch order.
    pub fn slices(&self) -> Vec<(Pid, Tick, Tick)> {
        self.trace
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Ran {
                    pid,
                    duration,
                    remaining,
                    ..
                } => Some((*pid, *duration, *remaining)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pid: Pid, turnaround: i64, waiting: i64, response: i64) -> ProcessMetrics {
        ProcessMetrics {
            pid,
            arrival_time: 0,
            burst_time: 1,
            completion_time: 1,
            turnaround,
            waiting,
            response,
        }
    }

    #[test]
    fn test_averages_of_nothing() {
        assert_eq!(AverageMetrics::from_metrics(&[]), None);
    }

    #[test]
    fn test_averages() {
        let averages = AverageMetrics::from_metrics(&[
            metrics(1, 10, 0, 0),
            metrics(2, 12, 8, 8),
            metrics(3, 17, 11, 10),
        ])
        .unwrap();
        assert_eq!(averages.turnaround, 13.0);
        assert_eq!(averages.waiting, 19.0 / 3.0);
        assert_eq!(averages.response, 6.0);
    }

    #[test]
    fn test_metrics_require_completion() {
        let mut process = Process::new(1, 0, 4, 10);
        assert_eq!(ProcessMetrics::from_process(&process), None);

        process.pcb_mut().mark_first_run(2);
        process.pcb_mut().mark_completion(8);
        let metrics = ProcessMetrics::from_process(&process).unwrap();
        assert_eq!(metrics.turnaround, 8);
        assert_eq!(metrics.waiting, 4);
        assert_eq!(metrics.response, 2);
    }

    #[test]
    fn test_cpu_utilization() {
        let report = SimulationReport {
            trace: Vec::new(),
            completed: Vec::new(),
            averages: None,
            total_time: 8,
            idle_ticks: 2,
        };
        assert_eq!(report.cpu_utilization(), 0.75);
    }
}
