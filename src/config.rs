//! Simulation configuration.
//!
//! A run is described by a TOML document: the scheduling policy, the size
//! of the address space, the device set, a tick limit and the processes to
//! feed in. Every section is optional and falls back to its default.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::SimulationError;
use crate::io::{IoManager, IoOperation, IoRequest, DEFAULT_DEVICES};
use crate::kernel::{
    scheduler_for, Dispatcher, MemoryManager, Process, Scheduler, SchedulingPolicy,
};
use crate::{Pid, Tick};

pub const DEFAULT_MEMORY_SIZE: usize = 200;
pub const DEFAULT_MAX_TICKS: Tick = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("pid {0} is declared more than once")]
    DuplicatePid(Pid),

    #[error("device {0} is declared more than once")]
    DuplicateDevice(String),

    #[error("pid {pid} requests I/O on unknown device {device}")]
    UnknownDevice { pid: Pid, device: String },

    #[error("pid {pid} requires {required} units of memory, available range is 1..={total}")]
    InvalidMemoryRequirement { pid: Pid, required: usize, total: usize },

    #[error("workload needs {total} ticks, more than the clock can count")]
    WorkloadTooLong { total: u64 },

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub scheduler: SchedulingPolicy,
    pub memory: MemoryConfig,
    pub io: IoConfig,
    pub limits: LimitsConfig,
    pub processes: Vec<ProcessConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    pub total_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            total_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IoConfig {
    pub devices: Vec<String>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            devices: DEFAULT_DEVICES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// `None` lets a run go on until it drains.
    pub max_ticks: Option<Tick>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ticks: Some(DEFAULT_MAX_TICKS),
        }
    }
}

/// One inbound unit of work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    pub pid: Pid,
    #[serde(default)]
    pub arrival_time: Tick,
    pub burst_time: Tick,
    pub memory_required: usize,
    /// Requests in issue order.
    #[serde(default)]
    pub io: Vec<IoRequestConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoRequestConfig {
    pub device: String,
    pub duration: Tick,
    pub operation: IoOperation,
}

impl ProcessConfig {
    pub fn to_process(&self) -> Process {
        let mut process = Process::new(
            self.pid,
            self.arrival_time,
            self.burst_time,
            self.memory_required,
        );
        for request in &self.io {
            process.add_io_request(IoRequest::new(
                self.pid,
                request.device.clone(),
                request.duration,
                request.operation,
            ));
        }
        process
    }
}

impl SimulationConfig {
    pub fn from_toml_str(source: &str) -> Result<SimulationConfig, ConfigError> {
        let config: SimulationConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<SimulationConfig, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        SimulationConfig::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut devices = HashSet::new();
        for device in &self.io.devices {
            if !devices.insert(device.as_str()) {
                return Err(ConfigError::DuplicateDevice(device.clone()));
            }
        }

        let mut pids = HashSet::new();
        for process in &self.processes {
            if !pids.insert(process.pid) {
                return Err(ConfigError::DuplicatePid(process.pid));
            }

            let total = self.memory.total_size;
            if process.memory_required == 0 || process.memory_required > total {
                return Err(ConfigError::InvalidMemoryRequirement {
                    pid: process.pid,
                    required: process.memory_required,
                    total,
                });
            }

            let unknown = process
                .io
                .iter()
                .find(|r| !devices.contains(r.device.as_str()));
            if let Some(request) = unknown {
                return Err(ConfigError::UnknownDevice {
                    pid: process.pid,
                    device: request.device.clone(),
                });
            }
        }

        // Upper bound on the final clock: every burst and every I/O wait back to back.
        let total: u64 = self
            .processes
            .iter()
            .flat_map(|p| {
                std::iter::once(p.burst_time).chain(p.io.iter().map(|r| r.duration))
            })
            .map(u64::from)
            .sum();
        if total > u64::from(Tick::MAX) {
            return Err(ConfigError::WorkloadTooLong { total });
        }

        Ok(())
    }

    /// Builds a dispatcher with every configured process admitted in order.
    pub fn build(&self) -> Result<Dispatcher<Box<dyn Scheduler>>, ConfigError> {
        self.validate()?;

        let mut dispatcher = Dispatcher::new(
            scheduler_for(self.scheduler),
            MemoryManager::new(self.memory.total_size),
            IoManager::new(self.io.devices.iter().cloned()),
        );
        if let Some(limit) = self.limits.max_ticks {
            dispatcher = dispatcher.with_tick_limit(limit);
        }

        for process in &self.processes {
            dispatcher.admit(process.to_process())?;
        }

        info!(
            policy = ?self.scheduler,
            memory = self.memory.total_size,
            processes = self.processes.len(),
            "simulation configured"
        );
        Ok(dispatcher)
    }
}
