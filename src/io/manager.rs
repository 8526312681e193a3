use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use super::{IoDevice, IoRequest};
use crate::kernel::Process;
use crate::Pid;

/// Devices registered when none are named explicitly.
pub const DEFAULT_DEVICES: [&str; 3] = ["DISK", "PRINTER", "NETWORK"];

/// Owns the device registry, the requests waiting for a free device and the
/// processes blocked on I/O.
#[derive(Debug)]
pub struct IoManager {
    devices: BTreeMap<String, IoDevice>,
    pending_requests: VecDeque<IoRequest>,
    waiting_processes: HashMap<Pid, Process>,
    completed: Vec<Process>,
}

impl IoManager {
    pub fn new<I, S>(device_names: I) -> IoManager
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let devices = device_names
            .into_iter()
            .map(|name| {
                let name = name.into();
                (name.clone(), IoDevice::new(name))
            })
            .collect();

        IoManager {
            devices,
            pending_requests: VecDeque::new(),
            waiting_processes: HashMap::new(),
            completed: Vec::new(),
        }
    }

    pub fn has_device(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    pub fn device(&self, name: &str) -> Option<&IoDevice> {
        self.devices.get(name)
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Queues `request` and parks `process` until the request completes.
    /// The process is filed under the request's pid, which is what the
    /// completing device reports back.
    pub fn submit_request(&mut self, request: IoRequest, process: Process) {
        debug!(
            pid = request.pid,
            device = %request.device_name,
            operation = %request.operation,
            "I/O request submitted"
        );

        self.waiting_processes.insert(request.pid, process);
        self.pending_requests.push_back(request);
    }

    /// Ticks every device, collects the processes whose request finished,
    /// then starts pending requests on idle devices in FIFO order.
    pub fn process_io(&mut self) {
        for device in self.devices.values_mut() {
            if let Some(completed) = device.tick() {
                if let Some(process) = self.waiting_processes.remove(&completed.pid) {
                    self.completed.push(process);
                }
            }
        }

        let mut still_pending = VecDeque::with_capacity(self.pending_requests.len());
        while let Some(request) = self.pending_requests.pop_front() {
            let outcome = match self.devices.get_mut(&request.device_name) {
                Some(device) => device.start_io(request),
                None => Err(request),
            };

            if let Err(request) = outcome {
                still_pending.push_back(request);
            }
        }
        self.pending_requests = still_pending;
    }

    /// Drains the processes whose I/O finished since the last call.
    pub fn get_completed_io(&mut self) -> Vec<Process> {
        std::mem::take(&mut self.completed)
    }

    pub fn has_pending_io(&self) -> bool {
        self.devices.values().any(IoDevice::is_busy)
            || !self.pending_requests.is_empty()
            || !self.waiting_processes.is_empty()
    }

    pub fn pending_requests(&self) -> impl Iterator<Item = &IoRequest> {
        self.pending_requests.iter()
    }

    pub fn is_waiting(&self, pid: Pid) -> bool {
        self.waiting_processes.contains_key(&pid)
    }
}

impl Default for IoManager {
    fn default() -> Self {
        IoManager::new(DEFAULT_DEVICES)
    }
}
