use crate::io::IoRequest;
use crate::{Pid, Tick};

use super::ProcessControlBlock;

/// A unit of work: its control block plus the I/O it will issue, in order.
#[derive(Debug, Clone)]
pub struct Process {
    pcb: ProcessControlBlock,
    io_requests: Vec<IoRequest>,
    io_cursor: usize,
}

impl Process {
    pub fn new(pid: Pid, arrival_time: Tick, burst_time: Tick, memory_required: usize) -> Process {
        Process {
            pcb: ProcessControlBlock::new(pid, arrival_time, burst_time, memory_required),
            io_requests: Vec::new(),
            io_cursor: 0,
        }
    }

    pub fn pcb(&self) -> &ProcessControlBlock {
        &self.pcb
    }

    pub fn pcb_mut(&mut self) -> &mut ProcessControlBlock {
        &mut self.pcb
    }

    pub fn get_pid(&self) -> Pid {
        self.pcb.get_pid()
    }

    pub fn run_for(&mut self, time: Tick) {
        self.pcb.reduce_time(time);
    }

    /// Queues a request. It is rebound to this process's pid.
    pub fn add_io_request(&mut self, mut request: IoRequest) {
        request.pid = self.get_pid();
        self.io_requests.push(request);
    }

    /// Builder form of [`Process::add_io_request`].
    pub fn with_io_request(mut self, request: IoRequest) -> Process {
        self.add_io_request(request);
        self
    }

    pub fn has_io_request(&self) -> bool {
        self.io_cursor < self.io_requests.len()
    }

    /// Number of requests already issued.
    pub fn issued_io_requests(&self) -> usize {
        self.io_cursor
    }

    pub fn get_next_io_request(&mut self) -> Option<IoRequest> {
        let request = self.io_requests.get(self.io_cursor).cloned()?;
        self.io_cursor += 1;
        Some(request)
    }

    /// A process issues its first request once it has consumed half of its
    /// burst. Only the first request is ever triggered this way.
    pub fn should_request_io(&self) -> bool {
        self.has_io_request()
            && self.io_cursor == 0
            && self.pcb.get_consumed_time() >= self.pcb.get_burst_time() / 2
    }
}
