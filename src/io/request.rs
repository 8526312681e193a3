use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Pid, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoOperation {
    Read,
    Write,
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOperation::Read => write!(f, "read"),
            IoOperation::Write => write!(f, "write"),
        }
    }
}

/// A single request for a device, owned by the process that issues it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IoRequest {
    pub pid: Pid,
    pub device_name: String,
    pub duration: Tick,
    pub operation: IoOperation,
}

impl IoRequest {
    pub fn new(
        pid: Pid,
        device_name: impl Into<String>,
        duration: Tick,
        operation: IoOperation,
    ) -> IoRequest {
        IoRequest {
            pid,
            device_name: device_name.into(),
            duration,
            operation,
        }
    }
}
