use tracing::debug;

use super::IoRequest;
use crate::Tick;

/// A single-slot device. It holds at most one request and counts it down
/// one tick at a time.
#[derive(Debug)]
pub struct IoDevice {
    name: String,
    current_request: Option<IoRequest>,
    remaining_time: Tick,
}

impl IoDevice {
    pub fn new(name: impl Into<String>) -> IoDevice {
        IoDevice {
            name: name.into(),
            current_request: None,
            remaining_time: 0,
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn is_busy(&self) -> bool {
        self.current_request.is_some()
    }

    pub fn get_remaining_time(&self) -> Tick {
        self.remaining_time
    }

    pub fn current_request(&self) -> Option<&IoRequest> {
        self.current_request.as_ref()
    }

    /// Occupies the device with `request`. A busy device hands the request back.
    pub fn start_io(&mut self, request: IoRequest) -> Result<(), IoRequest> {
        if self.is_busy() {
            return Err(request);
        }

        debug!(
            device = %self.name,
            pid = request.pid,
            operation = %request.operation,
            duration = request.duration,
            "device started request"
        );

        self.remaining_time = request.duration;
        self.current_request = Some(request);
        Ok(())
    }

    /// Advances the device by one tick. Returns the request once its
    /// countdown reaches zero.
    pub fn tick(&mut self) -> Option<IoRequest> {
        if !self.is_busy() {
            return None;
        }

        self.remaining_time = self.remaining_time.saturating_sub(1);
        if self.remaining_time > 0 {
            return None;
        }

        let completed = self.current_request.take();
        if let Some(request) = &completed {
            debug!(device = %self.name, pid = request.pid, "device completed request");
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::IoOperation;

    fn request(pid: u32, duration: Tick) -> IoRequest {
        IoRequest::new(pid, "DISK", duration, IoOperation::Read)
    }

    #[test]
    fn test_device_idle_tick_is_noop() {
        let mut device = IoDevice::new("DISK");
        assert_eq!(device.tick(), None);
        assert!(!device.is_busy());
    }

    #[test]
    fn test_device_counts_down_then_completes() {
        let mut device = IoDevice::new("DISK");
        device.start_io(request(1, 3)).unwrap();
        assert!(device.is_busy());

        assert_eq!(device.tick(), None);
        assert_eq!(device.tick(), None);
        assert_eq!(device.get_remaining_time(), 1);

        let completed = device.tick().unwrap();
        assert_eq!(completed.pid, 1);
        assert!(!device.is_busy());
        assert_eq!(device.tick(), None);
    }

    #[test]
    fn test_device_zero_duration_completes_on_first_tick() {
        let mut device = IoDevice::new("DISK");
        device.start_io(request(2, 0)).unwrap();
        assert_eq!(device.tick().map(|r| r.pid), Some(2));
    }

    #[test]
    fn test_busy_device_rejects_request() {
        let mut device = IoDevice::new("DISK");
        device.start_io(request(1, 2)).unwrap();

        let rejected = device.start_io(request(2, 2)).unwrap_err();
        assert_eq!(rejected.pid, 2);
        assert_eq!(device.current_request().map(|r| r.pid), Some(1));
    }
}
