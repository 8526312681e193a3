pub mod device;
pub mod disk;
pub mod manager;
pub mod request;

pub use device::IoDevice;
pub use disk::{Disk, DiskError, FileDescriptor};
pub use manager::{IoManager, DEFAULT_DEVICES};
pub use request::{IoOperation, IoRequest};
