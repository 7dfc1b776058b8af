//! Container memory sampling and lifecycle management for one sandboxed
//! execution.

pub mod container;
pub mod monitor;
pub mod preflight;

pub use container::{ContainerGuard, unique_container_name};
pub use monitor::MemoryMonitor;
pub use preflight::docker_available;
