//! lmharness hardware probing.
//! Detects which accelerators exist, resolves requested device strings against
//! them, and sizes the native thread pool.

pub mod detect;
pub mod resolve;
pub mod threads;
pub mod types;

pub use detect::{detect_now, inventory};
pub use resolve::{resolve_device, resolve_with};
pub use threads::{threads_from, THREADS_ENV};
pub use types::{DeviceInventory, ProbeReasons};
