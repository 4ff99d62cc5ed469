//! One-shot accelerator probe. Every probe that can block runs on a helper
//! thread with a deadline, so a wedged driver only costs the timeout.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::types::{DeviceInventory, ProbeReasons};

#[cfg(target_os = "macos")]
mod apple;

const TIMEOUT_ENV: &str = "LMHARNESS_HWPROF_TIMEOUT_MS";
const DISABLE_ENV_PREFIX: &str = "LMHARNESS_HWPROF_DISABLE_";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
const MIN_TIMEOUT_MS: u64 = 200;

static INVENTORY: Lazy<DeviceInventory> = Lazy::new(detect_now);

/// Process-wide inventory, probed once on first use.
pub fn inventory() -> &'static DeviceInventory {
    &INVENTORY
}

/// Probe the machine now. Probe failures are reported as "not available".
pub fn detect_now() -> DeviceInventory {
    let mut reasons = ProbeReasons::default();
    let (cuda_devices, cuda_driver) = probe_cuda(probe_timeout(), &mut reasons);
    let metal_devices = probe_metal(&mut reasons);

    let inv = DeviceInventory {
        cuda_devices,
        metal_devices,
        cuda_driver,
        reasons,
    };
    debug!(
        cuda = inv.cuda_devices,
        cuda_driver = inv.cuda_driver.as_deref().unwrap_or("none"),
        cuda_reason = inv.reasons.cuda.as_deref().unwrap_or("-"),
        metal = inv.metal_devices,
        metal_reason = inv.reasons.metal.as_deref().unwrap_or("-"),
        "hardware probe complete"
    );
    inv
}

/// `LMHARNESS_HWPROF_TIMEOUT_MS`, ignored below 200ms.
fn probe_timeout() -> Duration {
    std::env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&ms| ms >= MIN_TIMEOUT_MS)
        .map_or(DEFAULT_TIMEOUT, Duration::from_millis)
}

/// `LMHARNESS_HWPROF_DISABLE_<FAMILY>=1` hides an accelerator family.
#[cfg_attr(
    not(any(target_os = "linux", target_os = "windows", target_os = "macos")),
    allow(dead_code)
)]
fn family_disabled(family: &str) -> bool {
    let key = format!("{DISABLE_ENV_PREFIX}{}", family.to_ascii_uppercase());
    std::env::var(key).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg_attr(
    not(any(target_os = "linux", target_os = "windows")),
    allow(dead_code)
)]
enum Bounded<T> {
    Done(T),
    TimedOut,
}

/// Run `f` on a helper thread and wait at most `deadline` for it. A probe
/// that times out is left running detached.
#[cfg_attr(
    not(any(target_os = "linux", target_os = "windows")),
    allow(dead_code)
)]
fn run_bounded<T, F>(deadline: Duration, f: F) -> (Bounded<T>, Duration)
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let started = Instant::now();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    let outcome = match rx.recv_timeout(deadline) {
        Ok(value) => Bounded::Done(value),
        Err(_) => Bounded::TimedOut,
    };
    (outcome, started.elapsed())
}

/// Driver API version (`major * 1000 + minor * 10`) as `major.minor`.
#[cfg_attr(
    not(any(target_os = "linux", target_os = "windows")),
    allow(dead_code)
)]
fn driver_version(encoded: i32) -> Option<String> {
    (encoded > 0).then(|| format!("{}.{}", encoded / 1000, (encoded % 1000) / 10))
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
mod cuda_driver {
    use anyhow::{bail, ensure, Context, Result};
    use libloading::{Library, Symbol};

    #[cfg(target_os = "linux")]
    const LIBRARIES: &[&str] = &["libcuda.so.1", "libcuda.so"];
    #[cfg(target_os = "windows")]
    const LIBRARIES: &[&str] = &["nvcuda.dll"];

    type CuInit = unsafe extern "C" fn(flags: u32) -> i32;
    type CuCount = unsafe extern "C" fn(count: *mut i32) -> i32;

    pub struct DriverInfo {
        pub devices: usize,
        pub version: i32,
    }

    fn open() -> Result<Library> {
        let mut last = None;
        for name in LIBRARIES {
            // SAFETY: loading the vendor driver only runs its own initialisers.
            match unsafe { Library::new(name) } {
                Ok(lib) => return Ok(lib),
                Err(e) => last = Some(e),
            }
        }
        match last {
            Some(e) => Err(e).context("no loadable CUDA driver"),
            None => bail!("no CUDA driver library for this platform"),
        }
    }

    /// Initialise the driver API and count its devices.
    pub fn query() -> Result<DriverInfo> {
        let lib = open()?;
        // SAFETY: the symbol types match the driver API declarations, and
        // `lib` outlives every symbol borrowed from it.
        unsafe {
            let init: Symbol<CuInit> = lib.get(b"cuInit\0").context("cuInit")?;
            let device_count: Symbol<CuCount> =
                lib.get(b"cuDeviceGetCount\0").context("cuDeviceGetCount")?;
            let driver_version: Symbol<CuCount> =
                lib.get(b"cuDriverGetVersion\0").context("cuDriverGetVersion")?;

            let rc = init(0);
            ensure!(rc == 0, "cuInit returned {rc}");
            let mut devices = 0i32;
            let rc = device_count(&mut devices);
            ensure!(rc == 0, "cuDeviceGetCount returned {rc}");
            let mut version = 0i32;
            if driver_version(&mut version) != 0 {
                version = 0;
            }
            Ok(DriverInfo {
                devices: devices.max(0) as usize,
                version,
            })
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
fn probe_cuda(deadline: Duration, reasons: &mut ProbeReasons) -> (usize, Option<String>) {
    if family_disabled("cuda") {
        reasons.cuda = Some("disabled_env".into());
        return (0, None);
    }

    let (outcome, elapsed) = run_bounded(deadline, cuda_driver::query);
    debug!(elapsed_ms = elapsed.as_millis() as u64, "cuda probe");
    match outcome {
        Bounded::Done(Ok(info)) => {
            if info.devices == 0 {
                reasons.cuda = Some("no_devices".into());
            }
            (info.devices, driver_version(info.version))
        }
        Bounded::Done(Err(e)) => {
            reasons.cuda = Some(format!("probe_error:{e:#}"));
            (0, None)
        }
        Bounded::TimedOut => {
            reasons.cuda = Some("timeout".into());
            (0, None)
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn probe_cuda(_deadline: Duration, reasons: &mut ProbeReasons) -> (usize, Option<String>) {
    reasons.cuda = Some("unsupported_os".into());
    (0, None)
}

#[cfg(target_os = "macos")]
fn probe_metal(reasons: &mut ProbeReasons) -> usize {
    if family_disabled("metal") {
        reasons.metal = Some("disabled_env".into());
        return 0;
    }
    let n = apple::device_count();
    if n == 0 {
        reasons.metal = Some("no_device".into());
    }
    n
}

#[cfg(not(target_os = "macos"))]
fn probe_metal(reasons: &mut ProbeReasons) -> usize {
    reasons.metal = Some("unsupported_os".into());
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_versions_are_formatted() {
        assert_eq!(driver_version(12040).as_deref(), Some("12.4"));
        assert_eq!(driver_version(11080).as_deref(), Some("11.8"));
        assert_eq!(driver_version(0), None);
    }

    #[test]
    fn slow_probes_time_out() {
        let (outcome, elapsed) = run_bounded(Duration::from_millis(10), || {
            thread::sleep(Duration::from_millis(500));
            1
        });
        assert!(matches!(outcome, Bounded::TimedOut));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn fast_probes_return_their_value() {
        let (outcome, _) = run_bounded(Duration::from_secs(5), || 7);
        assert!(matches!(outcome, Bounded::Done(7)));
    }

    #[test]
    fn every_family_has_a_reason_or_devices() {
        let inv = detect_now();
        assert!(inv.cuda_devices > 0 || inv.reasons.cuda.is_some());
        assert!(inv.metal_devices > 0 || inv.reasons.metal.is_some());
    }
}
