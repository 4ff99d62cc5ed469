use lmharness_abi::Device;
use tracing::{info, warn};

use crate::detect::inventory;
use crate::types::DeviceInventory;

/// Resolve a requested device string against the detected hardware.
pub fn resolve_device(requested: &str) -> Device {
    resolve_with(requested, inventory())
}

/// Resolve `requested` against `inv`.
///
/// A parseable, available device is used as-is. Anything else (unknown name,
/// missing accelerator, out-of-range ordinal, empty string) falls back to the
/// best available accelerator, then the CPU. Never fails.
pub fn resolve_with(requested: &str, inv: &DeviceInventory) -> Device {
    match requested.parse::<Device>() {
        Ok(device) if inv.is_available(device) => {
            info!(%device, "using requested device");
            device
        }
        Ok(device) => {
            let fallback = inv.best();
            warn!(
                requested = %device,
                %fallback,
                "requested device is not available, falling back"
            );
            fallback
        }
        Err(e) => {
            let fallback = inv.best();
            if !requested.trim().is_empty() {
                warn!(requested, %fallback, "device not recognized ({e}), falling back");
            } else {
                info!(%fallback, "no device requested");
            }
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_devices_are_used() {
        let inv = DeviceInventory::cpu_only().with_cuda(2);
        assert_eq!(resolve_with("cpu", &inv), Device::Cpu);
        assert_eq!(resolve_with("cuda", &inv), Device::Cuda(0));
        assert_eq!(resolve_with("cuda:1", &inv), Device::Cuda(1));
    }

    #[test]
    fn unavailable_devices_fall_back_to_best_accelerator() {
        let inv = DeviceInventory::cpu_only().with_cuda(1);
        assert_eq!(resolve_with("cuda:5", &inv), Device::Cuda(0));
        assert_eq!(resolve_with("metal", &inv), Device::Cuda(0));
        assert_eq!(resolve_with("tpu", &inv), Device::Cuda(0));
        assert_eq!(resolve_with("", &inv), Device::Cuda(0));
    }

    #[test]
    fn cpu_only_machines_land_on_cpu() {
        let inv = DeviceInventory::cpu_only();
        assert_eq!(resolve_with("cuda", &inv), Device::Cpu);
        assert_eq!(resolve_with("cuda:0", &inv), Device::Cpu);
        assert_eq!(resolve_with("garbage", &inv), Device::Cpu);
    }

    #[test]
    fn metal_is_used_when_no_cuda() {
        let inv = DeviceInventory::cpu_only().with_metal(1);
        assert_eq!(resolve_with("cuda", &inv), Device::Metal(0));
        assert_eq!(resolve_with("mps", &inv), Device::Metal(0));
    }
}
