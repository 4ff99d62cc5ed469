use lmharness_abi::Device;
use serde::{Deserialize, Serialize};

/// Accelerators visible to this process. The CPU is always available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInventory {
    pub cuda_devices: usize,
    pub metal_devices: usize,

    #[serde(default)]
    pub cuda_driver: Option<String>,

    /// Why an accelerator family is reported empty (timeout/no_device/disabled_env).
    #[serde(default)]
    pub reasons: ProbeReasons,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReasons {
    #[serde(default)]
    pub cuda: Option<String>,
    #[serde(default)]
    pub metal: Option<String>,
}

impl DeviceInventory {
    /// Inventory of a machine with no accelerators.
    pub fn cpu_only() -> Self {
        Self::default()
    }

    pub fn with_cuda(mut self, n: usize) -> Self {
        self.cuda_devices = n;
        self
    }

    pub fn with_metal(mut self, n: usize) -> Self {
        self.metal_devices = n;
        self
    }

    pub fn is_available(&self, device: Device) -> bool {
        match device {
            Device::Cpu => true,
            Device::Cuda(i) => i < self.cuda_devices,
            Device::Metal(i) => i < self.metal_devices,
        }
    }

    /// First CUDA device, else first Metal device.
    pub fn best_accelerator(&self) -> Option<Device> {
        if self.cuda_devices > 0 {
            Some(Device::Cuda(0))
        } else if self.metal_devices > 0 {
            Some(Device::Metal(0))
        } else {
            None
        }
    }

    /// Best available device overall.
    pub fn best(&self) -> Device {
        self.best_accelerator().unwrap_or(Device::Cpu)
    }
}
