use candle_core::{DType, Device as CandleDevice};
use lmharness_abi::{Device, Error, Result};
use tracing::warn;

/// Open a candle device for `device`. Accelerators candle was not built for
/// (or cannot open) degrade to the CPU; the returned [`Device`] is the one
/// actually in use.
pub fn to_candle(device: Device) -> (Device, CandleDevice) {
    let opened = match device {
        Device::Cpu => return (Device::Cpu, CandleDevice::Cpu),
        Device::Cuda(i) => CandleDevice::new_cuda(i),
        Device::Metal(i) => CandleDevice::new_metal(i),
    };
    match opened {
        Ok(d) => (device, d),
        Err(e) => {
            warn!(%device, "cannot open device in candle ({e}), using cpu");
            (Device::Cpu, CandleDevice::Cpu)
        }
    }
}

/// Weight precision from the `dtype` option. Unset means `float32`.
pub fn parse_dtype(dtype: Option<&str>) -> Result<DType> {
    let Some(s) = dtype else {
        return Ok(DType::F32);
    };
    match s.trim().to_ascii_lowercase().as_str() {
        "float32" | "f32" | "torch.float32" | "auto" => Ok(DType::F32),
        "float16" | "f16" | "half" | "torch.float16" => Ok(DType::F16),
        "bfloat16" | "bf16" | "torch.bfloat16" => Ok(DType::BF16),
        other => Err(Error::config(format!("unsupported dtype {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_names() {
        assert_eq!(parse_dtype(None).unwrap(), DType::F32);
        assert_eq!(parse_dtype(Some("bfloat16")).unwrap(), DType::BF16);
        assert_eq!(parse_dtype(Some("Float16")).unwrap(), DType::F16);
        assert_eq!(parse_dtype(Some("torch.float32")).unwrap(), DType::F32);
        assert!(matches!(parse_dtype(Some("int4")), Err(Error::Config(_))));
    }

    #[test]
    fn cpu_maps_to_cpu() {
        let (dev, candle) = to_candle(Device::Cpu);
        assert_eq!(dev, Device::Cpu);
        assert!(candle.is_cpu());
    }
}
