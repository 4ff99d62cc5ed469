use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A concrete compute device an adapter runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl Device {
    pub fn is_accelerator(self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(i) => write!(f, "cuda:{i}"),
            Device::Metal(i) => write!(f, "metal:{i}"),
        }
    }
}

/// Parses `cpu`, `cuda`, `cuda:N`, `metal`, `metal:N` (and `mps` as an alias
/// for `metal:0`). A bare accelerator name means ordinal 0.
impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, ordinal) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("invalid device ordinal in {s:?}")))?;
                (kind.to_string(), Some(idx))
            }
            None => (s.clone(), None),
        };

        match (kind.as_str(), ordinal) {
            ("cpu", None) => Ok(Device::Cpu),
            ("cuda", idx) => Ok(Device::Cuda(idx.unwrap_or(0))),
            ("metal", idx) => Ok(Device::Metal(idx.unwrap_or(0))),
            ("mps", None) => Ok(Device::Metal(0)),
            _ => Err(Error::config(format!("unrecognized device {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_forms() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("CUDA:3".parse::<Device>().unwrap(), Device::Cuda(3));
        assert_eq!("mps".parse::<Device>().unwrap(), Device::Metal(0));
        assert_eq!("metal:1".parse::<Device>().unwrap(), Device::Metal(1));
    }

    #[test]
    fn rejects_garbage() {
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
        assert!("cpu:0".parse::<Device>().is_err());
        assert!("".parse::<Device>().is_err());
    }

    #[test]
    fn only_gpus_are_accelerators() {
        assert!(!Device::Cpu.is_accelerator());
        assert!(Device::Cuda(0).is_accelerator());
        assert!(Device::Metal(1).is_accelerator());
    }

    #[test]
    fn display_round_trips() {
        for d in [Device::Cpu, Device::Cuda(2), Device::Metal(0)] {
            assert_eq!(d.to_string().parse::<Device>().unwrap(), d);
        }
    }
}
