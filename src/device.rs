//! Compute device selection
//!
//! Device placement is an explicit configuration value rather than an
//! implicit runtime probe, so tests can pin the device and training runs can
//! be reproduced.

/// Compute device a batch or model lives on.
///
/// Only the CPU backend is compiled into this crate; accelerator backends
/// would extend this enum, which is why it is non-exhaustive.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Device {
    /// General-purpose processor
    #[default]
    Cpu,
}

impl Device {
    /// The fastest compute unit available to this build.
    ///
    /// With no accelerator backend compiled in, this is always [`Device::Cpu`].
    pub fn fastest() -> Self {
        Device::Cpu
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastest_is_cpu_without_accelerator() {
        assert_eq!(Device::fastest(), Device::Cpu);
    }

    #[test]
    fn test_default_matches_fastest() {
        assert_eq!(Device::default(), Device::fastest());
    }
}
