//! Configuration-related type-safe wrappers using NonZero types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::{NonZeroU16, NonZeroUsize};

use super::ValidationError;
use crate::constants::{builder, pool};

/// A validated network port number that cannot be zero
///
/// Port 0 is reserved and cannot be used for actual network communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(NonZeroU16);

impl Port {
    /// Create a new Port from a u16, returning None if port is 0
    #[must_use]
    pub const fn new(port: u16) -> Option<Self> {
        match NonZeroU16::new(port) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Get the port number as u16
    #[must_use]
    #[inline]
    pub const fn get(&self) -> u16 {
        self.0.get()
    }

    /// Default key-value service port (11210)
    /// Safety: 11210 is a non-zero, valid u16 value
    pub const KEY_VALUE: Self = Self(NonZeroU16::new(11210).unwrap());
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl TryFrom<u16> for Port {
    type Error = ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ValidationError::InvalidPort)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.get()
    }
}

impl Serialize for Port {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u16(self.get())
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        Self::new(port).ok_or_else(|| serde::de::Error::custom("port cannot be 0"))
    }
}

/// A non-zero minimum pool size
///
/// Every node pool keeps at least this many live connections once warmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinConnections(NonZeroUsize);

impl MinConnections {
    /// Create a new MinConnections, returning None if value is 0
    #[must_use]
    pub const fn new(value: usize) -> Option<Self> {
        match NonZeroUsize::new(value) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Get the value as usize
    #[must_use]
    #[inline]
    pub const fn get(&self) -> usize {
        self.0.get()
    }

    /// Default minimum connections per node pool
    pub const DEFAULT: Self = Self(NonZeroUsize::new(pool::DEFAULT_MIN_CONNECTIONS).unwrap());
}

impl fmt::Display for MinConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl Serialize for MinConnections {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.get() as u64)
    }
}

impl<'de> Deserialize<'de> for MinConnections {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = usize::deserialize(deserializer)?;
        Self::new(value)
            .ok_or_else(|| serde::de::Error::custom("num_kv_connections cannot be 0"))
    }
}

/// A non-zero maximum pool size
///
/// Ensures connection pools always allow at least 1 connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaxConnections(NonZeroUsize);

impl MaxConnections {
    /// Create a new MaxConnections, returning None if value is 0
    #[must_use]
    pub const fn new(value: usize) -> Option<Self> {
        match NonZeroUsize::new(value) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Get the value as usize
    #[must_use]
    #[inline]
    pub const fn get(&self) -> usize {
        self.0.get()
    }

    /// Default maximum connections per node pool
    pub const DEFAULT: Self = Self(NonZeroUsize::new(pool::DEFAULT_MAX_CONNECTIONS).unwrap());
}

impl fmt::Display for MaxConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl From<MaxConnections> for usize {
    fn from(max: MaxConnections) -> Self {
        max.get()
    }
}

impl Serialize for MaxConnections {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.get() as u64)
    }
}

impl<'de> Deserialize<'de> for MaxConnections {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = usize::deserialize(deserializer)?;
        Self::new(value)
            .ok_or_else(|| serde::de::Error::custom("max_kv_connections cannot be 0"))
    }
}

/// A non-zero capacity cap for retained operation builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuilderCapacity(NonZeroUsize);

impl BuilderCapacity {
    /// Create a new BuilderCapacity, returning None if value is 0
    #[must_use]
    pub const fn new(value: usize) -> Option<Self> {
        match NonZeroUsize::new(value) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Get the value as usize
    #[must_use]
    #[inline]
    pub const fn get(&self) -> usize {
        self.0.get()
    }

    /// Default capacity cap (1 MiB)
    pub const DEFAULT: Self = Self(NonZeroUsize::new(builder::MAX_CAPACITY).unwrap());
}

impl fmt::Display for BuilderCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl Serialize for BuilderCapacity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.get() as u64)
    }
}

impl<'de> Deserialize<'de> for BuilderCapacity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = usize::deserialize(deserializer)?;
        Self::new(value).ok_or_else(|| serde::de::Error::custom("max_capacity cannot be 0"))
    }
}

/// Maximum number of operation builders retained for reuse
///
/// Deserializing the value `0` selects the CPU-derived default
/// (4 x logical CPUs), so a config file can opt into the computed
/// default explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RetainedBuilders(NonZeroUsize);

impl RetainedBuilders {
    /// Create a new RetainedBuilders, returning None if value is 0
    #[must_use]
    pub const fn new(value: usize) -> Option<Self> {
        match NonZeroUsize::new(value) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Get the value as usize
    #[must_use]
    #[inline]
    pub const fn get(&self) -> usize {
        self.0.get()
    }

    /// The CPU-derived default: 4 x logical CPUs
    #[must_use]
    pub fn from_cpus() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        // cpus >= 1 so the product is non-zero
        Self(NonZeroUsize::new(cpus * builder::RETAINED_PER_CPU).unwrap())
    }
}

impl fmt::Display for RetainedBuilders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl Serialize for RetainedBuilders {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.get() as u64)
    }
}

impl<'de> Deserialize<'de> for RetainedBuilders {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = usize::deserialize(deserializer)?;
        match Self::new(value) {
            Some(v) => Ok(v),
            None => Ok(Self::from_cpus()),
        }
    }
}

/// Helper for serializing Duration as whole seconds
pub mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Helper for serializing Duration as milliseconds
///
/// Used for sub-second budgets like the key-value operation timeout.
pub mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper for deserializing Option<Duration> from seconds
pub mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_port_valid() {
        let port = Port::new(11210).unwrap();
        assert_eq!(port.get(), 11210);
    }

    #[test]
    fn test_port_zero_rejected() {
        assert!(Port::new(0).is_none());
    }

    #[test]
    fn test_port_key_value_constant() {
        assert_eq!(Port::KEY_VALUE.get(), 11210);
    }

    #[test]
    fn test_port_try_from() {
        assert!(Port::try_from(8091u16).is_ok());
        assert!(matches!(
            Port::try_from(0u16),
            Err(ValidationError::InvalidPort)
        ));
    }

    #[test]
    fn test_port_serde_zero_rejected() {
        let result: Result<Port, _> = serde_json::from_str("0");
        assert!(result.is_err());

        let port: Port = serde_json::from_str("11210").unwrap();
        assert_eq!(port.get(), 11210);
    }

    #[test]
    fn test_min_connections_default() {
        assert_eq!(MinConnections::DEFAULT.get(), 2);
    }

    #[test]
    fn test_min_connections_zero_rejected() {
        assert!(MinConnections::new(0).is_none());
        let result: Result<MinConnections, _> = serde_json::from_str("0");
        assert!(result.is_err());
    }

    #[test]
    fn test_max_connections_default() {
        assert_eq!(MaxConnections::DEFAULT.get(), 5);
    }

    #[test]
    fn test_max_connections_zero_rejected() {
        assert!(MaxConnections::new(0).is_none());
    }

    #[test]
    fn test_min_max_ordering() {
        let min = MinConnections::new(2).unwrap();
        let max = MaxConnections::new(5).unwrap();
        assert!(min.get() <= max.get());
    }

    #[test]
    fn test_builder_capacity_default() {
        assert_eq!(BuilderCapacity::DEFAULT.get(), 1024 * 1024);
    }

    #[test]
    fn test_retained_builders_from_cpus() {
        let retained = RetainedBuilders::from_cpus();
        assert!(retained.get() >= builder::RETAINED_PER_CPU);
        assert_eq!(retained.get() % builder::RETAINED_PER_CPU, 0);
    }

    #[test]
    fn test_retained_builders_zero_selects_cpu_default() {
        let retained: RetainedBuilders = serde_json::from_str("0").unwrap();
        assert_eq!(retained, RetainedBuilders::from_cpus());

        let retained: RetainedBuilders = serde_json::from_str("16").unwrap();
        assert_eq!(retained.get(), 16);
    }

    #[test]
    fn test_duration_serde_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Config {
            #[serde(with = "duration_serde")]
            timeout: Duration,
        }

        let config = Config {
            timeout: Duration::from_secs(30),
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("30"));

        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_duration_ms_serde_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Config {
            #[serde(with = "duration_ms_serde")]
            timeout: Duration,
        }

        let config = Config {
            timeout: Duration::from_millis(2500),
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("2500"));

        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_option_duration_serde() {
        #[derive(Serialize, Deserialize)]
        struct Config {
            #[serde(with = "option_duration_serde")]
            keepalive: Option<Duration>,
        }

        let config = Config {
            keepalive: Some(Duration::from_secs(60)),
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.keepalive, Some(Duration::from_secs(60)));

        let config = Config { keepalive: None };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.keepalive, None);
    }
}
