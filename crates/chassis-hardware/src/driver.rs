//! Driver plug-in registry.
//!
//! Drivers are keyed by the node name used in the device-tree document. A
//! node named `gpio-expander` is handed to whichever driver was registered
//! under that key, so vendor-specific parts can be swapped by registering a
//! different driver before the platform is built.

use crate::bus::BusId;
use crate::platform::PlatformBuilder;
use crate::{HardwareError, Result};
use chassis_core::ConfigNode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A device or bus driver.
pub trait DeviceDriver: Send + Sync {
    /// Materialise `node` under `parent`.
    ///
    /// A bus driver allocates its bus and registers the node's children
    /// under it; a device driver attaches itself to `parent` and creates its
    /// resources.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationFatal`] for malformed nodes.
    fn register(
        &self,
        node: &ConfigNode,
        parent: Option<BusId>,
        builder: &mut PlatformBuilder,
    ) -> Result<()>;
}

/// Drivers keyed by device-tree node name.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DeviceDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::InvalidArgument`] if `key` is taken.
    pub fn register_driver(
        &mut self,
        key: impl Into<String>,
        driver: Arc<dyn DeviceDriver>,
    ) -> Result<()> {
        let key = key.into();
        if self.drivers.contains_key(&key) {
            return Err(HardwareError::invalid_argument(format!(
                "driver '{key}' already registered"
            )));
        }
        debug!(driver = %key, "registering driver");
        self.drivers.insert(key, driver);
        Ok(())
    }

    /// Remove the driver registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotFound`] if no driver has that key.
    pub fn deregister_driver(&mut self, key: &str) -> Result<Arc<dyn DeviceDriver>> {
        debug!(driver = key, "deregistering driver");
        self.drivers
            .remove(key)
            .ok_or_else(|| HardwareError::not_found(format!("driver '{key}'")))
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn DeviceDriver>> {
        self.drivers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.drivers.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl DeviceDriver for Noop {
        fn register(
            &self,
            _node: &ConfigNode,
            _parent: Option<BusId>,
            _builder: &mut PlatformBuilder,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = DriverRegistry::new();
        registry.register_driver("fan-vendor-a", Arc::new(Noop)).unwrap();

        assert!(registry.contains("fan-vendor-a"));
        assert!(registry.get("fan-vendor-a").is_some());
        assert!(registry.get("fan-vendor-b").is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = DriverRegistry::new();
        registry.register_driver("psu", Arc::new(Noop)).unwrap();
        let result = registry.register_driver("psu", Arc::new(Noop));
        assert!(matches!(result, Err(HardwareError::InvalidArgument { .. })));
    }

    #[test]
    fn test_deregister() {
        let mut registry = DriverRegistry::new();
        registry.register_driver("psu", Arc::new(Noop)).unwrap();
        registry.deregister_driver("psu").unwrap();

        assert!(registry.is_empty());
        assert!(matches!(
            registry.deregister_driver("psu"),
            Err(HardwareError::NotFound { .. })
        ));
    }

    #[test]
    fn test_keys_sorted() {
        let mut registry = DriverRegistry::new();
        registry.register_driver("b", Arc::new(Noop)).unwrap();
        registry.register_driver("a", Arc::new(Noop)).unwrap();
        assert_eq!(registry.keys(), vec!["a", "b"]);
    }
}
