//! Capability traits implemented by resource drivers.
//!
//! Each resource type has one trait describing its operations. A driver
//! implements the trait matching the resource it creates and overrides the
//! operations its hardware supports; everything else reports
//! [`HardwareError::NotSupported`].
//!
//! [`CapabilityTable`] carries the driver behind a resource. Its variant is
//! fixed at creation and always matches the resource's declared
//! [`ResourceType`].
//!
//! # Examples
//!
//! ```
//! use chassis_hardware::capability::{CapabilityTable, LedControl, ResourceDriver};
//! use chassis_hardware::Result;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! #[derive(Default)]
//! struct StatusLed(AtomicBool);
//!
//! impl ResourceDriver for StatusLed {}
//!
//! impl LedControl for StatusLed {
//!     fn led_on(&self) -> Result<()> {
//!         self.0.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let table = CapabilityTable::Led(Arc::new(StatusLed::default()));
//! assert_eq!(table.resource_type(), chassis_core::ResourceType::Led);
//! ```

use crate::{HardwareError, Result};
use chassis_core::{EntityInfo, ResourceType, Threshold};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Operations common to every resource driver.
pub trait ResourceDriver: Send + Sync {
    /// Initialise the resource.
    ///
    /// `seed` is a type-specific start value; fans receive the owning
    /// entity's maximum speed, other types receive zero.
    fn init(&self, _seed: u32) -> Result<()> {
        Ok(())
    }
}

/// Temperature sensor.
pub trait TemperatureSensor: ResourceDriver {
    /// Current temperature in degrees Celsius.
    fn temperature_get(&self) -> Result<i32> {
        Err(HardwareError::not_supported("temperature_get"))
    }

    fn threshold_get(&self, _threshold: Threshold) -> Result<i32> {
        Err(HardwareError::not_supported("threshold_get"))
    }

    fn threshold_set(&self, _threshold: Threshold, _value: i32) -> Result<()> {
        Err(HardwareError::not_supported("threshold_set"))
    }

    /// Alert status; `true` when a threshold is crossed.
    fn status_get(&self) -> Result<bool> {
        Err(HardwareError::not_supported("status_get"))
    }
}

/// Fan.
pub trait FanControl: ResourceDriver {
    /// Speed in RPM.
    fn speed_get(&self) -> Result<u32> {
        Err(HardwareError::not_supported("speed_get"))
    }

    fn speed_set(&self, _rpm: u32) -> Result<()> {
        Err(HardwareError::not_supported("speed_set"))
    }

    fn fault_get(&self) -> Result<bool> {
        Err(HardwareError::not_supported("fault_get"))
    }
}

/// Single LED.
pub trait LedControl: ResourceDriver {
    fn led_on(&self) -> Result<()> {
        Err(HardwareError::not_supported("led_on"))
    }

    fn led_off(&self) -> Result<()> {
        Err(HardwareError::not_supported("led_off"))
    }
}

/// Digit display LED.
pub trait DisplayControl: ResourceDriver {
    fn display_on(&self) -> Result<()> {
        Err(HardwareError::not_supported("display_on"))
    }

    fn display_off(&self) -> Result<()> {
        Err(HardwareError::not_supported("display_off"))
    }

    fn display_set(&self, _text: &str) -> Result<()> {
        Err(HardwareError::not_supported("display_set"))
    }
}

/// Inventory EEPROM.
pub trait EntityInfoSource: ResourceDriver {
    fn entity_info_read(&self) -> Result<EntityInfo> {
        Err(HardwareError::not_supported("entity_info_read"))
    }
}

/// Field-upgradable programmable logic device.
pub trait PldControl: ResourceDriver {
    fn version_get(&self) -> Result<u32> {
        Err(HardwareError::not_supported("version_get"))
    }
}

/// Monitored quantity of a pluggable optical module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaMonitor {
    Temperature,
    Voltage,
}

/// Vendor field of a pluggable optical module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaVendorInfo {
    Name,
    Oui,
    SerialNumber,
    PartNumber,
    Revision,
}

/// Pluggable optical module.
pub trait MediaControl: ResourceDriver {
    fn presence_get(&self) -> Result<bool> {
        Err(HardwareError::not_supported("presence_get"))
    }

    /// Module-level alarm flags.
    fn module_monitor_status_get(&self) -> Result<u32> {
        Err(HardwareError::not_supported("module_monitor_status_get"))
    }

    /// Per-channel alarm flags.
    fn channel_status_get(&self, _channel: u32) -> Result<u32> {
        Err(HardwareError::not_supported("channel_status_get"))
    }

    /// Enable or disable the transmitter of a channel.
    fn tx_control(&self, _channel: u32, _enable: bool) -> Result<()> {
        Err(HardwareError::not_supported("tx_control"))
    }

    fn tx_control_status_get(&self, _channel: u32) -> Result<bool> {
        Err(HardwareError::not_supported("tx_control_status_get"))
    }

    fn module_monitor_get(&self, _monitor: MediaMonitor) -> Result<f64> {
        Err(HardwareError::not_supported("module_monitor_get"))
    }

    fn vendor_info_get(&self, _field: MediaVendorInfo) -> Result<String> {
        Err(HardwareError::not_supported("vendor_info_get"))
    }

    /// Raw read from the module EEPROM.
    fn read(&self, _offset: u16, _data: &mut [u8]) -> Result<()> {
        Err(HardwareError::not_supported("read"))
    }

    /// Raw write to the module EEPROM.
    fn write(&self, _offset: u16, _data: &[u8]) -> Result<()> {
        Err(HardwareError::not_supported("write"))
    }
}

/// Driver behind a resource, one variant per resource type.
#[derive(Clone)]
pub enum CapabilityTable {
    Temperature(Arc<dyn TemperatureSensor>),
    Fan(Arc<dyn FanControl>),
    Led(Arc<dyn LedControl>),
    DigitalDisplayLed(Arc<dyn DisplayControl>),
    EntityInfo(Arc<dyn EntityInfoSource>),
    UpgradablePld(Arc<dyn PldControl>),
    Media(Arc<dyn MediaControl>),
}

impl CapabilityTable {
    /// Resource type this table implements.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Temperature(_) => ResourceType::Temperature,
            Self::Fan(_) => ResourceType::Fan,
            Self::Led(_) => ResourceType::Led,
            Self::DigitalDisplayLed(_) => ResourceType::DigitalDisplayLed,
            Self::EntityInfo(_) => ResourceType::EntityInfo,
            Self::UpgradablePld(_) => ResourceType::UpgradablePld,
            Self::Media(_) => ResourceType::Media,
        }
    }

    /// Run the driver's init.
    pub fn init(&self, seed: u32) -> Result<()> {
        match self {
            Self::Temperature(driver) => driver.init(seed),
            Self::Fan(driver) => driver.init(seed),
            Self::Led(driver) => driver.init(seed),
            Self::DigitalDisplayLed(driver) => driver.init(seed),
            Self::EntityInfo(driver) => driver.init(seed),
            Self::UpgradablePld(driver) => driver.init(seed),
            Self::Media(driver) => driver.init(seed),
        }
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityTable({})", self.resource_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl ResourceDriver for Bare {}
    impl FanControl for Bare {}
    impl MediaControl for Bare {}

    #[test]
    fn test_unimplemented_operations_are_not_supported() {
        let fan = Bare;
        assert!(fan.speed_get().unwrap_err().is_not_supported());
        assert!(fan.speed_set(1000).unwrap_err().is_not_supported());
        assert!(ResourceDriver::init(&fan, 0).is_ok());

        let media: &dyn MediaControl = &Bare;
        assert!(media.tx_control(0, true).unwrap_err().is_not_supported());
        assert!(media.read(0, &mut [0; 4]).unwrap_err().is_not_supported());
    }

    #[test]
    fn test_table_type() {
        let table = CapabilityTable::Fan(Arc::new(Bare));
        assert_eq!(table.resource_type(), ResourceType::Fan);
        assert!(table.init(12000).is_ok());
        assert_eq!(format!("{table:?}"), "CapabilityTable(fan)");
    }
}
