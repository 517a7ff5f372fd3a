//! Typed operations on resources.
//!
//! Each operation checks the resource type first and fails with
//! [`HardwareError::PermissionDenied`] without touching the driver on a
//! mismatch. Driver failures are logged and returned; `NotSupported` is
//! returned without logging.

use crate::capability::{
    CapabilityTable, DisplayControl, EntityInfoSource, FanControl, LedControl, MediaControl,
    MediaMonitor, MediaVendorInfo, PldControl, TemperatureSensor,
};
use crate::resource::Resource;
use crate::{HardwareError, Result};
use chassis_core::{EntityInfo, ResourceType, Threshold};
use std::sync::Arc;
use tracing::error;

impl Resource {
    fn logged<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result
            && !e.is_not_supported()
        {
            error!(
                resource = self.name(),
                alias = self.alias(),
                operation,
                error = %e,
                "resource operation failed"
            );
        }
        result
    }

    fn mismatch(&self, expected: ResourceType) -> HardwareError {
        HardwareError::permission_denied(format!(
            "resource '{}' is {}, not {}",
            self.name(),
            self.resource_type(),
            expected
        ))
    }

    /// Initialise the resource with a type-specific seed.
    pub fn init(&self, seed: u32) -> Result<()> {
        self.logged("init", self.table().init(seed))
    }

    // Temperature

    fn thermal(&self) -> Result<&Arc<dyn TemperatureSensor>> {
        match self.capability(ResourceType::Temperature)? {
            CapabilityTable::Temperature(driver) => Ok(driver),
            _ => Err(self.mismatch(ResourceType::Temperature)),
        }
    }

    pub fn temperature_get(&self) -> Result<i32> {
        let driver = self.thermal()?;
        self.logged("temperature_get", driver.temperature_get())
    }

    pub fn temperature_threshold_get(&self, threshold: Threshold) -> Result<i32> {
        let driver = self.thermal()?;
        self.logged("threshold_get", driver.threshold_get(threshold))
    }

    pub fn temperature_threshold_set(&self, threshold: Threshold, value: i32) -> Result<()> {
        let driver = self.thermal()?;
        self.logged("threshold_set", driver.threshold_set(threshold, value))
    }

    pub fn temperature_status_get(&self) -> Result<bool> {
        let driver = self.thermal()?;
        self.logged("status_get", driver.status_get())
    }

    // Fan

    fn fan(&self) -> Result<&Arc<dyn FanControl>> {
        match self.capability(ResourceType::Fan)? {
            CapabilityTable::Fan(driver) => Ok(driver),
            _ => Err(self.mismatch(ResourceType::Fan)),
        }
    }

    pub fn fan_speed_get(&self) -> Result<u32> {
        let driver = self.fan()?;
        self.logged("speed_get", driver.speed_get())
    }

    pub fn fan_speed_set(&self, rpm: u32) -> Result<()> {
        let driver = self.fan()?;
        self.logged("speed_set", driver.speed_set(rpm))
    }

    pub fn fan_fault_get(&self) -> Result<bool> {
        let driver = self.fan()?;
        self.logged("fault_get", driver.fault_get())
    }

    // LED

    fn led(&self) -> Result<&Arc<dyn LedControl>> {
        match self.capability(ResourceType::Led)? {
            CapabilityTable::Led(driver) => Ok(driver),
            _ => Err(self.mismatch(ResourceType::Led)),
        }
    }

    pub fn led_on(&self) -> Result<()> {
        let driver = self.led()?;
        self.logged("led_on", driver.led_on())
    }

    pub fn led_off(&self) -> Result<()> {
        let driver = self.led()?;
        self.logged("led_off", driver.led_off())
    }

    // Digit display

    fn display(&self) -> Result<&Arc<dyn DisplayControl>> {
        match self.capability(ResourceType::DigitalDisplayLed)? {
            CapabilityTable::DigitalDisplayLed(driver) => Ok(driver),
            _ => Err(self.mismatch(ResourceType::DigitalDisplayLed)),
        }
    }

    pub fn display_on(&self) -> Result<()> {
        let driver = self.display()?;
        self.logged("display_on", driver.display_on())
    }

    pub fn display_off(&self) -> Result<()> {
        let driver = self.display()?;
        self.logged("display_off", driver.display_off())
    }

    pub fn display_set(&self, text: &str) -> Result<()> {
        let driver = self.display()?;
        self.logged("display_set", driver.display_set(text))
    }

    // Entity info

    pub fn entity_info_read(&self) -> Result<EntityInfo> {
        let driver: &Arc<dyn EntityInfoSource> = match self.capability(ResourceType::EntityInfo)? {
            CapabilityTable::EntityInfo(driver) => driver,
            _ => return Err(self.mismatch(ResourceType::EntityInfo)),
        };
        self.logged("entity_info_read", driver.entity_info_read())
    }

    // PLD

    pub fn pld_version_get(&self) -> Result<u32> {
        let driver: &Arc<dyn PldControl> = match self.capability(ResourceType::UpgradablePld)? {
            CapabilityTable::UpgradablePld(driver) => driver,
            _ => return Err(self.mismatch(ResourceType::UpgradablePld)),
        };
        self.logged("version_get", driver.version_get())
    }

    // Media

    fn media(&self) -> Result<&Arc<dyn MediaControl>> {
        match self.capability(ResourceType::Media)? {
            CapabilityTable::Media(driver) => Ok(driver),
            _ => Err(self.mismatch(ResourceType::Media)),
        }
    }

    pub fn media_presence_get(&self) -> Result<bool> {
        let driver = self.media()?;
        self.logged("presence_get", driver.presence_get())
    }

    pub fn media_module_monitor_status_get(&self) -> Result<u32> {
        let driver = self.media()?;
        self.logged(
            "module_monitor_status_get",
            driver.module_monitor_status_get(),
        )
    }

    pub fn media_channel_status_get(&self, channel: u32) -> Result<u32> {
        let driver = self.media()?;
        self.logged("channel_status_get", driver.channel_status_get(channel))
    }

    pub fn media_tx_control(&self, channel: u32, enable: bool) -> Result<()> {
        let driver = self.media()?;
        self.logged("tx_control", driver.tx_control(channel, enable))
    }

    pub fn media_tx_control_status_get(&self, channel: u32) -> Result<bool> {
        let driver = self.media()?;
        self.logged("tx_control_status_get", driver.tx_control_status_get(channel))
    }

    pub fn media_module_monitor_get(&self, monitor: MediaMonitor) -> Result<f64> {
        let driver = self.media()?;
        self.logged("module_monitor_get", driver.module_monitor_get(monitor))
    }

    pub fn media_vendor_info_get(&self, field: MediaVendorInfo) -> Result<String> {
        let driver = self.media()?;
        self.logged("vendor_info_get", driver.vendor_info_get(field))
    }

    pub fn media_read(&self, offset: u16, data: &mut [u8]) -> Result<()> {
        let driver = self.media()?;
        self.logged("read", driver.read(offset, data))
    }

    pub fn media_write(&self, offset: u16, data: &[u8]) -> Result<()> {
        let driver = self.media()?;
        self.logged("write", driver.write(offset, data))
    }
}
