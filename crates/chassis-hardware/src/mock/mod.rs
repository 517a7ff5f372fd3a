//! Simulated hardware for tests and bring-up without a chassis.
//!
//! Every mock bus or device comes with a handle sharing its state, so a test
//! can change what the hardware reports and observe what was done to it.
//! [`MockBench`] registers a device-tree driver for each mock and keeps the
//! handles of everything those drivers create, keyed by node name:
//!
//! ```json
//! { "name": "mock-i2c-bus", "attributes": { "name": "i2c-3", "capability": "0x1f0009" } }
//! { "name": "mock-pin", "attributes": { "name": "prs_0", "level": "high" } }
//! { "name": "mock-fan", "attributes": { "name": "fan_0", "speed": "9000" } }
//! ```
//!
//! # Examples
//!
//! ```
//! use chassis_core::ConfigNode;
//! use chassis_hardware::driver::DriverRegistry;
//! use chassis_hardware::mock::MockBench;
//! use chassis_hardware::platform::PlatformBuilder;
//!
//! # fn main() -> chassis_hardware::Result<()> {
//! let bench = MockBench::new();
//! let mut drivers = DriverRegistry::new();
//! bench.install(&mut drivers)?;
//!
//! let mut builder = PlatformBuilder::new(drivers);
//! builder.register_device_tree(
//!     &ConfigNode::new("devices")
//!         .with_child(ConfigNode::new("mock-fan").with_attr("name", "fan_0").with_attr("speed", "9000")),
//! )?;
//!
//! let fan = bench.fan("fan_0").unwrap();
//! assert_eq!(fan.with(|state| state.speed), 9000);
//! # Ok(())
//! # }
//! ```

mod i2c;
mod pin;
mod resources;

pub use i2c::{DEFAULT_MOCK_CAPABILITY, I2cTransaction, MockI2cBus, MockI2cHandle};
pub use pin::{MockPin, MockPinGroup, MockPinGroupHandle, MockPinHandle};
pub use resources::{
    DisplayState, EntityInfoState, FanState, LedState, MediaState, MockDevice, MockDisplay,
    MockDisplayHandle, MockEntityInfo, MockEntityInfoHandle, MockFan, MockFanHandle, MockHandle,
    MockLed, MockLedHandle, MockMedia, MockMediaHandle, MockPld, MockPldHandle, MockThermal,
    MockThermalHandle, PldState, ThermalState,
};

use crate::Result;
use crate::bus::{BusId, BusKind, Device};
use crate::capability::CapabilityTable;
use crate::driver::{DeviceDriver, DriverRegistry};
use crate::platform::PlatformBuilder;
use chassis_core::constants::ATTR_NAME;
use chassis_core::{
    Airflow, ConfigNode, Error as ConfigError, I2cCapability, PinLevel, ResourceType, Threshold,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Mock device kinds and their device-tree keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockKind {
    I2cBus,
    Pin,
    PinGroup,
    Fan,
    EntityInfo,
    Led,
    Display,
    Thermal,
    Media,
    Pld,
}

impl MockKind {
    pub const ALL: [MockKind; 10] = [
        Self::I2cBus,
        Self::Pin,
        Self::PinGroup,
        Self::Fan,
        Self::EntityInfo,
        Self::Led,
        Self::Display,
        Self::Thermal,
        Self::Media,
        Self::Pld,
    ];

    /// Device-tree node name handled by this kind.
    pub fn key(&self) -> &'static str {
        match self {
            Self::I2cBus => "mock-i2c-bus",
            Self::Pin => "mock-pin",
            Self::PinGroup => "mock-pin-group",
            Self::Fan => "mock-fan",
            Self::EntityInfo => "mock-entity-info",
            Self::Led => "mock-led",
            Self::Display => "mock-display",
            Self::Thermal => "mock-thermal",
            Self::Media => "mock-media",
            Self::Pld => "mock-pld",
        }
    }
}

#[derive(Debug, Default)]
struct Handles {
    i2c: HashMap<String, MockI2cHandle>,
    pins: HashMap<String, MockPinHandle>,
    pin_groups: HashMap<String, MockPinGroupHandle>,
    fans: HashMap<String, MockFanHandle>,
    entity_info: HashMap<String, MockEntityInfoHandle>,
    leds: HashMap<String, MockLedHandle>,
    displays: HashMap<String, MockDisplayHandle>,
    thermals: HashMap<String, MockThermalHandle>,
    media: HashMap<String, MockMediaHandle>,
    plds: HashMap<String, MockPldHandle>,
}

/// Registry of mock drivers and the handles of what they built.
#[derive(Debug, Clone, Default)]
pub struct MockBench {
    handles: Arc<Mutex<Handles>>,
}

impl MockBench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver for every [`MockKind`].
    ///
    /// # Errors
    ///
    /// Fails if one of the mock keys is already registered.
    pub fn install(&self, registry: &mut DriverRegistry) -> Result<()> {
        for kind in MockKind::ALL {
            registry.register_driver(
                kind.key(),
                Arc::new(MockDriver {
                    kind,
                    bench: self.clone(),
                }),
            )?;
        }
        Ok(())
    }

    fn handles(&self) -> MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn i2c(&self, name: &str) -> Option<MockI2cHandle> {
        self.handles().i2c.get(name).cloned()
    }

    pub fn pin(&self, name: &str) -> Option<MockPinHandle> {
        self.handles().pins.get(name).cloned()
    }

    pub fn pin_group(&self, name: &str) -> Option<MockPinGroupHandle> {
        self.handles().pin_groups.get(name).cloned()
    }

    pub fn fan(&self, name: &str) -> Option<MockFanHandle> {
        self.handles().fans.get(name).cloned()
    }

    pub fn entity_info(&self, name: &str) -> Option<MockEntityInfoHandle> {
        self.handles().entity_info.get(name).cloned()
    }

    pub fn led(&self, name: &str) -> Option<MockLedHandle> {
        self.handles().leds.get(name).cloned()
    }

    pub fn display(&self, name: &str) -> Option<MockDisplayHandle> {
        self.handles().displays.get(name).cloned()
    }

    pub fn thermal(&self, name: &str) -> Option<MockThermalHandle> {
        self.handles().thermals.get(name).cloned()
    }

    pub fn media(&self, name: &str) -> Option<MockMediaHandle> {
        self.handles().media.get(name).cloned()
    }

    pub fn pld(&self, name: &str) -> Option<MockPldHandle> {
        self.handles().plds.get(name).cloned()
    }
}

/// Device-tree driver creating one kind of mock.
#[derive(Debug)]
struct MockDriver {
    kind: MockKind,
    bench: MockBench,
}

impl DeviceDriver for MockDriver {
    fn register(
        &self,
        node: &ConfigNode,
        parent: Option<BusId>,
        builder: &mut PlatformBuilder,
    ) -> Result<()> {
        let name = node.required_attr(ATTR_NAME)?.to_string();
        debug!(kind = self.kind.key(), %name, "mock device");

        match self.kind {
            MockKind::I2cBus => {
                let capability = match node.parse_hex_attr("capability")? {
                    Some(bits) => I2cCapability::from_bits_truncate(bits),
                    None => DEFAULT_MOCK_CAPABILITY,
                };
                let (bus, handle) = MockI2cBus::new(capability);
                let id = builder.add_bus(name.as_str(), parent, BusKind::I2c(Box::new(bus)))?;
                self.bench.handles().i2c.insert(name, handle);
                builder.register_children(node, id)
            }
            MockKind::Pin => {
                let (pin, handle) = MockPin::new(parse_level(node)?);
                builder.add_bus(name.as_str(), parent, BusKind::Pin(Box::new(pin)))?;
                self.bench.handles().pins.insert(name, handle);
                Ok(())
            }
            MockKind::PinGroup => {
                let value = node.parse_hex_attr("value")?.unwrap_or(0);
                let (group, handle) = MockPinGroup::new(value);
                builder.add_bus(name.as_str(), parent, BusKind::PinGroup(Box::new(group)))?;
                self.bench.handles().pin_groups.insert(name, handle);
                Ok(())
            }
            MockKind::Fan => {
                let state = FanState {
                    speed: node.parse_attr("speed")?.unwrap_or(0),
                    fault: node.parse_attr("fault")?.unwrap_or(false),
                };
                let (fan, handle) = MockFan::with_state(name.as_str(), state);
                let fan = Arc::new(fan);
                attach(builder, parent, fan.clone())?;
                builder.create_resource(ResourceType::Fan, name.as_str(), CapabilityTable::Fan(fan))?;
                self.bench.handles().fans.insert(name, handle);
                Ok(())
            }
            MockKind::EntityInfo => {
                let (eeprom, handle) =
                    MockEntityInfo::with_state(name.as_str(), EntityInfoState { info: parse_info(node)? });
                let eeprom = Arc::new(eeprom);
                attach(builder, parent, eeprom.clone())?;
                builder.create_resource(
                    ResourceType::EntityInfo,
                    name.as_str(),
                    CapabilityTable::EntityInfo(eeprom),
                )?;
                self.bench.handles().entity_info.insert(name, handle);
                Ok(())
            }
            MockKind::Led => {
                let state = LedState {
                    on: node.parse_attr("on")?.unwrap_or(false),
                };
                let (led, handle) = MockLed::with_state(name.as_str(), state);
                let led = Arc::new(led);
                attach(builder, parent, led.clone())?;
                builder.create_resource(ResourceType::Led, name.as_str(), CapabilityTable::Led(led))?;
                self.bench.handles().leds.insert(name, handle);
                Ok(())
            }
            MockKind::Display => {
                let state = DisplayState {
                    on: false,
                    text: node.attr("text").unwrap_or_default().to_string(),
                };
                let (display, handle) = MockDisplay::with_state(name.as_str(), state);
                let display = Arc::new(display);
                attach(builder, parent, display.clone())?;
                builder.create_resource(
                    ResourceType::DigitalDisplayLed,
                    name.as_str(),
                    CapabilityTable::DigitalDisplayLed(display),
                )?;
                self.bench.handles().displays.insert(name, handle);
                Ok(())
            }
            MockKind::Thermal => {
                let mut state = ThermalState {
                    temperature: node.parse_attr("temperature")?.unwrap_or(25),
                    ..Default::default()
                };
                for (attribute, threshold) in [
                    ("low_threshold", Threshold::Low),
                    ("high_threshold", Threshold::High),
                    ("critical_threshold", Threshold::Critical),
                ] {
                    if let Some(value) = node.parse_attr(attribute)? {
                        state.thresholds.insert(threshold, value);
                    }
                }
                let (sensor, handle) = MockThermal::with_state(name.as_str(), state);
                let sensor = Arc::new(sensor);
                attach(builder, parent, sensor.clone())?;
                builder.create_resource(
                    ResourceType::Temperature,
                    name.as_str(),
                    CapabilityTable::Temperature(sensor),
                )?;
                self.bench.handles().thermals.insert(name, handle);
                Ok(())
            }
            MockKind::Media => {
                let state = MediaState {
                    present: node.parse_attr("present")?.unwrap_or(true),
                    ..Default::default()
                };
                let (media, handle) = MockMedia::with_state(name.as_str(), state);
                let media = Arc::new(media);
                attach(builder, parent, media.clone())?;
                builder.create_resource(
                    ResourceType::Media,
                    name.as_str(),
                    CapabilityTable::Media(media),
                )?;
                self.bench.handles().media.insert(name, handle);
                Ok(())
            }
            MockKind::Pld => {
                let state = PldState {
                    version: node.parse_hex_attr("version")?.unwrap_or(0),
                };
                let (pld, handle) = MockPld::with_state(name.as_str(), state);
                let pld = Arc::new(pld);
                attach(builder, parent, pld.clone())?;
                builder.create_resource(
                    ResourceType::UpgradablePld,
                    name.as_str(),
                    CapabilityTable::UpgradablePld(pld),
                )?;
                self.bench.handles().plds.insert(name, handle);
                Ok(())
            }
        }
    }
}

/// Put a resource device on its parent bus, if it has one.
fn attach(builder: &mut PlatformBuilder, parent: Option<BusId>, device: Arc<dyn Device>) -> Result<()> {
    match parent {
        Some(bus) => builder.attach_device(bus, device),
        None => Ok(()),
    }
}

fn parse_level(node: &ConfigNode) -> Result<PinLevel> {
    match node.attr("level") {
        None | Some("low" | "0") => Ok(PinLevel::Low),
        Some("high" | "1") => Ok(PinLevel::High),
        Some(other) => Err(ConfigError::invalid_attribute(&node.name, "level", other).into()),
    }
}

fn parse_info(node: &ConfigNode) -> Result<chassis_core::EntityInfo> {
    let text = |key: &str| node.attr(key).unwrap_or_default().to_string();
    let airflow = match node.attr("airflow") {
        None | Some("normal") => Airflow::Normal,
        Some("reverse") => Airflow::Reverse,
        Some(other) => {
            return Err(ConfigError::invalid_attribute(&node.name, "airflow", other).into());
        }
    };
    Ok(chassis_core::EntityInfo {
        product_name: text("product_name"),
        part_number: text("part_number"),
        serial_number: text("serial_number"),
        hw_revision: text("hw_revision"),
        vendor_name: text("vendor_name"),
        base_mac: node.attr("base_mac").map(str::to_string),
        mac_size: node.parse_attr("mac_size")?.unwrap_or(0),
        num_fans: node.parse_attr("num_fans")?.unwrap_or(0),
        max_speed: node.parse_attr("max_speed")?.unwrap_or(0),
        airflow,
        power_rating: node.parse_attr("power_rating")?.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::register_builtin;

    fn builder(bench: &MockBench) -> PlatformBuilder {
        let mut drivers = DriverRegistry::new();
        register_builtin(&mut drivers).unwrap();
        bench.install(&mut drivers).unwrap();
        PlatformBuilder::new(drivers)
    }

    #[test]
    fn test_install_registers_every_kind() {
        let mut drivers = DriverRegistry::new();
        MockBench::new().install(&mut drivers).unwrap();
        assert_eq!(drivers.len(), MockKind::ALL.len());
        assert!(drivers.contains("mock-media"));
        assert!(MockBench::new().install(&mut drivers).is_err());
    }

    #[test]
    fn test_devices_attach_to_parent_bus() {
        let bench = MockBench::new();
        let mut builder = builder(&bench);
        let tree = ConfigNode::new("devices").with_child(
            ConfigNode::new("mock-i2c-bus")
                .with_attr("name", "i2c-0")
                .with_child(ConfigNode::new("mock-fan").with_attr("name", "fan_0"))
                .with_child(
                    ConfigNode::new("mock-entity-info")
                        .with_attr("name", "psu_eeprom")
                        .with_attr("product_name", "PSU-650W")
                        .with_attr("power_rating", "650")
                        .with_attr("airflow", "reverse"),
                ),
        );
        builder.register_device_tree(&tree).unwrap();
        builder.init_buses().unwrap();

        let bus = builder.buses().find_by_name("i2c-0").unwrap();
        assert_eq!(bus.device_names(), vec!["fan_0", "psu_eeprom"]);
        assert!(bench.fan("fan_0").unwrap().probed());

        let info = bench.entity_info("psu_eeprom").unwrap().with(|s| s.info.clone());
        assert_eq!(info.product_name, "PSU-650W");
        assert_eq!(info.power_rating, 650);
        assert_eq!(info.airflow, Airflow::Reverse);
    }

    #[test]
    fn test_pin_level_attribute() {
        let bench = MockBench::new();
        let mut builder = builder(&bench);
        let tree = ConfigNode::new("devices")
            .with_child(ConfigNode::new("mock-pin").with_attr("name", "a").with_attr("level", "high"))
            .with_child(ConfigNode::new("mock-pin").with_attr("name", "b"));
        builder.register_device_tree(&tree).unwrap();

        assert_eq!(bench.pin("a").unwrap().level(), PinLevel::High);
        assert_eq!(bench.pin("b").unwrap().level(), PinLevel::Low);

        let bad = ConfigNode::new("devices")
            .with_child(ConfigNode::new("mock-pin").with_attr("name", "c").with_attr("level", "maybe"));
        assert!(builder.register_device_tree(&bad).unwrap_err().is_fatal());
    }

    #[test]
    fn test_unknown_name_has_no_handle() {
        let bench = MockBench::new();
        assert!(bench.led("led_0").is_none());
        assert!(bench.i2c("i2c-0").is_none());
    }
}
