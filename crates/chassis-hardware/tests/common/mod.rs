//! Shared chassis fixture for integration tests.
//!
//! The fixture models a small switch:
//!
//! ```text
//! i2c-3 (mock I2C bus)
//! └── mux3 (GPIO expander @ 0x20)
//!     ├── reg 0x00 bit 2  pin_mux3_bit2   fan tray presence
//!     ├── reg 0x00 bit 5  ft_pwr          fan tray power
//!     ├── reg 0x00 bit 6  ft_led_n        (inverted, unused by entities)
//!     └── reg 0x01 0x0c   ft_reset        fan tray reset group
//! soft (pseudo bus)
//!     ├── psu_prs, psu_fault, psu_reset   PSU presence and fault pins, reset group
//!     └── fans, EEPROMs, sensors, LED, PLD
//! ```
//!
//! Entities: a fixed system board, a hot-swappable fan tray and a
//! hot-swappable PSU tray with a fault pin, a settle delay and no output
//! status pin.

#![allow(dead_code)]

use chassis_core::{ConfigNode, EntityType};
use chassis_hardware::driver::DriverRegistry;
use chassis_hardware::drivers::register_builtin;
use chassis_hardware::mock::{MockBench, MockI2cHandle};
use chassis_hardware::{EntityId, Platform};
use std::time::Duration;

pub const MUX_ADDRESS: u16 = 0x20;
pub const LINE_REGISTER: u8 = 0x00;
pub const RESET_REGISTER: u8 = 0x01;
pub const PRESENCE_BIT: u8 = 1 << 2;
pub const POWER_BIT: u8 = 1 << 5;
pub const LED_BIT: u8 = 1 << 6;
pub const FAN_TRAY_MAX_SPEED: u32 = 18000;
pub const PSU_SETTLE_DELAY: Duration = Duration::from_millis(20);

pub const DEVICES: &str = r#"{
    "name": "devices",
    "children": [
        { "name": "mock-i2c-bus", "attributes": { "name": "i2c-3" }, "children": [
            { "name": "gpio-expander", "attributes": { "name": "mux3", "address": "0x20" }, "children": [
                { "name": "pin", "attributes": { "name": "pin_mux3_bit2", "register": "0x00", "bit": "2" } },
                { "name": "pin", "attributes": { "name": "ft_pwr", "register": "0x00", "bit": "5" } },
                { "name": "pin", "attributes": { "name": "ft_led_n", "register": "0x00", "bit": "6", "polarity": "inverted" } },
                { "name": "pin-group", "attributes": { "name": "ft_reset", "register": "0x01", "mask": "0x0c" } }
            ]}
        ]},
        { "name": "pseudo-bus", "attributes": { "name": "soft" }, "children": [
            { "name": "mock-pin", "attributes": { "name": "psu_prs", "level": "high" } },
            { "name": "mock-pin", "attributes": { "name": "psu_fault", "level": "low" } },
            { "name": "mock-pin-group", "attributes": { "name": "psu_reset" } },
            { "name": "mock-fan", "attributes": { "name": "fan_0" } },
            { "name": "mock-fan", "attributes": { "name": "fan_1" } },
            { "name": "mock-entity-info", "attributes": {
                "name": "ft_eeprom", "product_name": "FAN-TRAY-F2B", "max_speed": "18000", "num_fans": "2"
            }},
            { "name": "mock-fan", "attributes": { "name": "psu_fan" } },
            { "name": "mock-entity-info", "attributes": {
                "name": "psu_eeprom", "product_name": "PSU-650W", "power_rating": "650"
            }},
            { "name": "mock-thermal", "attributes": { "name": "cpu_temp", "temperature": "48", "high_threshold": "90" } },
            { "name": "mock-led", "attributes": { "name": "sys_led" } },
            { "name": "mock-pld", "attributes": { "name": "cpld", "version": "0x12" } }
        ]}
    ]
}"#;

pub const ENTITIES: &str = r#"{
    "name": "entities",
    "children": [
        { "name": "system_board", "attributes": {
            "instance": "1", "type": "SDI_ENTITY_SYSTEM_BOARD", "presence": "FIXED_SLOT"
          },
          "children": [
            { "name": "resource", "attributes": { "reference": "cpu_temp", "name": "cpu" } },
            { "name": "resource", "attributes": { "reference": "sys_led", "name": "status" } },
            { "name": "resource", "attributes": { "reference": "cpld", "name": "cpld" } }
          ]
        },
        { "name": "fan_tray", "attributes": {
            "instance": "1", "type": "SDI_ENTITY_FAN_TRAY", "presence": "pin_mux3_bit2",
            "power": "ft_pwr", "cold_reset": "0x3", "cold_reset_register": "ft_reset"
          },
          "children": [
            { "name": "resource", "attributes": { "reference": "fan_0", "name": "fan1" } },
            { "name": "resource", "attributes": { "reference": "fan_1", "name": "fan2" } },
            { "name": "resource", "attributes": { "reference": "ft_eeprom", "name": "info" } }
          ]
        },
        { "name": "psu_tray", "attributes": {
            "instance": "1", "type": "SDI_ENTITY_PSU_TRAY", "presence": "psu_prs",
            "fault": "psu_fault", "delay": "20",
            "warm_reset": "0x1", "cold_reset": "0x2", "cold_reset_register": "psu_reset"
          },
          "children": [
            { "name": "resource", "attributes": { "reference": "psu_fan", "name": "fan1" } },
            { "name": "resource", "attributes": { "reference": "psu_eeprom", "name": "info" } }
          ]
        }
    ]
}"#;

pub struct Chassis {
    pub platform: Platform,
    pub bench: MockBench,
}

impl Chassis {
    pub fn system_board(&self) -> EntityId {
        self.entity(EntityType::SystemBoard)
    }

    pub fn fan_tray(&self) -> EntityId {
        self.entity(EntityType::FanTray)
    }

    pub fn psu_tray(&self) -> EntityId {
        self.entity(EntityType::PsuTray)
    }

    fn entity(&self, entity_type: EntityType) -> EntityId {
        self.platform
            .entity_lookup(entity_type, 1)
            .expect("fixture entity")
    }

    pub fn i2c(&self) -> MockI2cHandle {
        self.bench.i2c("i2c-3").expect("fixture I2C bus")
    }

    /// Seat the fan tray by raising its presence bit.
    pub fn insert_fan_tray(&self) {
        let i2c = self.i2c();
        let value = i2c.register(MUX_ADDRESS, LINE_REGISTER);
        i2c.set_register(MUX_ADDRESS, LINE_REGISTER, value | PRESENCE_BIT);
    }

    pub fn remove_fan_tray(&self) {
        let i2c = self.i2c();
        let value = i2c.register(MUX_ADDRESS, LINE_REGISTER);
        i2c.set_register(MUX_ADDRESS, LINE_REGISTER, value & !PRESENCE_BIT);
    }
}

pub fn drivers(bench: &MockBench) -> DriverRegistry {
    let mut drivers = DriverRegistry::new();
    register_builtin(&mut drivers).expect("builtin drivers");
    bench.install(&mut drivers).expect("mock drivers");
    drivers
}

/// Build the fixture chassis. The fan tray starts absent.
pub fn chassis() -> Chassis {
    let bench = MockBench::new();
    let devices = ConfigNode::from_json_str(DEVICES).expect("device tree");
    let entities = ConfigNode::from_json_str(ENTITIES).expect("topology");
    let platform =
        Platform::from_documents(drivers(&bench), &devices, &entities).expect("platform");
    Chassis { platform, bench }
}
