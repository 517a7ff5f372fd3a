//! I2C GPIO expander.
//!
//! The expander is a device on an I2C bus. Each `pin` child becomes a Pin
//! bus mapped to one bit of an expander register; each `pin-group` child
//! becomes a PinGroup bus mapped to a contiguous mask of a register.
//!
//! ```json
//! {
//!   "name": "gpio-expander",
//!   "attributes": { "name": "mux3", "address": "0x20" },
//!   "children": [
//!     { "name": "pin", "attributes": { "name": "pin_mux3_bit2", "register": "0x00", "bit": "2" } },
//!     { "name": "pin-group", "attributes": { "name": "ft_reset", "register": "0x01", "mask": "0x0c" } }
//!   ]
//! }
//! ```
//!
//! Writes are read-modify-write under a single acquisition of the parent I2C
//! bus. The pin bus lock is always taken before the I2C bus lock.

use super::required_hex_u8;
use crate::bus::{Bus, BusId, BusKind, Device, PinGroupOps, PinOps};
use crate::driver::DeviceDriver;
use crate::platform::PlatformBuilder;
use crate::{HardwareError, Result};
use chassis_core::constants::{
    ATTR_ADDRESS, ATTR_BIT, ATTR_MASK, ATTR_NAME, ATTR_POLARITY, ATTR_REGISTER,
};
use chassis_core::{ConfigNode, Error as ConfigError, I2cFlags, PinLevel};
use std::sync::Arc;
use tracing::debug;

/// Driver for I2C-attached GPIO expanders.
#[derive(Debug, Default)]
pub struct GpioExpanderDriver;

impl DeviceDriver for GpioExpanderDriver {
    fn register(
        &self,
        node: &ConfigNode,
        parent: Option<BusId>,
        builder: &mut PlatformBuilder,
    ) -> Result<()> {
        let name = node.required_attr(ATTR_NAME)?;
        let parent = parent.ok_or_else(|| {
            ConfigError::UnresolvedReference(format!("I2C bus of expander '{name}'"))
        })?;
        let i2c = Arc::clone(builder.bus(parent)?);
        if i2c.as_i2c().is_err() {
            return Err(ConfigError::UnresolvedReference(format!(
                "expander '{name}' is not on an I2C bus"
            ))
            .into());
        }
        let address = u16::from(required_hex_u8(node, ATTR_ADDRESS)?);

        builder.attach_device(
            parent,
            Arc::new(GpioExpander {
                name: name.to_string(),
                address,
            }),
        )?;

        for child in &node.children {
            let line = child.required_attr(ATTR_NAME)?;
            let register = required_hex_u8(child, ATTR_REGISTER)?;
            let kind = match child.name.as_str() {
                "pin" => BusKind::Pin(Box::new(ExpanderPin {
                    i2c: Arc::clone(&i2c),
                    address,
                    register,
                    mask: bit_mask(child)?,
                    inverted: child.attr(ATTR_POLARITY) == Some("inverted"),
                })),
                "pin-group" => {
                    let mask = required_hex_u8(child, ATTR_MASK)?;
                    if mask == 0 {
                        return Err(
                            ConfigError::invalid_attribute(line, ATTR_MASK, "0x0").into()
                        );
                    }
                    BusKind::PinGroup(Box::new(ExpanderPinGroup {
                        i2c: Arc::clone(&i2c),
                        address,
                        register,
                        mask,
                    }))
                }
                other => return Err(ConfigError::unknown("expander line", other).into()),
            };
            debug!(expander = name, line, register, "expander line");
            builder.add_bus(line, Some(parent), kind)?;
        }
        Ok(())
    }
}

fn bit_mask(node: &ConfigNode) -> Result<u8> {
    let bit: u8 = node.parse_required_attr(ATTR_BIT)?;
    if bit > 7 {
        return Err(ConfigError::invalid_attribute(&node.name, ATTR_BIT, bit.to_string()).into());
    }
    Ok(1 << bit)
}

/// Device record of an expander on its I2C bus.
struct GpioExpander {
    name: String,
    address: u16,
}

impl Device for GpioExpander {
    fn name(&self) -> &str {
        &self.name
    }

    /// Probe the expander by reading its first register.
    fn init(&self, bus: &Bus) -> Result<()> {
        let i2c = bus.as_i2c()?;
        let guard = i2c.acquire()?;
        guard
            .read_byte(self.address, 0, I2cFlags::empty())
            .map(|_| ())
            .map_err(|e| HardwareError::bus(bus.name(), format!("{} probe: {e}", self.name)))
    }
}

struct ExpanderPin {
    i2c: Arc<Bus>,
    address: u16,
    register: u8,
    mask: u8,
    inverted: bool,
}

impl PinOps for ExpanderPin {
    fn read(&self) -> Result<PinLevel> {
        let i2c = self.i2c.as_i2c()?;
        let guard = i2c.acquire()?;
        let raw = guard.read_byte(self.address, self.register, I2cFlags::empty())?;
        Ok(PinLevel::from((raw & self.mask != 0) != self.inverted))
    }

    fn write(&self, level: PinLevel) -> Result<()> {
        let i2c = self.i2c.as_i2c()?;
        let guard = i2c.acquire()?;
        let raw = guard.read_byte(self.address, self.register, I2cFlags::empty())?;
        let value = if level.is_high() != self.inverted {
            raw | self.mask
        } else {
            raw & !self.mask
        };
        guard.write_byte(self.address, self.register, value, I2cFlags::empty())
    }
}

struct ExpanderPinGroup {
    i2c: Arc<Bus>,
    address: u16,
    register: u8,
    mask: u8,
}

impl ExpanderPinGroup {
    fn shift(&self) -> u32 {
        self.mask.trailing_zeros()
    }
}

impl PinGroupOps for ExpanderPinGroup {
    fn read(&self) -> Result<u32> {
        let i2c = self.i2c.as_i2c()?;
        let guard = i2c.acquire()?;
        let raw = guard.read_byte(self.address, self.register, I2cFlags::empty())?;
        Ok(u32::from(raw & self.mask) >> self.shift())
    }

    fn write(&self, value: u32) -> Result<()> {
        let limit = u32::from(self.mask) >> self.shift();
        if value > limit {
            return Err(HardwareError::invalid_argument(format!(
                "value {value:#x} exceeds pin group width (max {limit:#x})"
            )));
        }
        let i2c = self.i2c.as_i2c()?;
        let guard = i2c.acquire()?;
        let raw = guard.read_byte(self.address, self.register, I2cFlags::empty())?;
        // value <= limit, so the shifted value fits the mask
        let bits = (value << self.shift()) as u8 & self.mask;
        guard.write_byte(
            self.address,
            self.register,
            (raw & !self.mask) | bits,
            I2cFlags::empty(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::DriverRegistry;
    use crate::drivers::register_builtin;
    use crate::mock::MockBench;
    use crate::platform::PlatformBuilder;
    use chassis_core::constants::ATTR_POLARITY;
    use chassis_core::{BusType, ConfigNode, PinLevel};

    fn tree(extra: Vec<ConfigNode>) -> ConfigNode {
        let mut expander = ConfigNode::new("gpio-expander")
            .with_attr("name", "mux3")
            .with_attr("address", "0x20")
            .with_child(
                ConfigNode::new("pin")
                    .with_attr("name", "prs")
                    .with_attr("register", "0x00")
                    .with_attr("bit", "2"),
            )
            .with_child(
                ConfigNode::new("pin")
                    .with_attr("name", "pwr_n")
                    .with_attr("register", "0x00")
                    .with_attr("bit", "5")
                    .with_attr(ATTR_POLARITY, "inverted"),
            )
            .with_child(
                ConfigNode::new("pin-group")
                    .with_attr("name", "rst")
                    .with_attr("register", "0x01")
                    .with_attr("mask", "0x0c"),
            );
        expander.children.extend(extra);
        ConfigNode::new("devices").with_child(
            ConfigNode::new("mock-i2c-bus")
                .with_attr("name", "i2c-3")
                .with_child(expander),
        )
    }

    fn build(tree: &ConfigNode) -> (PlatformBuilder, MockBench) {
        let bench = MockBench::new();
        let mut drivers = DriverRegistry::new();
        register_builtin(&mut drivers).unwrap();
        bench.install(&mut drivers).unwrap();
        let mut builder = PlatformBuilder::new(drivers);
        builder.register_device_tree(tree).unwrap();
        builder.init_buses().unwrap();
        (builder, bench)
    }

    #[test]
    fn test_lines_become_buses() {
        let (builder, _bench) = build(&tree(vec![]));
        let buses = builder.buses();
        let i2c = buses.find_by_name("i2c-3").unwrap();

        assert!(buses.find_typed("prs", BusType::Pin).is_some());
        assert!(buses.find_typed("rst", BusType::PinGroup).is_some());
        assert_eq!(buses.children(i2c.id()).count(), 3);
        assert_eq!(i2c.device_names(), vec!["mux3"]);
    }

    #[test]
    fn test_pin_reads_register_bit() {
        let (builder, bench) = build(&tree(vec![]));
        let i2c = bench.i2c("i2c-3").unwrap();
        let pin = builder.buses().find_by_name("prs").unwrap().as_pin().unwrap();

        i2c.set_register(0x20, 0x00, 0b0000_0100);
        assert_eq!(pin.read_level().unwrap(), PinLevel::High);
        i2c.set_register(0x20, 0x00, 0b1111_1011);
        assert_eq!(pin.read_level().unwrap(), PinLevel::Low);
    }

    #[test]
    fn test_pin_write_preserves_other_bits() {
        let (builder, bench) = build(&tree(vec![]));
        let i2c = bench.i2c("i2c-3").unwrap();
        i2c.set_register(0x20, 0x00, 0b0000_0100);

        let pwr = builder.buses().find_by_name("pwr_n").unwrap().as_pin().unwrap();
        pwr.write_level(PinLevel::Low).unwrap();
        assert_eq!(i2c.register(0x20, 0x00), 0b0010_0100);
        pwr.write_level(PinLevel::High).unwrap();
        assert_eq!(i2c.register(0x20, 0x00), 0b0000_0100);
    }

    #[test]
    fn test_pin_group_shifts_value() {
        let (builder, bench) = build(&tree(vec![]));
        let i2c = bench.i2c("i2c-3").unwrap();
        i2c.set_register(0x20, 0x01, 0b1000_0001);

        let rst = builder
            .buses()
            .find_by_name("rst")
            .unwrap()
            .as_pin_group()
            .unwrap();
        rst.write_value(0x3).unwrap();
        assert_eq!(i2c.register(0x20, 0x01), 0b1000_1101);
        assert_eq!(rst.read_value().unwrap(), 0x3);
        assert!(rst.write_value(0x4).is_err());
    }

    #[test]
    fn test_unknown_line_kind_is_fatal() {
        let bench = MockBench::new();
        let mut drivers = DriverRegistry::new();
        register_builtin(&mut drivers).unwrap();
        bench.install(&mut drivers).unwrap();
        let mut builder = PlatformBuilder::new(drivers);

        let bad = tree(vec![ConfigNode::new("led").with_attr("name", "x").with_attr("register", "0")]);
        assert!(builder.register_device_tree(&bad).unwrap_err().is_fatal());
    }

    #[test]
    fn test_expander_needs_i2c_parent() {
        let mut drivers = DriverRegistry::new();
        register_builtin(&mut drivers).unwrap();
        let mut builder = PlatformBuilder::new(drivers);

        let bad = ConfigNode::new("devices").with_child(
            ConfigNode::new("pseudo-bus").with_attr("name", "soft").with_child(
                ConfigNode::new("gpio-expander")
                    .with_attr("name", "mux")
                    .with_attr("address", "0x20"),
            ),
        );
        assert!(builder.register_device_tree(&bad).unwrap_err().is_fatal());
    }
}
