//! Built-in bus and device drivers.

mod expander;
mod pseudo;

pub use expander::GpioExpanderDriver;
pub use pseudo::PseudoBusDriver;

use crate::Result;
use crate::driver::DriverRegistry;
use chassis_core::{ConfigNode, Error as ConfigError};
use std::sync::Arc;

/// Device-tree key of [`PseudoBusDriver`].
pub const PSEUDO_BUS: &str = "pseudo-bus";

/// Device-tree key of [`GpioExpanderDriver`].
pub const GPIO_EXPANDER: &str = "gpio-expander";

/// Register the built-in drivers.
///
/// # Errors
///
/// Fails if one of the keys is already taken.
pub fn register_builtin(registry: &mut DriverRegistry) -> Result<()> {
    registry.register_driver(PSEUDO_BUS, Arc::new(PseudoBusDriver))?;
    registry.register_driver(GPIO_EXPANDER, Arc::new(GpioExpanderDriver))?;
    Ok(())
}

/// Parse a required hexadecimal attribute that must fit in a byte.
pub(crate) fn required_hex_u8(node: &ConfigNode, attribute: &str) -> Result<u8> {
    let value = node
        .parse_hex_attr(attribute)?
        .ok_or_else(|| ConfigError::missing_attribute(&node.name, attribute))?;
    u8::try_from(value).map_err(|_| {
        ConfigError::invalid_attribute(&node.name, attribute, format!("{value:#x}")).into()
    })
}
