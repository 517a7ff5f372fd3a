use crate::Result;
use crate::bus::{BusId, BusKind};
use crate::driver::DeviceDriver;
use crate::platform::PlatformBuilder;
use chassis_core::ConfigNode;
use chassis_core::constants::ATTR_NAME;

/// Virtual bus grouping devices that have no physical transport.
///
/// ```json
/// { "name": "pseudo-bus", "attributes": { "name": "soft" }, "children": [ ... ] }
/// ```
#[derive(Debug, Default)]
pub struct PseudoBusDriver;

impl DeviceDriver for PseudoBusDriver {
    fn register(
        &self,
        node: &ConfigNode,
        parent: Option<BusId>,
        builder: &mut PlatformBuilder,
    ) -> Result<()> {
        let name = node.required_attr(ATTR_NAME)?;
        let id = builder.add_bus(name, parent, BusKind::Pseudo)?;
        builder.register_children(node, id)
    }
}
