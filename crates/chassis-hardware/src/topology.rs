//! Entity topology builder.
//!
//! The topology document lists the chassis entities and, for each, the
//! resources it contains:
//!
//! ```json
//! {
//!   "name": "entities",
//!   "children": [
//!     {
//!       "name": "fan_tray",
//!       "attributes": {
//!         "instance": "1",
//!         "type": "SDI_ENTITY_FAN_TRAY",
//!         "presence": "pin_mux3_bit2"
//!       },
//!       "children": [
//!         { "name": "resource", "attributes": { "reference": "fan_0", "name": "fan1" } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Pins and resources are resolved by name, so the device tree must be
//! registered and its buses initialised first.

use crate::bus::{BusArena, BusId};
use crate::entity::{Entity, EntityId, EntityPins};
use crate::resource::ResourceRegistry;
use crate::Result;
use chassis_core::constants::{
    ATTR_ALIAS, ATTR_DELAY, ATTR_FAULT, ATTR_INSTANCE, ATTR_NAME, ATTR_POWER,
    ATTR_POWER_OUTPUT_STATUS, ATTR_PRESENCE, ATTR_REFERENCE, ATTR_TYPE, FIXED_SLOT,
    MAX_NUM_RESET,
};
use chassis_core::{
    BusType, ConfigNode, EntityFeatures, EntityState, EntityType, Error as ConfigError,
    ResetType, ResourceType,
};
use std::collections::HashSet;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Build every entity declared under `root` and append it to `entities`.
///
/// # Errors
///
/// Any malformed entity aborts the load with
/// [`HardwareError::ConfigurationFatal`](crate::HardwareError::ConfigurationFatal).
pub(crate) fn load_entities(
    root: &ConfigNode,
    buses: &BusArena,
    resources: &mut ResourceRegistry,
    entities: &mut Vec<Entity>,
) -> Result<()> {
    for node in &root.children {
        let entity = build_entity(EntityId(entities.len()), node, buses, resources)?;

        if entities
            .iter()
            .any(|e| e.entity_type == entity.entity_type && e.instance == entity.instance)
        {
            return Err(ConfigError::DuplicateName(format!(
                "{} instance {}",
                entity.entity_type, entity.instance
            ))
            .into());
        }
        if entities.iter().any(|e| e.name == entity.name) {
            return Err(ConfigError::DuplicateName(entity.name).into());
        }

        info!(
            entity = %entity.name,
            entity_type = %entity.entity_type,
            instance = entity.instance,
            resources = entity.resources.len(),
            hotswap = entity.is_hotswappable(),
            "entity registered"
        );
        entities.push(entity);
    }
    Ok(())
}

fn build_entity(
    id: EntityId,
    node: &ConfigNode,
    buses: &BusArena,
    resources: &mut ResourceRegistry,
) -> Result<Entity> {
    let entity_type: EntityType = node.required_attr(ATTR_TYPE)?.parse()?;
    let instance: u32 = node.parse_required_attr(ATTR_INSTANCE)?;
    let name = match node.attr(ATTR_ALIAS) {
        Some(alias) => alias.to_string(),
        None => format!("{}-{}", node.name, instance),
    };
    debug!(entity = %name, %entity_type, "building entity");

    let mut features = EntityFeatures::empty();
    let mut pins = EntityPins::default();

    let presence = node.required_attr(ATTR_PRESENCE)?;
    if presence != FIXED_SLOT {
        let pin = buses
            .find_typed(presence, BusType::Pin)
            .ok_or_else(|| {
                ConfigError::UnresolvedReference(format!("presence pin '{presence}' of {name}"))
            })?;
        pins.presence = Some(pin);
        features |= EntityFeatures::HOTSWAPPABLE;
    }

    pins.fault = optional_bus(node, ATTR_FAULT, BusType::Pin, buses, &name);
    pins.power_output_status =
        optional_bus(node, ATTR_POWER_OUTPUT_STATUS, BusType::Pin, buses, &name);

    if node.attr(ATTR_POWER).is_some() {
        features |= EntityFeatures::POWER_CONTROL;
        pins.power = optional_bus(node, ATTR_POWER, BusType::Pin, buses, &name);
    }

    let mut reset_values = [0u32; MAX_NUM_RESET];
    for reset in ResetType::ALL {
        if let Some(value) = node.parse_hex_attr(reset.value_attribute())? {
            reset_values[reset.index()] = value;
            features |= reset.feature();
        }
        pins.reset[reset.index()] = optional_bus(
            node,
            reset.register_attribute(),
            BusType::PinGroup,
            buses,
            &name,
        );
    }

    let delay = Duration::from_millis(node.parse_attr::<u64>(ATTR_DELAY)?.unwrap_or(0));

    let mut contained = Vec::with_capacity(node.children.len());
    let mut aliases = HashSet::new();
    let mut entity_info = None;
    for child in &node.children {
        let reference = child.required_attr(ATTR_REFERENCE)?;
        let alias = child.required_attr(ATTR_NAME)?;

        let resource = resources.find_by_name(reference).ok_or_else(|| {
            ConfigError::UnresolvedReference(format!("resource '{reference}' of {name}"))
        })?;
        let (resource_id, resource_type) = (resource.id(), resource.resource_type());
        if let Some(previous) = resource.alias() {
            warn!(resource = reference, previous, alias, "resource re-aliased");
        }

        if !aliases.insert(alias) {
            return Err(ConfigError::DuplicateName(format!("{name}/{alias}")).into());
        }
        resources.set_alias(resource_id, alias)?;

        if resource_type == ResourceType::EntityInfo {
            if entity_info.is_none() {
                entity_info = Some(resource_id);
            } else {
                warn!(entity = %name, resource = reference, "extra entity-info resource ignored");
            }
        }
        debug!(entity = %name, resource = reference, alias, "resource attached");
        contained.push(resource_id);
    }

    Ok(Entity {
        id,
        entity_type,
        instance,
        name,
        features,
        reset_values,
        delay,
        pins,
        entity_info,
        resources: contained,
        info_cache: RwLock::new(None),
        state: Mutex::new(EntityState::NotInitialized),
    })
}

/// Resolve an optional pin reference. A name that does not resolve is
/// logged and treated as absent.
fn optional_bus(
    node: &ConfigNode,
    attribute: &str,
    bus_type: BusType,
    buses: &BusArena,
    entity: &str,
) -> Option<BusId> {
    let target = node.attr(attribute)?;
    let resolved = buses.find_typed(target, bus_type);
    if resolved.is_none() {
        warn!(entity, attribute, target, %bus_type, "bus reference not resolved");
    }
    resolved
}
