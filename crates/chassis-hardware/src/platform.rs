//! Platform context.
//!
//! [`PlatformBuilder`] runs the single-threaded start-up phase: drivers
//! materialise the device tree, buses are initialised, then the entity
//! topology is loaded on top. [`PlatformBuilder::build`] freezes the result
//! into a [`Platform`], which is `Sync` and read-only apart from per-bus
//! locks and per-entity runtime state.
//!
//! # Examples
//!
//! ```
//! use chassis_core::{ConfigNode, EntityType};
//! use chassis_hardware::driver::DriverRegistry;
//! use chassis_hardware::mock::MockBench;
//! use chassis_hardware::platform::Platform;
//!
//! # fn main() -> chassis_hardware::Result<()> {
//! let bench = MockBench::new();
//! let mut drivers = DriverRegistry::new();
//! bench.install(&mut drivers)?;
//!
//! let devices = ConfigNode::from_json_str(r#"{
//!     "name": "devices",
//!     "children": [{ "name": "mock-fan", "attributes": { "name": "fan_0" } }]
//! }"#)?;
//! let entities = ConfigNode::from_json_str(r#"{
//!     "name": "entities",
//!     "children": [{
//!         "name": "fan_tray",
//!         "attributes": { "instance": "1", "type": "SDI_ENTITY_FAN_TRAY", "presence": "FIXED_SLOT" },
//!         "children": [{ "name": "resource", "attributes": { "reference": "fan_0", "name": "fan1" } }]
//!     }]
//! }"#)?;
//!
//! let platform = Platform::from_documents(drivers, &devices, &entities)?;
//! assert_eq!(platform.entity_count(EntityType::FanTray), 1);
//! # Ok(())
//! # }
//! ```

use crate::bus::{Bus, BusArena, BusId, BusKind, Device};
use crate::capability::CapabilityTable;
use crate::driver::DriverRegistry;
use crate::entity::{Entity, EntityId};
use crate::resource::{Resource, ResourceId, ResourceRegistry};
use crate::topology;
use crate::{HardwareError, Result};
use chassis_core::{
    ConfigNode, EntityFeatures, EntityInfo, EntityState, EntityType, Error as ConfigError,
    ResourceType,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Start-up configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Device-tree document.
    pub device_tree: PathBuf,

    /// Entity topology document.
    pub entities: PathBuf,

    /// Initialise non-hotswappable entities during bootstrap.
    pub init_fixed_entities: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            device_tree: PathBuf::from("/etc/chassis/devices.json"),
            entities: PathBuf::from("/etc/chassis/entities.json"),
            init_fixed_entities: true,
        }
    }
}

/// Start-up phase of a [`Platform`].
#[derive(Debug)]
pub struct PlatformBuilder {
    drivers: DriverRegistry,
    buses: BusArena,
    resources: ResourceRegistry,
    entities: Vec<Entity>,
}

impl PlatformBuilder {
    pub fn new(drivers: DriverRegistry) -> Self {
        Self {
            drivers,
            buses: BusArena::default(),
            resources: ResourceRegistry::default(),
            entities: Vec::new(),
        }
    }

    pub fn drivers_mut(&mut self) -> &mut DriverRegistry {
        &mut self.drivers
    }

    /// Register every top-level node of a device-tree document.
    ///
    /// # Errors
    ///
    /// Returns the first registration failure.
    pub fn register_device_tree(&mut self, root: &ConfigNode) -> Result<()> {
        for node in &root.children {
            self.register_node(node, None)?;
        }
        info!(
            buses = self.buses.len(),
            resources = self.resources.len(),
            "device tree registered"
        );
        Ok(())
    }

    /// Hand `node` to the driver registered under its name.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationFatal`] if no driver handles the
    /// node, or the driver's own error.
    pub fn register_node(&mut self, node: &ConfigNode, parent: Option<BusId>) -> Result<()> {
        let driver = self
            .drivers
            .get(&node.name)
            .ok_or_else(|| ConfigError::unknown("driver", &node.name))?;
        debug!(driver = %node.name, ?parent, "registering node");
        driver.register(node, parent, self)
    }

    /// Register the children of `node` under `parent`.
    pub fn register_children(&mut self, node: &ConfigNode, parent: BusId) -> Result<()> {
        for child in &node.children {
            self.register_node(child, Some(parent))?;
        }
        Ok(())
    }

    pub fn add_bus(
        &mut self,
        name: impl Into<String>,
        parent: Option<BusId>,
        kind: BusKind,
    ) -> Result<BusId> {
        self.buses.insert(name, parent, kind)
    }

    /// Attach a device to a bus's device list.
    pub fn attach_device(&mut self, bus: BusId, device: Arc<dyn Device>) -> Result<()> {
        self.buses.bus(bus)?.attach(device);
        Ok(())
    }

    pub fn create_resource(
        &mut self,
        resource_type: ResourceType,
        name: impl Into<String>,
        table: CapabilityTable,
    ) -> Result<ResourceId> {
        self.resources.create_resource(resource_type, name, table)
    }

    pub fn bus(&self, id: BusId) -> Result<&Arc<Bus>> {
        self.buses.bus(id)
    }

    pub fn buses(&self) -> &BusArena {
        &self.buses
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Initialise every registered bus and its devices.
    pub fn init_buses(&self) -> Result<()> {
        self.buses.init_all()
    }

    /// Build the entities declared in a topology document.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationFatal`] for malformed entities
    /// and unresolved references.
    pub fn load_entities(&mut self, root: &ConfigNode) -> Result<()> {
        topology::load_entities(root, &self.buses, &mut self.resources, &mut self.entities)
    }

    /// Freeze the start-up state.
    pub fn build(self) -> Platform {
        info!(
            entities = self.entities.len(),
            resources = self.resources.len(),
            buses = self.buses.len(),
            "platform ready"
        );
        Platform {
            drivers: self.drivers,
            buses: self.buses,
            resources: self.resources,
            entities: self.entities,
        }
    }
}

/// The frozen platform: buses, resources and entities.
#[derive(Debug)]
pub struct Platform {
    pub(crate) drivers: DriverRegistry,
    pub(crate) buses: BusArena,
    pub(crate) resources: ResourceRegistry,
    pub(crate) entities: Vec<Entity>,
}

impl Platform {
    /// Register a device tree, initialise its buses and load a topology.
    ///
    /// # Errors
    ///
    /// Any failure aborts start-up.
    pub fn from_documents(
        drivers: DriverRegistry,
        device_tree: &ConfigNode,
        topology: &ConfigNode,
    ) -> Result<Self> {
        let mut builder = PlatformBuilder::new(drivers);
        builder.register_device_tree(device_tree)?;
        builder.init_buses()?;
        builder.load_entities(topology)?;
        Ok(builder.build())
    }

    /// Load both documents named by `config` and start the platform.
    ///
    /// Failures while initialising fixed entities are logged; the platform is
    /// still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be loaded or start-up fails.
    pub fn bootstrap(config: &PlatformConfig, drivers: DriverRegistry) -> Result<Self> {
        let device_tree = ConfigNode::load(&config.device_tree)?;
        let topology = ConfigNode::load(&config.entities)?;
        let platform = Self::from_documents(drivers, &device_tree, &topology)?;

        if config.init_fixed_entities
            && let Err(e) = platform.init_fixed_entities()
        {
            warn!(error = %e, "fixed entity initialization incomplete");
        }
        Ok(platform)
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn buses(&self) -> &BusArena {
        &self.buses
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    // Entities

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotFound`] for an id from another platform.
    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(id.0)
            .ok_or_else(|| HardwareError::not_found(format!("entity {id}")))
    }

    /// Number of entities of `entity_type`.
    pub fn entity_count(&self, entity_type: EntityType) -> usize {
        self.entities
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .count()
    }

    /// Entity with the given type and instance number.
    pub fn entity_lookup(&self, entity_type: EntityType, instance: u32) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|e| e.entity_type == entity_type && e.instance == instance)
            .map(Entity::id)
    }

    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .map(Entity::id)
    }

    pub fn for_each_entity<F>(&self, mut visit: F)
    where
        F: FnMut(&Entity),
    {
        for entity in &self.entities {
            visit(entity);
        }
    }

    pub fn entity_name_get(&self, id: EntityId) -> Result<&str> {
        Ok(self.entity(id)?.name())
    }

    pub fn entity_type_get(&self, id: EntityId) -> Result<EntityType> {
        Ok(self.entity(id)?.entity_type())
    }

    pub fn entity_state(&self, id: EntityId) -> Result<EntityState> {
        Ok(self.entity(id)?.state())
    }

    /// Cached inventory of an entity, as of its last initialisation.
    pub fn entity_info(&self, id: EntityId) -> Result<EntityInfo> {
        Ok(self.entity(id)?.info())
    }

    pub fn is_feature_supported(&self, id: EntityId, feature: EntityFeatures) -> Result<bool> {
        Ok(self.entity(id)?.is_feature_supported(feature))
    }

    // Resources

    /// Resource by id.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotFound`] for an id from another platform.
    pub fn resource(&self, id: ResourceId) -> Result<&Resource> {
        self.resources.resource(id)
    }

    pub fn resource_by_name(&self, name: &str) -> Option<&Resource> {
        self.resources.find_by_name(name)
    }

    pub fn resource_type_get(&self, id: ResourceId) -> Result<ResourceType> {
        Ok(self.resource(id)?.resource_type())
    }

    pub fn resource_alias_get(&self, id: ResourceId) -> Result<Option<&str>> {
        Ok(self.resource(id)?.alias())
    }

    /// Resource of `resource_type` aliased `alias` inside an entity.
    pub fn resource_lookup(
        &self,
        entity: EntityId,
        resource_type: ResourceType,
        alias: &str,
    ) -> Option<ResourceId> {
        self.entity_resources(entity)
            .find(|r| r.resource_type() == resource_type && r.alias() == Some(alias))
            .map(Resource::id)
    }

    /// Number of resources of `resource_type` inside an entity.
    pub fn entity_resource_count(
        &self,
        entity: EntityId,
        resource_type: ResourceType,
    ) -> Result<usize> {
        self.entity(entity)?;
        Ok(self
            .entity_resources(entity)
            .filter(|r| r.resource_type() == resource_type)
            .count())
    }

    /// Apply `visit` to each resource of an entity, in configuration order.
    pub fn for_each_resource<F>(&self, entity: EntityId, mut visit: F) -> Result<()>
    where
        F: FnMut(&Resource),
    {
        self.entity(entity)?;
        for resource in self.entity_resources(entity) {
            visit(resource);
        }
        Ok(())
    }

    pub(crate) fn entity_resources(&self, entity: EntityId) -> impl Iterator<Item = &Resource> {
        self.entities
            .get(entity.0)
            .map(|e| e.resources.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.resources.get(*id))
    }
}
