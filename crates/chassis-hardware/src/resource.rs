//! Resource registry.
//!
//! A [`Resource`] is one controllable or observable capability instance: a
//! fan, an LED, a temperature sensor. Drivers create resources while the
//! device tree is registered; the topology builder later gives each one an
//! entity-scoped alias.

use crate::capability::CapabilityTable;
use crate::{HardwareError, Result};
use chassis_core::{Error as ConfigError, ResourceType};
use std::fmt;
use tracing::debug;

/// Index of a resource in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource{}", self.0)
    }
}

/// A typed resource and the driver behind it.
#[derive(Debug)]
pub struct Resource {
    id: ResourceId,
    resource_type: ResourceType,
    name: String,
    alias: Option<String>,
    table: CapabilityTable,
}

impl Resource {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Process-global name assigned by the driver.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity-scoped alias, once the resource is attached to an entity.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Driver behind this resource, after checking that the resource has the
    /// `expected` type.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PermissionDenied`] on a type mismatch.
    pub fn capability(&self, expected: ResourceType) -> Result<&CapabilityTable> {
        if self.resource_type != expected || self.table.resource_type() != expected {
            return Err(HardwareError::permission_denied(format!(
                "resource '{}' is {}, not {}",
                self.name, self.resource_type, expected
            )));
        }
        Ok(&self.table)
    }

    pub(crate) fn table(&self) -> &CapabilityTable {
        &self.table
    }
}

/// Append-only collection of resources, looked up by name or type.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
}

impl ResourceRegistry {
    /// Register a resource.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::ConfigurationFatal`] if `name` is already registered.
    /// * [`HardwareError::InvalidArgument`] if `table` implements another type.
    pub fn create_resource(
        &mut self,
        resource_type: ResourceType,
        name: impl Into<String>,
        table: CapabilityTable,
    ) -> Result<ResourceId> {
        let name = name.into();
        if table.resource_type() != resource_type {
            return Err(HardwareError::invalid_argument(format!(
                "resource '{name}' declared {resource_type} with a {} driver",
                table.resource_type()
            )));
        }
        if self.find_by_name(&name).is_some() {
            return Err(ConfigError::DuplicateName(name).into());
        }

        let id = ResourceId(self.resources.len());
        debug!(resource = %name, %resource_type, "creating resource");
        self.resources.push(Resource {
            id,
            resource_type,
            name,
            alias: None,
            table,
        });
        Ok(id)
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    /// Resource by id.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotFound`] for an id from another registry.
    pub fn resource(&self, id: ResourceId) -> Result<&Resource> {
        self.get(id)
            .ok_or_else(|| HardwareError::not_found(format!("resource {id}")))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn iter_of_type(&self, resource_type: ResourceType) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Apply `visit` to every resource of `resource_type`, in creation order.
    pub fn for_each_of_type<F>(&self, resource_type: ResourceType, mut visit: F)
    where
        F: FnMut(&Resource),
    {
        for resource in self.iter_of_type(resource_type) {
            visit(resource);
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub(crate) fn set_alias(&mut self, id: ResourceId, alias: impl Into<String>) -> Result<()> {
        let resource = self
            .resources
            .get_mut(id.0)
            .ok_or_else(|| HardwareError::not_found(format!("resource {id}")))?;
        resource.alias = Some(alias.into());
        Ok(())
    }
}
