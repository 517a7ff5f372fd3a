use super::{Bus, BusId, BusKind};
use crate::{HardwareError, Result};
use chassis_core::{BusType, Error as ConfigError};
use std::sync::Arc;
use tracing::{debug, info};

/// Append-only arena of buses.
///
/// Buses are referenced by [`BusId`]. A bus's parent must already be in the
/// arena when the bus is inserted, which keeps the bus tree acyclic.
#[derive(Debug, Default)]
pub struct BusArena {
    buses: Vec<Arc<Bus>>,
}

impl BusArena {
    /// Allocate a bus.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::ConfigurationFatal`] if the name is already taken.
    /// * [`HardwareError::NotFound`] if `parent` is not in the arena.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        parent: Option<BusId>,
        kind: BusKind,
    ) -> Result<BusId> {
        let name = name.into();
        if self.find_by_name(&name).is_some() {
            return Err(ConfigError::DuplicateName(name).into());
        }
        if let Some(parent) = parent {
            self.bus(parent)?;
        }

        let id = BusId(self.buses.len());
        debug!(bus = %name, %id, ?parent, kind = ?kind, "registering bus");
        self.buses.push(Arc::new(Bus::new(id, name, parent, kind)));
        Ok(id)
    }

    pub fn get(&self, id: BusId) -> Option<&Arc<Bus>> {
        self.buses.get(id.0)
    }

    /// Bus by id.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotFound`] for an id from another arena.
    pub fn bus(&self, id: BusId) -> Result<&Arc<Bus>> {
        self.get(id)
            .ok_or_else(|| HardwareError::not_found(format!("bus {id}")))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Arc<Bus>> {
        self.buses.iter().find(|bus| bus.name() == name)
    }

    /// Look up a bus by name and require its type.
    ///
    /// Returns `None` if no bus has that name or it is of another type.
    pub fn find_typed(&self, name: &str, bus_type: BusType) -> Option<BusId> {
        self.find_by_name(name)
            .filter(|bus| bus.bus_type() == bus_type)
            .map(|bus| bus.id())
    }

    pub fn children(&self, parent: BusId) -> impl Iterator<Item = &Arc<Bus>> {
        self.buses
            .iter()
            .filter(move |bus| bus.parent() == Some(parent))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Bus>> {
        self.buses.iter()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// Initialise every bus in registration order, so parents come up
    /// before their children.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later buses are not initialised.
    pub fn init_all(&self) -> Result<()> {
        for bus in &self.buses {
            bus.init()?;
        }
        info!(buses = self.buses.len(), "buses initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockI2cBus, MockPin};
    use chassis_core::{I2cCapability, PinLevel};

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut arena = BusArena::default();
        let a = arena.insert("a", None, BusKind::Pseudo).unwrap();
        let b = arena.insert("b", Some(a), BusKind::Pseudo).unwrap();

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.children(a).count(), 1);
    }

    #[test]
    fn test_duplicate_name_is_fatal() {
        let mut arena = BusArena::default();
        arena.insert("i2c-0", None, BusKind::Pseudo).unwrap();
        let err = arena.insert("i2c-0", None, BusKind::Pseudo).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_parent() {
        let mut arena = BusArena::default();
        let result = arena.insert("orphan", Some(BusId(7)), BusKind::Pseudo);
        assert!(matches!(result, Err(HardwareError::NotFound { .. })));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_find_typed() {
        let mut arena = BusArena::default();
        let (i2c, _h) = MockI2cBus::new(I2cCapability::all());
        let (pin, _p) = MockPin::new(PinLevel::Low);
        arena.insert("i2c-0", None, BusKind::I2c(Box::new(i2c))).unwrap();
        let pin_id = arena.insert("prs", None, BusKind::Pin(Box::new(pin))).unwrap();

        assert_eq!(arena.find_typed("prs", BusType::Pin), Some(pin_id));
        assert_eq!(arena.find_typed("i2c-0", BusType::Pin), None);
        assert_eq!(arena.find_typed("missing", BusType::Pin), None);
    }
}
