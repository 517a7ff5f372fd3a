//! Chassis entities.
//!
//! An [`Entity`] is a fixed or field-replaceable unit of the chassis: the
//! system board, a fan tray, a PSU tray. Entities are built once by the
//! topology loader and never change structurally afterwards; only the
//! cached inventory snapshot and the lifecycle state move.

use crate::bus::BusId;
use crate::resource::ResourceId;
use chassis_core::constants::MAX_NUM_RESET;
use chassis_core::{
    EntityFeatures, EntityInfo, EntityInfoSnapshot, EntityState, EntityType, ResetType,
};
use std::fmt;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Index of an entity in its platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity{}", self.0)
    }
}

/// Pin and pin-group buses wired to an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityPins {
    pub presence: Option<BusId>,
    pub fault: Option<BusId>,
    pub power_output_status: Option<BusId>,
    pub power: Option<BusId>,
    pub reset: [Option<BusId>; MAX_NUM_RESET],
}

/// A chassis unit and the resources it contains.
#[derive(Debug)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) entity_type: EntityType,
    pub(crate) instance: u32,
    pub(crate) name: String,
    pub(crate) features: EntityFeatures,
    pub(crate) reset_values: [u32; MAX_NUM_RESET],
    pub(crate) delay: Duration,
    pub(crate) pins: EntityPins,
    pub(crate) entity_info: Option<ResourceId>,
    pub(crate) resources: Vec<ResourceId>,
    pub(crate) info_cache: RwLock<Option<EntityInfoSnapshot>>,
    pub(crate) state: Mutex<EntityState>,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// Alias of the entity, `<node>-<instance>` unless configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> EntityFeatures {
        self.features
    }

    pub fn is_feature_supported(&self, feature: EntityFeatures) -> bool {
        self.features.contains(feature)
    }

    pub fn is_hotswappable(&self) -> bool {
        self.is_feature_supported(EntityFeatures::HOTSWAPPABLE)
    }

    pub fn reset_value(&self, reset: ResetType) -> u32 {
        self.reset_values[reset.index()]
    }

    pub fn reset_group(&self, reset: ResetType) -> Option<BusId> {
        self.pins.reset[reset.index()]
    }

    /// Settle delay applied after reset and power-on.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pins(&self) -> &EntityPins {
        &self.pins
    }

    /// Entity-info resource, if the entity has one.
    pub fn entity_info_resource(&self) -> Option<ResourceId> {
        self.entity_info
    }

    /// Contained resources, in configuration order.
    pub fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    /// Last inventory snapshot read during initialisation.
    pub fn info_snapshot(&self) -> Option<EntityInfoSnapshot> {
        self.info_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cached inventory, or the default when never read.
    pub fn info(&self) -> EntityInfo {
        self.info_snapshot()
            .map(|snapshot| snapshot.info)
            .unwrap_or_default()
    }

    pub fn state(&self) -> EntityState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: EntityState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub(crate) fn store_info(&self, info: EntityInfo) {
        *self
            .info_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(EntityInfoSnapshot::now(info));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan_tray() -> Entity {
        Entity {
            id: EntityId(0),
            entity_type: EntityType::FanTray,
            instance: 1,
            name: "fan_tray-1".into(),
            features: EntityFeatures::HOTSWAPPABLE | EntityFeatures::COLD_RESET,
            reset_values: [0, 0x3],
            delay: Duration::from_millis(20),
            pins: EntityPins::default(),
            entity_info: None,
            resources: Vec::new(),
            info_cache: RwLock::new(None),
            state: Mutex::new(EntityState::NotInitialized),
        }
    }

    #[test]
    fn test_feature_queries() {
        let entity = fan_tray();
        assert!(entity.is_hotswappable());
        assert!(entity.is_feature_supported(EntityFeatures::COLD_RESET));
        assert!(!entity.is_feature_supported(EntityFeatures::WARM_RESET));
        assert_eq!(entity.reset_value(ResetType::Cold), 0x3);
        assert_eq!(entity.reset_group(ResetType::Cold), None);
    }

    #[test]
    fn test_info_cache() {
        let entity = fan_tray();
        assert!(entity.info_snapshot().is_none());
        assert_eq!(entity.info().max_speed, 0);

        entity.store_info(EntityInfo {
            max_speed: 21000,
            ..Default::default()
        });
        assert_eq!(entity.info().max_speed, 21000);
    }

    #[test]
    fn test_state_transitions() {
        let entity = fan_tray();
        assert_eq!(entity.state(), EntityState::NotInitialized);
        entity.set_state(EntityState::Initialized);
        assert_eq!(entity.state(), EntityState::Initialized);
    }
}
