//! Entity lifecycle: presence, fault, PSU output status, initialisation,
//! reset and power sequencing.
//!
//! ```text
//! Unknown ──(topology loaded)──► NotInitialized ──(init ok)──► Initialized
//!                                     ▲                            │
//!                                     └──── reset / power-off ─────┘
//! ```

use crate::bus::BusId;
use crate::entity::{Entity, EntityId};
use crate::platform::Platform;
use crate::{HardwareError, Result};
use chassis_core::{EntityFeatures, EntityState, EntityType, PinLevel, ResetType, ResourceType};
use std::thread;
use tracing::{debug, error, info, warn};

impl Platform {
    /// Whether the entity is physically present.
    ///
    /// Fixed entities are always present. Hot-swappable entities are present
    /// when their presence pin reads high.
    ///
    /// # Errors
    ///
    /// Propagates pin read failures.
    pub fn presence_get(&self, id: EntityId) -> Result<bool> {
        let entity = self.entity(id)?;
        self.is_present(entity)
    }

    fn is_present(&self, entity: &Entity) -> Result<bool> {
        if !entity.is_hotswappable() {
            return Ok(true);
        }
        match entity.pins.presence {
            Some(pin) => self.read_pin(pin),
            None => Ok(true),
        }
    }

    fn read_pin(&self, pin: BusId) -> Result<bool> {
        Ok(self.buses.bus(pin)?.as_pin()?.read_level()?.is_high())
    }

    /// Fault status of the entity.
    ///
    /// A dedicated fault pin is read directly. Without one, the entity must be
    /// present and the result is the OR of its fans' fault indicators. Fans
    /// whose fault read fails are skipped.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::NotPresent`] if the entity is absent and has no
    ///   fault pin.
    /// * Pin read failures.
    pub fn fault_status_get(&self, id: EntityId) -> Result<bool> {
        let entity = self.entity(id)?;
        if let Some(pin) = entity.pins.fault {
            return self.read_pin(pin);
        }
        if !self.is_present(entity)? {
            return Err(HardwareError::not_present(entity.name()));
        }

        // Only fans report entity-level faults for now.
        let mut fault = false;
        for resource in self.entity_resources(id) {
            if resource.resource_type() != ResourceType::Fan {
                continue;
            }
            match resource.fan_fault_get() {
                Ok(status) => fault |= status,
                Err(e) => debug!(
                    entity = entity.name(),
                    fan = resource.name(),
                    error = %e,
                    "fan fault status unavailable"
                ),
            }
        }
        Ok(fault)
    }

    /// Output power status of a PSU tray.
    ///
    /// Without a `power_output_status` pin the status reads `false` and the
    /// call succeeds. That result cannot be told apart from a real "no
    /// output" reading.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::NotSupported`] for entities other than PSU trays.
    /// * [`HardwareError::PermissionDenied`] if the PSU is absent.
    /// * Pin read failures.
    pub fn psu_output_power_status_get(&self, id: EntityId) -> Result<bool> {
        let entity = self.entity(id)?;
        if entity.entity_type() != EntityType::PsuTray {
            return Err(HardwareError::not_supported(format!(
                "output power status on {}",
                entity.entity_type()
            )));
        }
        if !self.is_present(entity)? {
            return Err(HardwareError::permission_denied(format!(
                "{} is not present",
                entity.name()
            )));
        }
        match entity.pins.power_output_status {
            Some(pin) => self.read_pin(pin),
            None => Ok(false),
        }
    }

    /// Initialise an entity and its resources.
    ///
    /// The entity-info resource, if any, is read first and replaces the
    /// cached inventory; a failed read keeps the previous cache. Every
    /// contained resource is then initialised in configuration order. Fans
    /// are seeded with the inventory's maximum speed. A failing resource does
    /// not stop the others.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::PermissionDenied`] if the entity is absent; nothing
    ///   is initialised.
    /// * [`HardwareError::PartialInit`] if any resource failed.
    pub fn entity_init(&self, id: EntityId) -> Result<()> {
        let entity = self.entity(id)?;
        if !self.is_present(entity)? {
            return Err(HardwareError::permission_denied(format!(
                "{} is not present",
                entity.name()
            )));
        }

        if let Some(info_id) = entity.entity_info {
            match self.resources.resource(info_id)?.entity_info_read() {
                Ok(info) => entity.store_info(info),
                Err(e) => warn!(entity = entity.name(), error = %e, "entity info read failed"),
            }
        }
        let max_speed = entity.info().max_speed;

        let total = entity.resources.len();
        let mut failed = 0;
        for resource in self.entity_resources(id) {
            let seed = match resource.resource_type() {
                ResourceType::Fan => max_speed,
                _ => 0,
            };
            if let Err(e) = resource.init(seed) {
                error!(
                    entity = entity.name(),
                    resource = resource.name(),
                    error = %e,
                    "resource init failed"
                );
                failed += 1;
            }
        }

        if failed > 0 {
            entity.set_state(EntityState::NotInitialized);
            return Err(HardwareError::PartialInit { failed, total });
        }
        entity.set_state(EntityState::Initialized);
        info!(entity = entity.name(), resources = total, "entity initialized");
        Ok(())
    }

    /// Reset an entity by a raw reset-type index.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::NotSupported`] for an index outside the
    /// known reset types, otherwise as [`Platform::entity_reset`].
    pub fn entity_reset_raw(&self, id: EntityId, reset: u32) -> Result<()> {
        let reset = ResetType::try_from(reset)
            .map_err(|e| HardwareError::not_supported(e.to_string()))?;
        self.entity_reset(id, reset)
    }

    /// Reset an entity.
    ///
    /// Writes the configured reset value to the entity's reset pin group,
    /// waits for the settle delay, then re-runs [`Platform::entity_init`].
    /// The outcome of re-initialisation is logged, not returned.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::NotSupported`] if the entity cannot do `reset`.
    /// * [`HardwareError::InvalidArgument`] if no reset pin group resolved.
    /// * Pin-group acquire or write failures; nothing further happens.
    pub fn entity_reset(&self, id: EntityId, reset: ResetType) -> Result<()> {
        let entity = self.entity(id)?;
        if !entity.is_feature_supported(reset.feature()) {
            return Err(HardwareError::not_supported(format!(
                "{reset} reset on {}",
                entity.name()
            )));
        }
        let group = entity.reset_group(reset).ok_or_else(|| {
            HardwareError::invalid_argument(format!(
                "{} has no {reset} reset pin group",
                entity.name()
            ))
        })?;

        {
            let bus = self.buses.bus(group)?;
            let guard = bus.as_pin_group()?.acquire()?;
            guard.write(entity.reset_value(reset))?;
        }
        info!(entity = entity.name(), %reset, "entity reset asserted");
        entity.set_state(EntityState::NotInitialized);

        self.settle_and_reinit(entity);
        Ok(())
    }

    /// Switch an entity's power on or off.
    ///
    /// After a successful power-on the settle delay elapses and the entity is
    /// re-initialised; the re-initialisation outcome is logged, not returned.
    ///
    /// # Errors
    ///
    /// * [`HardwareError::NotSupported`] if the entity has no power control
    ///   or its power pin did not resolve.
    /// * Pin write failures.
    pub fn entity_power_status_control(&self, id: EntityId, enable: bool) -> Result<()> {
        let entity = self.entity(id)?;
        if !entity.is_feature_supported(EntityFeatures::POWER_CONTROL) {
            return Err(HardwareError::not_supported(format!(
                "power control on {}",
                entity.name()
            )));
        }
        let pin = entity.pins.power.ok_or_else(|| {
            HardwareError::not_supported(format!("{} has no power pin", entity.name()))
        })?;

        self.buses
            .bus(pin)?
            .as_pin()?
            .write_level(PinLevel::from(enable))?;
        info!(entity = entity.name(), enable, "entity power switched");

        if enable {
            self.settle_and_reinit(entity);
        } else {
            entity.set_state(EntityState::NotInitialized);
        }
        Ok(())
    }

    /// Initialise every fixed (non-hotswappable) entity.
    ///
    /// # Errors
    ///
    /// Returns the first failure after attempting every fixed entity.
    pub fn init_fixed_entities(&self) -> Result<()> {
        let mut first_error = None;
        for entity in self.entities.iter().filter(|e| !e.is_hotswappable()) {
            if let Err(e) = self.entity_init(entity.id()) {
                error!(entity = entity.name(), error = %e, "fixed entity init failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn settle_and_reinit(&self, entity: &Entity) {
        if !entity.delay().is_zero() {
            thread::sleep(entity.delay());
        }
        if let Err(e) = self.entity_init(entity.id()) {
            warn!(entity = entity.name(), error = %e, "re-initialization failed");
        }
    }
}
