//! Declared topology against what the platform discovered.
//!
//! Every entity and resource reference in the topology document must be
//! reachable through the platform accessors, with matching types and
//! aliases.

mod common;

use chassis_core::constants::{ATTR_INSTANCE, ATTR_NAME, ATTR_REFERENCE, ATTR_TYPE};
use chassis_core::{ConfigNode, EntityType};
use common::chassis;

#[test]
fn test_declared_entities_are_discovered() {
    let chassis = chassis();
    let platform = &chassis.platform;
    let document = ConfigNode::from_json_str(common::ENTITIES).unwrap();

    assert_eq!(platform.entities().count(), document.children.len());

    for declared in &document.children {
        let entity_type: EntityType = declared.attr(ATTR_TYPE).unwrap().parse().unwrap();
        let instance: u32 = declared.parse_required_attr(ATTR_INSTANCE).unwrap();
        let id = platform
            .entity_lookup(entity_type, instance)
            .unwrap_or_else(|| panic!("{entity_type} {instance} not discovered"));

        let entity = platform.entity(id).unwrap();
        assert_eq!(entity.resources().len(), declared.children.len());

        for child in &declared.children {
            let reference = child.attr(ATTR_REFERENCE).unwrap();
            let alias = child.attr(ATTR_NAME).unwrap();
            let resource = platform.resource_by_name(reference).unwrap();

            assert_eq!(resource.alias(), Some(alias));
            assert_eq!(
                platform.resource_lookup(id, resource.resource_type(), alias),
                Some(resource.id())
            );
        }
    }
}

#[test]
fn test_resource_counts_match_registry() {
    let chassis = chassis();
    let platform = &chassis.platform;

    let mut attached = 0;
    platform.for_each_entity(|entity| attached += entity.resources().len());

    // every registered resource belongs to exactly one entity
    assert_eq!(attached, platform.resources().len());
    for resource in platform.resources().iter() {
        assert!(resource.alias().is_some(), "{} has no alias", resource.name());
    }
}

#[test]
fn test_device_tree_buses() {
    let chassis = chassis();
    let buses = chassis.platform.buses();

    let i2c = buses.find_by_name("i2c-3").unwrap();
    assert_eq!(i2c.device_names(), vec!["mux3"]);
    assert_eq!(buses.children(i2c.id()).count(), 4);

    let soft = buses.find_by_name("soft").unwrap();
    assert_eq!(buses.children(soft.id()).count(), 3);
    assert_eq!(soft.device_count(), 8);
}

#[test]
fn test_sample_configuration_loads() {
    let bench = chassis_hardware::mock::MockBench::new();
    let devices = ConfigNode::from_json_str(include_str!("../../../configs/devices.json")).unwrap();
    let entities =
        ConfigNode::from_json_str(include_str!("../../../configs/entities.json")).unwrap();
    let platform =
        chassis_hardware::Platform::from_documents(common::drivers(&bench), &devices, &entities)
            .unwrap();

    assert_eq!(platform.entity_count(EntityType::FanTray), 2);
    platform.init_fixed_entities().unwrap();

    let psu = platform.entity_lookup(EntityType::PsuTray, 1).unwrap();
    assert!(platform.psu_output_power_status_get(psu).unwrap());
    let board = platform.entity_lookup(EntityType::SystemBoard, 1).unwrap();
    assert_eq!(platform.entity_info(board).unwrap().product_name, "S6000-ON");
}
