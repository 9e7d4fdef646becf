use super::Action;
use super::Appliance;
use super::Category;

const MANUFACTURER: &str = "SmartHome";

fn light(id: &str, friendly_name: &str, room: &str, switch: &str) -> Appliance {
    Appliance {
        id: id.to_string(),
        friendly_name: friendly_name.to_string(),
        description: format!("The {} light controlled by AlexaPi", room),
        manufacturer: MANUFACTURER.to_string(),
        model: "Smart Light".to_string(),
        version: "1".to_string(),
        actions: vec![Action::TurnOn, Action::TurnOff],
        category: Category::Light,
        details: serde_json::Map::new(),
        gateway_target: switch.to_string(),
    }
}

/// The household the bridge was first deployed in: one thermostat and eight
/// lights over three floors.
///
/// Used whenever the configuration file lists no appliances.
pub fn builtin_appliances() -> Vec<Appliance> {
    vec![
        Appliance {
            id: "Thermostat".to_string(),
            friendly_name: "Thermostat".to_string(),
            description: "The thermostat controlled by AlexaPi".to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: "Smart Thermostat".to_string(),
            version: "1".to_string(),
            actions: vec![
                Action::TurnOn,
                Action::TurnOff,
                Action::SetTargetTemperature,
                Action::IncrementTargetTemperature,
                Action::DecrementTargetTemperature,
            ],
            category: Category::Thermostat,
            details: serde_json::Map::new(),
            gateway_target: "home".to_string(),
        },
        light("F1_DiningLight", "Dining Room Light", "dining room", "switch1d"),
        light("F1_KitchenLight", "Kitchen Light", "kitchen", "switch1c"),
        light("F1_HallLight", "Hall Light", "hall", "switch1b"),
        light("F1_PatioLight", "Patio Light", "patio", "switch1a"),
        light("F2_RestRoomLight", "Bathroom Light", "bathroom", "switch2c"),
        light("F2_BedRoomLight", "Bedroom Light", "bedroom", "switch2b"),
        light("F2_LivingRoomLight", "Living Room Light", "living room", "switch2a"),
        light("F3_AtticLight", "Attic Light", "attic", "switch3a"),
    ]
}
