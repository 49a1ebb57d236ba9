//! Vehicle identifier resolution
//!
//! Maps free-text plate tokens (`9245-MJC`, `1257MTY`, `MLB`) and route-sheet
//! device codes to canonical vehicle ids. Lookups never guess: a token that
//! matches nothing resolves to `None`.

use tracing::debug;

/// Upper-case and drop whitespace and hyphens
pub fn normalize_plate(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Ordered plate and device tables
#[derive(Debug, Clone, Default)]
pub struct VehicleRegistry {
    /// (normalized plate, vehicle id) in registration order
    plates: Vec<(String, String)>,
    /// (normalized device code, vehicle id)
    devices: Vec<(String, String)>,
}

impl VehicleRegistry {
    pub fn add_plate(&mut self, plate: &str, vehicle_id: &str) {
        let key = normalize_plate(plate);
        if !key.is_empty() && !self.plates.iter().any(|(k, _)| *k == key) {
            self.plates.push((key, vehicle_id.to_string()));
        }
    }

    pub fn add_device(&mut self, device: &str, vehicle_id: &str) {
        let key = normalize_plate(device);
        if !key.is_empty() && !self.devices.iter().any(|(k, _)| *k == key) {
            self.devices.push((key, vehicle_id.to_string()));
        }
    }

    /// Resolve a plate token: exact match first, then containment either way
    pub fn resolve(&self, token: &str) -> Option<&str> {
        let key = normalize_plate(token);
        if key.is_empty() {
            return None;
        }

        if let Some((_, id)) = self.plates.iter().find(|(plate, _)| *plate == key) {
            return Some(id.as_str());
        }

        let found = self
            .plates
            .iter()
            .find(|(plate, _)| plate.contains(&key) || key.contains(plate.as_str()))
            .map(|(_, id)| id.as_str());

        if found.is_none() {
            debug!("Unresolved vehicle token: {}", token);
        }
        found
    }

    /// Resolve a route-sheet device code (exact match only)
    pub fn resolve_device(&self, code: &str) -> Option<&str> {
        let key = normalize_plate(code);
        self.devices
            .iter()
            .find(|(device, _)| *device == key)
            .map(|(_, id)| id.as_str())
    }

    /// First device code appearing anywhere in `text`, with its vehicle
    pub fn find_device_in(&self, text: &str) -> Option<(&str, &str)> {
        let upper = text.to_uppercase();
        self.devices
            .iter()
            .find(|(device, _)| upper.contains(device.as_str()))
            .map(|(device, id)| (device.as_str(), id.as_str()))
    }
}
