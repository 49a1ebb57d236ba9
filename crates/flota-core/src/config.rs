//! Fleet reference configuration
//!
//! Vehicles, categories, categorization rules and the payroll worker table
//! are loaded from TOML. Resolution order:
//! 1. An explicit path (`--config`)
//! 2. The user override at `~/.config/flota/fleet.toml`
//! 3. Defaults compiled into the binary

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{CategorizationRule, Category, CategoryKind, Vehicle, COMMON_VEHICLE};
use crate::payroll::{Worker, WorkerTable};
use crate::vehicles::VehicleRegistry;

/// Embedded default config
const DEFAULT_CONFIG: &str = include_str!("../../../config/fleet.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub monthly_depreciation: f64,
    /// Registration numbers printed on invoices
    #[serde(default)]
    pub plates: Vec<String>,
    /// Route-sheet device codes
    #[serde(default)]
    pub devices: Vec<String>,
    /// Shared pseudo-vehicle, never resolved from plates
    #[serde(default)]
    pub shared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    pub name: String,
    pub kind: CategoryKind,
    #[serde(default)]
    pub assignment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub category: String,
    #[serde(default)]
    pub vehicle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub id: u32,
    pub name: String,
    pub vehicle: String,
}

/// Complete fleet reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub vehicles: Vec<VehicleConfig>,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    /// Ordered: earlier rules win
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
}

impl FleetConfig {
    /// Load configuration following the override chain
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let content = match explicit {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!("Loading fleet config from {}", path.display());
                    fs::read_to_string(&path).map_err(|e| {
                        Error::Config(format!("Failed to read {}: {}", path.display(), e))
                    })?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::parse(&content)
    }

    /// The defaults compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Parse and validate a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject references to unknown categories or vehicles
    pub fn validate(&self) -> Result<()> {
        let vehicle_ids: HashSet<&str> = self.vehicles.iter().map(|v| v.id.as_str()).collect();
        let category_ids: HashSet<&str> = self.categories.iter().map(|c| c.id.as_str()).collect();

        if vehicle_ids.len() != self.vehicles.len() {
            return Err(Error::Config("Duplicate vehicle id".to_string()));
        }
        if category_ids.len() != self.categories.len() {
            return Err(Error::Config("Duplicate category id".to_string()));
        }

        for rule in &self.rules {
            if rule.pattern.trim().is_empty() {
                return Err(Error::Config("Rule with empty pattern".to_string()));
            }
            if !category_ids.contains(rule.category.as_str()) {
                return Err(Error::Config(format!(
                    "Rule '{}' references unknown category {}",
                    rule.pattern, rule.category
                )));
            }
            if let Some(vehicle) = &rule.vehicle {
                if !vehicle_ids.contains(vehicle.as_str()) {
                    return Err(Error::Config(format!(
                        "Rule '{}' references unknown vehicle {}",
                        rule.pattern, vehicle
                    )));
                }
            }
        }

        let mut worker_ids = HashSet::new();
        for worker in &self.workers {
            if !worker_ids.insert(worker.id) {
                return Err(Error::Config(format!("Duplicate worker id {}", worker.id)));
            }
            if !vehicle_ids.contains(worker.vehicle.as_str()) {
                return Err(Error::Config(format!(
                    "Worker {} references unknown vehicle {}",
                    worker.id, worker.vehicle
                )));
            }
        }

        Ok(())
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .map(|v| Vehicle {
                id: v.id.clone(),
                name: v.name.clone(),
                monthly_depreciation: v.monthly_depreciation,
            })
            .collect()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .map(|c| Category {
                id: c.id.clone(),
                name: c.name.clone(),
                kind: c.kind,
                assignment: c.assignment.clone(),
            })
            .collect()
    }

    /// Rules in priority order
    pub fn rules(&self) -> Vec<CategorizationRule> {
        self.rules
            .iter()
            .map(|r| CategorizationRule {
                pattern: r.pattern.clone(),
                category_id: r.category.clone(),
                vehicle_id: r.vehicle.clone(),
            })
            .collect()
    }

    pub fn worker_table(&self) -> WorkerTable {
        let workers: BTreeMap<u32, Worker> = self
            .workers
            .iter()
            .map(|w| {
                (
                    w.id,
                    Worker {
                        name: w.name.clone(),
                        vehicle_id: w.vehicle.clone(),
                    },
                )
            })
            .collect();
        WorkerTable::new(workers)
    }

    /// Plate and device lookup for every non-shared vehicle
    pub fn vehicle_registry(&self) -> VehicleRegistry {
        let mut registry = VehicleRegistry::default();
        for vehicle in self.vehicles.iter().filter(|v| !v.shared && v.id != COMMON_VEHICLE) {
            for plate in &vehicle.plates {
                registry.add_plate(plate, &vehicle.id);
            }
            registry.add_plate(&vehicle.id, &vehicle.id);
            for device in &vehicle.devices {
                registry.add_device(device, &vehicle.id);
            }
        }
        registry
    }
}

/// User override location for the fleet config
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flota").join("fleet.toml"))
}
