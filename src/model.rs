use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub type CritterId = u64;

/// Terrain classification as reported by the World Service. The set is open:
/// the server may introduce new kinds, which must still deserialize and
/// render with the fallback color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum TerrainKind {
    Water,
    Grass,
    Dirt,
    Mountain,
    Unknown,
}

impl From<String> for TerrainKind {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "WATER" => TerrainKind::Water,
            "GRASS" => TerrainKind::Grass,
            "DIRT" => TerrainKind::Dirt,
            "MOUNTAIN" => TerrainKind::Mountain,
            _ => TerrainKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Diet {
    Herbivore,
    Carnivore,
    #[default]
    Unknown,
}

impl From<String> for Diet {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "HERBIVORE" => Diet::Herbivore,
            "CARNIVORE" => Diet::Carnivore,
            _ => Diet::Unknown,
        }
    }
}

/// One cell of the world as served by `/api/world/terrain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainTile {
    pub x: i64,
    pub y: i64,
    pub terrain: TerrainKind,
    pub height: f64,
    #[serde(default)]
    pub food_available: f64,
}

fn default_max_health() -> f64 {
    100.0
}

/// Authoritative per-critter state from one poll. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritterSnapshot {
    pub id: CritterId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub diet: Diet,
    #[serde(default = "default_max_health")]
    pub health: f64,
    #[serde(default = "default_max_health")]
    pub max_health: f64,
    #[serde(default)]
    pub energy: f64,
    #[serde(default)]
    pub hunger: f64,
    #[serde(default)]
    pub thirst: f64,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub last_action: String,
}

/// Entry in a critter's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritterEvent {
    pub tick: u64,
    pub event: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
}

/// Sparse value -> count map. JSON object keys are strings; serde parses
/// them back into integers.
pub type ValueDistribution = BTreeMap<i64, u64>;

/// Pre-classified label -> count map (health bands, goals, causes of death).
pub type LabelDistribution = HashMap<String, u64>;

/// One per-tick aggregate snapshot from `/api/stats/history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsEntry {
    pub tick: u64,
    pub population: u64,
    #[serde(default)]
    pub herbivore_population: u64,
    #[serde(default)]
    pub carnivore_population: u64,
    #[serde(default)]
    pub herbivore_energy_distribution: ValueDistribution,
    #[serde(default)]
    pub carnivore_energy_distribution: ValueDistribution,
    #[serde(default)]
    pub herbivore_hunger_distribution: ValueDistribution,
    #[serde(default)]
    pub carnivore_hunger_distribution: ValueDistribution,
    #[serde(default)]
    pub herbivore_thirst_distribution: ValueDistribution,
    #[serde(default)]
    pub carnivore_thirst_distribution: ValueDistribution,
    #[serde(default)]
    pub herbivore_age_distribution: ValueDistribution,
    #[serde(default)]
    pub carnivore_age_distribution: ValueDistribution,
    #[serde(default)]
    pub herbivore_health_distribution: LabelDistribution,
    #[serde(default)]
    pub carnivore_health_distribution: LabelDistribution,
    #[serde(default)]
    pub goal_distribution: LabelDistribution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_terrain_kind_falls_back() {
        let tile: TerrainTile = serde_json::from_str(
            r#"{"x": 1, "y": 2, "terrain": "LAVA", "height": 0.4, "food_available": 0.0}"#,
        )
        .expect("tile with unknown terrain deserializes");
        assert_eq!(tile.terrain, TerrainKind::Unknown);
    }

    #[test]
    fn terrain_kind_is_case_insensitive() {
        let kind: TerrainKind = serde_json::from_str(r#""grass""#).unwrap();
        assert_eq!(kind, TerrainKind::Grass);
    }

    #[test]
    fn critter_tolerates_missing_optional_fields() {
        let snap: CritterSnapshot =
            serde_json::from_str(r#"{"id": 7, "x": 3.0, "y": 4.0}"#).unwrap();
        assert_eq!(snap.id, 7);
        assert_eq!(snap.diet, Diet::Unknown);
        assert_eq!(snap.max_health, 100.0);
        assert!(snap.goal.is_empty());
    }

    #[test]
    fn distribution_keys_parse_from_json_strings() {
        let entry: StatsEntry = serde_json::from_str(
            r#"{
                "tick": 12,
                "population": 5,
                "herbivore_energy_distribution": {"5": 2, "15": 3}
            }"#,
        )
        .unwrap();
        assert_eq!(entry.herbivore_energy_distribution.get(&5), Some(&2));
        assert_eq!(entry.herbivore_energy_distribution.get(&15), Some(&3));
        assert!(entry.goal_distribution.is_empty());
    }
}
