use crate::resource::types::{StatKey, STAT_MIN, STAT_MAX};

use indexmap::IndexMap;
use serde::{Serialize, Deserialize};

/// Permitted range of one stat for a resource class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRange {
    #[serde(default = "default_min")]
    pub min: i32,
    #[serde(default = "default_max")]
    pub max: i32
}

fn default_min() -> i32 { STAT_MIN }
fn default_max() -> i32 { STAT_MAX }

impl Default for StatRange {
    fn default() -> Self {
        StatRange { min: STAT_MIN, max: STAT_MAX }
    }
}

impl StatRange {
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One node of the category tree as served by `GET /api/taxonomy`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub label: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub children: Vec<TaxonomyNode>,
    #[serde(default)]
    pub is_valid: bool,
    // Keys are `res_oq` or `OQ` depending on the generator
    #[serde(default)]
    pub stats: IndexMap<String, StatRange>,
    #[serde(default)]
    pub planets: Vec<String>
}

impl TaxonomyNode {
    pub fn folder(label: &str, children: Vec<TaxonomyNode>) -> TaxonomyNode {
        TaxonomyNode {
            label: label.to_string(),
            id: None,
            children,
            is_valid: false,
            stats: IndexMap::new(),
            planets: Vec::new()
        }
    }

    pub fn leaf(label: &str, stats: &[StatKey], planets: &[&str]) -> TaxonomyNode {
        TaxonomyNode {
            label: label.to_string(),
            id: None,
            children: Vec::new(),
            is_valid: true,
            stats: stats.iter().map(|s| (s.field().to_string(), StatRange::default())).collect(),
            planets: planets.iter().map(|p| p.to_string()).collect()
        }
    }
}

/// Lookup entry for one valid (spawnable) category
#[derive(Clone, Debug, PartialEq)]
pub struct TypeConfig {
    pub label: String,
    pub class_id: Option<i64>,
    pub stats: IndexMap<StatKey, StatRange>,
    pub planets: Vec<String>,
    pub is_valid: bool
}

impl TypeConfig {
    pub fn permits_stat(&self, key: StatKey) -> bool {
        self.stats.contains_key(&key)
    }

    pub fn permits_planet(&self, planet: &str) -> bool {
        self.planets.iter().any(|p| p.eq_ignore_ascii_case(planet))
    }

    /// Canonical spelling of `planet` in this entry
    pub fn planet_name(&self, planet: &str) -> Option<&str> {
        self.planets.iter().find(|p| p.eq_ignore_ascii_case(planet)).map(|p| p.as_str())
    }
}
