use serde::{Serialize, Deserialize, Deserializer};
use std::fmt;

pub type ResourceId = i64;
/// Epoch seconds
pub type Timestamp = i64;

pub const STAT_MIN: i32 = 1;
pub const STAT_MAX: i32 = 1000;

pub const ALL_PLANETS: [&str; 12] = [
    "Corellia", "Dantooine", "Dathomir", "Endor", "Kashyyyk", "Lok",
    "Mustafar", "Naboo", "Rori", "Talus", "Tatooine", "Yavin"
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKey {
    #[serde(rename = "res_oq")] Oq,
    #[serde(rename = "res_cd")] Cd,
    #[serde(rename = "res_dr")] Dr,
    #[serde(rename = "res_fl")] Fl,
    #[serde(rename = "res_hr")] Hr,
    #[serde(rename = "res_ma")] Ma,
    #[serde(rename = "res_pe")] Pe,
    #[serde(rename = "res_sr")] Sr,
    #[serde(rename = "res_ut")] Ut,
    #[serde(rename = "res_cr")] Cr
}

impl StatKey {
    pub const ALL: [StatKey; 10] = [
        StatKey::Oq, StatKey::Cd, StatKey::Dr, StatKey::Fl, StatKey::Hr,
        StatKey::Ma, StatKey::Pe, StatKey::Sr, StatKey::Ut, StatKey::Cr
    ];

    /// Short code used by the taxonomy, e.g. `OQ`
    pub fn code(self) -> &'static str {
        match self {
            StatKey::Oq => "OQ", StatKey::Cd => "CD", StatKey::Dr => "DR",
            StatKey::Fl => "FL", StatKey::Hr => "HR", StatKey::Ma => "MA",
            StatKey::Pe => "PE", StatKey::Sr => "SR", StatKey::Ut => "UT",
            StatKey::Cr => "CR",
        }
    }

    /// Wire field name, e.g. `res_oq`
    pub fn field(self) -> &'static str {
        match self {
            StatKey::Oq => "res_oq", StatKey::Cd => "res_cd", StatKey::Dr => "res_dr",
            StatKey::Fl => "res_fl", StatKey::Hr => "res_hr", StatKey::Ma => "res_ma",
            StatKey::Pe => "res_pe", StatKey::Sr => "res_sr", StatKey::Ut => "res_ut",
            StatKey::Cr => "res_cr",
        }
    }

    /// Accepts either the wire field name or the short code
    pub fn parse(key: &str) -> Option<StatKey> {
        let key = key.trim();
        StatKey::ALL.iter().copied()
            .find(|s| s.field().eq_ignore_ascii_case(key) || s.code().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// 0 is the legacy encoding for an unset stat
fn zero_as_unset<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
        where D: Deserializer<'de> {
    let value: Option<i32> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| *v != 0))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
        where D: Deserializer<'de>, T: Default + Deserialize<'de> {
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

macro_rules! stat_block {
    ($($key: ident => $field: ident),* $(,)?) => {
        /// Measured stat values. `None` is unset, never zero.
        #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct StatBlock {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "zero_as_unset")]
                pub $field: Option<i32>,
            )*
        }

        impl StatBlock {
            pub fn get(&self, key: StatKey) -> Option<i32> {
                match key { $(StatKey::$key => self.$field,)* }
            }

            pub fn set(&mut self, key: StatKey, value: Option<i32>) {
                match key { $(StatKey::$key => self.$field = value,)* }
            }
        }
    };
}

stat_block! {
    Oq => res_oq, Cd => res_cd, Dr => res_dr, Fl => res_fl, Hr => res_hr,
    Ma => res_ma, Pe => res_pe, Sr => res_sr, Ut => res_ut, Cr => res_cr,
}

impl StatBlock {
    /// Set stats in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (StatKey, i32)> + '_ {
        StatKey::ALL.iter().filter_map(move |k| self.get(*k).map(|v| (*k, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

macro_rules! rating_block {
    ($($key: ident => $field: ident),* $(,)?) => {
        /// Server computed ratings in `[0,1]`, read only on the client
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        pub struct RatingBlock {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<f64>,
            )*
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub res_weight_rating: Option<f64>
        }

        impl RatingBlock {
            pub fn get(&self, key: StatKey) -> Option<f64> {
                match key { $(StatKey::$key => self.$field,)* }
            }

            pub fn set(&mut self, key: StatKey, value: Option<f64>) {
                match key { $(StatKey::$key => self.$field = value,)* }
            }
        }
    };
}

rating_block! {
    Oq => res_oq_rating, Cd => res_cd_rating, Dr => res_dr_rating, Fl => res_fl_rating,
    Hr => res_hr_rating, Ma => res_ma_rating, Pe => res_pe_rating, Sr => res_sr_rating,
    Ut => res_ut_rating, Cr => res_cr_rating,
}

/// One reported resource spawn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_class_id: Option<i64>,
    #[serde(flatten)]
    pub stats: StatBlock,
    #[serde(flatten)]
    pub ratings: RatingBlock,
    #[serde(rename = "planet", alias = "planets", default, deserialize_with = "null_as_default")]
    pub planets: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub date_reported_ts: Option<f64>,
    #[serde(default)]
    pub last_modified_ts: Option<f64>,
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default)]
    pub reporter_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>
}

fn default_active() -> bool { true }

impl Resource {
    pub fn new(id: ResourceId, name: &str, resource_type: &str) -> Resource {
        Resource {
            id,
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            resource_class_id: None,
            stats: StatBlock::default(),
            ratings: RatingBlock::default(),
            planets: Vec::new(),
            is_active: true,
            date_reported_ts: None,
            last_modified_ts: None,
            reporter_id: None,
            reporter_name: None,
            notes: None,
            server_id: None
        }
    }

    pub fn has_planet(&self, planet: &str) -> bool {
        self.planets.iter().any(|p| p.eq_ignore_ascii_case(planet))
    }

    /// Remove `planet` if assigned, add it otherwise
    pub fn toggle_planet(&mut self, planet: &str) {
        if self.has_planet(planet) {
            self.planets.retain(|p| !p.eq_ignore_ascii_case(planet));
        } else {
            self.planets.push(planet.to_string());
        }
    }

    /// Assigned planets sorted for display and comparison
    pub fn sorted_planets(&self) -> Vec<String> {
        let mut planets = self.planets.clone();
        planets.sort_by_key(|p| p.to_lowercase());
        planets
    }
}

/// Body of `add-resource` / `update-resource`.
///
/// `planet` is a single planet name and means *toggle*; the full planet list
/// is never sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_class_id: Option<i64>,
    #[serde(flatten)]
    pub stats: StatBlock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<String>,
    pub server_id: String
}

impl ResourcePayload {
    /// Full stat block of an existing record so the server can recompute ratings
    pub fn from_resource(resource: &Resource, server_id: &str) -> ResourcePayload {
        ResourcePayload {
            id: Some(resource.id),
            name: Some(resource.name.clone()),
            resource_type: Some(resource.resource_type.clone()),
            resource_class_id: resource.resource_class_id,
            stats: resource.stats.clone(),
            is_active: Some(resource.is_active),
            notes: resource.notes.clone(),
            planet: None,
            server_id: server_id.to_string()
        }
    }
}

/// User input for reporting or editing a resource
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceDraft {
    pub id: Option<ResourceId>,
    pub name: String,
    pub resource_type: Option<String>,
    pub stats: StatBlock,
    pub planets: Vec<String>,
    pub notes: Option<String>
}

impl ResourceDraft {
    pub fn new(name: &str, resource_type: &str) -> ResourceDraft {
        ResourceDraft {
            name: name.to_string(),
            resource_type: Some(resource_type.to_string()),
            ..Default::default()
        }
    }

    pub fn from_resource(resource: &Resource) -> ResourceDraft {
        ResourceDraft {
            id: Some(resource.id),
            name: resource.name.clone(),
            resource_type: Some(resource.resource_type.clone()),
            stats: resource.stats.clone(),
            planets: resource.planets.clone(),
            notes: resource.notes.clone()
        }
    }

    pub fn with_stat(mut self, key: StatKey, value: i32) -> ResourceDraft {
        self.stats.set(key, Some(value));
        self
    }

    pub fn with_planet(mut self, planet: &str) -> ResourceDraft {
        self.planets.push(planet.to_string());
        self
    }
}
