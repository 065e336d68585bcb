//! Taxonomy driven checks run before any write leaves the client

use crate::resource::types::{ResourceDraft, StatBlock, StatKey, STAT_MIN, STAT_MAX};
use crate::shared::error::{Error, FieldError, Result};
use crate::taxonomy::index::TaxonomyIndex;
use crate::taxonomy::types::TypeConfig;

pub fn validate_stat(key: StatKey, value: i32, config: Option<&TypeConfig>) -> Option<FieldError> {
    if !(STAT_MIN..=STAT_MAX).contains(&value) {
        return Some(FieldError::new(key.field(),
            format!("{} must be between {} and {}", key.code(), STAT_MIN, STAT_MAX)));
    }
    let config = config?;
    match config.stats.get(&key) {
        None => Some(FieldError::new(key.field(),
            format!("{} does not support {}", config.label, key.code()))),
        Some(range) if !range.contains(value) => Some(FieldError::new(key.field(),
            format!("{} must be between {} and {}", key.code(), range.min, range.max))),
        Some(_) => None
    }
}

pub fn validate_stats(stats: &StatBlock, config: Option<&TypeConfig>) -> Vec<FieldError> {
    stats.iter().filter_map(|(key, value)| validate_stat(key, value, config)).collect()
}

/// Checks a draft against its type's taxonomy entry and returns that entry
pub fn validate_draft<'a>(draft: &ResourceDraft, taxonomy: &'a TaxonomyIndex) -> Result<&'a TypeConfig> {
    let mut errors = Vec::new();

    if draft.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }

    let config = match draft.resource_type.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::new("type", "A resource category is required"));
            None
        }
        Some(label) => {
            let config = taxonomy.config_for(label);
            if config.is_none() {
                errors.push(FieldError::new("type", format!("`{}` is not a valid resource type", label)));
            }
            config
        }
    };

    // Without a valid entry only the global bounds can be checked
    errors.extend(validate_stats(&draft.stats, config));

    if let Some(config) = config {
        for planet in &draft.planets {
            if !config.permits_planet(planet) {
                errors.push(FieldError::new("planet",
                    format!("{} does not spawn on {}", config.label, planet)));
            }
        }
    }

    match (errors.is_empty(), config) {
        (true, Some(config)) => Ok(config),
        _ => Err(Error::Validation(errors))
    }
}

/// Switches the draft's type, dropping stats and planets the new type does
/// not permit. Everything is dropped for unknown or folder labels.
pub fn change_type(draft: &mut ResourceDraft, label: &str, taxonomy: &TaxonomyIndex) {
    draft.resource_type = Some(label.to_string());
    let config = taxonomy.config_for(label);

    for key in StatKey::ALL {
        if draft.stats.get(key).is_some() && !config.map_or(false, |c| c.permits_stat(key)) {
            draft.stats.set(key, None);
        }
    }
    draft.planets.retain(|p| config.map_or(false, |c| c.permits_planet(p)));
}
