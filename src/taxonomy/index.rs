//! Flattened lookup over the resource category tree

use crate::resource::types::{Resource, StatKey, ALL_PLANETS};
use crate::taxonomy::types::{TaxonomyNode, TypeConfig};

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct TaxonomyIndex {
    roots: Vec<TaxonomyNode>,
    by_label: HashMap<String, TypeConfig>
}

impl TaxonomyIndex {
    /// Builds the lookup with one depth-first pass over every node. Folders
    /// stay in the tree but only valid nodes get a lookup entry.
    pub fn new(roots: Vec<TaxonomyNode>) -> TaxonomyIndex {
        let mut by_label = HashMap::new();
        let mut stack: Vec<&TaxonomyNode> = roots.iter().rev().collect();

        while let Some(node) = stack.pop() {
            if node.is_valid {
                if by_label.contains_key(&node.label) {
                    log::warn!("Duplicate taxonomy label `{}`, keeping the first", node.label);
                } else {
                    by_label.insert(node.label.clone(), Self::config_of(node));
                }
            }
            stack.extend(node.children.iter().rev());
        }

        log::info!("Taxonomy loaded, {} valid types", by_label.len());
        TaxonomyIndex { roots, by_label }
    }

    pub fn empty() -> TaxonomyIndex {
        TaxonomyIndex::default()
    }

    fn config_of(node: &TaxonomyNode) -> TypeConfig {
        let mut stats = IndexMap::new();
        for (key, range) in &node.stats {
            match StatKey::parse(key) {
                Some(stat) => { stats.insert(stat, *range); }
                None => log::warn!("Unknown stat `{}` on taxonomy node `{}`", key, node.label)
            }
        }
        TypeConfig {
            label: node.label.clone(),
            class_id: node.id,
            stats,
            planets: node.planets.clone(),
            is_valid: node.is_valid
        }
    }

    pub fn roots(&self) -> &[TaxonomyNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn is_valid_type(&self, label: &str) -> bool {
        self.by_label.get(label).map_or(false, |c| c.is_valid)
    }

    /// `None` for unknown or folder labels; callers disable every dependent
    /// field in that case
    pub fn config_for(&self, label: &str) -> Option<&TypeConfig> {
        self.by_label.get(label).filter(|c| c.is_valid)
    }

    /// Valid labels, sorted for the type picker
    pub fn valid_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_label.keys().map(|k| k.as_str()).collect();
        types.sort();
        types
    }

    /// First node whose label matches, case-insensitive, depth-first
    pub fn find(&self, label: &str) -> Option<&TaxonomyNode> {
        let mut stack: Vec<&TaxonomyNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.label.eq_ignore_ascii_case(label) {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Every label below `label` in depth-first order. Empty for unknown and
    /// leaf labels.
    pub fn descendants_of(&self, label: &str) -> Vec<String> {
        let node = match self.find(label) {
            Some(n) => n,
            None => return Vec::new()
        };

        let mut out: IndexSet<String> = IndexSet::new();
        let mut stack: Vec<&TaxonomyNode> = node.children.iter().rev().collect();
        while let Some(child) = stack.pop() {
            out.insert(child.label.clone());
            stack.extend(child.children.iter().rev());
        }
        out.into_iter().collect()
    }

    /// Permitted planets not yet assigned to `resource`, sorted
    pub fn addable_planets(&self, resource: &Resource) -> Vec<String> {
        let allowed: Vec<String> = match self.config_for(&resource.resource_type) {
            Some(config) => config.planets.clone(),
            None => ALL_PLANETS.iter().map(|p| p.to_string()).collect()
        };
        let mut planets: Vec<String> = allowed.into_iter()
            .filter(|p| !resource.has_planet(p))
            .collect();
        planets.sort();
        planets
    }
}
