mod common;

#[cfg(test)]
mod tests {
    use crate::common::{resource, taxonomy};
    use swgbuddy_client::query::pipeline::{filter, CategoryFilter};
    use swgbuddy_client::resource::types::{StatKey, ALL_PLANETS};
    use swgbuddy_client::taxonomy::index::TaxonomyIndex;
    use swgbuddy_client::taxonomy::types::TaxonomyNode;

    #[test]
    fn validity() {
        let index = taxonomy();
        assert!(index.is_valid_type("Copper"), "Leaf category is valid");
        assert!(!index.is_valid_type("Minerals"), "Folder is not valid");
        assert!(!index.is_valid_type("Unobtainium"), "Unknown label is not valid");
        assert!(index.config_for("Minerals").is_none(), "Folders have no config");
        assert!(index.config_for("Unobtainium").is_none(), "Unknown labels have no config");

        let copper = index.config_for("Copper").unwrap();
        assert!(copper.permits_stat(StatKey::Ma), "Copper permits MA");
        assert!(!copper.permits_stat(StatKey::Fl), "Copper does not permit FL");
        assert!(copper.permits_planet("tatooine"), "Planet match ignores case");
        assert_eq!(copper.class_id, Some(401), "Class id carried from the node");
    }

    #[test]
    fn valid_types_sorted() {
        assert_eq!(taxonomy().valid_types(), vec!["Berries", "Copper", "Fiberplast", "Iron"]);
    }

    #[test]
    fn descendants() {
        let index = taxonomy();
        assert_eq!(index.descendants_of("Inorganic"),
            vec!["Minerals", "Copper", "Iron", "Chemicals", "Fiberplast"],
            "Depth-first order below the node");
        assert_eq!(index.descendants_of("inorganic").len(), 5, "Lookup ignores case");
        assert!(index.descendants_of("Copper").is_empty(), "Leaf has no descendants");
        assert!(index.descendants_of("Unobtainium").is_empty(), "Unknown label has no descendants");
    }

    #[test]
    fn category_containment() {
        let index = taxonomy();
        let resources = vec![
            resource(1, "Cuprite", "Copper"),
            resource(2, "Ferrite", "Iron"),
            resource(3, "Plasto", "Fiberplast"),
            resource(4, "Razzle", "Berries"),
        ];
        let names = |category: &str| -> Vec<String> {
            filter(resources.iter(), "", &CategoryFilter::parse(category), &index)
                .into_iter().map(|r| r.name.clone()).collect()
        };

        assert_eq!(names("Inorganic"), vec!["Cuprite", "Ferrite", "Plasto"], "Inorganic includes nested types");
        assert_eq!(names("Minerals"), vec!["Cuprite", "Ferrite"], "Minerals includes its leaves");
        assert_eq!(names("Chemicals"), vec!["Plasto"], "Sibling branch excludes Copper");
        assert_eq!(names("copper"), vec!["Cuprite"], "Selecting a leaf matches that type");
        assert_eq!(names("All Resources").len(), 4, "Root sentinel selects everything");
        assert_eq!(names("Resources").len(), 4, "Root label selects everything");
    }

    #[test]
    fn addable_planets() {
        let index = taxonomy();
        let mut cuprite = resource(1, "Cuprite", "Copper");
        cuprite.planets = vec!["Naboo".to_string()];
        assert_eq!(index.addable_planets(&cuprite), vec!["Lok", "Tatooine"]);

        let mut stray = resource(2, "Stray", "Unobtainium");
        stray.planets = vec!["Lok".to_string()];
        let planets = index.addable_planets(&stray);
        assert_eq!(planets.len(), ALL_PLANETS.len() - 1, "Unknown type falls back to every planet");
        assert!(!planets.contains(&"Lok".to_string()), "Assigned planet is not addable");
    }

    #[test]
    fn payload_decoding() {
        let json = r#"[{
            "label": "Resources",
            "children": [
                {"label": "Gas", "is_valid": true, "id": 7,
                 "stats": {"OQ": {"min": 1, "max": 1000}, "res_ut": {"max": 500}, "XX": {}},
                 "planets": ["Lok"]},
                {"label": "Gas", "is_valid": true, "stats": {"res_cd": {}}}
            ]
        }]"#;
        let roots: Vec<TaxonomyNode> = serde_json::from_str(json).unwrap();
        let index = TaxonomyIndex::new(roots);

        let gas = index.config_for("Gas").unwrap();
        assert_eq!(gas.class_id, Some(7), "First duplicate wins");
        assert!(gas.permits_stat(StatKey::Oq), "Short code stat key");
        assert_eq!(gas.stats.get(&StatKey::Ut).map(|r| (r.min, r.max)), Some((1, 500)), "Missing min defaults to 1");
        assert_eq!(gas.stats.len(), 2, "Unknown stat key ignored");
    }
}
