#![allow(dead_code)]

use swgbuddy_client::app::Tracker;
use swgbuddy_client::resource::types::{Resource, StatKey};
use swgbuddy_client::shared::handlers::debug_handler::DebugHandler;
use swgbuddy_client::shared::types::account::{MePayload, Role};
use swgbuddy_client::taxonomy::index::TaxonomyIndex;
use swgbuddy_client::taxonomy::types::{StatRange, TaxonomyNode};

use std::collections::HashMap;

pub const SERVER: &str = "cuemu";
pub const OTHER_SERVER: &str = "legends";

/// Resources
///   Inorganic
///     Minerals: Copper, Iron
///     Chemicals: Fiberplast
///   Organic
///     Flora: Berries
pub fn taxonomy_roots() -> Vec<TaxonomyNode> {
    use StatKey::*;

    let mut iron = TaxonomyNode::leaf("Iron", &[Oq, Cd, Dr, Sr], &["Corellia", "Naboo"]);
    iron.stats.insert("res_oq".to_string(), StatRange { min: 100, max: 900 });
    iron.id = Some(402);

    let mut copper = TaxonomyNode::leaf("Copper", &[Oq, Cd, Dr, Ma, Sr, Ut], &["Naboo", "Lok", "Tatooine"]);
    copper.id = Some(401);

    vec![TaxonomyNode::folder("Resources", vec![
        TaxonomyNode::folder("Inorganic", vec![
            TaxonomyNode::folder("Minerals", vec![copper, iron]),
            TaxonomyNode::folder("Chemicals", vec![
                TaxonomyNode::leaf("Fiberplast", &[Oq, Cd, Dr, Fl, Pe], &["Dantooine", "Lok"]),
            ]),
        ]),
        TaxonomyNode::folder("Organic", vec![
            TaxonomyNode::folder("Flora", vec![
                TaxonomyNode::leaf("Berries", &[Oq, Dr, Fl, Pe], &["Naboo", "Rori", "Endor"]),
            ]),
        ]),
    ])]
}

pub fn taxonomy() -> TaxonomyIndex {
    TaxonomyIndex::new(taxonomy_roots())
}

pub fn resource(id: i64, name: &str, resource_type: &str) -> Resource {
    Resource::new(id, name, resource_type)
}

pub fn me(perms: &[(&str, Role)], is_superadmin: bool) -> MePayload {
    MePayload {
        authenticated: true,
        id: Some("u1".to_string()),
        username: Some("Tester".to_string()),
        avatar: None,
        is_superadmin,
        server_perms: perms.iter().map(|(s, r)| (s.to_string(), *r)).collect::<HashMap<_, _>>()
    }
}

/// A fake server with the sample taxonomy, logged in with `role` on SERVER
/// and two records: "Cuprite" (Copper on Naboo and Lok) and "Ferrite" (Iron)
pub fn server_with_role(role: Role) -> DebugHandler {
    let handler = DebugHandler::new();
    handler.set_taxonomy(taxonomy_roots());
    handler.set_session(Some(me(&[(SERVER, role)], false)));

    let mut cuprite = resource(1, "Cuprite", "Copper");
    cuprite.stats.set(StatKey::Oq, Some(500));
    cuprite.stats.set(StatKey::Cd, Some(300));
    cuprite.planets = vec!["Naboo".to_string(), "Lok".to_string()];
    handler.insert_resource(SERVER, cuprite);

    let mut ferrite = resource(2, "Ferrite", "Iron");
    ferrite.stats.set(StatKey::Oq, Some(800));
    ferrite.planets = vec!["Corellia".to_string()];
    handler.insert_resource(SERVER, ferrite);

    handler
}

pub async fn tracker_for(handler: &DebugHandler) -> Tracker<DebugHandler> {
    let tracker = Tracker::new(handler.clone(), SERVER).with_clock(handler.clock());
    tracker.init().await.unwrap();
    tracker
}
