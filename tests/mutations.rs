mod common;

#[cfg(test)]
mod tests {
    use crate::common::{resource, server_with_role, taxonomy, tracker_for, SERVER};
    use swgbuddy_client::mutation::gateway::{MutationAction, MutationGateway, MutationKey};
    use swgbuddy_client::mutation::transaction::{Transaction, TxState};
    use swgbuddy_client::resource::types::{ResourceDraft, ResourcePayload, StatKey};
    use swgbuddy_client::resource::validation::{validate_draft, validate_stat};
    use swgbuddy_client::shared::error::Error;
    use swgbuddy_client::shared::handlers::debug_handler::{Call, Failure};
    use swgbuddy_client::shared::types::account::Role;
    use swgbuddy_client::shared::util::handler::TrackerApi;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fields(err: &Error) -> Vec<&str> {
        err.field_errors().iter().map(|e| e.field.as_str()).collect()
    }

    #[tokio::test]
    async fn validation_before_network() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let draft = ResourceDraft::new("Cuprum", "Copper").with_stat(StatKey::Oq, 1001);
        let err = tracker.add_resource(&draft).await.unwrap_err();
        assert_eq!(fields(&err), vec!["res_oq"], "Out of range stat rejected");
        assert!(err.is_local());

        let draft = ResourceDraft::new("Cuprum", "Copper").with_stat(StatKey::Fl, 500);
        let err = tracker.add_resource(&draft).await.unwrap_err();
        assert_eq!(fields(&err), vec!["res_fl"], "Stat the type does not have");

        let draft = ResourceDraft::new("Cuprum", "Copper").with_planet("Dathomir");
        let err = tracker.add_resource(&draft).await.unwrap_err();
        assert_eq!(fields(&err), vec!["planet"], "Planet the type does not spawn on");

        assert_eq!(handler.write_count(), 0, "Nothing was sent");
        assert!(tracker.find_resource("Cuprum").is_none());
    }

    #[test]
    fn stat_legality() {
        let index = taxonomy();
        for label in index.valid_types() {
            let config = index.config_for(label).unwrap();
            for key in StatKey::ALL {
                let error = validate_stat(key, 500, Some(config));
                assert_eq!(error.is_none(), config.permits_stat(key),
                    "{} on {} accepted only when permitted", key, label);
            }
        }

        let iron = index.config_for("Iron");
        assert!(validate_stat(StatKey::Oq, 50, iron).is_some(), "Below the class minimum");
        assert!(validate_stat(StatKey::Oq, 100, iron).is_none(), "Class minimum is inclusive");
        assert!(validate_stat(StatKey::Oq, 0, None).is_some(), "Global bounds without a config");
        assert!(validate_stat(StatKey::Oq, 1000, None).is_none());
    }

    #[test]
    fn draft_needs_type_and_name() {
        let index = taxonomy();
        let draft = ResourceDraft { name: "  ".to_string(), ..Default::default() };
        let err = validate_draft(&draft, &index).unwrap_err();
        assert_eq!(fields(&err), vec!["name", "type"]);

        let err = validate_draft(&ResourceDraft::new("Thing", "Minerals"), &index).unwrap_err();
        assert_eq!(fields(&err), vec!["type"], "Folders are not valid types");
    }

    #[tokio::test]
    async fn add_resource() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let draft = ResourceDraft::new("Bornite", "Copper")
            .with_stat(StatKey::Oq, 500)
            .with_planet("naboo");
        let response = tracker.add_resource(&draft).await.unwrap();
        assert!(response.success);

        let payload = match handler.last_write() {
            Some(Call::Add(payload)) => payload,
            other => panic!("Expected an add, got {:?}", other)
        };
        assert_eq!(payload.planet.as_deref(), Some("Naboo"), "Planet sent in its canonical spelling");
        assert_eq!(payload.resource_class_id, Some(401));
        assert_eq!(payload.server_id, SERVER);

        let stored = tracker.find_resource("Bornite").expect("Added resource is cached");
        assert_eq!(stored.ratings.res_oq_rating, Some(0.5), "Ratings come from the server");
        assert_eq!(stored.ratings.res_weight_rating, Some(0.5));
        assert_eq!(stored.planets, vec!["Naboo"]);
    }

    #[tokio::test]
    async fn add_without_echo_still_syncs() {
        let handler = server_with_role(Role::Editor);
        handler.set_echo_resources(false);
        let tracker = tracker_for(&handler).await;

        tracker.add_resource(&ResourceDraft::new("Bornite", "Copper")).await.unwrap();
        assert!(tracker.find_resource("Bornite").is_some(), "Picked up by the follow-up delta");
    }

    #[tokio::test]
    async fn add_carries_one_planet() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let draft = ResourceDraft::new("Bornite", "Copper").with_planet("Naboo").with_planet("Lok");
        let err = tracker.add_resource(&draft).await.unwrap_err();
        assert_eq!(fields(&err), vec!["planet"]);
        assert_eq!(handler.write_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_name_rejected_verbatim() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let err = tracker.add_resource(&ResourceDraft::new("Cuprite", "Copper")).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(_)));
        assert_eq!(err.to_string(), "Error: Cuprite already exists for cuemu", "Server message shown as is");
        assert_eq!(tracker.cache_len(), 2);
    }

    #[tokio::test]
    async fn update_resource() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let mut draft = tracker.draft_for(1).unwrap();
        draft.stats.set(StatKey::Oq, Some(750));
        draft.stats.set(StatKey::Cd, None);
        draft.notes = Some("Rich vein".to_string());
        tracker.update_resource(&draft).await.unwrap();

        match handler.last_write() {
            Some(Call::Update(payload)) => {
                assert_eq!(payload.id, Some(1));
                assert_eq!(payload.planet, None, "Edits never send planets");
                assert_eq!(payload.stats.res_oq, Some(750));
            }
            other => panic!("Expected an update, got {:?}", other)
        }

        let cuprite = tracker.resource(1).unwrap();
        assert_eq!(cuprite.ratings.res_oq_rating, Some(0.75));
        assert_eq!(cuprite.ratings.res_weight_rating, Some(0.75), "Weight over the remaining stat");
        assert_eq!(cuprite.stats.res_cd, None, "Cleared stat stays cleared");
        assert_eq!(cuprite.notes.as_deref(), Some("Rich vein"));
        assert_eq!(cuprite.planets, vec!["Naboo", "Lok"], "Planets untouched by an edit");

        let unsaved = ResourceDraft::new("Bornite", "Copper");
        let err = tracker.update_resource(&unsaved).await.unwrap_err();
        assert_eq!(fields(&err), vec!["id"]);
    }

    #[tokio::test]
    async fn planet_toggle() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        tracker.toggle_planet(1, "naboo").await.unwrap();
        assert_eq!(tracker.resource(1).unwrap().planets, vec!["Lok"], "Assigned planet removed");

        match handler.last_write() {
            Some(Call::Update(payload)) => {
                assert_eq!(payload.planet.as_deref(), Some("Naboo"), "Only the toggled planet is sent");
                assert_eq!(payload.resource_type.as_deref(), Some("Copper"), "Type sent so the server finds its rules");
                assert_eq!(payload.resource_class_id, Some(401));
                assert_eq!((payload.stats.res_oq, payload.stats.res_cd), (Some(500), Some(300)),
                    "Full stat block sent so ratings are recomputed from it");
                assert_eq!(payload.is_active, None, "Status untouched by a planet toggle");
            }
            other => panic!("Expected an update, got {:?}", other)
        }

        tracker.toggle_planet(1, "Naboo").await.unwrap();
        assert_eq!(tracker.resource(1).unwrap().planets, vec!["Lok", "Naboo"], "Toggled back on");
        assert_eq!(handler.stored(SERVER, 1).unwrap().planets, vec!["Lok", "Naboo"], "Server agrees");
        assert_eq!(tracker.addable_planets(1), vec!["Tatooine"]);
        assert_eq!(tracker.resource(1).unwrap().ratings.res_weight_rating, Some(0.4),
            "Weight kept across planet toggles");
    }

    #[tokio::test]
    async fn update_needs_type() {
        let handler = server_with_role(Role::Editor);

        let payload = ResourcePayload {
            id: Some(1),
            name: Some("Cuprite".to_string()),
            planet: Some("Naboo".to_string()),
            server_id: SERVER.to_string(),
            ..Default::default()
        };
        let err = handler.update_resource(&payload).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing Resource Type/Label", "Server cannot pick rules without a type");
        assert_eq!(handler.stored(SERVER, 1).unwrap().planets, vec!["Naboo", "Lok"]);
    }

    #[tokio::test]
    async fn cached_stats_checked_before_sending() {
        let handler = server_with_role(Role::Admin);
        let mut bad = resource(0, "Tainted", "Copper");
        bad.stats.set(StatKey::Fl, Some(500));
        bad.stats.set(StatKey::Oq, Some(1500));
        let id = handler.insert_resource(SERVER, bad).id;
        let tracker = tracker_for(&handler).await;

        let err = tracker.toggle_status(id).await.unwrap_err();
        let mut bad_fields = fields(&err);
        bad_fields.sort();
        assert_eq!(bad_fields, vec!["res_fl", "res_oq"], "Illegal and out of range stats both reported");
        assert!(tracker.resource(id).unwrap().is_active, "No optimistic change");

        let err = tracker.toggle_planet(id, "Lok").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(tracker.resource(id).unwrap().planets.is_empty());
        assert_eq!(handler.write_count(), 0, "Nothing was sent");

        // Retiring sends only the id, so a bad record can still be retired
        tracker.retire_resource(id).await.unwrap();
        assert_eq!(handler.last_write(), Some(Call::Retire { server_id: SERVER.to_string(), id }));
    }

    #[tokio::test]
    async fn planet_not_permitted() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let err = tracker.toggle_planet(1, "Dathomir").await.unwrap_err();
        assert_eq!(fields(&err), vec!["planet"]);
        assert_eq!(handler.write_count(), 0);
        assert_eq!(tracker.resource(1).unwrap().planets, vec!["Naboo", "Lok"]);
    }

    #[tokio::test]
    async fn rollback_on_failure() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;
        let before = tracker.resource(1).unwrap();

        handler.fail_next_write(Failure::Network);
        let err = tracker.toggle_status(1).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(tracker.resource(1).unwrap(), before, "Status restored");

        handler.fail_next_write(Failure::Rejected("Resource is locked".to_string()));
        let err = tracker.toggle_planet(1, "Lok").await.unwrap_err();
        assert_eq!(err.to_string(), "Resource is locked");
        assert_eq!(tracker.resource(1).unwrap(), before, "Planets restored");

        tracker.toggle_status(1).await.unwrap();
        assert!(!tracker.resource(1).unwrap().is_active, "Works once the server accepts");
    }

    #[tokio::test]
    async fn denial_refreshes_role() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;
        let fetches = handler.session_fetches();

        // Demoted elsewhere; the client still believes it is an editor
        handler.set_server_role(SERVER, Role::User);
        let err = tracker.toggle_status(1).await.unwrap_err();
        assert!(matches!(err, Error::AccessDenied));
        assert!(tracker.resource(1).unwrap().is_active, "Optimistic change undone");
        assert_eq!(handler.session_fetches(), fetches + 1, "Session re-read after the denial");
        assert_eq!(tracker.effective_role(), Role::User);

        let err = tracker.toggle_status(1).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { required: Role::Editor, current: Role::User }),
            "Next attempt is refused locally");
    }

    #[tokio::test]
    async fn role_gates() {
        let handler = server_with_role(Role::Editor);
        handler.set_session(None);
        let tracker = tracker_for(&handler).await;
        let err = tracker.toggle_status(1).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { current: Role::Guest, .. }), "Guests cannot write");

        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;
        let err = tracker.retire_resource(1).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { required: Role::Admin, .. }), "Retire needs admin");
        assert_eq!(handler.write_count(), 0);

        let handler = server_with_role(Role::Admin);
        let tracker = tracker_for(&handler).await;
        tracker.retire_resource(1).await.unwrap();
        assert_eq!(handler.last_write(), Some(Call::Retire { server_id: SERVER.to_string(), id: 1 }));
        assert!(!tracker.resource(1).unwrap().is_active, "Retired records stay, inactive");
        assert_eq!(tracker.cache_len(), 2);
    }

    #[tokio::test]
    async fn double_submit_guard() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;
        // Keeps the first toggle in flight during its re-sync
        let hold = handler.hold_next_fetch();

        let (first, second, other) = tokio::join!(
            tracker.toggle_status(1),
            tracker.toggle_status(1),
            async {
                let result = tracker.toggle_status(2).await;
                hold.notify_one();
                result
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(Error::InFlight(_))), "Same control rejected while in flight");
        assert!(other.is_ok(), "Other resources are not blocked");
        assert_eq!(handler.write_count(), 2);
        assert!(!tracker.resource(1).unwrap().is_active);
        assert!(!tracker.resource(2).unwrap().is_active);

        tracker.toggle_status(1).await.unwrap();
        assert!(tracker.resource(1).unwrap().is_active, "Guard released after completion");
    }

    #[test]
    fn gateway_keys() {
        let gateway = MutationGateway::new();
        let key = MutationKey::resource(MutationAction::TogglePlanet, 3);

        let guard = gateway.acquire(key.clone()).unwrap();
        assert!(gateway.is_in_flight(&key));
        assert!(matches!(gateway.acquire(key.clone()), Err(Error::InFlight(_))));
        assert!(gateway.acquire(MutationKey::resource(MutationAction::ToggleStatus, 3)).is_ok(),
            "Different action on the same record");

        drop(guard);
        assert!(!gateway.is_in_flight(&key), "Released on drop");
        assert!(gateway.acquire(key).is_ok());
    }

    #[test]
    fn transaction_outcomes() {
        let undone = Arc::new(AtomicUsize::new(0));
        let counter = |undone: &Arc<AtomicUsize>| {
            let undone = Arc::clone(undone);
            move || { undone.fetch_add(1, Ordering::SeqCst); }
        };

        let tx = Transaction::pending("commit", counter(&undone));
        assert_eq!(tx.state(), TxState::Pending);
        assert_eq!(tx.commit(), TxState::Committed);
        assert_eq!(undone.load(Ordering::SeqCst), 0, "Commit keeps the change");

        let tx = Transaction::pending("rollback", counter(&undone));
        assert_eq!(tx.rollback(), TxState::RolledBack);
        assert_eq!(undone.load(Ordering::SeqCst), 1, "Rollback undoes once");

        drop(Transaction::pending("dropped", counter(&undone)));
        assert_eq!(undone.load(Ordering::SeqCst), 2, "Dropped while pending rolls back");

        assert_eq!(Transaction::without_undo("plain").rollback(), TxState::RolledBack);
    }

    #[tokio::test]
    async fn type_change_drops_illegal_fields() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;

        let mut draft = ResourceDraft::new("Bornite", "Copper")
            .with_stat(StatKey::Oq, 500)
            .with_stat(StatKey::Ma, 200)
            .with_planet("Naboo");
        tracker.change_draft_type(&mut draft, "Fiberplast");

        assert_eq!(draft.resource_type.as_deref(), Some("Fiberplast"));
        assert_eq!(draft.stats.iter().collect::<Vec<_>>(), vec![(StatKey::Oq, 500)], "MA is not a Fiberplast stat");
        assert!(draft.planets.is_empty(), "Naboo is not a Fiberplast planet");
    }
}
