mod common;

#[cfg(test)]
mod tests {
    use crate::common::{me, server_with_role, tracker_for, OTHER_SERVER, SERVER};
    use swgbuddy_client::auth::permission::{assignable_roles, effective_role, has_permission};
    use swgbuddy_client::shared::types::account::{MePayload, Role};

    #[test]
    fn role_precedence() {
        let superadmin = me(&[(SERVER, Role::User)], true).into_session();
        for server in [SERVER, OTHER_SERVER, "unknown"] {
            assert_eq!(effective_role(superadmin.as_ref(), server), Role::SuperAdmin,
                "Superadmin overrides server perms on {}", server);
        }

        let editor = me(&[(SERVER, Role::Editor)], false).into_session();
        assert_eq!(effective_role(editor.as_ref(), SERVER), Role::Editor, "Explicit server role");
        assert_eq!(effective_role(editor.as_ref(), OTHER_SERVER), Role::User, "No entry resolves to USER");
        assert_eq!(effective_role(None, SERVER), Role::Guest, "No session is GUEST");
    }

    #[test]
    fn logged_out_payload() {
        let payload: MePayload = serde_json::from_str(r#"{"authenticated": false}"#).unwrap();
        assert!(payload.into_session().is_none(), "Unauthenticated payload has no session");
    }

    #[test]
    fn permission_checks() {
        assert!(has_permission(Role::Editor, Role::Editor), "Equal role passes");
        assert!(has_permission(Role::Admin, "editor"), "Role names ignore case");
        assert!(!has_permission(Role::Editor, "ADMIN"), "Lower role fails");
        assert!(has_permission(Role::Editor, 2), "Numeric power level");
        assert!(!has_permission(Role::Editor, 3i64), "Numeric power level above");
        assert!(has_permission(Role::SuperAdmin, 99), "Superadmin is above every named role");
        assert!(!has_permission(Role::Admin, "OWNER"), "Unknown role name needs superadmin");
        assert!(has_permission(Role::SuperAdmin, "OWNER"), "Superadmin passes unknown names");
        assert!(!has_permission(Role::Guest, Role::User), "Guest is below user");
    }

    #[test]
    fn roles_ordered() {
        assert!(Role::Guest < Role::User && Role::User < Role::Editor
            && Role::Editor < Role::Admin && Role::Admin < Role::SuperAdmin, "Total order");
        assert_eq!(Role::SuperAdmin.power_level(), 100);
        assert_eq!(Role::from_power_level(2), Some(Role::Editor));
        assert_eq!(Role::from_power_level(7), None);
    }

    #[test]
    fn role_decoding() {
        let payload: MePayload = serde_json::from_str(r#"{
            "authenticated": true, "id": "42", "username": "Han",
            "server_perms": {"cuemu": "EDITOR", "legends": 3, "swgr": "OWNER"}
        }"#).unwrap();
        assert_eq!(payload.server_perms.get("cuemu"), Some(&Role::Editor), "Role by name");
        assert_eq!(payload.server_perms.get("legends"), Some(&Role::Admin), "Role by power level");
        assert_eq!(payload.server_perms.get("swgr"), Some(&Role::Guest), "Unknown role is GUEST");
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"SUPERADMIN\"");
    }

    #[test]
    fn assignable() {
        assert_eq!(assignable_roles(Role::SuperAdmin), vec![Role::User, Role::Editor, Role::Admin]);
        assert_eq!(assignable_roles(Role::Admin), vec![Role::User, Role::Editor]);
        assert_eq!(assignable_roles(Role::Editor), vec![Role::User]);
        assert!(assignable_roles(Role::User).is_empty(), "Users cannot assign roles");
    }

    #[tokio::test]
    async fn role_follows_server_context() {
        let handler = server_with_role(Role::Editor);
        let tracker = tracker_for(&handler).await;
        assert_eq!(tracker.effective_role(), Role::Editor, "Editor on the first server");
        assert!(tracker.can(Role::Editor));

        tracker.switch_server(OTHER_SERVER).await.unwrap();
        assert_eq!(tracker.effective_role(), Role::User, "No role on the second server");
        assert!(!tracker.can(Role::Editor), "Edit rights do not carry over");

        tracker.switch_server(SERVER).await.unwrap();
        assert_eq!(tracker.effective_role(), Role::Editor, "Back on the first server");
    }

    #[tokio::test]
    async fn guest_without_session() {
        let handler = server_with_role(Role::Editor);
        handler.set_session(None);
        let tracker = tracker_for(&handler).await;
        assert_eq!(tracker.effective_role(), Role::Guest);
        assert_eq!(tracker.cache_len(), 2, "Guests still read the log");
    }
}
