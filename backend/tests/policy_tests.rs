use gallery_portal::{
    accounts,
    models::Role,
    policy::{Action, Decision, authorize, resolve_role},
    repository::MemoryRepository,
};

#[test]
fn test_gate_matrix() {
    let cases = [
        (Role::Guest, Action::Create, false),
        (Role::Guest, Action::Edit, false),
        (Role::Guest, Action::Delete, false),
        (Role::NormalUser, Action::Create, true),
        (Role::NormalUser, Action::Edit, true),
        (Role::NormalUser, Action::Delete, false),
        (Role::Admin, Action::Create, true),
        (Role::Admin, Action::Edit, true),
        (Role::Admin, Action::Delete, true),
    ];

    for (role, action, expected) in cases {
        assert_eq!(
            authorize(role, action).is_allowed(),
            expected,
            "{:?} / {:?}",
            role,
            action
        );
    }
}

#[test]
fn test_denial_carries_user_facing_message() {
    match authorize(Role::NormalUser, Action::Delete) {
        Decision::Denied(denial) => {
            assert_eq!(denial.action, Action::Delete);
            assert_eq!(denial.role, Role::NormalUser);
            assert_eq!(
                denial.message,
                "You do not have permission to Delete images. Please contact the admin."
            );
        }
        Decision::Allowed => panic!("NormalUser must not delete"),
    }

    let denial = authorize(Role::Guest, Action::Create).into_result().unwrap_err();
    assert!(denial.message.contains("add images"));
}

#[cfg(test)]
mod role_resolution {
    use super::*;

    async fn seeded() -> MemoryRepository {
        let repo = MemoryRepository::new();
        accounts::register(&repo, Some("norm1"), Some("Secret1!"), Some(Role::NormalUser))
            .await
            .unwrap();
        accounts::register(&repo, Some("admin1"), Some("Secret1!"), Some(Role::Admin))
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_anonymous_and_empty_identity_are_guest() {
        let repo = seeded().await;
        assert_eq!(resolve_role(&repo, None).await.unwrap(), Role::Guest);
        assert_eq!(resolve_role(&repo, Some("")).await.unwrap(), Role::Guest);
    }

    #[tokio::test]
    async fn test_unknown_user_is_guest() {
        let repo = seeded().await;
        assert_eq!(resolve_role(&repo, Some("ghost1")).await.unwrap(), Role::Guest);
    }

    #[tokio::test]
    async fn test_stored_roles_resolve() {
        let repo = seeded().await;
        assert_eq!(resolve_role(&repo, Some("norm1")).await.unwrap(), Role::NormalUser);
        assert_eq!(resolve_role(&repo, Some("admin1")).await.unwrap(), Role::Admin);
    }

    #[tokio::test]
    async fn test_absent_or_unrecognised_role_is_guest() {
        let repo = seeded().await;

        repo.set_role("norm1", None).await;
        assert_eq!(resolve_role(&repo, Some("norm1")).await.unwrap(), Role::Guest);

        repo.set_role("admin1", Some("superuser")).await;
        assert_eq!(resolve_role(&repo, Some("admin1")).await.unwrap(), Role::Guest);
    }

    #[tokio::test]
    async fn test_role_change_applies_on_next_resolution() {
        let repo = seeded().await;
        assert!(!authorize(
            resolve_role(&repo, Some("norm1")).await.unwrap(),
            Action::Delete
        )
        .is_allowed());

        repo.set_role("norm1", Some("Admin")).await;

        assert!(authorize(
            resolve_role(&repo, Some("norm1")).await.unwrap(),
            Action::Delete
        )
        .is_allowed());
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error_not_a_role() {
        let repo = MemoryRepository::new_failing();
        assert!(resolve_role(&repo, Some("norm1")).await.is_err());
        // No lookup happens for anonymous callers.
        assert_eq!(resolve_role(&repo, None).await.unwrap(), Role::Guest);
    }
}
