//! Permission engine scenarios over the in-memory store
//!
//! Drives the services the same way the admin API does, then checks decisions
//! through the evaluator and through the cached access layer.

mod common;

use common::TestApp;
use plangate_core::domain::{CreateActionInput, CreatePlanInput, CreateRoleInput, StringUuid};
use plangate_core::error::AppError;
use plangate_core::repository::{PermissionRepository, Repositories};
use plangate_core::service::PermissionEvaluator;
use pretty_assertions::assert_eq;

struct Fixture {
    app: TestApp,
    plan: StringUuid,
    owner: StringUuid,
    member: StringUuid,
    view: StringUuid,
    create: StringUuid,
}

fn action(slug: &str) -> CreateActionInput {
    CreateActionInput {
        slug: slug.to_string(),
        name: slug.to_lowercase().replace('_', " "),
        description: None,
        category: "project".to_string(),
    }
}

/// A "free" plan that only entitles PROJECT_VIEW, built through the services
async fn fixture() -> Fixture {
    let app = TestApp::empty();
    let state = &app.state;

    let plan = state
        .plan_service
        .create(CreatePlanInput {
            name: "free".to_string(),
            display_name: "Free".to_string(),
            description: None,
            stripe_price_id_monthly: None,
            stripe_price_id_yearly: None,
            is_active: true,
        })
        .await
        .unwrap()
        .id;
    let owner = state
        .role_service
        .create(CreateRoleInput {
            name: "OWNER".to_string(),
            priority: 0,
            description: None,
        })
        .await
        .unwrap()
        .id;
    let member = state
        .role_service
        .create(CreateRoleInput {
            name: "MEMBER".to_string(),
            priority: 2,
            description: None,
        })
        .await
        .unwrap()
        .id;
    let view = state
        .action_service
        .create(action("PROJECT_VIEW"))
        .await
        .unwrap()
        .id;
    let create = state
        .action_service
        .create(action("PROJECT_CREATE"))
        .await
        .unwrap()
        .id;

    state
        .entitlement_service
        .set_plan_action_permission(plan, view, true)
        .await
        .unwrap();

    Fixture {
        app,
        plan,
        owner,
        member,
        view,
        create,
    }
}

fn evaluator(repos: &Repositories) -> PermissionEvaluator {
    PermissionEvaluator::new(repos.permissions.clone(), repos.actions.clone())
}

#[tokio::test]
async fn test_inconsistent_allowance_does_not_leak_past_plan() {
    let f = fixture().await;
    let entitlements = &f.app.state.entitlement_service;

    // Both allowances present, only PROJECT_VIEW entitled
    entitlements
        .set_role_action_permission(f.plan, f.member, f.view, true)
        .await
        .unwrap();
    entitlements
        .set_role_action_permission(f.plan, f.member, f.create, true)
        .await
        .unwrap();

    let evaluator = evaluator(&f.app.repos);
    assert!(
        evaluator
            .can_role_perform_action_in_plan(f.plan, f.member, f.view)
            .await
    );
    assert!(
        !evaluator
            .can_role_perform_action_in_plan(f.plan, f.member, f.create)
            .await
    );

    let access = &f.app.state.access;
    assert!(access.can(f.plan, f.member, "PROJECT_VIEW").await);
    assert!(!access.can(f.plan, f.member, "PROJECT_CREATE").await);
}

#[tokio::test]
async fn test_role_priority_never_bypasses_allowances() {
    let f = fixture().await;

    // OWNER has priority 0 but no allowance row
    let evaluator = evaluator(&f.app.repos);
    assert!(
        !evaluator
            .can_role_perform_action_in_plan(f.plan, f.owner, f.view)
            .await
    );
    assert!(evaluator.is_action_enabled_for_plan(f.plan, f.view).await);
    assert!(!evaluator.is_action_enabled_for_plan(f.plan, f.create).await);
}

#[tokio::test]
async fn test_allowance_revocation_is_immediate_through_cache() {
    let f = fixture().await;
    let entitlements = &f.app.state.entitlement_service;
    let access = &f.app.state.access;

    entitlements
        .set_role_action_permission(f.plan, f.member, f.view, true)
        .await
        .unwrap();
    assert!(access.can(f.plan, f.member, "PROJECT_VIEW").await);
    assert_eq!(
        f.app.cache.get(f.plan, f.member, "PROJECT_VIEW"),
        Some(true)
    );

    entitlements
        .set_role_action_permission(f.plan, f.member, f.view, false)
        .await
        .unwrap();
    assert!(!access.can(f.plan, f.member, "PROJECT_VIEW").await);
}

#[tokio::test]
async fn test_entitlement_disable_is_immediate_through_cache() {
    let f = fixture().await;
    let entitlements = &f.app.state.entitlement_service;
    let access = &f.app.state.access;

    for role in [f.owner, f.member] {
        entitlements
            .set_role_action_permission(f.plan, role, f.view, true)
            .await
            .unwrap();
        assert!(access.can(f.plan, role, "PROJECT_VIEW").await);
    }

    entitlements
        .set_plan_action_permission(f.plan, f.view, false)
        .await
        .unwrap();
    for role in [f.owner, f.member] {
        assert!(!access.can(f.plan, role, "PROJECT_VIEW").await);
    }
}

#[tokio::test]
async fn test_deleting_allowance_row_denies() {
    let f = fixture().await;
    let entitlements = &f.app.state.entitlement_service;
    let access = &f.app.state.access;

    entitlements
        .set_role_action_permission(f.plan, f.member, f.view, true)
        .await
        .unwrap();
    assert!(access.can(f.plan, f.member, "PROJECT_VIEW").await);

    entitlements
        .delete_role_action_permission(f.plan, f.member, f.view)
        .await
        .unwrap();
    assert!(!access.can(f.plan, f.member, "PROJECT_VIEW").await);
}

#[tokio::test]
async fn test_unknown_slug_deny_clears_when_action_is_created() {
    let f = fixture().await;
    let state = &f.app.state;

    assert!(!state.access.can(f.plan, f.member, "PROJECT_ARCHIVE").await);
    assert_eq!(
        f.app.cache.get(f.plan, f.member, "PROJECT_ARCHIVE"),
        Some(false)
    );

    let archive = state
        .action_service
        .create(action("PROJECT_ARCHIVE"))
        .await
        .unwrap()
        .id;
    assert_eq!(f.app.cache.get(f.plan, f.member, "PROJECT_ARCHIVE"), None);

    state
        .entitlement_service
        .set_plan_action_permission(f.plan, archive, true)
        .await
        .unwrap();
    state
        .entitlement_service
        .set_role_action_permission(f.plan, f.member, archive, true)
        .await
        .unwrap();
    assert!(state.access.can(f.plan, f.member, "PROJECT_ARCHIVE").await);
}

#[tokio::test]
async fn test_upserts_keep_one_row_per_key() {
    let f = fixture().await;

    let permissions = &f.app.repos.permissions;
    let first = permissions
        .upsert_plan_action_permission(f.plan, f.create, true)
        .await
        .unwrap();
    let second = permissions
        .upsert_plan_action_permission(f.plan, f.create, false)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert!(!second.enabled);

    let rows: Vec<_> = permissions
        .find_plan_action_permissions(f.plan)
        .await
        .unwrap()
        .into_iter()
        .filter(|row| row.action_id == f.create)
        .collect();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].enabled);

    for allowed in [true, true, false] {
        permissions
            .upsert_role_action_permission(f.plan, f.member, f.view, allowed)
            .await
            .unwrap();
    }
    let rows = permissions
        .find_role_action_permissions(f.plan, Some(f.member))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].allowed);
}

#[tokio::test]
async fn test_deletes_rejected_while_dependents_exist() {
    let f = fixture().await;
    let state = &f.app.state;
    state
        .entitlement_service
        .set_role_action_permission(f.plan, f.member, f.view, true)
        .await
        .unwrap();

    let err = state.role_service.delete(f.member).await.unwrap_err();
    assert!(matches!(err, AppError::DependencyInUse(_)));
    let err = state.plan_service.delete(f.plan).await.unwrap_err();
    assert!(matches!(err, AppError::DependencyInUse(_)));
    let err = state.action_service.delete(f.view).await.unwrap_err();
    assert!(matches!(err, AppError::DependencyInUse(_)));

    // Nothing changed, so the decision still stands
    assert!(state.access.can(f.plan, f.member, "PROJECT_VIEW").await);

    // Unreferenced rows delete fine
    state.role_service.delete(f.owner).await.unwrap();
}

#[tokio::test]
async fn test_allowance_for_missing_role_is_not_found() {
    let f = fixture().await;
    let err = f
        .app
        .state
        .entitlement_service
        .set_role_action_permission(f.plan, StringUuid::new_v4(), f.view, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_seeded_matrix_decisions() {
    let app = TestApp::seeded().await;
    let access = &app.state.access;
    let free = app.plan_id("free").await;
    let business = app.plan_id("business").await;
    let owner = app.role_id("OWNER").await;
    let admin = app.role_id("ADMIN").await;
    let member = app.role_id("MEMBER").await;

    assert!(access.can(free, member, "PROJECT_VIEW").await);
    assert!(!access.can(free, member, "BILLING_MANAGE").await);
    assert!(access.can(free, owner, "BILLING_MANAGE").await);
    assert!(!access.can(free, owner, "ANALYTICS_EXPORT").await);
    assert!(!access.can(free, owner, "ADMIN_PERMISSIONS_MANAGE").await);

    assert!(access.can(business, owner, "ANALYTICS_EXPORT").await);
    assert!(!access.can(business, admin, "BILLING_MANAGE").await);
    assert!(access.can(business, admin, "ADMIN_PERMISSIONS_MANAGE").await);

    assert!(access.is_enabled(business, "ADMIN_AUDIT_VIEW").await);
    assert!(!access.is_enabled(free, "ADMIN_AUDIT_VIEW").await);
}
