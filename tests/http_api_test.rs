//! Admin HTTP API tests against the production router and the in-memory store

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use plangate_core::repository::{PermissionRepository, RoleRepository};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = TestApp::empty();
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_not_enabled() {
    let app = TestApp::empty();
    let (status, _) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_actions_grouped_by_category() {
    let app = TestApp::seeded().await;
    let (status, body) = app.get("/api/v1/actions").await;

    assert_eq!(status, StatusCode::OK);
    let actions = body["data"].as_array().unwrap();
    assert_eq!(actions.len(), 16);
    let categories: Vec<&str> = actions
        .iter()
        .map(|a| a["category"].as_str().unwrap())
        .collect();
    let mut sorted = categories.clone();
    sorted.sort();
    assert_eq!(categories, sorted);
}

#[tokio::test]
async fn test_list_roles_by_priority() {
    let app = TestApp::seeded().await;
    let (status, body) = app.get("/api/v1/roles").await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["OWNER", "ADMIN", "MEMBER"]);
}

#[tokio::test]
async fn test_mutation_without_caller_is_forbidden() {
    let app = TestApp::seeded().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            None,
            Some(json!({"name": "AUDITOR", "priority": 3})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "forbidden", "message": "Forbidden"}));
}

#[tokio::test]
async fn test_mutation_by_member_is_forbidden() {
    let app = TestApp::seeded().await;
    let member = app.caller("business", "MEMBER").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            Some(member),
            Some(json!({"name": "AUDITOR", "priority": 3})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");
    assert!(app.repos.roles.find_by_name("AUDITOR").await.unwrap().is_none());
}

#[tokio::test]
async fn test_owner_on_free_plan_cannot_manage_permissions() {
    // The free plan does not entitle ADMIN_PERMISSIONS_MANAGE, whatever the role
    let app = TestApp::seeded().await;
    let owner = app.caller("free", "OWNER").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            Some(owner),
            Some(json!({"name": "AUDITOR"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_role_crud() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            Some(admin),
            Some(json!({"name": "AUDITOR", "priority": 3, "description": "Read-only"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/roles",
            Some(admin),
            Some(json!({"name": "AUDITOR"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/roles/{}", id),
            Some(admin),
            Some(json!({"description": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], serde_json::Value::Null);
    assert_eq!(body["data"]["priority"], 3);

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/v1/roles/{}", id), Some(admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Role deleted successfully");

    let (status, _) = app.get(&format!("/api/v1/roles/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_action_slug_cannot_be_changed() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let id = app.action_id("PROJECT_VIEW").await;

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/v1/actions/{}", id),
            Some(admin),
            Some(json!({"slug": "PROJECT_READ"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = app.get(&format!("/api/v1/actions/{}", id)).await;
    assert_eq!(body["data"]["slug"], "PROJECT_VIEW");
}

#[tokio::test]
async fn test_create_action_rejects_invalid_slug() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/actions",
            Some(admin),
            Some(json!({"slug": "project-archive", "name": "Archive", "category": "project"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_delete_referenced_action_is_rejected() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let action_id = app.action_id("PROJECT_DELETE").await;
    let business = app.plan_id("business").await;
    let before = app
        .repos
        .permissions
        .find_role_action_permissions(business, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|row| row.action_id == action_id)
        .count();
    assert!(before > 0);

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/actions/{}", action_id),
            Some(admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "dependency_in_use");

    let after = app
        .repos
        .permissions
        .find_role_action_permissions(business, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|row| row.action_id == action_id)
        .count();
    assert_eq!(before, after);
    let (status, _) = app.get(&format!("/api/v1/actions/{}", action_id)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_toggle_allowance_is_visible_on_next_check() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let plan = app.plan_id("pro").await;
    let role = app.role_id("MEMBER").await;
    let action = app.action_id("PROJECT_CREATE").await;
    let check = format!("/api/v1/plans/{}/roles/{}/check/PROJECT_CREATE", plan, role);

    let (status, body) = app.get(&check).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": {"allowed": true}}));

    let (status, body) = app
        .send(
            Method::PUT,
            &format!(
                "/api/v1/plans/{}/roles/{}/action-permissions/{}",
                plan, role, action
            ),
            Some(admin),
            Some(json!({"allowed": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allowed"], false);

    let (_, body) = app.get(&check).await;
    assert_eq!(body, json!({"data": {"allowed": false}}));
}

#[tokio::test]
async fn test_disabling_entitlement_denies_every_role() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let plan = app.plan_id("pro").await;
    let action = app.action_id("PROJECT_VIEW").await;
    let roles = [
        app.role_id("OWNER").await,
        app.role_id("ADMIN").await,
        app.role_id("MEMBER").await,
    ];

    for role in roles {
        let (_, body) = app
            .get(&format!("/api/v1/plans/{}/roles/{}/check/PROJECT_VIEW", plan, role))
            .await;
        assert_eq!(body["data"]["allowed"], true);
    }

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/plans/{}/action-permissions/{}", plan, action),
            Some(admin),
            Some(json!({"enabled": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for role in roles {
        let (_, body) = app
            .get(&format!("/api/v1/plans/{}/roles/{}/check/PROJECT_VIEW", plan, role))
            .await;
        assert_eq!(body["data"]["allowed"], false);
    }
}

#[tokio::test]
async fn test_check_unknown_slug_denies() {
    let app = TestApp::seeded().await;
    let plan = app.plan_id("business").await;
    let role = app.role_id("OWNER").await;

    let (status, body) = app
        .get(&format!("/api/v1/plans/{}/roles/{}/check/NOT_A_THING", plan, role))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allowed"], false);
}

#[tokio::test]
async fn test_permission_matrix_listing() {
    let app = TestApp::seeded().await;
    let plan = app.plan_id("free").await;
    let member = app.role_id("MEMBER").await;

    let (status, body) = app
        .get(&format!("/api/v1/plans/{}/action-permissions", plan))
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 16);
    assert_eq!(rows.iter().filter(|r| r["enabled"] == true).count(), 7);

    let (status, body) = app
        .get(&format!(
            "/api/v1/plans/{}/role-permissions?role_id={}",
            plan, member
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert!(!rows.is_empty());
    assert!(rows
        .iter()
        .all(|r| r["role_id"] == serde_json::Value::String(member.to_string())));
}

#[tokio::test]
async fn test_matrix_for_missing_plan_is_not_found() {
    let app = TestApp::seeded().await;
    let (status, _) = app
        .get(&format!(
            "/api/v1/plans/{}/action-permissions",
            uuid::Uuid::new_v4()
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_module_actions_replaces_set() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let module = app.module_id("insights").await;
    let view = app.action_id("ANALYTICS_VIEW").await;
    let audit = app.action_id("ADMIN_AUDIT_VIEW").await;
    let path = format!("/api/v1/modules/{}/actions", module);

    let (status, body) = app
        .send(
            Method::PUT,
            &path,
            Some(admin),
            Some(json!({"action_ids": [audit, view, audit]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action_slug"].as_str().unwrap())
        .collect();
    // ordered by category (admin < analytics), duplicates collapsed
    assert_eq!(slugs, vec!["ADMIN_AUDIT_VIEW", "ANALYTICS_VIEW"]);
}

#[tokio::test]
async fn test_set_module_actions_with_unknown_id_keeps_old_set() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let module = app.module_id("projects").await;
    let view = app.action_id("PROJECT_VIEW").await;
    let path = format!("/api/v1/modules/{}/actions", module);

    let (_, before) = app.get(&path).await;

    let (status, _) = app
        .send(
            Method::PUT,
            &path,
            Some(admin),
            Some(json!({"action_ids": [view, uuid::Uuid::new_v4()]})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, after) = app.get(&path).await;
    assert_eq!(before, after);
    assert!(!after["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_module_action_add_and_remove() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let module = app.module_id("settings").await;
    let export = app.action_id("ANALYTICS_EXPORT").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/modules/{}/actions", module),
            Some(admin),
            Some(json!({"action_id": export})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["action_id"], export.to_string());

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/modules/{}/actions/{}", module, export),
            Some(admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/modules/{}/actions/{}", module, export),
            Some(admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_module_with_actions_is_rejected() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let module = app.module_id("team").await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/modules/{}", module),
            Some(admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_plan_patch_clears_price_ids() {
    let app = TestApp::seeded().await;
    let admin = app.admin().await;
    let plan = app.plan_id("pro").await;
    let path = format!("/api/v1/plans/{}", plan);

    let (status, body) = app
        .send(
            Method::PATCH,
            &path,
            Some(admin),
            Some(json!({"stripe_price_id_monthly": "price_123"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stripe_price_id_monthly"], "price_123");
    assert_eq!(body["data"]["display_name"], "Pro");

    let (_, body) = app
        .send(
            Method::PATCH,
            &path,
            Some(admin),
            Some(json!({"stripe_price_id_monthly": null})),
        )
        .await;
    assert_eq!(body["data"]["stripe_price_id_monthly"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_navigation_filter_hides_denied_entries() {
    let app = TestApp::seeded().await;
    let member = app.caller("free", "MEMBER").await;

    let items = json!([
        {"key": "home", "label": "Home", "href": "/", "gate": {"type": "open"}},
        {"key": "projects", "label": "Projects", "href": "/projects",
         "gate": {"type": "role", "action": "PROJECT_VIEW"}},
        {"key": "insights", "label": "Insights", "href": "/insights",
         "gate": {"type": "plan", "action": "ANALYTICS_VIEW"}},
        {"key": "billing", "label": "Billing", "href": "/billing",
         "gate": {"type": "role", "action": "BILLING_MANAGE"}}
    ]);

    let (status, body) = app
        .send(Method::POST, "/api/v1/navigation", Some(member), Some(items))
        .await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["home", "projects"]);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = TestApp::empty();
    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}
