//! Common test utilities
//!
//! Builds the production router over a seeded in-memory store, so HTTP tests
//! run without a database.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use plangate_core::cache::PermissionCache;
use plangate_core::domain::{Caller, StringUuid};
use plangate_core::middleware::caller::{PLAN_ID_HEADER, ROLE_ID_HEADER};
use plangate_core::repository::{
    ActionRepository, InMemoryStore, ModuleRepository, PlanRepository, Repositories,
    RoleRepository,
};
use plangate_core::seed::Seeder;
use plangate_core::server::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub repos: Repositories,
    pub cache: PermissionCache,
}

impl TestApp {
    /// Empty stores
    pub fn empty() -> Self {
        let repos = Repositories::in_memory(InMemoryStore::new());
        let cache = PermissionCache::default();
        let state = AppState::new(repos.clone(), cache.clone());
        Self {
            app: build_router(state.clone()),
            state,
            repos,
            cache,
        }
    }

    /// Stores populated by the seed pipeline
    pub async fn seeded() -> Self {
        let app = Self::empty();
        Seeder::new(app.repos.clone(), app.cache.clone())
            .run()
            .await
            .unwrap();
        app
    }

    pub async fn plan_id(&self, name: &str) -> StringUuid {
        self.repos.plans.find_by_name(name).await.unwrap().unwrap().id
    }

    pub async fn role_id(&self, name: &str) -> StringUuid {
        self.repos.roles.find_by_name(name).await.unwrap().unwrap().id
    }

    pub async fn action_id(&self, slug: &str) -> StringUuid {
        self.repos.actions.find_by_slug(slug).await.unwrap().unwrap().id
    }

    pub async fn module_id(&self, slug: &str) -> StringUuid {
        self.repos.modules.find_by_slug(slug).await.unwrap().unwrap().id
    }

    pub async fn caller(&self, plan: &str, role: &str) -> Caller {
        Caller {
            plan_id: self.plan_id(plan).await,
            role_id: self.role_id(role).await,
        }
    }

    /// A caller allowed to manage permissions (OWNER on business)
    pub async fn admin(&self) -> Caller {
        self.caller("business", "OWNER").await
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty or not JSON)
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        caller: Option<Caller>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(caller) = caller {
            builder = builder
                .header(PLAN_ID_HEADER, caller.plan_id.to_string())
                .header(ROLE_ID_HEADER, caller.role_id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, None, None).await
    }
}
