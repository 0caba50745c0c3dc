//! Server initialization and routing

use crate::api;
use crate::cache::PermissionCache;
use crate::config::{Config, StoreBackend};
use crate::middleware::ObservabilityLayer;
use crate::repository::{InMemoryStore, Repositories};
use crate::seed::Seeder;
use crate::service::{
    AccessControl, ActionService, EntitlementService, ModuleService, PermissionEvaluator,
    PlanService, RoleService,
};
use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub role_service: Arc<RoleService>,
    pub action_service: Arc<ActionService>,
    pub plan_service: Arc<PlanService>,
    pub module_service: Arc<ModuleService>,
    pub entitlement_service: Arc<EntitlementService>,
    pub access: AccessControl,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire every service over one set of stores and one cache instance.
    pub fn new(repos: Repositories, cache: PermissionCache) -> Self {
        let evaluator = Arc::new(PermissionEvaluator::new(
            repos.permissions.clone(),
            repos.actions.clone(),
        ));

        Self {
            role_service: Arc::new(RoleService::new(repos.roles.clone(), cache.clone())),
            action_service: Arc::new(ActionService::new(repos.actions.clone(), cache.clone())),
            plan_service: Arc::new(PlanService::new(repos.plans.clone(), cache.clone())),
            module_service: Arc::new(ModuleService::new(
                repos.modules.clone(),
                repos.actions.clone(),
            )),
            entitlement_service: Arc::new(EntitlementService::new(
                repos.permissions.clone(),
                repos.actions.clone(),
                repos.plans.clone(),
                cache.clone(),
            )),
            access: AccessControl::new(evaluator, cache),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.prometheus = handle;
        self
    }
}

/// Open the configured store
pub async fn connect_repositories(config: &Config) -> Result<Repositories> {
    match config.store_backend {
        StoreBackend::Mysql => {
            let database = config.require_database()?;
            let pool = MySqlPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .connect(&database.url)
                .await
                .context("Failed to connect to database")?;
            info!("Connected to database");
            Ok(Repositories::mysql(pool))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on shutdown");
            Ok(Repositories::in_memory(InMemoryStore::new()))
        }
    }
}

/// Run the HTTP server until a shutdown signal arrives
pub async fn run(config: Config, prometheus: Option<PrometheusHandle>) -> Result<()> {
    let repos = connect_repositories(&config).await?;
    let cache = PermissionCache::with_capacity(
        config.permission_cache.ttl(),
        config.permission_cache.max_entries,
    );

    if config.seed_on_startup {
        let report = Seeder::new(repos.clone(), cache.clone())
            .run()
            .await
            .context("Seeding failed")?;
        info!(?report, "Seed pipeline finished");
    }

    let sweeper = cache.spawn_sweeper(config.permission_cache.sweep_interval());
    let state = AppState::new(repos, cache).with_prometheus(prometheus);
    let app = build_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!("HTTP server started on {}", http_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sweeper.abort();
    served?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and metrics
        .route("/health", get(api::health::health))
        .route("/metrics", get(api::metrics::metrics_handler))
        // Roles
        .route(
            "/api/v1/roles",
            get(api::role::list_roles).post(api::role::create_role),
        )
        .route(
            "/api/v1/roles/{id}",
            get(api::role::get_role)
                .patch(api::role::update_role)
                .delete(api::role::delete_role),
        )
        // Action catalog
        .route(
            "/api/v1/actions",
            get(api::action::list_actions).post(api::action::create_action),
        )
        .route(
            "/api/v1/actions/{id}",
            get(api::action::get_action)
                .patch(api::action::update_action)
                .delete(api::action::delete_action),
        )
        // Plans
        .route(
            "/api/v1/plans",
            get(api::plan::list_plans).post(api::plan::create_plan),
        )
        .route(
            "/api/v1/plans/{id}",
            get(api::plan::get_plan)
                .patch(api::plan::update_plan)
                .delete(api::plan::delete_plan),
        )
        // Modules
        .route(
            "/api/v1/modules",
            get(api::module::list_modules).post(api::module::create_module),
        )
        .route(
            "/api/v1/modules/{id}",
            get(api::module::get_module)
                .patch(api::module::update_module)
                .delete(api::module::delete_module),
        )
        .route(
            "/api/v1/modules/{id}/actions",
            get(api::module::list_module_actions)
                .put(api::module::set_module_actions)
                .post(api::module::add_module_action),
        )
        .route(
            "/api/v1/modules/{id}/actions/{action_id}",
            delete(api::module::remove_module_action),
        )
        // Plan entitlements
        .route(
            "/api/v1/plans/{id}/action-permissions",
            get(api::permission::list_plan_action_permissions),
        )
        .route(
            "/api/v1/plans/{id}/action-permissions/{action_id}",
            put(api::permission::set_plan_action_permission)
                .delete(api::permission::delete_plan_action_permission),
        )
        // Role allowances
        .route(
            "/api/v1/plans/{id}/role-permissions",
            get(api::permission::list_role_action_permissions),
        )
        .route(
            "/api/v1/plans/{id}/roles/{role_id}/action-permissions/{action_id}",
            put(api::permission::set_role_action_permission)
                .delete(api::permission::delete_role_action_permission),
        )
        // Decisions
        .route(
            "/api/v1/plans/{id}/roles/{role_id}/check/{action_slug}",
            get(api::permission::check_permission),
        )
        .route(
            "/api/v1/navigation",
            post(api::permission::filter_navigation),
        )
        // Add middleware
        .layer(ObservabilityLayer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
