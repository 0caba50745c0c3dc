use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plangate_core::{
    cache::PermissionCache,
    config::Config,
    migration,
    seed::Seeder,
    server::{self, AppState},
    telemetry,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "plangate-core")]
#[command(about = "Plan entitlement and role allowance service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the admin HTTP API (default)
    Serve,
    /// Create the database if missing and apply migrations
    Migrate,
    /// Upsert the baseline roles, actions, plans, modules and permission tables
    Seed,
    /// Evaluate one decision: may ROLE perform ACTION under PLAN
    Check {
        /// Plan name, e.g. "free"
        plan: String,
        /// Role name, e.g. "MEMBER"
        role: String,
        /// Action slug, e.g. "PROJECT_CREATE"
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let prometheus = telemetry::init(&config.telemetry)?;

    let cache = PermissionCache::with_capacity(
        config.permission_cache.ttl(),
        config.permission_cache.max_entries,
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting Plangate Core Service");
            server::run(config, prometheus).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
        Command::Seed => {
            let repos = server::connect_repositories(&config).await?;
            let report = Seeder::new(repos, cache)
                .run()
                .await
                .context("Seeding failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Check { plan, role, action } => {
            let repos = server::connect_repositories(&config).await?;
            let state = AppState::new(repos, cache);
            let plan = state.plan_service.get_by_name(&plan).await?;
            let role = state.role_service.get_by_name(&role).await?;
            let allowed = state.access.can(plan.id, role.id, &action).await;
            println!(
                "{} / {} / {}: {}",
                plan.name,
                role.name,
                action,
                if allowed { "allowed" } else { "denied" }
            );
            Ok(())
        }
    }
}
