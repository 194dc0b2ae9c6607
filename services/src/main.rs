use recipebook_services::{config::Config, database, routes, storage::PgStorage, telemetry};
use recipebook_utils::version_info::{build_branch, build_commit, build_date, build_version};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config: Config = Config::init()?;

    telemetry::init_tracing(&config)?;

    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        "Configuration loaded"
    );

    let pool = database::create_pool(&config).await?;
    if config.run_migrations() {
        database::run_migrations(&pool).await?;
    }

    let route = routes(PgStorage::new(pool), config.clone());

    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

fn print_build_info() {
    info!("===========================================");
    info!("  Recipebook Services {}", build_version());
    info!("===========================================");
    info!("Build Date:   {}", build_date());
    info!("Build Commit: {}", build_commit());
    info!("Build Branch: {}", build_branch());
    info!("===========================================");
}
