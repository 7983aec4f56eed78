use axum::Router;
use envconfig::Envconfig;
use eyre::{eyre, Result};
use log::{error, info};

use santa_core::db::{open_db, open_db_in_memory};
use santa_server::{router, AppState, Config};

const IN_MEMORY_PATH: &str = ":memory:";

async fn listen(app: Router, bind: String) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("event=server_listen module=server status=ok bind={}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=server_shutdown module=server status=error error={}", err);
        return;
    }
    info!("event=server_shutdown module=server status=ok");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::init_from_env()?;
    santa_core::init_logging(config.log_level(), config.log_dir()).map_err(|err| eyre!(err))?;
    let settings = config.settings()?;

    let conn = if config.database_path == IN_MEMORY_PATH {
        open_db_in_memory()?
    } else {
        open_db(&config.database_path)?
    };

    let state = AppState::new(conn, settings);
    if let Some(hash) = config.admin_password_hash() {
        state.bootstrap_admin(&config.admin_name, hash).await?;
    } else {
        info!("event=admin_bootstrap module=server status=skipped reason=no_password_hash");
    }

    if let Err(err) = listen(router(state), config.bind()).await {
        error!("event=server_listen module=server status=error error={}", err);
        return Err(err);
    }
    Ok(())
}
