use hostgate::{router, AppState, Config};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostgate=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| {
        error!("ошибка конфигурации: {}", e);
        e
    })?;
    info!(?config, "конфигурация загружена");

    let addr = config.bind_address;
    let app_state = AppState::new(config);
    let sweeper = app_state.admission.spawn_sweeper();

    let listener = TcpListener::bind(&addr).await?;
    info!("Сервер запущен по адресу http://{}", addr);

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Сервер остановлен");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("не удалось слушать Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("получен Ctrl+C, останавливаемся");
}
