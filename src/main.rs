use clap::Parser;
use lucidly::config::cli::ServerArgs;
use lucidly::server::{create_router, AppState};
use lucidly::utils::error::ErrorSeverity;
use lucidly::utils::{logger, validation::Validate};
use lucidly::LucidlyError;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();

    let file_config = match args.load_toml() {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    // 初始化日誌
    logger::init_server_logger(args.verbose(&file_config), args.log_format(&file_config));
    tracing::info!("Starting Lucidly API server v{}", env!("CARGO_PKG_VERSION"));

    // 合併並驗證配置
    let settings = match args.resolve(&file_config).and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => exit_with(e),
    };
    tracing::debug!("Resolved settings: store={}, environment={}", settings.store.name(), settings.environment);

    let state = match AppState::from_settings(&settings) {
        Ok(state) => state,
        Err(e) => exit_with(e),
    };
    let app = create_router(state);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

fn exit_with(e: LucidlyError) -> ! {
    tracing::error!(
        "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Critical => 3,
        _ => 1,
    };
    std::process::exit(exit_code);
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
