use anyhow::Result;

use wordday::app::App;
use wordday::config::Config;
use wordday::metrics;
use wordday::server;

/// Run the scheduler and the HTTP API until Ctrl+C
pub async fn serve(config: Config, no_scheduler: bool) -> Result<()> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics registry unavailable, continuing without metrics");
    }

    let app = App::build(config).await?;
    let server_config = app.config.server.clone();

    if no_scheduler {
        tracing::info!("Scheduler disabled for this run");
    } else {
        app.scheduler.start().await;
    }

    println!("wordday listening on {}:{}", server_config.host, server_config.port);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to wait for Ctrl+C: {}", e),
        }
    };

    let result = server::serve(app.state(), &server_config, shutdown).await;

    app.scheduler.stop().await;
    println!("wordday stopped.");
    result
}
