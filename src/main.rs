use std::sync::Arc;

use chrono::Local;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use enrollment_dashboard::config::AppConfig;
use enrollment_dashboard::services::Dashboard;
use enrollment_dashboard::store::FirebaseStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "enrollment_dashboard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    info!("connecting to {}", config.store.database_url);

    let store = Arc::new(FirebaseStore::new(config.store.clone())?);
    let dashboard = Dashboard::new(store, config.page_size);
    let mut session = dashboard.mount();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            alive = session.pump() => {
                if !alive {
                    break;
                }
                let view = dashboard.view();
                let cards: Vec<String> = view.stats.cards().iter().map(ToString::to_string).collect();
                info!("{} | {} courses", cards.join(" | "), view.courses.len());
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }
    session.close();

    let export = dashboard.export(Local::now().date_naive());
    export.write_to(&config.export_dir)?;

    Ok(())
}
