use rusty_library_circulation::{
    adapters::clock::SystemClock,
    adapters::memory::{InMemoryLoanStore, RecordingNotificationGateway},
    adapters::postgres::PostgresLoanStore,
    api::{handlers::AppState, router::create_router},
    application::loan::ServiceDependencies,
    application::reminder::ReminderScheduler,
    config::AppConfig,
    ports::LoanStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rusty_library_circulation=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Select the loan store
    let loan_store: Arc<dyn LoanStore> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Using PostgreSQL loan store");
            Arc::new(PostgresLoanStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory loan store");
            Arc::new(InMemoryLoanStore::new())
        }
    };

    // Create service dependencies
    let service_deps = ServiceDependencies {
        loan_store,
        notification_gateway: Arc::new(RecordingNotificationGateway::new()),
        clock: Arc::new(SystemClock),
    };

    // Start the reminder scheduler
    let scheduler = ReminderScheduler::spawn(service_deps.clone(), config.reminder_interval);

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    let state = scheduler.shutdown_and_join().await;
    tracing::info!(?state, "Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
