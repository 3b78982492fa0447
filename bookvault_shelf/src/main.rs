use std::sync::Arc;

use actix_web::{App, HttpServer};
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use bookvault_shelf::app_config::config_app;
use bookvault_shelf::auth::TokenService;
use bookvault_shelf::book_search_client::BookSearchClient;
use bookvault_shelf::settings::Settings;
use bookvault_shelf::users_repository::{
    InMemoryUsersRepository, PostgresUsersRepository, PostgresUsersRepositoryConfig,
    UsersRepository,
};

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() {
    let app_name = "bookvault_shelf";

    // Start a new Jaeger trace pipeline.
    // Spans are exported in batch - recommended setup for a production application.
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .expect("Failed to install OpenTelemetry tracer.");

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Create a `tracing` layer using the Jaeger tracer
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    // Create a `tracing` layer to emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    // Combined them all together in a `tracing` subscriber
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    let settings = Settings::load().expect("Failed to load configuration");

    let token_service = TokenService::new(settings.token_secret.as_bytes());

    let users_repository: Arc<dyn UsersRepository> = if settings.use_in_memory_db {
        Arc::new(InMemoryUsersRepository::default())
    } else {
        Arc::new(
            PostgresUsersRepository::init(PostgresUsersRepositoryConfig {
                hostname: settings.db_host,
                username: settings.db_username,
                password: settings.db_password,
            })
            .await
            .expect("Failed to init postgres"),
        )
    };

    let book_search_client = web::Data::new(
        BookSearchClient::new(&settings.catalog_url).expect("Failed to init book search client"),
    );

    println!("starting HTTP server at http://localhost:{}", settings.port);

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(users_repository.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(book_search_client.clone())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(("0.0.0.0", settings.port))?
    .run()
    .await
}
