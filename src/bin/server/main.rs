//! Entry point: wires [`Settings`] into registered backends, a repository, and a
//! [`content_core::Service`], then serves the JSON REST surface.

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{self, RandomIdGenerator, Sampler};
use opentelemetry_sdk::Resource;
use tracing::info;
use tracing_subscriber::prelude::*;

use content_core::blobstore::fs::{FsBlobStore, FsConfig};
use content_core::blobstore::memory::MemoryBlobStore;
use content_core::blobstore::s3::{S3BlobStore, S3Config};
use content_core::blobstore::BlobStore;
use content_core::config::{BackendKind, DatabaseKind, Settings};
use content_core::event_sink::NoopEventSink;
use content_core::key_generator::KeyGenerator;
use content_core::repository::memory::MemoryRepository;
use content_core::repository::postgres::PostgresRepository;
use content_core::repository::Repository;
use content_core::url_strategy::UrlStrategy;
use content_core::Service;

mod http;

#[derive(Debug, Parser)]
#[command(version)]
struct Opt {
    /// Base name (without extension) of the config file to load, overlaid with `CONTENT_*`
    /// environment variables.
    #[arg(long, short, default_value = "config/default")]
    config: String,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::parse();
    let settings = Settings::load(&opt.config)?;
    setup_tracing(&settings)?;

    let repository = build_repository(&settings).await?;
    let key_generator = KeyGenerator::new(settings.key_policy);
    let url_strategy = UrlStrategy::new(settings.url_strategy, settings.api_prefix.clone());
    let service = Arc::new(Service::new(repository, key_generator, url_strategy, Arc::new(NoopEventSink)));

    for backend in &settings.backends {
        let store: Arc<dyn BlobStore> = build_backend(backend, &settings).await?;
        service.register_backend(store).await;
        info!(name = %backend.name, "registered storage backend");
    }

    let state = http::AppState { service };
    let app = http::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server is running at http://{addr}");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("server is stopped");
    Ok(())
}

async fn build_repository(settings: &Settings) -> Result<Arc<dyn Repository>, Box<dyn std::error::Error>> {
    match settings.database.kind {
        DatabaseKind::Memory => Ok(Arc::new(MemoryRepository::new())),
        DatabaseKind::Postgres => {
            let url = settings
                .database
                .url
                .as_deref()
                .ok_or("database.url is required when database.type = postgres")?;
            let repo = PostgresRepository::connect(url).await?;
            Ok(Arc::new(repo))
        }
    }
}

async fn build_backend(
    backend: &content_core::config::BackendConfig,
    settings: &Settings,
) -> Result<Arc<dyn BlobStore>, Box<dyn std::error::Error>> {
    match backend.kind {
        BackendKind::Memory => Ok(Arc::new(MemoryBlobStore::new(backend.name.clone()))),
        BackendKind::Fs => {
            let base_dir = backend
                .base_dir
                .as_deref()
                .ok_or("backend.base_dir is required for a fs backend")?;
            let store = FsBlobStore::new(
                backend.name.clone(),
                FsConfig {
                    base_dir: base_dir.into(),
                    url_prefix: backend.url_prefix.clone().unwrap_or_else(|| settings.api_prefix.clone()),
                    secret: settings.presign_secret.clone(),
                    presign_expires_seconds: settings.presign_expires_seconds,
                },
            );
            Ok(Arc::new(store))
        }
        BackendKind::S3 => {
            let bucket = backend.bucket.clone().ok_or("backend.bucket is required for an s3 backend")?;
            let store = S3BlobStore::new(
                backend.name.clone(),
                S3Config {
                    bucket,
                    region: backend.region.clone().unwrap_or_else(|| "us-east-1".into()),
                    endpoint_url: backend.endpoint.clone(),
                    access_key: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
                    secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
                    use_path_style: backend.use_path_style,
                    create_bucket_if_not_exist: backend.create_bucket_if_not_exist,
                    sse: None,
                },
            )
            .await?;
            Ok(Arc::new(store))
        }
    }
}

fn setup_tracing(settings: &Settings) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    if settings.otlp_endpoint.is_none() {
        use tracing_subscriber::EnvFilter;

        let env_filter = EnvFilter::from_default_env();
        let enable_color = std::io::stdout().is_terminal();

        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(env_filter)
            .with_ansi(enable_color)
            .init();
        return Ok(());
    }

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(settings.otlp_endpoint.clone().unwrap())
                .with_timeout(Duration::from_secs(3)),
        )
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_max_events_per_span(64)
                .with_max_attributes_per_span(16)
                .with_resource(Resource::new(vec![KeyValue::new("service.name", "content-server")])),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    let fmt_layer = tracing_subscriber::fmt::layer();
    let opentelemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with(fmt_layer)
        .with(opentelemetry);
    registry.try_init()?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
