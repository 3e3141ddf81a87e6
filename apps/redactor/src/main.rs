mod config;
mod db;
mod errors;
mod extraction;
mod fonts;
mod layout;
mod llm_client;
mod masking;
mod publish;
mod redaction;
mod render;
mod routes;
mod state;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::{build_extraction_prompt, ExtractionChain};
use crate::fonts::HttpFontResolver;
use crate::layout::LayoutConfig;
use crate::llm_client::LlmClient;
use crate::publish::S3Publisher;
use crate::redaction::RedactionPipeline;
use crate::render::RenderOptions;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting redactor v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (queue table)
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize the model chain
    let llm = LlmClient::new(config.gemini_api_key.clone(), config.gemini_api_base.clone())
        .context("failed to build Gemini HTTP client")?;
    let prompt = build_extraction_prompt(&config.policy, config.anchor_mode);
    let extractor = ExtractionChain::from_models(Arc::new(llm), &config.gemini_models, &prompt);
    info!(
        "Extraction chain: {} (anchor mode {:?})",
        extractor.provider_names().join(" -> "),
        config.anchor_mode
    );

    // Initialize font resolver
    let fonts = HttpFontResolver::new(config.font_url.clone())
        .context("failed to build font HTTP client")?;

    let publisher = S3Publisher::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
        db,
    );

    let pipeline = RedactionPipeline::new(
        extractor,
        Arc::new(fonts),
        Arc::new(publisher),
        config.anchor_mode,
        RenderOptions {
            layout: LayoutConfig::default(),
            with_summaries: config.policy.rewrite_summaries,
        },
    );

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        max_upload_bytes: config.max_upload_mb * 1024 * 1024,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "redactor-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO and most S3-compatible stores need path-style addressing
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
