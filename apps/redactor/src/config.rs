use anyhow::{Context, Result};

use crate::extraction::RedactionPolicy;
use crate::masking::AnchorMode;

const DEFAULT_MODELS: &str = "gemini-2.5-flash,gemini-2.0-flash,gemini-1.5-flash";
const DEFAULT_FONT_URL: &str =
    "https://github.com/google/fonts/raw/main/ofl/nanumgothic/NanumGothic-Regular.ttf";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    /// Base URL used to build the public reference URL of uploaded objects.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    /// Ordered candidate models for metadata extraction. First success wins.
    pub gemini_models: Vec<String>,
    pub font_url: String,
    pub anchor_mode: AnchorMode,
    pub policy: RedactionPolicy,
    pub max_upload_mb: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;
        let gemini_models = parse_model_list(&optional_env("GEMINI_MODELS", DEFAULT_MODELS));
        if gemini_models.is_empty() {
            anyhow::bail!("GEMINI_MODELS must name at least one model");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: optional_env("S3_PUBLIC_URL", &s3_endpoint),
            s3_endpoint,
            s3_region: optional_env("S3_REGION", "us-east-1"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_base: optional_env(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com",
            ),
            gemini_models,
            font_url: optional_env("FONT_URL", DEFAULT_FONT_URL),
            anchor_mode: parse_anchor_mode(&optional_env("MASK_ANCHOR_MODE", "body_start"))?,
            policy: RedactionPolicy {
                anonymize_parties: bool_env("ANONYMIZE_PARTIES", true)?,
                anonymize_counsel: bool_env("ANONYMIZE_COUNSEL", false)?,
                rewrite_summaries: bool_env("REWRITE_SUMMARIES", false)?,
            },
            max_upload_mb: optional_env("MAX_UPLOAD_MB", "25")
                .parse::<usize>()
                .context("MAX_UPLOAD_MB must be a positive integer")?,
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn bool_env(key: &str, default: bool) -> Result<bool> {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw)
            .with_context(|| format!("Environment variable '{key}' must be a boolean, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_anchor_mode(raw: &str) -> Result<AnchorMode> {
    raw.parse::<AnchorMode>()
        .context("MASK_ANCHOR_MODE must be 'page_ratio' or 'body_start'")
}

/// Splits a comma-separated model list, dropping blanks and later duplicates.
pub fn parse_model_list(raw: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !models.iter().any(|m| m == name) {
            models.push(name.to_string());
        }
    }
    models
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
