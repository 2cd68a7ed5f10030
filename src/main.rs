use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use studymate::{
    build_backend_app, build_gateway_app, build_ocr_app, config::Config, BackendState, GatewayState, OcrState,
};

const GATEWAY_ADDRESS: &str = "0.0.0.0:8000";
const OCR_ADDRESS: &str = "0.0.0.0:8001";
const BACKEND_ADDRESS: &str = "0.0.0.0:8002";

#[derive(Parser)]
#[command(name = "studymate")]
#[command(version, about = "Study assistant services: OCR, quiz generation, transcription and speech")]
struct Cli {
    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand)]
enum Service {
    /// Public API gateway in front of the OCR service and Ollama
    Gateway {
        /// Address to listen on (overrides SERVER_ADDRESS)
        #[arg(long)]
        bind: Option<String>,
    },
    /// OCR microservice wrapping tesseract
    Ocr {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Backend with local OCR, content generation, transcription and TTS
    Backend {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let (name, app, address) = match cli.service {
        Service::Gateway { bind } => {
            let address = bind.unwrap_or_else(|| config.bind_address(GATEWAY_ADDRESS));
            info!("OCR service: {}", config.ocr_service_url);
            info!("Ollama: {} (model {})", config.ollama_url, config.ollama_model);
            let state = GatewayState::from_config(config)?;
            ("gateway", build_gateway_app(Arc::new(state)), address)
        }
        Service::Ocr { bind } => {
            let address = bind.unwrap_or_else(|| config.bind_address(OCR_ADDRESS));
            info!(
                "OCR language {}, {} concurrent jobs",
                config.ocr_language, config.concurrent_ocr_jobs
            );
            let state = OcrState::from_config(config);
            ("ocr", build_ocr_app(Arc::new(state)), address)
        }
        Service::Backend { bind } => {
            let address = bind.unwrap_or_else(|| config.bind_address(BACKEND_ADDRESS));
            info!("Ollama: {} (model {})", config.ollama_url, config.ollama_model);
            info!("Transcription: {}", config.transcription_url);
            let state = BackendState::from_config(config)?;
            info!("TTS engine: {}", state.tts.name());
            ("backend", build_backend_app(Arc::new(state)), address)
        }
    };

    serve(name, app, &address).await
}

async fn serve(name: &str, app: Router, address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("StudyMate {} listening on {}", name, listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("StudyMate {} stopped", name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
