use std::{net::SocketAddr, path::Path, sync::Arc};

use anyhow::{Context, Result};
use dotenv::dotenv;

mod advice;
mod catalog;
mod config;
mod detection;
mod error;
mod model;
mod ollama;
mod rotator;
mod routes;
mod translate;

use advice::{AdviceGenerator, TextGenerator};
use catalog::DiseaseCatalog;
use config::Config;
use detection::Detector;
use model::Classifier;
use ollama::OllamaClient;
use routes::{create_router, AppState};
use translate::GoogleTranslator;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    log::info!("🚀 Starting crop advisory service...");

    let classifier = load_classifier(&config);
    let catalog = Arc::new(DiseaseCatalog::builtin());
    let detector = Arc::new(Detector::new(classifier, catalog));

    // `--classify <image>` runs one detection and exits, for checking a model by hand.
    let args: Vec<String> = std::env::args().collect();
    if let [_, flag, path, ..] = args.as_slice() {
        if flag == "--classify" {
            return classify_once(&detector, Path::new(path));
        }
    }

    let translator = Arc::new(
        GoogleTranslator::new(config.translate_url.clone(), config.http_timeout)
            .context("Failed to build translation client")?,
    );

    let generator: Option<Arc<dyn TextGenerator>> = if config.ollama_enabled {
        let client = OllamaClient::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
            config.http_timeout,
        )
        .context("Failed to build Ollama client")?;
        log::info!("✅ Ollama client ready ({} at {})", client.model(), config.ollama_url);
        Some(Arc::new(client) as Arc<dyn TextGenerator>)
    } else {
        None
    };

    let advisor = Arc::new(AdviceGenerator::new(translator, generator));
    if !advisor.generation_enabled() {
        log::warn!("⚠️ Ollama disabled, advice answers will be placeholders");
    }
    let app = create_router(AppState { advisor, detector }, config.body_limit_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("🌐 Listening on http://{}", addr);

    axum::Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("🛑 Shut down");
    Ok(())
}

fn load_classifier(config: &Config) -> Option<Arc<dyn Classifier>> {
    if !Path::new(&config.model_dir).exists() {
        log::warn!(
            "⚠️ Model directory {} not found, /detect will run in simulation mode",
            config.model_dir.display()
        );
        return None;
    }
    load_tensorflow(config)
}

#[cfg(feature = "tensorflow")]
fn load_tensorflow(config: &Config) -> Option<Arc<dyn Classifier>> {
    match model::TensorflowClassifier::load(
        &config.model_dir,
        &config.model_signature,
        config.image_size,
    ) {
        Ok(classifier) => {
            log::info!("✅ Crop disease model loaded from {}", config.model_dir.display());
            Some(Arc::new(classifier) as Arc<dyn Classifier>)
        }
        Err(e) => {
            log::error!("❌ Failed to load model: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "tensorflow"))]
fn load_tensorflow(_config: &Config) -> Option<Arc<dyn Classifier>> {
    log::warn!("⚠️ Built without the tensorflow feature, /detect will run in simulation mode");
    None
}

fn classify_once(detector: &Detector, path: &Path) -> Result<()> {
    let response = if detector.model_loaded() {
        let prediction = detector
            .classify_path(path)
            .with_context(|| format!("Failed to classify {}", path.display()))?;
        detector.describe(prediction)
    } else {
        detector.simulate()
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
