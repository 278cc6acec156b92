//! Transaction Risk Engine - Main Entry Point
//!
//! Trains the ensemble at startup, serves scoring requests over NATS
//! request/reply, runs the live traffic simulator and publishes every flagged
//! transaction to the alert subject.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use transaction_risk_engine::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    engine::FraudEngine,
    handler::{self, Routes},
    metrics::MetricsReporter,
    producer::AlertProducer,
    simulator::LiveTrafficTask,
};

const CONFIG_PATH: &str = "config/config.toml";

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_found = Path::new(CONFIG_PATH).exists();
    let config = if config_found {
        AppConfig::load_from_path(CONFIG_PATH)?
    } else {
        AppConfig::default()
    };

    init_logging(&config.logging);
    info!("Starting Transaction Risk Engine");
    if config_found {
        info!(path = CONFIG_PATH, "Configuration loaded");
    } else {
        warn!(path = CONFIG_PATH, "Configuration file not found, using defaults");
    }
    info!(
        "Fraud threshold: {:.2}, block threshold: {:.2}, weights: {:.1}/{:.1}",
        config.detection.fraud_threshold,
        config.detection.block_threshold,
        config.detection.unsupervised_weight,
        config.detection.supervised_weight
    );

    // Training failures are fatal
    let engine = Arc::new(FraudEngine::new(config.clone()).context("Model training failed")?);
    let metrics = engine.metrics();

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), Routes::from_config(&config.nats));
    let producer = AlertProducer::new(client.clone(), &config.nats.alert_subject);
    info!("Publishing alerts to: {}", producer.subject());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();

    let live_traffic = tokio::spawn(
        LiveTrafficTask::new(engine.clone())
            .with_alert_sink(alert_tx)
            .run(shutdown_rx.clone()),
    );
    let reporter = tokio::spawn(
        MetricsReporter::new(metrics.clone(), config.stream.metrics_interval()).run(shutdown_rx),
    );

    let mut requests = consumer.subscribe().await?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            message = requests.next() => {
                let Some(message) = message else {
                    warn!("Request subscriptions closed");
                    break;
                };
                let Some(kind) = consumer.classify(&message) else {
                    continue;
                };

                let engine = engine.clone();
                let producer = producer.clone();
                tokio::spawn(async move {
                    let payload = message.payload.clone();
                    let reply = match tokio::task::spawn_blocking(move || {
                        handler::handle(&engine, kind, &payload)
                    })
                    .await
                    {
                        Ok(reply) => reply,
                        Err(e) => {
                            error!(request = ?kind, error = %e, "Request handler panicked");
                            return;
                        }
                    };

                    if let Some(reply_to) = message.reply {
                        if let Err(e) = producer.reply(reply_to, reply.body).await {
                            error!(request = ?kind, error = %e, "Failed to send reply");
                        }
                    }
                    producer.publish_batch(&reply.flagged).await;
                });
            }
            Some(alert) = alert_rx.recv() => {
                if let Err(e) = producer.publish(&alert).await {
                    error!(alert_id = %alert.alert_id, error = %e, "Failed to publish alert");
                }
            }
            _ = &mut ctrl_c => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Risk engine shutting down...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = live_traffic.await {
        error!(error = %e, "Live traffic task failed");
    }
    if let Err(e) = reporter.await {
        error!(error = %e, "Metrics reporter failed");
    }
    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush NATS connection");
    }

    Ok(())
}
