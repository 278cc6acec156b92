//! Traffic Replay
//!
//! Sends generated live-traffic batches, with occasional bot-drain bursts, to
//! the engine's analyze subject and logs each verdict.
//!
//! Usage: traffic_replay [nats_url] [subject] [batches] [attack_rate] [delay_ms]

use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};
use transaction_risk_engine::simulator::{AttackInjector, TrafficGenerator};
use transaction_risk_engine::{BatchAnalysis, TransactionRecord};

const BURST_SIZE: usize = 20;

fn next_batch<R: Rng>(rng: &mut R, attack_rate: f64) -> (Vec<TransactionRecord>, bool) {
    if rng.gen_bool(attack_rate) {
        (AttackInjector::burst(rng, BURST_SIZE), true)
    } else {
        (TrafficGenerator::batch(rng), false)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("traffic_replay=info".parse()?),
        )
        .init();

    info!("Starting Traffic Replay");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("fraud.analyze");
    let batches: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(50);
    let attack_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(500);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        batches,
        attack_rate,
        delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(batches, attack_rate, delay_ms).await;
        }
    };

    let mut rng = rand::thread_rng();
    let (mut sent, mut flagged, mut bursts) = (0usize, 0usize, 0u64);

    for i in 0..batches {
        let (records, is_burst) = next_batch(&mut rng, attack_rate);
        if is_burst {
            bursts += 1;
        }
        let payload = serde_json::to_vec(&json!({ "transactions": records }))?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => match serde_json::from_slice::<BatchAnalysis>(&reply.payload) {
                Ok(analysis) => {
                    sent += analysis.total_analyzed;
                    flagged += analysis.total_flagged;
                    info!(
                        batch = i + 1,
                        burst = is_burst,
                        analyzed = analysis.total_analyzed,
                        flagged = analysis.total_flagged,
                        "Batch analyzed"
                    );
                }
                Err(_) => {
                    let error = serde_json::from_slice::<Value>(&reply.payload)
                        .ok()
                        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
                        .unwrap_or_else(|| "unreadable reply".to_string());
                    warn!(batch = i + 1, error = %error, "Batch rejected");
                }
            },
            Err(e) => warn!(batch = i + 1, error = %e, "Request failed"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} transactions in {} batches ({} bursts), {} flagged",
        sent, batches, bursts, flagged
    );

    Ok(())
}

async fn run_dry_mode(batches: u64, attack_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut rng = rand::thread_rng();

    for i in 0..batches {
        let (records, is_burst) = next_batch(&mut rng, attack_rate);

        if is_burst || i == 0 || (i + 1) % 10 == 0 {
            let sample = serde_json::to_string_pretty(&records[0])?;
            info!(
                "Sample batch {} ({} records, burst: {}):\n{}",
                i + 1,
                records.len(),
                is_burst,
                sample
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
