//! Forecast water use for one country from three differently labelled
//! datasets, streaming training progress from a worker thread.
//!
//! Run with: cargo run --example forecast_demo
//! Set `RUST_LOG=aquacast=debug` to see pipeline stage logs.

use aquacast::prelude::*;
use tracing_subscriber::EnvFilter;

/// (label, year, temperature, usage, population) rows as they might arrive
/// from CSV exports, including a few unparseable cells.
fn raw_rows() -> Vec<(&'static str, i32, String, String, String)> {
    (0..30)
        .map(|i| {
            let year = 1990 + i;
            let t = i as f64;
            let usage = if i == 7 {
                "n/a".to_string()
            } else {
                format!("{:.2}", 1.8 + 0.06 * t + 0.1 * (t / 3.0).sin())
            };
            (
                "Viet Nam",
                year,
                format!("{:.2}", 24.5 + 0.02 * t),
                usage,
                format!("{:.0}", 6.6e7 * (1.0 + 0.012 * t)),
            )
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== aquacast forecast demo ===\n");

    let config = PipelineConfig::default().with_seed(7);

    // 1. Ingest textual values under the configured numeric policy
    let mut datasets = RawDatasets::default();
    let mut rejected = 0;
    for (label, year, temperature, usage, population) in raw_rows() {
        let accepted = [
            datasets.push_text("Vietnam", year, &temperature, SourceTag::Temperature, &config),
            datasets.push_text(label, year, &usage, SourceTag::Usage, &config),
            datasets.push_text("VIET NAM", year, &population, SourceTag::Population, &config),
        ];
        rejected += accepted.iter().filter(|ok| !**ok).count();
    }
    let datasets = datasets.with_canonical_labels(["Viet Nam", "Thailand", "Cambodia"]);
    println!("Ingested records ({rejected} rejected)");

    // 2. Inspect the prepared series
    let orchestrator = match PipelineOrchestrator::new(config.clone()) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return;
        }
    };
    match orchestrator.prepare("Viet Nam", &datasets) {
        Ok(prepared) => println!(
            "Fused {} years into {} training and {} test windows",
            prepared.fused.len(),
            prepared.train.len(),
            prepared.test.len()
        ),
        Err(e) => {
            eprintln!("preparation failed: {e}");
            return;
        }
    }

    // 3. Train on a worker thread and stream progress
    println!("\n--- Training ---");
    let (mut tx, rx) = progress_channel();
    let horizon = config.horizon;
    let worker = std::thread::spawn(move || {
        orchestrator.run_forecast_with("Viet Nam", &datasets, horizon, &mut tx, None)
    });

    for event in rx {
        if event.epoch % 10 == 9 {
            println!(
                "epoch {:>3}  loss {:.5}  accuracy {:.3}",
                event.epoch + 1,
                event.loss,
                event.pseudo_accuracy()
            );
        }
    }

    let result = match worker.join() {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            eprintln!("forecast failed: {e}");
            return;
        }
        Err(_) => {
            eprintln!("forecast worker panicked");
            return;
        }
    };

    // 4. Report
    println!("\n--- Forecast for {} ---", result.entity_id);
    println!(
        "Std error: {:.4} (scaled), {:.4} (target units)",
        result.std_error, result.std_error_target_units
    );
    for point in &result.forecast_series {
        println!(
            "{}: {:.3} ± {:.3}",
            point.year,
            point.value,
            1.96 * result.std_error_target_units
        );
    }

    match serde_json::to_string_pretty(&result.forecast_series) {
        Ok(json) => println!("\nJSON:\n{json}"),
        Err(e) => eprintln!("serialization failed: {e}"),
    }
}
