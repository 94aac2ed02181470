//! End-to-end scenarios for the forecasting pipeline.

use aquacast::config::PipelineConfig;
use aquacast::core::{RawRecord, SourceTag, WaterKind, WATER_FEATURE};
use aquacast::fusion::RawDatasets;
use aquacast::pipeline::PipelineOrchestrator;
use aquacast::progress::{progress_channel, CancellationToken, EpochEvent};
use aquacast::resolve::{resolve, Resolution};
use aquacast::ForecastError;
use approx::assert_relative_eq;

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default().with_seed(2024).with_epochs(4);
    config.model.hidden_units = 6;
    config
}

/// Twenty years of Kenya-like data under the source labels of three
/// differently curated datasets.
fn kenya_datasets() -> RawDatasets {
    let mut datasets = RawDatasets::default();
    for year in 1995..2015 {
        let t = (year - 1995) as f64;
        datasets.push(RawRecord::new("Kenya", year, 24.0 + 0.03 * t, SourceTag::Temperature));
        datasets.push(RawRecord::new("KENYA", year, 2.5 + 0.1 * t, SourceTag::Usage));
        datasets.push(RawRecord::new("KENYA", year, 0.4, SourceTag::Usage));
        datasets.push(RawRecord::new("KENYA", year, 30.0, SourceTag::Resource));
        let population = 2.8e7 * (1.0 + 0.025 * t);
        datasets.push(RawRecord::new("Kenya Rep.", year, population, SourceTag::Population));
    }
    datasets.with_canonical_labels(["Kenya", "Uganda", "United Republic of Tanzania"])
}

#[test]
fn usa_resolves_and_gibberish_does_not() {
    let canonical = ["United States of America", "Canada"];

    let mapping = resolve(&["USA"], &canonical, 0.6);
    assert_eq!(mapping.canonical_for("USA"), "United States of America");

    let mapping = resolve(&["Zzzz"], &canonical, 0.6);
    assert!(matches!(
        mapping.get("Zzzz"),
        Some(Resolution::Unresolved { .. })
    ));
    assert_eq!(mapping.canonical_for("Zzzz"), "Zzzz");
}

#[test]
fn one_to_five_scenario_windows_and_split() {
    let mut datasets = RawDatasets::default();
    for (i, year) in (1990..1995).enumerate() {
        datasets.push(RawRecord::new("X", year, 20.0, SourceTag::Temperature));
        datasets.push(RawRecord::new("X", year, (i + 1) as f64, SourceTag::Usage));
        datasets.push(RawRecord::new("X", year, 100.0, SourceTag::Population));
    }

    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let prepared = orchestrator.prepare("X", &datasets).unwrap();
    let water = prepared.scalers.water;

    let windows: Vec<(Vec<f64>, f64)> = prepared
        .train
        .iter()
        .chain(&prepared.test)
        .map(|w| {
            let inputs = w.features.iter().map(|f| water.inverse(f[WATER_FEATURE])).collect();
            (inputs, water.inverse(w.target))
        })
        .collect();

    assert_eq!(windows.len(), 2);
    for (got, expected) in windows[0].0.iter().zip([1.0, 2.0, 3.0]) {
        assert_relative_eq!(*got, expected, epsilon = 1e-12);
    }
    assert_relative_eq!(windows[0].1, 4.0, epsilon = 1e-12);
    for (got, expected) in windows[1].0.iter().zip([2.0, 3.0, 4.0]) {
        assert_relative_eq!(*got, expected, epsilon = 1e-12);
    }
    assert_relative_eq!(windows[1].1, 5.0, epsilon = 1e-12);

    assert_eq!(prepared.train.len(), 1);
    assert_eq!(prepared.test.len(), 1);
}

#[test]
fn misaligned_labels_fuse_after_resolution() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let prepared = orchestrator.prepare("Kenya", &kenya_datasets()).unwrap();

    let mapping = prepared.mapping.as_ref().unwrap();
    assert_eq!(mapping.canonical_for("KENYA"), "Kenya");
    assert_eq!(mapping.canonical_for("Kenya Rep."), "Kenya");
    assert_eq!(prepared.fused.len(), 20);
    // Usage records of a year are summed.
    assert_relative_eq!(prepared.fused[0].water, 2.9, epsilon = 1e-12);
}

#[test]
fn water_kind_selects_the_forecast_target() {
    let mut config = config();
    config.water_kind = WaterKind::Resource;
    let orchestrator = PipelineOrchestrator::new(config).unwrap();
    let prepared = orchestrator.prepare("Kenya", &kenya_datasets()).unwrap();
    assert!(prepared.fused.iter().all(|r| r.water == 30.0));
}

#[test]
fn horizon_ten_gives_ten_consecutive_years() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let result = orchestrator.run_forecast("Kenya", &kenya_datasets(), 10).unwrap();

    assert_eq!(result.forecast_series.len(), 10);
    assert_eq!(result.last_historical_year(), Some(2014));
    let years: Vec<i32> = result.forecast_series.iter().map(|p| p.year).collect();
    assert_eq!(years, (2015..2025).collect::<Vec<_>>());
    assert!(result.std_error.is_finite() && result.std_error >= 0.0);
}

#[test]
fn preparation_is_deterministic() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let a = orchestrator.prepare("Kenya", &kenya_datasets()).unwrap();
    let b = orchestrator.prepare("Kenya", &kenya_datasets()).unwrap();

    assert_eq!(a.fused, b.fused);
    assert_eq!(a.train, b.train);
    assert_eq!(a.test, b.test);
    assert_eq!(a.scalers, b.scalers);
}

#[test]
fn seeded_forecasts_are_bit_exact() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let a = orchestrator.run_forecast("Kenya", &kenya_datasets(), 5).unwrap();
    let b = orchestrator.run_forecast("Kenya", &kenya_datasets(), 5).unwrap();
    assert_eq!(a.forecast_series, b.forecast_series);
    assert_eq!(a.std_error, b.std_error);
}

#[test]
fn progress_streams_over_channel() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let datasets = kenya_datasets();
    let (mut tx, rx) = progress_channel();

    let handle = std::thread::spawn(move || {
        let result = orchestrator.run_forecast_with("Kenya", &datasets, 3, &mut tx, None);
        drop(tx);
        result
    });

    let events: Vec<EpochEvent> = rx.collect();
    let result = handle.join().unwrap().unwrap();

    assert_eq!(events.iter().map(|e| e.epoch).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert_eq!(events.last().map(|e| e.loss), Some(result.final_loss));
}

#[test]
fn cancellation_from_observer_stops_training() {
    let orchestrator = PipelineOrchestrator::new(config().with_epochs(20)).unwrap();
    let token = CancellationToken::new();
    let trigger = token.clone();
    let mut seen = 0;

    let err = orchestrator
        .run_forecast_with(
            "Kenya",
            &kenya_datasets(),
            3,
            &mut |e: EpochEvent| {
                seen += 1;
                if e.epoch == 4 {
                    trigger.cancel();
                }
            },
            Some(&token),
        )
        .unwrap_err();

    assert_eq!(err, ForecastError::Cancelled { epoch: 4 });
    assert_eq!(seen, 5);
}

#[test]
fn config_file_drives_the_run() {
    let config = PipelineConfig::from_toml_str(
        r#"
        horizon = 6
        water_kind = "usage"

        [training]
        epochs = 2
        batch_size = 8

        [model]
        hidden_units = 3
        seed = 11
        "#,
    )
    .unwrap();
    let horizon = config.horizon;
    let orchestrator = PipelineOrchestrator::new(config).unwrap();
    let result = orchestrator
        .run_forecast("Kenya", &kenya_datasets(), horizon)
        .unwrap();
    assert_eq!(result.horizon(), 6);
}

#[cfg(feature = "async")]
#[tokio::test]
async fn async_run_matches_blocking_run() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let (tx, rx) = progress_channel();

    let result = orchestrator
        .run_forecast_async("Kenya", kenya_datasets(), 4, Some(tx), None)
        .await
        .unwrap();
    let blocking = orchestrator.run_forecast("Kenya", &kenya_datasets(), 4).unwrap();

    assert_eq!(result, blocking);
    assert_eq!(rx.count(), 4);
}

#[cfg(feature = "async")]
#[tokio::test]
async fn timed_out_async_run_stops_training() {
    let epochs = 100_000;
    let orchestrator = PipelineOrchestrator::new(config().with_epochs(epochs)).unwrap();
    let (tx, rx) = progress_channel();
    let token = CancellationToken::new();

    let run = orchestrator.run_forecast_async(
        "Kenya",
        kenya_datasets(),
        4,
        Some(tx),
        Some(token.clone()),
    );
    let outcome = tokio::time::timeout(std::time::Duration::from_millis(5), run).await;

    assert!(outcome.is_err());
    assert!(token.is_cancelled());
    // The blocking run drops its sender once it notices the cancellation.
    let seen = tokio::task::spawn_blocking(move || rx.count()).await.unwrap();
    assert!(seen < epochs);
}

#[cfg(feature = "async")]
#[tokio::test]
async fn completed_async_run_leaves_token_untouched() {
    let orchestrator = PipelineOrchestrator::new(config()).unwrap();
    let token = CancellationToken::new();

    orchestrator
        .run_forecast_async("Kenya", kenya_datasets(), 2, None, Some(token.clone()))
        .await
        .unwrap();
    assert!(!token.is_cancelled());
}
