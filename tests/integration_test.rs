//! Integration tests for the backtest engine.
//!
//! Tests cover:
//! - Log-return compounding across monthly rebalances
//! - Units skipped for missing data or insufficient history
//! - Parallel and sequential runs agreeing
//! - Momentum and value strategies over synthetic prices

mod common;

use approx::assert_relative_eq;
use common::*;
use longshort::domain::backtest::{self, rebalance_dates, BacktestConfig};
use longshort::domain::period::Period;
use longshort::domain::strategy::{MomentumStrategy, Strategy, ValueStrategy};
use longshort::domain::weights::gross_exposure;
use longshort::ports::price_port::{PricePort, SharedPricePort};
use std::sync::Arc;

fn bounds(min: f64, max: f64) -> BacktestConfig {
    BacktestConfig {
        min_abs_weight: min,
        max_abs_weight: max,
        ..BacktestConfig::default()
    }
}

fn two_asset_store() -> longshort::domain::prices::PriceStore {
    drifting_store(
        &[("AAA", 100.0, 0.001), ("BBB", 50.0, -0.0005)],
        "2021-01-01",
        "2021-12-31",
    )
}

mod compounding {
    use super::*;

    #[test]
    fn final_value_is_exp_of_weighted_log_returns() {
        let store = two_asset_store();
        let period = Period::new(date("2021-02-01"), date("2021-06-30"), "H1");
        let strategy = FixedWeightsStrategy::new("Fixed", &[("AAA", 0.5), ("BBB", -0.5)]);
        let report = RecordingReport::new();

        let unit = backtest::simulate_unit(
            store.log_returns(),
            &period,
            &strategy,
            &bounds(0.01, 0.6),
            &report,
        )
        .unwrap();

        let window: Vec<_> = store
            .log_returns()
            .range(period.start..=period.end)
            .map(|(d, _)| *d)
            .collect();
        let rebalances = rebalance_dates(window.iter().copied());
        let first = rebalances[0];
        let last = *rebalances.last().unwrap();
        let expected_log: f64 = store
            .log_returns()
            .range(first..=last)
            .filter(|(d, _)| **d > first)
            .map(|(_, r)| 0.5 * r["AAA"] - 0.5 * r["BBB"])
            .sum();

        assert_relative_eq!(unit.history.value(), expected_log.exp(), epsilon = 1e-12);
        assert_eq!(unit.history.last_date(), Some(last));
        assert_eq!(unit.rebalances.len(), rebalances.len() - 1);
        for rebalance in &unit.rebalances {
            assert_relative_eq!(rebalance.weights["AAA"], 0.5, epsilon = 1e-12);
            assert_relative_eq!(rebalance.weights["BBB"], -0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn rebalances_fall_on_first_trading_day_of_month() {
        let store = two_asset_store();
        let period = Period::new(date("2021-03-01"), date("2021-06-30"), "Q2");
        let strategy = FixedWeightsStrategy::new("Fixed", &[("AAA", 0.5), ("BBB", -0.5)]);

        let unit = backtest::simulate_unit(
            store.log_returns(),
            &period,
            &strategy,
            &bounds(0.01, 0.6),
            &RecordingReport::new(),
        )
        .unwrap();

        let dates: Vec<_> = unit.rebalances.iter().map(|r| r.date).collect();
        // 2021-05-01 is a Saturday
        assert_eq!(
            dates,
            vec![date("2021-03-01"), date("2021-04-01"), date("2021-05-03")]
        );
    }

    #[test]
    fn enforced_weights_are_used_for_compounding() {
        let store = two_asset_store();
        let period = Period::new(date("2021-02-01"), date("2021-04-30"), "Q");
        let strategy = FixedWeightsStrategy::new("Fixed", &[("AAA", 0.8), ("BBB", -0.2)]);

        let unit = backtest::simulate_unit(
            store.log_returns(),
            &period,
            &strategy,
            &bounds(0.01, 0.6),
            &RecordingReport::new(),
        )
        .unwrap();

        for rebalance in &unit.rebalances {
            assert_relative_eq!(gross_exposure(&rebalance.weights), 1.0, epsilon = 1e-6);
            assert!(rebalance.weights["AAA"] > 0.0);
            assert!(rebalance.weights["BBB"] < 0.0);
        }
    }

    #[test]
    fn history_is_strictly_increasing_in_date() {
        let store = two_asset_store();
        let period = Period::new(date("2021-01-04"), date("2021-12-31"), "Year");
        let strategy = FixedWeightsStrategy::new("Fixed", &[("AAA", 0.5), ("BBB", -0.5)]);

        let unit = backtest::simulate_unit(
            store.log_returns(),
            &period,
            &strategy,
            &bounds(0.01, 0.6),
            &RecordingReport::new(),
        )
        .unwrap();

        assert!(unit.history.points().windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(unit.history.points()[0].value, 1.0);
    }
}

mod skipped_units {
    use super::*;

    #[test]
    fn period_outside_data_is_skipped() {
        let store = two_asset_store();
        let periods = vec![Period::new(date("1999-01-01"), date("1999-12-31"), "Before")];
        let strategies: Vec<Box<dyn Strategy>> = vec![Box::new(FixedWeightsStrategy::new(
            "Fixed",
            &[("AAA", 0.5), ("BBB", -0.5)],
        ))];
        let report = RecordingReport::new();

        let summary = backtest::run(&store, &periods, &strategies, &bounds(0.01, 0.6), &report);

        assert!(summary.completed.is_empty());
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].reason.contains("no log-returns"));
        assert!(report.metrics.lock().unwrap().is_empty());
    }

    #[test]
    fn insufficient_history_skips_only_that_unit() {
        let store = two_asset_store();
        let periods = vec![Period::new(date("2021-02-01"), date("2021-06-30"), "H1")];
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(NoHistoryStrategy),
            Box::new(FixedWeightsStrategy::new("Fixed", &[("AAA", 0.5), ("BBB", -0.5)])),
        ];
        let report = RecordingReport::new();

        let summary = backtest::run(&store, &periods, &strategies, &bounds(0.01, 0.6), &report);

        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.completed[0].strategy_name, "Fixed");
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].strategy_name, "NoHistoryStrategy");
        assert!(summary.skipped[0].reason.contains("insufficient history"));
        assert_eq!(report.metrics.lock().unwrap().len(), 1);
    }

    #[test]
    fn empty_store_skips_every_unit() {
        let store = longshort::domain::prices::PriceStore::default();
        let periods = vec![
            Period::new(date("2021-02-01"), date("2021-06-30"), "H1"),
            Period::new(date("2021-07-01"), date("2021-12-31"), "H2"),
        ];
        let strategies: Vec<Box<dyn Strategy>> =
            vec![Box::new(FixedWeightsStrategy::new("Fixed", &[("AAA", 1.0)]))];

        let summary = backtest::run(
            &store,
            &periods,
            &strategies,
            &BacktestConfig::default(),
            &RecordingReport::new(),
        );

        assert!(summary.completed.is_empty());
        assert_eq!(summary.skipped.len(), 2);
    }

    #[test]
    fn report_failures_do_not_abort_units() {
        let store = two_asset_store();
        let periods = vec![Period::new(date("2021-02-01"), date("2021-06-30"), "H1")];
        let strategies: Vec<Box<dyn Strategy>> = vec![Box::new(FixedWeightsStrategy::new(
            "Fixed",
            &[("AAA", 0.5), ("BBB", -0.5)],
        ))];

        let summary = backtest::run(&store, &periods, &strategies, &bounds(0.01, 0.6), &BrokenReport);

        assert_eq!(summary.completed.len(), 1);
        assert!(summary.skipped.is_empty());
    }
}

mod reporting {
    use super::*;

    #[test]
    fn every_rebalance_and_unit_is_reported() {
        let store = two_asset_store();
        let period = Period::new(date("2021-02-01"), date("2021-06-30"), "H1");
        let strategies: Vec<Box<dyn Strategy>> = vec![Box::new(FixedWeightsStrategy::new(
            "Fixed",
            &[("AAA", 0.5), ("BBB", -0.5)],
        ))];
        let report = RecordingReport::new();

        let summary = backtest::run(
            &store,
            std::slice::from_ref(&period),
            &strategies,
            &bounds(0.01, 0.6),
            &report,
        );

        let folder = period.folder_name("Fixed");
        assert_eq!(folder, "Fixed_20210201-20210630");
        assert_eq!(
            report.composition_count(&folder),
            summary.completed[0].rebalances.len()
        );
        assert_eq!(report.charts.lock().unwrap().as_slice(), [folder]);
        let metrics = report.metrics.lock().unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].2, summary.completed[0].results);
    }

    #[test]
    fn charts_can_be_disabled() {
        let store = two_asset_store();
        let periods = vec![Period::new(date("2021-02-01"), date("2021-06-30"), "H1")];
        let strategies: Vec<Box<dyn Strategy>> = vec![Box::new(FixedWeightsStrategy::new(
            "Fixed",
            &[("AAA", 0.5), ("BBB", -0.5)],
        ))];
        let report = RecordingReport::new();
        let config = BacktestConfig {
            charts: false,
            ..bounds(0.01, 0.6)
        };

        backtest::run(&store, &periods, &strategies, &config, &report);

        assert!(report.charts.lock().unwrap().is_empty());
        assert_eq!(report.metrics.lock().unwrap().len(), 1);
    }
}

mod parallel {
    use super::*;

    #[test]
    fn parallel_run_matches_sequential() {
        let store = two_asset_store();
        let periods = vec![
            Period::new(date("2021-02-01"), date("2021-06-30"), "H1"),
            Period::new(date("2021-07-01"), date("2021-12-31"), "H2"),
            Period::new(date("2021-03-15"), date("2021-09-15"), "Mid"),
        ];
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(FixedWeightsStrategy::new("LongA", &[("AAA", 0.5), ("BBB", -0.5)])),
            Box::new(FixedWeightsStrategy::new("LongB", &[("AAA", -0.5), ("BBB", 0.5)])),
        ];

        let sequential = backtest::run(
            &store,
            &periods,
            &strategies,
            &bounds(0.01, 0.6),
            &RecordingReport::new(),
        );
        let parallel_config = BacktestConfig {
            parallel: true,
            ..bounds(0.01, 0.6)
        };
        let parallel = backtest::run(
            &store,
            &periods,
            &strategies,
            &parallel_config,
            &RecordingReport::new(),
        );

        assert_eq!(sequential.completed.len(), 6);
        assert_eq!(parallel.completed.len(), 6);
        for (s, p) in sequential.completed.iter().zip(&parallel.completed) {
            assert_eq!(s.period, p.period);
            assert_eq!(s.strategy_name, p.strategy_name);
            assert_eq!(s.results, p.results);
            assert_eq!(s.history.value(), p.history.value());
        }
    }
}

mod strategies {
    use super::*;

    fn universe() -> SharedPricePort {
        let tickers: Vec<(String, f64)> = (0..10)
            .map(|i| (format!("T{i}"), (i as f64 - 4.5) * 0.0004))
            .collect();
        let refs: Vec<(&str, f64, f64)> = tickers
            .iter()
            .map(|(t, rate)| (t.as_str(), 100.0, *rate))
            .collect();
        Arc::new(drifting_store(&refs, "2019-01-01", "2021-12-31"))
    }

    #[test]
    fn momentum_runs_with_a_year_of_history() {
        let store = universe();
        let periods = vec![Period::new(date("2020-06-01"), date("2021-06-01"), "Window")];
        let strategies: Vec<Box<dyn Strategy>> =
            vec![Box::new(MomentumStrategy::new(Arc::clone(&store)))];
        let config = BacktestConfig {
            top_n: 3,
            ..BacktestConfig::default()
        };

        let summary = backtest::run(
            store.as_ref(),
            &periods,
            &strategies,
            &config,
            &RecordingReport::new(),
        );

        assert_eq!(summary.completed.len(), 1, "skipped: {:?}", summary.skipped);
        let unit = &summary.completed[0];
        assert_eq!(unit.strategy_name, "MomentumStrategy");
        for rebalance in &unit.rebalances {
            assert_relative_eq!(gross_exposure(&rebalance.weights), 1.0, epsilon = 1e-6);
            assert_eq!(rebalance.weights.values().filter(|w| **w > 0.0).count(), 3);
            assert_eq!(rebalance.weights.values().filter(|w| **w < 0.0).count(), 3);
            assert!(rebalance.weights["T9"] > 0.0);
            assert!(rebalance.weights["T0"] < 0.0);
        }
        // long the risers, short the fallers
        assert!(unit.results.total_return > 0.0);
    }

    #[test]
    fn value_without_five_years_of_history_is_skipped() {
        let store = universe();
        let periods = vec![Period::new(date("2020-06-01"), date("2021-06-01"), "Window")];
        let strategies: Vec<Box<dyn Strategy>> =
            vec![Box::new(ValueStrategy::new(Arc::clone(&store)))];

        let summary = backtest::run(
            store.as_ref(),
            &periods,
            &strategies,
            &BacktestConfig::default(),
            &RecordingReport::new(),
        );

        assert!(summary.completed.is_empty());
        assert_eq!(summary.skipped[0].strategy_name, "ValueStrategy");
        assert!(summary.skipped[0].reason.contains("insufficient history"));
    }
}
