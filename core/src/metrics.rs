//! Per-run gas and proving-time samples.
//!
//! A collector is created by the harness and cloned into each anchor it
//! wants measured; clones share samples, separate collectors never do.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default)]
struct Samples {
    gas_used: Vec<u64>,
    proof_millis: Vec<f64>,
}

/// Shared handle to one run's samples
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Samples>>,
}

/// Summary statistics over a sample set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub samples: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_gas(&self, gas_used: u64) {
        self.lock().gas_used.push(gas_used);
    }

    pub fn record_proof_time(&self, elapsed: Duration) {
        self.lock().proof_millis.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn gas_summary(&self) -> Option<MetricsSummary> {
        let values: Vec<f64> = self.lock().gas_used.iter().map(|g| *g as f64).collect();
        summarize(values)
    }

    /// Proof generation times in milliseconds
    pub fn proof_time_summary(&self) -> Option<MetricsSummary> {
        let values = self.lock().proof_millis.clone();
        summarize(values)
    }

    pub fn reset(&self) {
        let mut samples = self.lock();
        samples.gas_used.clear();
        samples.proof_millis.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Samples> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn summarize(mut values: Vec<f64>) -> Option<MetricsSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let n = values.len();
    let median = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };

    Some(MetricsSummary {
        samples: n,
        mean: values.iter().sum::<f64>() / n as f64,
        median,
        max: values[n - 1],
        min: values[0],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_summary() {
        let metrics = MetricsCollector::new();
        assert!(metrics.gas_summary().is_none());

        for gas in [300, 100, 200, 400] {
            metrics.record_gas(gas);
        }
        let summary = metrics.gas_summary().unwrap();
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.mean, 250.0);
        assert_eq!(summary.median, 250.0);
        assert_eq!(summary.max, 400.0);
        assert_eq!(summary.min, 100.0);
    }

    #[test]
    fn test_clones_share_and_collectors_do_not() {
        let metrics = MetricsCollector::new();
        let handle = metrics.clone();
        handle.record_proof_time(Duration::from_millis(30));
        assert_eq!(metrics.proof_time_summary().unwrap().samples, 1);

        let other = MetricsCollector::new();
        assert!(other.proof_time_summary().is_none());

        metrics.reset();
        assert!(handle.proof_time_summary().is_none());
    }
}
