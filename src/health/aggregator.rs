//! Dependency health aggregation.
//!
//! # Responsibilities
//! - Hold the registered checks in registration order
//! - Run every check concurrently, each in its own task with a deadline
//! - Fold the results into one report with total wall-clock duration

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use crate::health::check::{HealthCheck, ProbeError};
use crate::health::report::{HealthReport, HealthReportEntry};

struct Registration {
    name: String,
    check: Arc<dyn HealthCheck>,
}

/// Runs registered checks and reports their combined health.
pub struct HealthAggregator {
    checks: Vec<Registration>,
    timeout: Duration,
}

impl HealthAggregator {
    /// `timeout` bounds each check, including checks without their own deadline.
    pub fn new(timeout: Duration) -> Self {
        Self {
            checks: Vec::new(),
            timeout,
        }
    }

    /// Register a check under a component name.
    pub fn register(&mut self, name: impl Into<String>, check: Arc<dyn HealthCheck>) -> &mut Self {
        self.checks.push(Registration {
            name: name.into(),
            check,
        });
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Probe every dependency once.
    pub async fn check_all(&self) -> HealthReport {
        let started = Instant::now();

        let tasks = self.checks.iter().map(|registration| {
            let check = registration.check.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                let began = Instant::now();
                let result = match tokio::time::timeout(timeout, check.check()).await {
                    Ok(result) => result,
                    Err(_) => ProbeError::Timeout(timeout).into(),
                };
                (result, began.elapsed())
            })
        });
        let outcomes = join_all(tasks).await;

        let entries = self
            .checks
            .iter()
            .zip(outcomes)
            .map(|(registration, outcome)| {
                let (result, duration) = outcome.unwrap_or_else(|e| {
                    tracing::error!(component = %registration.name, error = %e, "Health check task failed");
                    (ProbeError::Panicked.into(), Duration::ZERO)
                });
                HealthReportEntry {
                    name: registration.name.clone(),
                    status: result.status,
                    description: result.description,
                    duration,
                }
            })
            .collect();

        let report = HealthReport::new(entries, started.elapsed());
        tracing::debug!(
            status = %report.status(),
            duration = ?report.total_duration(),
            "Health check pass complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::report::{HealthCheckResult, HealthStatus};
    use async_trait::async_trait;

    struct Fixed(HealthCheckResult);

    #[async_trait]
    impl HealthCheck for Fixed {
        async fn check(&self) -> HealthCheckResult {
            self.0.clone()
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl HealthCheck for Slow {
        async fn check(&self) -> HealthCheckResult {
            tokio::time::sleep(self.0).await;
            HealthCheckResult::healthy()
        }
    }

    struct Panics;

    #[async_trait]
    impl HealthCheck for Panics {
        async fn check(&self) -> HealthCheckResult {
            panic!("probe bug")
        }
    }

    fn aggregator(checks: Vec<(&str, Arc<dyn HealthCheck>)>) -> HealthAggregator {
        let mut aggregator = HealthAggregator::new(Duration::from_secs(1));
        for (name, check) in checks {
            aggregator.register(name, check);
        }
        aggregator
    }

    #[tokio::test]
    async fn test_one_unhealthy_makes_report_unhealthy() {
        let agg = aggregator(vec![
            ("Product Service", Arc::new(Fixed(HealthCheckResult::healthy()))),
            ("Order Service", Arc::new(Fixed(HealthCheckResult::unhealthy("connection failed: refused")))),
        ]);

        let report = agg.check_all().await;
        assert_eq!(report.status(), HealthStatus::Unhealthy);

        let names: Vec<_> = report.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Product Service", "Order Service"]);

        let products = report.entry("Product Service").unwrap();
        assert_eq!(products.status, HealthStatus::Healthy);
        assert_eq!(products.description.as_deref().unwrap_or(""), "");

        let orders = report.entry("Order Service").unwrap();
        assert_eq!(orders.status, HealthStatus::Unhealthy);
        assert_eq!(orders.description.as_deref(), Some("connection failed: refused"));
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let agg = aggregator(vec![
            ("Product Service", Arc::new(Fixed(HealthCheckResult::healthy()))),
            ("Order Service", Arc::new(Fixed(HealthCheckResult::healthy()))),
        ]);

        let report = agg.check_all().await;
        assert_eq!(report.status(), HealthStatus::Healthy);
        assert!(report.total_duration() > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_degraded_signal() {
        let agg = aggregator(vec![
            ("Product Service", Arc::new(Fixed(HealthCheckResult::healthy()))),
            ("Cache", Arc::new(Fixed(HealthCheckResult::degraded("slow")))),
        ]);
        assert_eq!(agg.check_all().await.status(), HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_repeated_passes_are_stable() {
        let agg = aggregator(vec![
            ("Product Service", Arc::new(Fixed(HealthCheckResult::healthy()))),
            ("Order Service", Arc::new(Fixed(HealthCheckResult::unhealthy("down")))),
        ]);

        let first = agg.check_all().await;
        for _ in 0..5 {
            let next = agg.check_all().await;
            assert_eq!(next.status(), first.status());
            let statuses = |r: &HealthReport| r.entries().iter().map(|e| e.status).collect::<Vec<_>>();
            assert_eq!(statuses(&next), statuses(&first));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_checks_run_concurrently_and_time_out() {
        let agg = aggregator(vec![
            ("A", Arc::new(Slow(Duration::from_millis(800)))),
            ("B", Arc::new(Slow(Duration::from_millis(800)))),
            ("C", Arc::new(Slow(Duration::from_secs(10)))),
        ]);

        let start = tokio::time::Instant::now();
        let report = agg.check_all().await;
        // bounded by the 1s deadline, not by the sum of the probes
        assert!(start.elapsed() < Duration::from_millis(1100));

        assert_eq!(report.entry("A").unwrap().status, HealthStatus::Healthy);
        assert_eq!(report.entry("B").unwrap().status, HealthStatus::Healthy);
        let slow = report.entry("C").unwrap();
        assert_eq!(slow.status, HealthStatus::Unhealthy);
        assert_eq!(slow.description.as_deref(), Some("probe timed out after 1s"));
    }

    #[tokio::test]
    async fn test_panicking_check_is_contained() {
        let agg = aggregator(vec![
            ("Broken", Arc::new(Panics)),
            ("Product Service", Arc::new(Fixed(HealthCheckResult::healthy()))),
        ]);

        let report = agg.check_all().await;
        assert_eq!(report.status(), HealthStatus::Unhealthy);
        assert_eq!(report.entry("Broken").unwrap().description.as_deref(), Some("health check panicked"));
        assert_eq!(report.entry("Product Service").unwrap().status, HealthStatus::Healthy);
    }
}
