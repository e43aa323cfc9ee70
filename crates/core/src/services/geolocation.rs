//! Geolocation sampling.
//!
//! A [`GeolocationSampler`] obtains one point-in-time position from a
//! [`LocationSource`]. It never blocks longer than the configured timeout and
//! reuses a recent fix when one is cached.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logbook_common::{AppError, AttendanceConfig, Coordinates};
use serde::{Deserialize, Serialize};

/// A single position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub coordinates: Coordinates,
    /// Radius of the 68% confidence circle, in meters.
    pub accuracy_meters: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl Position {
    /// A position captured now.
    #[must_use]
    pub fn now(coordinates: Coordinates, accuracy_meters: Option<f64>) -> Self {
        Self {
            coordinates,
            accuracy_meters,
            captured_at: Utc::now(),
        }
    }
}

/// Why no position could be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationError {
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("timed out waiting for a position")]
    Timeout,
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        Self::LocationUnavailable(err.to_string())
    }
}

/// Options for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub max_cache_age: Duration,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_cache_age: Duration::from_secs(300),
        }
    }
}

impl From<&AttendanceConfig> for SampleOptions {
    fn from(config: &AttendanceConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: config.sample_timeout(),
            max_cache_age: config.max_cache_age(),
        }
    }
}

/// Something that can produce a position: a device API, a client report, a
/// fixed test point.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self, high_accuracy: bool) -> Result<Position, LocationError>;
}

/// Always answers with the same coordinates, stamped at call time.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coordinates: Coordinates,
    accuracy_meters: Option<f64>,
}

impl FixedLocation {
    #[must_use]
    pub const fn new(coordinates: Coordinates, accuracy_meters: Option<f64>) -> Self {
        Self {
            coordinates,
            accuracy_meters,
        }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self, _high_accuracy: bool) -> Result<Position, LocationError> {
        Ok(Position::now(self.coordinates, self.accuracy_meters))
    }
}

/// A sample reported by a client device, success or failure.
#[derive(Debug, Clone, Copy)]
pub struct ReportedLocation(pub Result<Position, LocationError>);

#[async_trait]
impl LocationSource for ReportedLocation {
    async fn current_position(&self, _high_accuracy: bool) -> Result<Position, LocationError> {
        self.0
    }
}

/// Last successful fix, shareable between samplers.
///
/// The lock is only taken to read or replace the value, never across a
/// source call.
#[derive(Debug, Clone, Default)]
pub struct PositionCache(Arc<Mutex<Option<Position>>>);

impl PositionCache {
    /// The cached fix if it is at most `max_age` old.
    #[must_use]
    pub fn fresh(&self, max_age: Duration) -> Option<Position> {
        let cached = (*self.0.lock().unwrap_or_else(PoisonError::into_inner))?;
        // Clock skew can make a fix look like it came from the future.
        let age = (Utc::now() - cached.captured_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age <= max_age {
            tracing::debug!(age_ms = age.as_millis() as u64, "Using cached position");
            Some(cached)
        } else {
            None
        }
    }

    /// Replace the cached fix.
    pub fn store(&self, position: Position) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(position);
    }
}

/// Samples positions with a timeout and a short-lived cache.
#[derive(Clone)]
pub struct GeolocationSampler {
    source: Arc<dyn LocationSource>,
    cache: PositionCache,
}

impl GeolocationSampler {
    /// Create a sampler with an empty cache.
    #[must_use]
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self::with_cache(source, PositionCache::default())
    }

    /// Create a sampler that reads and refreshes an existing cache.
    #[must_use]
    pub fn with_cache(source: Arc<dyn LocationSource>, cache: PositionCache) -> Self {
        Self { source, cache }
    }

    /// Obtain one position.
    pub async fn sample(&self, options: SampleOptions) -> Result<Position, LocationError> {
        if let Some(cached) = self.cache.fresh(options.max_cache_age) {
            return Ok(cached);
        }

        let position = tokio::time::timeout(
            options.timeout,
            self.source.current_position(options.high_accuracy),
        )
        .await
        .map_err(|_| LocationError::Timeout)??;

        self.cache.store(position);
        Ok(position)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
        result: Result<Coordinates, LocationError>,
    }

    impl CountingSource {
        fn ok(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                result: Ok(Coordinates::new(6.5244, 3.3792).unwrap()),
            }
        }
    }

    #[async_trait]
    impl LocationSource for CountingSource {
        async fn current_position(&self, _high_accuracy: bool) -> Result<Position, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.map(|c| Position::now(c, Some(12.0)))
        }
    }

    fn options(timeout_ms: u64, cache_ms: u64) -> SampleOptions {
        SampleOptions {
            high_accuracy: true,
            timeout: Duration::from_millis(timeout_ms),
            max_cache_age: Duration::from_millis(cache_ms),
        }
    }

    #[tokio::test]
    async fn test_sample_times_out() {
        let source = Arc::new(CountingSource::ok(Duration::from_millis(500)));
        let sampler = GeolocationSampler::new(source);

        let result = sampler.sample(options(20, 0)).await;
        assert_eq!(result, Err(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_cached_position_is_reused() {
        let source = Arc::new(CountingSource::ok(Duration::ZERO));
        let sampler = GeolocationSampler::new(source.clone());

        let first = sampler.sample(options(1000, 60_000)).await.unwrap();
        let second = sampler.sample(options(1000, 60_000)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_cache_age_always_samples() {
        let source = Arc::new(CountingSource::ok(Duration::ZERO));
        let sampler = GeolocationSampler::new(source.clone());

        sampler.sample(options(1000, 0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        sampler.sample(options(1000, 0)).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_denied_permission_is_reported_and_not_cached() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            result: Err(LocationError::PermissionDenied),
        });
        let sampler = GeolocationSampler::new(source.clone());

        for _ in 0..2 {
            assert_eq!(
                sampler.sample(SampleOptions::default()).await,
                Err(LocationError::PermissionDenied)
            );
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reported_location_passes_through() {
        let position = Position::now(Coordinates::new(1.0, 2.0).unwrap(), None);
        let sampler = GeolocationSampler::new(Arc::new(ReportedLocation(Ok(position))));
        assert_eq!(sampler.sample(SampleOptions::default()).await, Ok(position));

        let failing =
            GeolocationSampler::new(Arc::new(ReportedLocation(Err(LocationError::Timeout))));
        assert_eq!(
            failing.sample(SampleOptions::default()).await,
            Err(LocationError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_slow_source_does_not_block_cached_reads() {
        let source = Arc::new(CountingSource::ok(Duration::from_millis(300)));
        let sampler = GeolocationSampler::new(source.clone());
        let mut stale = Position::now(Coordinates::new(6.5, 3.3).unwrap(), None);
        stale.captured_at = Utc::now() - chrono::Duration::seconds(5);
        sampler.cache.store(stale);

        // Cache too old for this caller, so it goes to the slow source.
        let slow = tokio::spawn({
            let sampler = sampler.clone();
            async move { sampler.sample(options(1000, 1000)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let cached = tokio::time::timeout(
            Duration::from_millis(100),
            sampler.sample(options(1000, 60_000)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(cached, stale);

        let fresh = slow.await.unwrap().unwrap();
        assert_ne!(fresh, stale);
        assert_eq!(sampler.cache.fresh(Duration::from_secs(60)), Some(fresh));
    }

    #[tokio::test]
    async fn test_shared_cache_covers_failed_report() {
        let cache = PositionCache::default();
        let position = Position::now(Coordinates::new(6.5244, 3.3792).unwrap(), Some(8.0));

        let reporting = GeolocationSampler::with_cache(
            Arc::new(ReportedLocation(Ok(position))),
            cache.clone(),
        );
        assert_eq!(reporting.sample(SampleOptions::default()).await, Ok(position));

        let failing = GeolocationSampler::with_cache(
            Arc::new(ReportedLocation(Err(LocationError::PermissionDenied))),
            cache.clone(),
        );
        assert_eq!(failing.sample(SampleOptions::default()).await, Ok(position));

        let no_cache = SampleOptions {
            max_cache_age: Duration::ZERO,
            ..SampleOptions::default()
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(
            failing.sample(no_cache).await,
            Err(LocationError::PermissionDenied)
        );
    }

    #[test]
    fn test_location_error_maps_to_retryable_app_error() {
        let err: AppError = LocationError::PositionUnavailable.into();
        assert!(matches!(err, AppError::LocationUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_options_from_config() {
        let opts = SampleOptions::from(&AttendanceConfig::default());
        assert_eq!(opts, SampleOptions::default());
    }
}
