use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use relay_common::Result;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::history::{HistoryBuffer, MetricsHistory, MetricsSample};
use crate::source::MetricsSource;

/// Shortest sampling period `start` will honour.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Periodically samples a [`MetricsSource`] into a bounded history.
///
/// The sampler is the only writer of its buffer. Readers get copies through
/// [`MetricsSampler::history`], so they never observe a half-applied write.
pub struct MetricsSampler {
    source: Arc<dyn MetricsSource>,
    history: RwLock<HistoryBuffer>,
}

impl MetricsSampler {
    pub fn new(source: Arc<dyn MetricsSource>, capacity: usize) -> Self {
        Self {
            source,
            history: RwLock::new(HistoryBuffer::new(capacity)),
        }
    }

    /// Take one reading and append it. A failed reading is logged and the
    /// buffer is left as is.
    pub async fn sample_once(&self) -> Result<MetricsSample> {
        let reading = match self.source.read().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("failed to collect metrics: {e}");
                return Err(e);
            }
        };
        let sample = MetricsSample {
            timestamp: chrono::Utc::now().timestamp_millis(),
            cpu: reading.cpu,
            memory: reading.memory,
        };
        self.record(sample);
        Ok(sample)
    }

    /// Append a sample. Append and eviction happen under one write lock.
    pub fn record(&self, sample: MetricsSample) {
        self.history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    pub fn history(&self) -> MetricsHistory {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Spawn the sampling loop: one sample immediately, then one per
    /// `interval`. Failed samples are logged and skipped. Intervals below
    /// 10ms are raised to 10ms.
    pub fn start(self: &Arc<Self>, interval: Duration) -> SamplerTask {
        if interval < MIN_INTERVAL {
            warn!("metrics interval {interval:?} too short, using {MIN_INTERVAL:?}");
        }
        let interval = interval.max(MIN_INTERVAL);
        let sampler = Arc::clone(self);
        info!(
            "metrics collection started ({:?} interval, source {})",
            interval,
            sampler.source.name()
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let _ = sampler.sample_once().await;
            }
        });

        SamplerTask {
            handle: Some(handle),
        }
    }
}

/// Handle to the background sampling loop. Dropping it stops sampling.
pub struct SamplerTask {
    handle: Option<JoinHandle<()>>,
}

impl SamplerTask {
    pub fn stop(mut self) {
        self.abort();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("metrics collection stopped");
        }
    }
}

impl Drop for SamplerTask {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MAX_HISTORY;
    use crate::source::Reading;
    use async_trait::async_trait;
    use relay_common::Error;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted readings, then keeps returning the last one.
    struct ScriptedSource {
        readings: Mutex<VecDeque<Result<Reading>>>,
    }

    impl ScriptedSource {
        fn new(readings: Vec<Result<Reading>>) -> Arc<Self> {
            Arc::new(Self {
                readings: Mutex::new(readings.into()),
            })
        }

        fn steady(cpu: f64) -> Arc<Self> {
            Self::new(vec![Ok(Reading { cpu, memory: 50.0 })])
        }
    }

    #[async_trait]
    impl MetricsSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn read(&self) -> Result<Reading> {
            let mut readings = self.readings.lock().unwrap();
            if readings.len() > 1 {
                readings.pop_front().unwrap()
            } else {
                match readings.front() {
                    Some(Ok(r)) => Ok(*r),
                    _ => Err(Error::Metrics("sensor failed".into())),
                }
            }
        }
    }

    fn reading(cpu: f64) -> Result<Reading> {
        Ok(Reading { cpu, memory: 10.0 })
    }

    #[tokio::test]
    async fn failed_samples_leave_history_untouched() {
        let source = ScriptedSource::new(vec![
            reading(1.0),
            Err(Error::Metrics("psutil missing".into())),
            reading(3.0),
        ]);
        let sampler = MetricsSampler::new(source, MAX_HISTORY);

        sampler.sample_once().await.unwrap();
        let before = sampler.history();
        assert!(sampler.sample_once().await.is_err());
        assert_eq!(sampler.history(), before);
        sampler.sample_once().await.unwrap();

        let history = sampler.history();
        assert_eq!(history.cpu, vec![1.0, 3.0]);
        assert_eq!(history.memory.len(), 2);
        assert!(history.timestamps[0] <= history.timestamps[1]);
    }

    #[tokio::test]
    async fn history_is_bounded_to_capacity() {
        let readings = (0..70).map(|i| reading(f64::from(i))).collect();
        let sampler = MetricsSampler::new(ScriptedSource::new(readings), MAX_HISTORY);

        for _ in 0..70 {
            sampler.sample_once().await.unwrap();
        }

        let history = sampler.history();
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.cpu.first(), Some(&10.0));
        assert_eq!(history.cpu.last(), Some(&69.0));
    }

    #[tokio::test]
    async fn background_task_samples_until_stopped() {
        let sampler = Arc::new(MetricsSampler::new(ScriptedSource::steady(5.0), MAX_HISTORY));

        let task = sampler.start(Duration::from_millis(20));
        assert!(task.is_running());
        tokio::time::sleep(Duration::from_millis(150)).await;
        task.stop();

        let collected = sampler.history().len();
        assert!(collected >= 3, "only {collected} samples collected");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sampler.history().len(), collected);
    }

    #[tokio::test]
    async fn zero_interval_is_clamped() {
        let sampler = Arc::new(MetricsSampler::new(ScriptedSource::steady(1.0), MAX_HISTORY));

        let task = sampler.start(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(task.is_running());
        assert!(!sampler.history().is_empty());
        task.stop();
    }

    #[tokio::test]
    async fn sampling_continues_after_failures() {
        let source = ScriptedSource::new(vec![
            Err(Error::Metrics("boom".into())),
            Err(Error::Metrics("boom".into())),
            reading(7.0),
        ]);
        let sampler = Arc::new(MetricsSampler::new(source, MAX_HISTORY));

        let task = sampler.start(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(120)).await;
        drop(task);

        let history = sampler.history();
        assert!(!history.is_empty());
        assert!(history.cpu.iter().all(|&c| c == 7.0));
    }
}
