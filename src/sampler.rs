//! Adaptive per-key sample rates.
//!
//! Every arrival bumps a per-key counter for the current interval. Once per
//! interval [`EmaSampler::update`] folds those counters into an exponential
//! moving average per key and derives integer sample rates from it, so that
//! the total forwarded volume approaches `sum / goal_sample_rate`. Rare keys
//! end up at rate 1 (keep everything), frequent keys get higher rates.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::interval;
use tracing::debug;

/// How the goal volume is split across keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Allocation {
    /// Every key gets the same forwarding budget.
    #[default]
    Even,
    /// Budget proportional to `log10` of the key's traffic.
    Logarithmic,
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub goal_sample_rate: u32,
    /// Weight of the newest interval in the moving average, in `(0, 1]`.
    pub weight: f64,
    /// Keys whose average drops below this are forgotten.
    pub age_out_value: f64,
    /// An interval reaching this multiple of the summed averages counts as a burst.
    pub burst_multiple: f64,
    /// Intervals to wait before burst detection kicks in.
    pub burst_detection_delay: u32,
    /// Maximum keys tracked per interval, 0 for no limit.
    pub max_keys: usize,
    pub allocation: Allocation,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            goal_sample_rate: 1,
            weight: 0.5,
            age_out_value: 0.5,
            burst_multiple: 2.0,
            burst_detection_delay: 3,
            max_keys: 0,
            allocation: Allocation::Even,
        }
    }
}

pub struct EmaSampler {
    config: SamplerConfig,
    // swapped out as a whole by update(); arrivals only take the read side
    counts: RwLock<DashMap<String, u64>>,
    averages: Mutex<HashMap<String, f64>>,
    rates: RwLock<HashMap<String, u32>>,
    intervals: AtomicU32,
    burst_sum: AtomicU64,
    burst_threshold: AtomicU64,
    burst_signaled: AtomicBool,
    burst: Notify,
}

impl EmaSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config: SamplerConfig {
                goal_sample_rate: config.goal_sample_rate.max(1),
                ..config
            },
            counts: RwLock::new(DashMap::new()),
            averages: Mutex::new(HashMap::new()),
            rates: RwLock::new(HashMap::new()),
            intervals: AtomicU32::new(0),
            burst_sum: AtomicU64::new(0),
            burst_threshold: AtomicU64::new(0),
            burst_signaled: AtomicBool::new(false),
            burst: Notify::new(),
        }
    }

    /// Counts one arrival of `key` in the current interval.
    ///
    /// Returns `true` when this arrival pushed the interval over the burst
    /// threshold; the adjuster is woken up to recompute early in that case.
    pub fn record_arrival(&self, key: &str) -> bool {
        let sum = {
            let counts = self.counts.read();
            // the shard guard must be gone before len() locks every shard
            let tracked = counts.get_mut(key).map(|mut count| *count += 1).is_some();
            if !tracked {
                if self.config.max_keys > 0 && counts.len() >= self.config.max_keys {
                    return false;
                }
                *counts.entry(key.to_string()).or_insert(0) += 1;
            }
            self.burst_sum.fetch_add(1, Ordering::Relaxed) + 1
        };

        self.check_burst(sum)
    }

    /// Last computed rate for `key`. Unknown keys are kept at rate 1.
    pub fn sample_rate(&self, key: &str) -> u32 {
        self.rates.read().get(key).copied().unwrap_or(1)
    }

    /// Records the arrival and returns the key's current rate.
    pub fn get_sample_rate(&self, key: &str) -> u32 {
        self.record_arrival(key);
        self.sample_rate(key)
    }

    /// Closes the current interval and recomputes every rate.
    pub fn update(&self) {
        let counts = {
            let mut counts = self.counts.write();
            self.burst_sum.store(0, Ordering::Relaxed);
            self.burst_signaled.store(false, Ordering::Relaxed);
            std::mem::take(&mut *counts)
        };

        let mut averages = self.averages.lock();
        let mut counts: HashMap<String, u64> = counts.into_iter().collect();

        averages.retain(|key, avg| {
            let count = counts.remove(key).unwrap_or(0);
            *avg = adjust_average(*avg, count as f64, self.config.weight);
            *avg >= self.config.age_out_value
        });
        for (key, count) in counts {
            let avg = adjust_average(0.0, count as f64, self.config.weight);
            if avg >= self.config.age_out_value {
                averages.insert(key, avg);
            }
        }

        let rates = allocate(&averages, self.config.goal_sample_rate, self.config.allocation);

        let total: f64 = averages.values().sum();
        self.burst_threshold
            .store((total * self.config.burst_multiple).ceil() as u64, Ordering::Relaxed);
        let intervals = self.intervals.fetch_add(1, Ordering::Relaxed) + 1;

        debug!(keys = rates.len(), intervals, "recomputed sample rates");
        *self.rates.write() = rates;
    }

    /// Number of keys with a live moving average.
    pub fn key_count(&self) -> usize {
        self.averages.lock().len()
    }

    /// Number of completed recomputations.
    pub fn intervals(&self) -> u32 {
        self.intervals.load(Ordering::Relaxed)
    }

    fn check_burst(&self, sum: u64) -> bool {
        if self.intervals() < self.config.burst_detection_delay {
            return false;
        }
        let threshold = self.burst_threshold.load(Ordering::Relaxed);
        if threshold == 0 || sum < threshold {
            return false;
        }
        // one wake-up per interval
        if self.burst_signaled.swap(true, Ordering::Relaxed) {
            return false;
        }
        self.burst.notify_one();
        true
    }
}

fn adjust_average(old: f64, value: f64, weight: f64) -> f64 {
    value * weight + (1.0 - weight) * old
}

// Keys are visited from quietest to busiest. Budget a quiet key does not use
// is handed on to the keys after it.
fn allocate(averages: &HashMap<String, f64>, goal_rate: u32, allocation: Allocation) -> HashMap<String, u32> {
    let mut keys: Vec<(&String, f64)> = averages
        .iter()
        .filter(|(_, avg)| **avg > 0.0)
        .map(|(key, avg)| (key, avg.max(1.0)))
        .collect();
    keys.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut rates = HashMap::with_capacity(keys.len());
    if keys.is_empty() {
        return rates;
    }
    // goal rate 1 keeps everything
    if goal_rate <= 1 {
        rates.extend(keys.into_iter().map(|(key, _)| (key.clone(), 1)));
        return rates;
    }

    let sum_events: f64 = keys.iter().map(|(_, count)| count).sum();
    let goal_count = sum_events / goal_rate as f64;
    let log_sum: f64 = keys.iter().map(|(_, count)| count.log10()).sum();

    let key_count = keys.len() as f64;
    let mut remaining = keys.len();
    let mut extra = 0.0;
    let mut floor = 1;

    for (key, count) in keys {
        let share = match allocation {
            Allocation::Even => goal_count / key_count,
            Allocation::Logarithmic => count.log10() * goal_count / log_sum,
        };
        // NaN (all counts at 1 under log weighting) falls back to 1 here
        let mut goal = share.max(1.0);

        let extra_for_key = extra / remaining as f64;
        goal += extra_for_key;
        extra -= extra_for_key;
        remaining -= 1;

        let rate = if count <= goal {
            extra += goal - count;
            1
        } else {
            // an exact ratio can come out a hair above the integer
            let raw = (count / goal - 1e-9).ceil();
            let rate = if raw.is_finite() && raw >= 1.0 {
                raw.min(u32::MAX as f64) as u32
            } else {
                1
            };
            extra += goal - count / rate as f64;
            rate
        };

        let rate = rate.max(floor);
        floor = rate;
        rates.insert(key.clone(), rate);
    }

    rates
}

/// Recomputes the sampler's rates every `every`, or earlier when a burst is detected.
///
/// Returns once `shutdown` resolves.
pub async fn run_adjuster<F>(sampler: Arc<EmaSampler>, every: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(every);
    // first tick completes immediately
    ticker.tick().await;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("sample rate adjuster stopped");
                return;
            }
            _ = ticker.tick() => {}
            _ = sampler.burst.notified() => {
                debug!("traffic burst, recomputing sample rates early");
                ticker.reset();
            }
        }
        sampler.update();
    }
}
