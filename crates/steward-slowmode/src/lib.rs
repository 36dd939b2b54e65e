//! `steward-slowmode` — the chat thermometer.
//!
//! Every guild message is recorded into a per-channel sliding window.
//! When a channel runs hot (many messages from several distinct authors)
//! the thermometer recommends a slow-mode delay; the Discord adapter's
//! monitor loop applies the recommendation and clears it again once the
//! channel cools. This crate holds no Discord types — it only measures.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use steward_core::config::SlowmodeConfig;
use tracing::debug;

/// A burst from a single member does not heat the room; per-user rate
/// limiting is the platform's job. Slow mode only engages when this many
/// distinct authors post inside the window.
const MIN_DISTINCT_AUTHORS: usize = 3;

/// Smallest delay worth applying, in seconds.
const BASE_DELAY_SECS: u16 = 5;

pub struct Thermometer {
    window: Duration,
    hot_threshold: usize,
    max_delay: u16,
    /// Per-channel samples: (arrival instant, author id), oldest first.
    channels: DashMap<u64, VecDeque<(Instant, u64)>>,
    /// Delay last reported per channel, so sweeps only yield changes.
    applied: DashMap<u64, u16>,
}

impl Thermometer {
    pub fn new(config: &SlowmodeConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            hot_threshold: config.hot_threshold,
            max_delay: config.max_delay_secs,
            channels: DashMap::new(),
            applied: DashMap::new(),
        }
    }

    /// Record one message. Never fails; the dispatcher calls this on
    /// every qualifying guild message.
    pub fn record(&self, channel_id: u64, author_id: u64, now: Instant) {
        let mut samples = self.channels.entry(channel_id).or_default();
        samples.push_back((now, author_id));
        Self::prune(&mut samples, now, self.window);
    }

    /// The delay this channel should run at right now: 0 means no slow
    /// mode. Grows one second per message over the hot threshold.
    pub fn recommended_delay(&self, channel_id: u64, now: Instant) -> u16 {
        let Some(mut samples) = self.channels.get_mut(&channel_id) else {
            return 0;
        };
        Self::prune(&mut samples, now, self.window);

        let count = samples.len();
        if count < self.hot_threshold {
            return 0;
        }
        let mut authors: Vec<u64> = samples.iter().map(|&(_, a)| a).collect();
        authors.sort_unstable();
        authors.dedup();
        if authors.len() < MIN_DISTINCT_AUTHORS {
            return 0;
        }

        let over = (count - self.hot_threshold) as u16;
        (BASE_DELAY_SECS + over).min(self.max_delay)
    }

    /// Channels whose recommendation changed since the last sweep, as
    /// (channel, delay) pairs. The monitor loop applies exactly these.
    pub fn sweep(&self, now: Instant) -> Vec<(u64, u16)> {
        let ids: Vec<u64> = self.channels.iter().map(|e| *e.key()).collect();
        let mut changed = Vec::new();
        for channel_id in ids {
            let delay = self.recommended_delay(channel_id, now);
            let previous = self.applied.insert(channel_id, delay).unwrap_or(0);
            if delay != previous {
                debug!(channel_id, delay, "slow-mode recommendation changed");
                changed.push((channel_id, delay));
            }
        }
        changed
    }

    fn prune(samples: &mut VecDeque<(Instant, u64)>, now: Instant, window: Duration) {
        while let Some(&(t, _)) = samples.front() {
            if now.duration_since(t) > window {
                samples.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thermometer() -> Thermometer {
        Thermometer::new(&SlowmodeConfig {
            window_secs: 60,
            hot_threshold: 10,
            max_delay_secs: 30,
        })
    }

    fn fill(th: &Thermometer, channel: u64, start: Instant, count: usize, authors: usize) {
        for i in 0..count {
            th.record(
                channel,
                (i % authors) as u64 + 1,
                start + Duration::from_millis(i as u64 * 100),
            );
        }
    }

    #[test]
    fn quiet_channel_has_no_delay() {
        let th = thermometer();
        let t0 = Instant::now();
        fill(&th, 1, t0, 5, 5);
        assert_eq!(th.recommended_delay(1, t0 + Duration::from_secs(1)), 0);
    }

    #[test]
    fn hot_channel_gets_rising_delay() {
        let th = thermometer();
        let t0 = Instant::now();
        fill(&th, 1, t0, 10, 5);
        let at = t0 + Duration::from_secs(2);
        assert_eq!(th.recommended_delay(1, at), BASE_DELAY_SECS);

        fill(&th, 1, at, 10, 5);
        let later = at + Duration::from_secs(2);
        assert!(th.recommended_delay(1, later) > BASE_DELAY_SECS);
    }

    #[test]
    fn delay_is_capped() {
        let th = thermometer();
        let t0 = Instant::now();
        fill(&th, 1, t0, 200, 5);
        assert_eq!(th.recommended_delay(1, t0 + Duration::from_secs(25)), 30);
    }

    #[test]
    fn single_author_burst_never_engages() {
        let th = thermometer();
        let t0 = Instant::now();
        fill(&th, 1, t0, 50, 1);
        assert_eq!(th.recommended_delay(1, t0 + Duration::from_secs(6)), 0);
    }

    #[test]
    fn cooling_decays_back_to_zero() {
        let th = thermometer();
        let t0 = Instant::now();
        fill(&th, 1, t0, 20, 5);
        assert!(th.recommended_delay(1, t0 + Duration::from_secs(3)) > 0);
        // Window slides past every sample.
        assert_eq!(th.recommended_delay(1, t0 + Duration::from_secs(120)), 0);
    }

    #[test]
    fn sweep_yields_only_changes() {
        let th = thermometer();
        let t0 = Instant::now();
        fill(&th, 1, t0, 15, 5);
        let at = t0 + Duration::from_secs(2);

        let first = th.sweep(at);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, 1);
        assert!(first[0].1 >= BASE_DELAY_SECS);

        // Unchanged recommendation — nothing to apply.
        assert!(th.sweep(at + Duration::from_millis(10)).is_empty());

        // Cooled off — one final change back to zero.
        let cooled = th.sweep(t0 + Duration::from_secs(120));
        assert_eq!(cooled, vec![(1, 0)]);
    }
}
