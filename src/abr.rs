//! Adaptive Bitrate Controller
//!
//! The controller consumes link-quality samples reported by the transport
//! and decides when the active bitrate tier should move. Decisions are
//! asymmetric: one threshold breach sustained over N consecutive samples
//! drops a tier, while raising a tier requires M consecutive good samples
//! with M larger than N. The asymmetry is the hysteresis that keeps the
//! tier from oscillating on a marginal link.
//!
//! Tier moves never skip a step and stay within `[Low, ceiling]`, where the
//! ceiling is the tier negotiated in the session's operating point.
//!
//! Silence is never treated as improvement: a gap between samples longer
//! than the configured timeout discards the accumulated evidence and holds
//! the current tier until fresh samples arrive.

use heapless::Deque;

use crate::caps::BitrateTier;
use crate::constants::{
    DEFAULT_DEGRADE_BUFFER_PERCENT, DEFAULT_DEGRADE_SAMPLE_COUNT, DEFAULT_MAX_RETRANSMITS,
    DEFAULT_SAMPLE_TIMEOUT_MS, DEFAULT_UPGRADE_BUFFER_PERCENT, DEFAULT_UPGRADE_SAMPLE_COUNT,
    LINK_QUALITY_WINDOW,
};

/// Adaptive bitrate thresholds and behavior switches
#[derive(Debug, Clone, Copy)]
pub struct AbrOptions {
    /// Buffer fill percentage below which a sample counts as degraded
    pub degrade_buffer_percent: u8,
    /// Buffer fill percentage above which a sample counts as good
    pub upgrade_buffer_percent: u8,
    /// Retransmit count above which a sample counts as degraded
    pub max_retransmits: u8,
    /// Consecutive degraded samples required to drop a tier
    pub degrade_sample_count: u8,
    /// Consecutive good samples required to raise a tier
    pub upgrade_sample_count: u8,
    /// Sample silence after which link quality is unknown, in milliseconds
    pub sample_timeout_ms: u64,
    /// Whether automatic tier decisions are enabled
    pub adaptive: bool,
}

impl Default for AbrOptions {
    fn default() -> Self {
        Self {
            degrade_buffer_percent: DEFAULT_DEGRADE_BUFFER_PERCENT,
            upgrade_buffer_percent: DEFAULT_UPGRADE_BUFFER_PERCENT,
            max_retransmits: DEFAULT_MAX_RETRANSMITS,
            degrade_sample_count: DEFAULT_DEGRADE_SAMPLE_COUNT,
            upgrade_sample_count: DEFAULT_UPGRADE_SAMPLE_COUNT,
            sample_timeout_ms: DEFAULT_SAMPLE_TIMEOUT_MS,
            adaptive: true,
        }
    }
}

/// A single link-quality observation from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct LinkQualitySample {
    /// Transmit buffer fill level, 0-100
    pub buffer_fill_percent: u8,
    /// Retransmissions observed since the previous sample
    pub retransmit_count: u8,
    /// Sample timestamp in milliseconds, from the transport's clock
    pub timestamp_ms: u64,
}

/// Why a tier change happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum TierChangeReason {
    /// Starting tier applied when streaming begins below the ceiling
    Initial,
    /// Sustained congestion evidence
    Degrade,
    /// Sustained good-link evidence
    Upgrade,
    /// Explicit request through the control plane
    Manual,
}

/// An applied bitrate tier change
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct TierChange {
    /// Tier before the change
    pub from: BitrateTier,
    /// Tier after the change
    pub to: BitrateTier,
    /// What triggered the change
    pub reason: TierChangeReason,
}

/// Per-session adaptive bitrate state
#[derive(Debug)]
pub struct AbrController {
    options: AbrOptions,
    tier: BitrateTier,
    ceiling: BitrateTier,
    degrade_streak: u8,
    upgrade_streak: u8,
    window: Deque<LinkQualitySample, LINK_QUALITY_WINDOW>,
    last_sample_ms: Option<u64>,
}

impl AbrController {
    /// Create a controller for a freshly negotiated session
    ///
    /// `ceiling` is the tier from the negotiated operating point; the
    /// starting tier is the configured preference clamped to that ceiling.
    #[must_use]
    pub fn new(options: AbrOptions, preferred: BitrateTier, ceiling: BitrateTier) -> Self {
        let tier = if preferred > ceiling { ceiling } else { preferred };
        Self {
            options,
            tier,
            ceiling,
            degrade_streak: 0,
            upgrade_streak: 0,
            window: Deque::new(),
            last_sample_ms: None,
        }
    }

    /// Current bitrate tier
    #[must_use]
    pub const fn tier(&self) -> BitrateTier {
        self.tier
    }

    /// Negotiated tier ceiling
    #[must_use]
    pub const fn ceiling(&self) -> BitrateTier {
        self.ceiling
    }

    /// Controller options
    #[must_use]
    pub const fn options(&self) -> &AbrOptions {
        &self.options
    }

    /// Whether a sample has been seen within the silence timeout
    #[must_use]
    pub fn link_quality_known(&self, now_ms: u64) -> bool {
        self.last_sample_ms
            .is_some_and(|last| now_ms.saturating_sub(last) <= self.options.sample_timeout_ms)
    }

    /// Mean buffer fill over the sample window, if any samples are held
    #[must_use]
    pub fn average_buffer_fill(&self) -> Option<u8> {
        if self.window.is_empty() {
            return None;
        }
        let sum: u32 = self
            .window
            .iter()
            .map(|s| u32::from(s.buffer_fill_percent))
            .sum();
        #[allow(clippy::cast_possible_truncation)]
        let avg = (sum / self.window.len() as u32) as u8;
        Some(avg)
    }

    /// Feed one link-quality sample and apply at most one tier decision
    ///
    /// Returns the applied change, if any. A sample arriving after a
    /// silence gap longer than the timeout resets the evidence window
    /// first, so stale streaks never carry across an outage.
    pub fn on_sample(&mut self, sample: LinkQualitySample) -> Option<TierChange> {
        if let Some(last) = self.last_sample_ms {
            if sample.timestamp_ms.saturating_sub(last) > self.options.sample_timeout_ms {
                self.window.clear();
                self.degrade_streak = 0;
                self.upgrade_streak = 0;
            }
        }
        self.last_sample_ms = Some(sample.timestamp_ms);

        if self.window.is_full() {
            self.window.pop_front();
        }
        // Capacity was just ensured, push cannot fail
        self.window.push_back(sample).ok();

        if !self.options.adaptive {
            return None;
        }

        if self.is_degraded(&sample) {
            self.upgrade_streak = 0;
            self.degrade_streak = self.degrade_streak.saturating_add(1);
            if self.degrade_streak >= self.options.degrade_sample_count {
                self.degrade_streak = 0;
                return self.degrade_one();
            }
        } else if self.is_good(&sample) {
            self.degrade_streak = 0;
            self.upgrade_streak = self.upgrade_streak.saturating_add(1);
            if self.upgrade_streak >= self.options.upgrade_sample_count {
                self.upgrade_streak = 0;
                return self.upgrade_one();
            }
        } else {
            // Neither degraded nor good: consecutive evidence is broken
            self.degrade_streak = 0;
            self.upgrade_streak = 0;
        }

        None
    }

    /// Force the active tier, clamped to the negotiated ceiling
    ///
    /// Clears accumulated evidence so automatic decisions restart from the
    /// new tier. Returns the change if the tier actually moved.
    pub fn set_tier(&mut self, tier: BitrateTier) -> Option<TierChange> {
        let target = if tier > self.ceiling { self.ceiling } else { tier };
        self.degrade_streak = 0;
        self.upgrade_streak = 0;

        if target == self.tier {
            return None;
        }
        let from = self.tier;
        self.tier = target;
        Some(TierChange {
            from,
            to: target,
            reason: TierChangeReason::Manual,
        })
    }

    const fn is_degraded(&self, sample: &LinkQualitySample) -> bool {
        sample.buffer_fill_percent < self.options.degrade_buffer_percent
            || sample.retransmit_count > self.options.max_retransmits
    }

    const fn is_good(&self, sample: &LinkQualitySample) -> bool {
        sample.buffer_fill_percent > self.options.upgrade_buffer_percent
            && sample.retransmit_count == 0
    }

    fn degrade_one(&mut self) -> Option<TierChange> {
        let to = self.tier.step_down()?;
        let from = self.tier;
        self.tier = to;
        Some(TierChange {
            from,
            to,
            reason: TierChangeReason::Degrade,
        })
    }

    fn upgrade_one(&mut self) -> Option<TierChange> {
        let to = self.tier.step_up().filter(|t| *t <= self.ceiling)?;
        let from = self.tier;
        self.tier = to;
        Some(TierChange {
            from,
            to,
            reason: TierChangeReason::Upgrade,
        })
    }
}
