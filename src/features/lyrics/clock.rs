//! Playback clock adapters
//!
//! Hosts usually report the playback position coarsely (an audio element
//! fires `timeupdate` a few times per second). [`InterpolatedClock`] keeps
//! the last reported position as an anchor and extrapolates from it using
//! the playback rate, so lyric lines can switch on time between reports.
//!
//! Every call takes an explicit `now` so the clock is deterministic.

use std::time::Instant;

use super::sync::TransportEvent;

/// Source of playback position for the sync controller
pub trait PlaybackClock {
    /// Current position in milliseconds
    fn position_ms(&self, now: Instant) -> f64;

    /// Whether the position is advancing
    fn is_playing(&self) -> bool;

    /// Feed a transport event from the host
    fn apply(&mut self, event: &TransportEvent, now: Instant);
}

/// Position estimate anchored on the latest host report
#[derive(Debug, Clone)]
pub struct InterpolatedClock {
    anchor_ms: f64,
    anchor_at: Option<Instant>,
    rate: f64,
    playing: bool,
    duration_ms: Option<f64>,
}

impl Default for InterpolatedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpolatedClock {
    pub fn new() -> Self {
        Self {
            anchor_ms: 0.0,
            anchor_at: None,
            rate: 1.0,
            playing: false,
            duration_ms: None,
        }
    }

    /// Clamp extrapolation to the track length once it is known
    pub fn set_duration(&mut self, duration_ms: f64) {
        if duration_ms.is_finite() && duration_ms > 0.0 {
            self.duration_ms = Some(duration_ms);
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Record a position reported by the host
    pub fn sample(&mut self, position_ms: f64, now: Instant) {
        if !position_ms.is_finite() {
            tracing::debug!("Ignoring non-finite clock sample {}", position_ms);
            return;
        }
        self.anchor_ms = position_ms.max(0.0);
        self.anchor_at = Some(now);
    }

    pub fn set_rate(&mut self, rate: f64, now: Instant) {
        if !rate.is_finite() || rate < 0.0 {
            tracing::warn!("Ignoring unsupported playback rate {}", rate);
            return;
        }
        // Re-anchor so time already played keeps the old rate
        let position = self.position_ms(now);
        self.rate = rate;
        self.sample(position, now);
    }

    pub fn pause(&mut self, now: Instant) {
        let position = self.position_ms(now);
        self.playing = false;
        self.sample(position, now);
    }

    pub fn resume(&mut self, now: Instant) {
        self.playing = true;
        self.anchor_at = Some(now);
    }

    pub fn stop(&mut self, now: Instant) {
        self.playing = false;
        self.sample(0.0, now);
    }

    fn clamp(&self, position: f64) -> f64 {
        match self.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl PlaybackClock for InterpolatedClock {
    fn position_ms(&self, now: Instant) -> f64 {
        let elapsed_ms = match (self.playing, self.anchor_at) {
            (true, Some(at)) => now.saturating_duration_since(at).as_secs_f64() * 1000.0,
            _ => 0.0,
        };
        self.clamp(self.anchor_ms + elapsed_ms * self.rate)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn apply(&mut self, event: &TransportEvent, now: Instant) {
        match *event {
            TransportEvent::Tick(position) | TransportEvent::Seek(position) => {
                self.sample(position, now)
            }
            TransportEvent::RateChange(rate) => self.set_rate(rate, now),
            TransportEvent::Pause => self.pause(now),
            TransportEvent::Resume => self.resume(now),
            TransportEvent::Stop => self.stop(now),
            TransportEvent::Ended => {
                let position = self.position_ms(now);
                self.playing = false;
                self.sample(position, now);
            }
        }
    }
}
