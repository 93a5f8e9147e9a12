//! Lyric synchronization controller
//!
//! Turns playback position reports and transport events into "active line
//! changed" notifications. The controller is a plain owned value: each
//! player widget has its own, and nothing here blocks or spawns.
//!
//! Every notification carries the generation of the lyric set it was computed
//! against. Installing new lyrics bumps the generation, and
//! [`SyncController::deliver`] drops notifications from older generations so
//! a late result for the previous song never highlights a line of the new one.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::clock::PlaybackClock;
use super::parser::{LyricEntry, LyricSet, LyricSource, parse_lyrics};
use super::timeline::{binary_search_active, find_active, next_change_ms};

/// What happens after the final entry's explicit end time passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// The last entry stays active until playback stops or ends
    #[default]
    Sticky,
    /// Nothing is active once the last entry's explicit end passes
    Release,
}

impl std::fmt::Display for TailPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TailPolicy::Sticky => write!(f, "sticky"),
            TailPolicy::Release => write!(f, "release"),
        }
    }
}

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No lyrics, or an empty set
    Idle,
    /// Lyrics loaded; positions resolve to lines
    Tracking,
}

/// Transport events delivered by the host, in arrival order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// Periodic position report in milliseconds
    Tick(f64),
    /// Position jump in milliseconds
    Seek(f64),
    RateChange(f64),
    Pause,
    Resume,
    Stop,
    Ended,
}

/// Why a notification was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Loaded,
    Tick,
    Seek,
    Stopped,
    Ended,
}

/// Payload for views when the active line may have changed.
///
/// `new_index == None` means no line is active: before the first line,
/// after stop/end, or past the final line's end under [`TailPolicy::Release`].
/// `tail_policy` tells the view which of those rules applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncNotification {
    pub generation: u64,
    pub old_index: Option<usize>,
    pub new_index: Option<usize>,
    /// The newly active entry, with its time bounds
    pub entry: Option<LyricEntry>,
    pub position_ms: u64,
    pub cause: ChangeCause,
    pub tail_policy: TailPolicy,
}

impl SyncNotification {
    pub fn index_changed(&self) -> bool {
        self.old_index != self.new_index
    }
}

/// Something that renders the active lyric line
pub trait Notifiable {
    fn on_active_changed(&mut self, notification: &SyncNotification);
}

/// Mutable playback state owned by the controller
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub position_ms: u64,
    pub active_index: Option<usize>,
    pub generation: u64,
    pub rate: f64,
    pub playing: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            position_ms: 0,
            active_index: None,
            generation: 0,
            rate: 1.0,
            playing: false,
        }
    }
}

/// Convert a host position to whole milliseconds. NaN is rejected;
/// negative positions clamp to zero.
fn to_position_ms(position_ms: f64) -> Option<u64> {
    if position_ms.is_nan() {
        return None;
    }
    // `as` saturates, so +inf maps to u64::MAX
    Some(position_ms.max(0.0).floor() as u64)
}

/// Lyric sync state machine
#[derive(Debug, Clone)]
pub struct SyncController {
    lyrics: LyricSet,
    state: PlaybackState,
    sync_state: SyncState,
    tail_policy: TailPolicy,
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncController {
    pub fn new() -> Self {
        Self::with_tail_policy(TailPolicy::default())
    }

    pub fn with_tail_policy(tail_policy: TailPolicy) -> Self {
        Self {
            lyrics: LyricSet::empty(),
            state: PlaybackState::default(),
            sync_state: SyncState::Idle,
            tail_policy,
        }
    }

    pub fn lyrics(&self) -> &LyricSet {
        &self.lyrics
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn active_index(&self) -> Option<usize> {
        self.state.active_index
    }

    pub fn active_entry(&self) -> Option<&LyricEntry> {
        self.state.active_index.and_then(|i| self.lyrics.get(i))
    }

    pub fn tail_policy(&self) -> TailPolicy {
        self.tail_policy
    }

    /// Takes effect from the next position update
    pub fn set_tail_policy(&mut self, tail_policy: TailPolicy) {
        self.tail_policy = tail_policy;
    }

    /// Parse and install new lyrics, then re-evaluate at the last position
    pub fn load_lyrics(&mut self, raw: &str) -> SyncNotification {
        self.load_set(parse_lyrics(raw))
    }

    pub fn load_from<S: LyricSource + ?Sized>(&mut self, source: &S) -> SyncNotification {
        self.load_lyrics(&source.lyric_text())
    }

    /// Install an already parsed set
    pub fn load_set(&mut self, lyrics: LyricSet) -> SyncNotification {
        self.lyrics = lyrics;
        self.state.generation += 1;
        self.state.active_index = None;
        self.sync_state = if self.lyrics.is_empty() {
            SyncState::Idle
        } else {
            SyncState::Tracking
        };

        tracing::info!(
            "Installed {} {} lyric entries (generation {})",
            self.lyrics.len(),
            self.lyrics.format(),
            self.state.generation
        );

        let new_index = match self.sync_state {
            SyncState::Tracking => self.resolve(self.state.position_ms, None),
            SyncState::Idle => None,
        };
        self.transition(None, new_index, ChangeCause::Loaded)
    }

    /// Periodic position update; notifies only when the active line changes
    pub fn on_position_tick(&mut self, position_ms: f64) -> Option<SyncNotification> {
        let position = to_position_ms(position_ms)?;
        self.state.position_ms = position;
        if self.sync_state == SyncState::Idle {
            return None;
        }

        let old_index = self.state.active_index;
        let new_index = self.resolve(position, old_index);
        if new_index == old_index {
            return None;
        }
        Some(self.transition(old_index, new_index, ChangeCause::Tick))
    }

    /// Position jump; always notifies while tracking so views can re-scroll
    pub fn on_seek(&mut self, position_ms: f64) -> Option<SyncNotification> {
        let position = to_position_ms(position_ms)?;
        self.state.position_ms = position;
        if self.sync_state == SyncState::Idle {
            return None;
        }

        let old_index = self.state.active_index;
        let new_index = self.resolve(position, None);
        tracing::debug!("Seek to {}ms: {:?} -> {:?}", position, old_index, new_index);
        Some(self.transition(old_index, new_index, ChangeCause::Seek))
    }

    pub fn on_stop(&mut self) -> Option<SyncNotification> {
        self.state.playing = false;
        self.state.position_ms = 0;
        self.clear(ChangeCause::Stopped)
    }

    pub fn on_ended(&mut self) -> Option<SyncNotification> {
        self.state.playing = false;
        self.clear(ChangeCause::Ended)
    }

    pub fn on_rate_change(&mut self, rate: f64) {
        if rate.is_finite() && rate >= 0.0 {
            self.state.rate = rate;
        } else {
            tracing::warn!("Ignoring unsupported playback rate {}", rate);
        }
    }

    pub fn on_pause(&mut self) {
        self.state.playing = false;
    }

    pub fn on_resume(&mut self) {
        self.state.playing = true;
    }

    /// Dispatch a transport event
    pub fn handle(&mut self, event: TransportEvent) -> Option<SyncNotification> {
        match event {
            TransportEvent::Tick(position) => self.on_position_tick(position),
            TransportEvent::Seek(position) => self.on_seek(position),
            TransportEvent::RateChange(rate) => {
                self.on_rate_change(rate);
                None
            }
            TransportEvent::Pause => {
                self.on_pause();
                None
            }
            TransportEvent::Resume => {
                self.on_resume();
                None
            }
            TransportEvent::Stop => self.on_stop(),
            TransportEvent::Ended => self.on_ended(),
        }
    }

    /// Whether a notification belongs to the currently installed lyrics
    pub fn is_current(&self, notification: &SyncNotification) -> bool {
        notification.generation == self.state.generation
    }

    /// Forward a notification to a view unless it is stale.
    /// Returns whether it was delivered.
    pub fn deliver<V: Notifiable + ?Sized>(
        &self,
        notification: &SyncNotification,
        view: &mut V,
    ) -> bool {
        if !self.is_current(notification) {
            tracing::debug!(
                "Discarding stale notification (generation {} != {})",
                notification.generation,
                self.state.generation
            );
            return false;
        }
        view.on_active_changed(notification);
        true
    }

    /// Wall-clock time until the active line next changes at the current
    /// rate, for hosts that schedule a wake instead of polling
    pub fn time_until_next_change(&self) -> Option<Duration> {
        if self.sync_state == SyncState::Idle || !self.state.playing || self.state.rate <= 0.0 {
            return None;
        }

        let entries = self.lyrics.entries();
        let active = self.state.active_index;
        let boundary = next_change_ms(entries, active).or_else(|| self.release_at(active))?;
        let remaining_ms = boundary.checked_sub(self.state.position_ms)?;

        // Near-zero rates push the wait past what a Duration can hold
        Duration::try_from_secs_f64(remaining_ms as f64 / 1000.0 / self.state.rate).ok()
    }

    /// End time of the final entry when the tail policy will release it
    fn release_at(&self, active: Option<usize>) -> Option<u64> {
        if self.tail_policy != TailPolicy::Release {
            return None;
        }
        let last = self.lyrics.len().checked_sub(1)?;
        if active != Some(last) {
            return None;
        }
        self.lyrics.get(last)?.end_time_ms
    }

    fn resolve(&self, position_ms: u64, hint: Option<usize>) -> Option<usize> {
        let entries = self.lyrics.entries();
        let index = match hint {
            Some(_) => find_active(entries, position_ms, hint),
            None => binary_search_active(entries, position_ms),
        }?;

        match self.release_at(Some(index)) {
            Some(end) if position_ms >= end => None,
            _ => Some(index),
        }
    }

    fn clear(&mut self, cause: ChangeCause) -> Option<SyncNotification> {
        let old_index = self.state.active_index;
        if old_index.is_none() {
            return None;
        }
        Some(self.transition(old_index, None, cause))
    }

    fn transition(
        &mut self,
        old_index: Option<usize>,
        new_index: Option<usize>,
        cause: ChangeCause,
    ) -> SyncNotification {
        self.state.active_index = new_index;
        SyncNotification {
            generation: self.state.generation,
            old_index,
            new_index,
            entry: new_index.and_then(|i| self.lyrics.get(i)).cloned(),
            position_ms: self.state.position_ms,
            cause,
            tail_policy: self.tail_policy,
        }
    }
}

/// Controller, clock and view wired together for hosts that deliver
/// notifications synchronously
#[derive(Debug)]
pub struct SyncDriver<C, V> {
    controller: SyncController,
    clock: C,
    view: V,
}

impl<C: PlaybackClock, V: Notifiable> SyncDriver<C, V> {
    pub fn new(controller: SyncController, clock: C, view: V) -> Self {
        Self {
            controller,
            clock,
            view,
        }
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_parts(self) -> (SyncController, C, V) {
        (self.controller, self.clock, self.view)
    }

    /// Install lyrics and deliver the resulting notification
    pub fn load_lyrics(&mut self, raw: &str) -> bool {
        let notification = self.controller.load_lyrics(raw);
        self.controller.deliver(&notification, &mut self.view)
    }

    /// Tick the controller with the clock's current estimate
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.clock.is_playing() {
            return false;
        }
        let position = self.clock.position_ms(now);
        match self.controller.on_position_tick(position) {
            Some(notification) => self.controller.deliver(&notification, &mut self.view),
            None => false,
        }
    }

    /// Route a host event to both the clock and the controller
    pub fn dispatch(&mut self, event: TransportEvent, now: Instant) -> bool {
        self.clock.apply(&event, now);
        match self.controller.handle(event) {
            Some(notification) => self.controller.deliver(&notification, &mut self.view),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lyrics::clock::InterpolatedClock;
    use pretty_assertions::assert_eq;

    /// Records every delivered notification
    #[derive(Debug, Default)]
    struct RecordingView {
        seen: Vec<SyncNotification>,
    }

    impl Notifiable for RecordingView {
        fn on_active_changed(&mut self, notification: &SyncNotification) {
            self.seen.push(notification.clone());
        }
    }

    fn indices_for(controller: &mut SyncController, positions: &[f64]) -> Vec<Option<usize>> {
        positions
            .iter()
            .map(|&p| {
                controller.on_position_tick(p);
                controller.active_index()
            })
            .collect()
    }

    #[test]
    fn test_lrc_ticks() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:01.00]Hello\n[00:03.00]World");
        assert_eq!(
            indices_for(&mut controller, &[0.0, 1500.0, 3500.0]),
            vec![None, Some(0), Some(1)]
        );
    }

    #[test]
    fn test_srt_single_block_is_sticky() {
        let mut controller = SyncController::new();
        controller.load_lyrics("1\n00:00:01,000 --> 00:00:02,000\nHi");
        assert_eq!(
            indices_for(&mut controller, &[500.0, 1500.0, 2500.0]),
            vec![None, Some(0), Some(0)]
        );
    }

    #[test]
    fn test_srt_single_block_release_policy() {
        let mut controller = SyncController::with_tail_policy(TailPolicy::Release);
        controller.load_lyrics("1\n00:00:01,000 --> 00:00:02,000\nHi");
        assert_eq!(
            indices_for(&mut controller, &[500.0, 1500.0, 2500.0, 3000.0]),
            vec![None, Some(0), None, None]
        );
    }

    #[test]
    fn test_release_ignores_gaps_before_the_tail() {
        let mut controller = SyncController::with_tail_policy(TailPolicy::Release);
        controller.load_lyrics(
            "1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n00:00:05,000 --> 00:00:06,000\nB",
        );
        assert_eq!(
            indices_for(&mut controller, &[3000.0, 5500.0, 6500.0]),
            vec![Some(0), Some(1), None]
        );
    }

    #[test]
    fn test_plain_text_is_active_from_zero() {
        let mut controller = SyncController::new();
        controller.load_lyrics("just some notes");
        assert_eq!(controller.sync_state(), SyncState::Tracking);
        assert_eq!(controller.active_index(), Some(0));
        assert_eq!(
            indices_for(&mut controller, &[0.0, 90_000.0]),
            vec![Some(0), Some(0)]
        );
    }

    #[test]
    fn test_tick_only_notifies_on_change() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:01.00]Hello\n[00:03.00]World");

        assert_eq!(controller.on_position_tick(500.0), None);
        let change = controller.on_position_tick(1200.0).unwrap();
        assert_eq!(change.old_index, None);
        assert_eq!(change.new_index, Some(0));
        assert_eq!(change.cause, ChangeCause::Tick);
        assert_eq!(
            change.entry,
            Some(LyricEntry::new(1000, "Hello").with_end(3000))
        );
        assert_eq!(controller.on_position_tick(1300.0), None);
    }

    #[test]
    fn test_idle_never_notifies() {
        let mut controller = SyncController::new();
        let loaded = controller.load_lyrics("   ");
        assert_eq!(controller.sync_state(), SyncState::Idle);
        assert_eq!(loaded.new_index, None);

        assert_eq!(controller.on_position_tick(1000.0), None);
        assert_eq!(controller.on_seek(5000.0), None);
        assert_eq!(controller.on_stop(), None);
        assert_eq!(controller.state().position_ms, 0);
    }

    #[test]
    fn test_load_reevaluates_last_position() {
        let mut controller = SyncController::new();
        controller.on_position_tick(2500.0);

        let loaded = controller.load_lyrics("[00:01.00]a\n[00:02.00]b\n[00:03.00]c");
        assert_eq!(loaded.cause, ChangeCause::Loaded);
        assert_eq!(loaded.generation, 1);
        assert_eq!(loaded.new_index, Some(1));
        assert_eq!(controller.active_index(), Some(1));
    }

    #[test]
    fn test_seek_always_notifies_and_matches_fresh_search() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:01.00]a\n[00:02.00]b\n[00:02.00]b2\n[00:09.00]c");

        for target in [8000.0, 100.0, 2000.0, 2000.0, 15_000.0, 1999.0] {
            let notification = controller.on_seek(target).unwrap();
            assert_eq!(notification.cause, ChangeCause::Seek);
            let expected = binary_search_active(controller.lyrics().entries(), target as u64);
            assert_eq!(notification.new_index, expected);
            assert_eq!(controller.active_index(), expected);
        }
    }

    #[test]
    fn test_monotonic_ticks_are_non_decreasing() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:00.50]a\n[00:01.00]b\n[00:01.00]c\n[00:01.70]d\n[00:04.00]e");

        let positions: Vec<f64> = (0..100).map(|i| i as f64 * 53.0).collect();
        let indices = indices_for(&mut controller, &positions);
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(indices.last().copied().flatten(), Some(4));
    }

    #[test]
    fn test_stop_and_end_reset() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:01.00]a\n[00:02.00]b");
        controller.on_position_tick(2500.0);

        let ended = controller.on_ended().unwrap();
        assert_eq!(ended.old_index, Some(1));
        assert_eq!(ended.new_index, None);
        assert_eq!(ended.cause, ChangeCause::Ended);
        assert_eq!(controller.on_ended(), None);

        controller.on_position_tick(1500.0);
        let stopped = controller.on_stop().unwrap();
        assert_eq!(stopped.cause, ChangeCause::Stopped);
        assert_eq!(controller.state().position_ms, 0);
    }

    #[test]
    fn test_nan_and_negative_positions() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:00.00]a\n[00:02.00]b");
        controller.on_position_tick(2100.0);

        assert_eq!(controller.on_position_tick(f64::NAN), None);
        assert_eq!(controller.state().position_ms, 2100);

        let rewound = controller.on_seek(-50.0).unwrap();
        assert_eq!(rewound.position_ms, 0);
        assert_eq!(rewound.new_index, Some(0));
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut controller = SyncController::new();
        let mut view = RecordingView::default();

        controller.load_lyrics("[00:01.00]A one\n[00:02.00]A two");
        let pending = controller.on_position_tick(1500.0).unwrap();

        controller.load_lyrics("[00:01.00]B one");
        assert_ne!(pending.generation, controller.generation());
        assert!(!controller.is_current(&pending));
        assert!(!controller.deliver(&pending, &mut view));
        assert!(view.seen.is_empty());
    }

    #[test]
    fn test_transport_events() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:01.00]a\n[00:03.00]b");

        assert_eq!(controller.handle(TransportEvent::Resume), None);
        assert_eq!(controller.handle(TransportEvent::RateChange(2.0)), None);
        assert!(controller.state().playing);
        assert_eq!(controller.state().rate, 2.0);

        let change = controller.handle(TransportEvent::Tick(1000.0)).unwrap();
        assert_eq!(change.new_index, Some(0));
        // 2000ms of lyrics at double speed
        assert_eq!(
            controller.time_until_next_change(),
            Some(Duration::from_secs(1))
        );

        controller.handle(TransportEvent::Pause);
        assert_eq!(controller.time_until_next_change(), None);

        controller.handle(TransportEvent::RateChange(f64::INFINITY));
        assert_eq!(controller.state().rate, 2.0);
    }

    #[test]
    fn test_next_change_at_near_zero_rate() {
        let mut controller = SyncController::new();
        controller.load_lyrics("[00:01.00]Hello\n[00:03.00]World");
        controller.on_resume();
        controller.on_rate_change(1e-20);
        controller.on_position_tick(1000.0);

        assert_eq!(controller.active_index(), Some(0));
        assert_eq!(controller.time_until_next_change(), None);

        controller.on_rate_change(0.5);
        assert_eq!(
            controller.time_until_next_change(),
            Some(Duration::from_secs(4))
        );
    }

    #[test]
    fn test_next_change_with_release_tail() {
        let mut controller = SyncController::with_tail_policy(TailPolicy::Release);
        controller.load_lyrics("1\n00:00:01,000 --> 00:00:04,000\nHi");
        controller.on_resume();
        controller.on_position_tick(1000.0);
        assert_eq!(
            controller.time_until_next_change(),
            Some(Duration::from_secs(3))
        );

        controller.set_tail_policy(TailPolicy::Sticky);
        assert_eq!(controller.time_until_next_change(), None);
    }

    #[test]
    fn test_driver_polls_clock() {
        let t0 = Instant::now();
        let mut driver = SyncDriver::new(
            SyncController::new(),
            InterpolatedClock::new(),
            RecordingView::default(),
        );

        assert!(driver.load_lyrics("[00:01.00]Hello\n[00:03.00]World"));
        assert!(!driver.poll(t0 + Duration::from_secs(2)));

        driver.dispatch(TransportEvent::Resume, t0);
        assert!(driver.poll(t0 + Duration::from_millis(1200)));
        assert!(!driver.poll(t0 + Duration::from_millis(1300)));
        assert!(driver.dispatch(TransportEvent::Seek(3500.0), t0 + Duration::from_millis(1300)));

        let seen: Vec<_> = driver
            .view()
            .seen
            .iter()
            .map(|n| (n.cause, n.new_index))
            .collect();
        assert_eq!(
            seen,
            vec![
                (ChangeCause::Loaded, None),
                (ChangeCause::Tick, Some(0)),
                (ChangeCause::Seek, Some(1)),
            ]
        );
    }
}
