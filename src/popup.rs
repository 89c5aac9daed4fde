//! Popup controller: the state machine behind the rendered popup.
//!
//! Everything the popup shows is derived from `Option<MediaSnapshot>` plus
//! the scrub-drag state; the controller holds no other mutable UI state.
//! Lifecycle is explicit — `open` on construction of the window, `close`
//! exactly once when it goes away — so no timer or channel can outlive the
//! popup instance.

use std::time::{Duration, Instant};

use crate::{
    media::{format_timestamp, MediaSnapshot},
    presence::{BackgroundController, UpdateChannel},
    scrub::{ScrubSpan, ScrubState},
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const SEEK_STEP_SECS: f64 = 10.0;
/// Two step-button clicks inside this window count as a double click and
/// send a single 3x seek instead of two 1x seeks.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

pub const PLACEHOLDER_PLATFORM: &str = "Platform";
pub const PLACEHOLDER_TITLE: &str = "Title";
pub const PLACEHOLDER_TIME: &str = "0:00";
pub const STATUS_ENABLED: &str = "Enabled";
pub const STATUS_DISABLED: &str = "Disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    Disabled,
    Enabled,
}

/// A step-seek click waiting out the double-click window. Promoted to a
/// single 3x command by a second click, or flushed as 1x on expiry —
/// never both.
#[derive(Debug, Clone, Copy)]
struct PendingStep {
    delta_secs: f64,
    deadline: Instant,
}

pub struct PopupController<C: BackgroundController> {
    controller: C,
    state: PopupState,
    snapshot: Option<MediaSnapshot>,
    channel: Option<UpdateChannel>,
    next_poll: Option<Instant>,
    pending_step: Option<PendingStep>,
    scrub: ScrubState,
    closed: bool,
}

impl<C: BackgroundController> PopupController<C> {
    /// Builds the controller and performs the on-open sync: if the feature
    /// is already enabled the first snapshot is rendered immediately,
    /// otherwise the popup starts out disabled.
    pub fn open(controller: C, now: Instant) -> Self {
        let mut popup = Self {
            controller,
            state: PopupState::Disabled,
            snapshot: None,
            channel: None,
            next_poll: None,
            pending_step: None,
            scrub: ScrubState::default(),
            closed: false,
        };
        if popup.controller.is_enabled() {
            let snapshot = popup.controller.current_media();
            popup.apply_snapshot(snapshot, now);
        }
        popup
    }

    pub fn state(&self) -> PopupState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == PopupState::Enabled
    }

    pub fn snapshot(&self) -> Option<&MediaSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn scrub(&self) -> &ScrubState {
        &self.scrub
    }

    /// User flipped the enable toggle. Enabling only sticks if the
    /// controller actually has a session to track; otherwise the toggle
    /// reverts and the popup stays disabled.
    pub fn toggle(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if self.controller.is_enabled() {
            self.controller.disable();
            self.enter_disabled();
        } else {
            match self.controller.enable() {
                Some(snapshot) => self.enter_enabled(snapshot, now),
                None => {
                    self.controller.disable();
                    self.enter_disabled();
                }
            }
        }
    }

    /// Periodic work, driven from the UI frame loop. Flushes an expired
    /// pending step seek, drains pushed snapshots, and once per second polls
    /// the controller — re-acquiring the push subscription only if the
    /// previous one went dead.
    pub fn tick(&mut self, now: Instant) {
        if self.closed {
            return;
        }

        if let Some(pending) = self.pending_step {
            if now >= pending.deadline {
                self.pending_step = None;
                if self.is_enabled() {
                    self.controller.seek_by(pending.delta_secs);
                }
            }
        }

        self.drain_channel(now);

        if self.state != PopupState::Enabled {
            return;
        }
        let due = self.next_poll.map_or(true, |at| now >= at);
        if !due {
            return;
        }
        self.next_poll = Some(now + POLL_INTERVAL);

        let channel_dead = self
            .channel
            .as_ref()
            .map_or(true, |channel| !channel.is_connected());
        if channel_dead {
            self.channel = self.controller.update_channel();
        }

        let snapshot = self.controller.current_media();
        self.apply_snapshot(snapshot, now);
    }

    /// Play/pause button. Sends the new desired playing state and flips the
    /// local snapshot so the icon updates without waiting for a push.
    pub fn play_pause(&mut self) {
        if !self.is_enabled() {
            return;
        }
        let Some(snapshot) = self.snapshot.as_mut() else {
            return;
        };
        let playing = snapshot.paused;
        snapshot.paused = !playing;
        self.controller.set_playing(playing);
    }

    pub fn rewind_clicked(&mut self, now: Instant) {
        self.step_clicked(-SEEK_STEP_SECS, now);
    }

    pub fn fast_forward_clicked(&mut self, now: Instant) {
        self.step_clicked(SEEK_STEP_SECS, now);
    }

    pub fn toggle_loop(&mut self) {
        if !self.is_enabled() {
            return;
        }
        let Some(snapshot) = self.snapshot.as_mut() else {
            return;
        };
        let looping = !snapshot.is_looping;
        snapshot.is_looping = looping;
        self.controller.set_looping(looping);
    }

    /// Pointer pressed on the scrub indicator. Inert while disabled, which
    /// is also what keeps the later release from sending a command.
    pub fn scrub_pointer_down(&mut self, start_x: f32) {
        self.scrub
            .pointer_down(self.is_enabled() && !self.closed, start_x);
    }

    pub fn scrub_pointer_move(&mut self, span: ScrubSpan, x: f32) {
        self.scrub.pointer_move(span, x);
    }

    /// Pointer released anywhere. Commits at most one absolute seek, using
    /// the duration queried fresh from the controller at release time.
    pub fn scrub_pointer_up(&mut self, span: ScrubSpan) {
        let duration = self
            .controller
            .current_media()
            .map_or(0.0, |media| media.duration_secs);
        if let Some(target_secs) = self.scrub.pointer_up(span, duration) {
            if self.is_enabled() {
                self.controller.seek_to(target_secs);
                if let Some(snapshot) = self.snapshot.as_mut() {
                    snapshot.position_secs = target_secs.clamp(0.0, snapshot.duration_secs);
                }
            }
        }
    }

    /// Tears the popup down. Idempotent: the first call detaches the push
    /// listener and cancels the poll schedule, later calls are no-ops, and
    /// nothing renders after it.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.channel = None;
        self.next_poll = None;
        self.pending_step = None;
        self.scrub = ScrubState::default();
    }

    // -- rendered text, derived per frame --

    pub fn status_text(&self) -> &'static str {
        match self.state {
            PopupState::Enabled => STATUS_ENABLED,
            PopupState::Disabled => STATUS_DISABLED,
        }
    }

    pub fn platform_text(&self) -> String {
        match &self.snapshot {
            Some(snapshot) => snapshot.platform.clone(),
            None => PLACEHOLDER_PLATFORM.to_owned(),
        }
    }

    pub fn title_text(&self) -> String {
        match &self.snapshot {
            Some(snapshot) => snapshot.display_title(),
            None => PLACEHOLDER_TITLE.to_owned(),
        }
    }

    pub fn position_text(&self) -> String {
        match &self.snapshot {
            Some(snapshot) => format_timestamp(snapshot.position_secs),
            None => PLACEHOLDER_TIME.to_owned(),
        }
    }

    pub fn duration_text(&self) -> String {
        match &self.snapshot {
            Some(snapshot) => format_timestamp(snapshot.duration_secs),
            None => PLACEHOLDER_TIME.to_owned(),
        }
    }

    pub fn show_pause_icon(&self) -> bool {
        self.snapshot
            .as_ref()
            .map_or(false, |snapshot| !snapshot.paused)
    }

    pub fn loop_pressed(&self) -> bool {
        self.snapshot
            .as_ref()
            .map_or(false, |snapshot| snapshot.is_looping)
    }

    // -- internals --

    fn step_clicked(&mut self, delta_secs: f64, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        match self.pending_step.take() {
            // Second click of a double click: one 3x command, the armed 1x
            // never fires.
            Some(pending) if pending.delta_secs == delta_secs && now < pending.deadline => {
                self.controller.seek_by(delta_secs * 3.0);
            }
            // A pending step in the other direction still owes its 1x.
            Some(pending) => {
                self.controller.seek_by(pending.delta_secs);
                self.pending_step = Some(PendingStep {
                    delta_secs,
                    deadline: now + DOUBLE_CLICK_WINDOW,
                });
            }
            None => {
                self.pending_step = Some(PendingStep {
                    delta_secs,
                    deadline: now + DOUBLE_CLICK_WINDOW,
                });
            }
        }
    }

    fn drain_channel(&mut self, now: Instant) {
        loop {
            let Some(channel) = self.channel.as_mut() else {
                return;
            };
            match channel.try_next() {
                Some(message) => self.apply_snapshot(message, now),
                None => return,
            }
        }
    }

    /// The one render entry point: every snapshot, pushed or polled, goes
    /// through here and lands in exactly Disabled or Enabled.
    fn apply_snapshot(&mut self, snapshot: Option<MediaSnapshot>, now: Instant) {
        match snapshot {
            Some(mut snapshot) => {
                // Keep the dragged indicator where the user holds it.
                if self.scrub.dragging() {
                    if let Some(previous) = &self.snapshot {
                        snapshot.position_secs = previous.position_secs;
                    }
                }
                self.enter_enabled(snapshot, now);
            }
            None => self.enter_disabled(),
        }
    }

    fn enter_enabled(&mut self, snapshot: MediaSnapshot, now: Instant) {
        let was_disabled = self.state != PopupState::Enabled;
        self.state = PopupState::Enabled;
        self.snapshot = Some(snapshot);
        if was_disabled {
            self.channel = self.controller.update_channel();
            self.next_poll = Some(now + POLL_INTERVAL);
        }
    }

    /// Local teardown for the disabled rendering: placeholders, no listener,
    /// no poll schedule. The session side is already off (or was just turned
    /// off by the caller).
    fn enter_disabled(&mut self) {
        self.state = PopupState::Disabled;
        self.snapshot = None;
        self.channel = None;
        self.next_poll = None;
        self.pending_step = None;
        self.scrub = ScrubState::default();
    }
}
