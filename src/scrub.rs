//! Drag-to-seek scrubber over the playback bar.
//!
//! The indicator offset is first-class numeric state owned by [`ScrubState`];
//! rendering derives from it and nothing ever parses a position back out of
//! painted output. While a drag is in progress, snapshot-driven repositioning
//! is suppressed so incoming updates do not fight the user's pointer.

/// Indicator travel is inset slightly from the bar's painted bounds so the
/// dot stays visually inside the track at both extremes.
pub const BAR_LEFT_INSET: f32 = 2.0;
pub const BAR_RIGHT_INSET: f32 = 6.0;

/// Usable horizontal span of the playback bar, in absolute screen
/// coordinates, after the fixed insets are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubSpan {
    left: f32,
    right: f32,
}

impl ScrubSpan {
    pub fn from_bar(bar_left: f32, bar_width: f32) -> Self {
        let left = bar_left + BAR_LEFT_INSET;
        let right = (bar_left + bar_width - BAR_RIGHT_INSET).max(left);
        Self { left, right }
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn clamp(&self, x: f32) -> f32 {
        x.clamp(self.left, self.right)
    }

    /// Absolute x coordinate of the indicator for a given snapshot. The
    /// fraction is clamped so a snapshot with `position > duration` never
    /// pushes the indicator off the bar.
    pub fn x_for_progress(&self, progress: f64) -> f32 {
        self.left + self.width() * progress.clamp(0.0, 1.0) as f32
    }

    /// Seek target for an indicator offset, rounded to whole seconds. A zero
    /// usable width or duration degenerates to 0.
    pub fn seconds_for_x(&self, x: f32, duration_secs: f64) -> f64 {
        if self.width() <= 0.0 || duration_secs <= 0.0 {
            return 0.0;
        }
        let fraction = ((self.clamp(x) - self.left) / self.width()) as f64;
        (fraction * duration_secs).round()
    }
}

/// The one piece of UI-owned mutable state the popup carries: whether a drag
/// is in progress and where the indicator currently sits.
#[derive(Debug, Default)]
pub struct ScrubState {
    dragging: bool,
    /// Absolute x of the indicator while dragging. Meaningless otherwise;
    /// rendering falls back to the snapshot-derived position.
    drag_x: f32,
}

impl ScrubState {
    pub fn dragging(&self) -> bool {
        self.dragging
    }

    pub fn drag_x(&self) -> f32 {
        self.drag_x
    }

    /// Pointer pressed on the indicator. Only starts a drag while a session
    /// is enabled; while disabled the scrubber is inert.
    pub fn pointer_down(&mut self, enabled: bool, start_x: f32) {
        if enabled {
            self.dragging = true;
            self.drag_x = start_x;
        }
    }

    /// Pointer moved. Tracks the clamped x purely visually; no command is
    /// sent until release.
    pub fn pointer_move(&mut self, span: ScrubSpan, x: f32) {
        if self.dragging {
            self.drag_x = span.clamp(x);
        }
    }

    /// Pointer released anywhere. Returns the committed seek target in whole
    /// seconds if a drag was in progress, and clears `dragging`
    /// unconditionally so a missed down/up pairing cannot wedge the state.
    pub fn pointer_up(&mut self, span: ScrubSpan, duration_secs: f64) -> Option<f64> {
        let was_dragging = self.dragging;
        self.dragging = false;
        if !was_dragging {
            return None;
        }
        Some(span.seconds_for_x(self.drag_x, duration_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> ScrubSpan {
        // 100 px bar at x = 10 → usable [12, 104].
        ScrubSpan::from_bar(10.0, 100.0)
    }

    #[test]
    fn span_applies_insets() {
        let span = span();
        assert_eq!(span.left(), 12.0);
        assert_eq!(span.width(), 92.0);
    }

    #[test]
    fn progress_offset_is_monotone_and_rests_at_zero() {
        let span = span();
        assert_eq!(span.x_for_progress(0.0), span.left());
        let mut last = f32::MIN;
        for step in 0..=20 {
            let x = span.x_for_progress(step as f64 / 20.0);
            assert!(x >= last);
            last = x;
        }
        assert_eq!(span.x_for_progress(1.5), span.x_for_progress(1.0));
    }

    #[test]
    fn seconds_round_to_whole_units() {
        let span = span();
        assert_eq!(span.seconds_for_x(span.left(), 200.0), 0.0);
        assert_eq!(span.seconds_for_x(span.left() + 46.0, 200.0), 100.0);
        // 30.5/92 * 200 = 66.30... → 66
        assert_eq!(span.seconds_for_x(span.left() + 30.5, 200.0), 66.0);
        // Out-of-span x clamps before converting.
        assert_eq!(span.seconds_for_x(1000.0, 200.0), 200.0);
        assert_eq!(span.seconds_for_x(span.left() + 46.0, 0.0), 0.0);
    }

    #[test]
    fn drag_commits_exactly_one_target() {
        let span = span();
        let mut scrub = ScrubState::default();

        scrub.pointer_down(true, span.left());
        assert!(scrub.dragging());
        scrub.pointer_move(span, span.left() + 23.0);
        scrub.pointer_move(span, span.left() + 46.0);
        assert_eq!(scrub.pointer_up(span, 200.0), Some(100.0));
        assert!(!scrub.dragging());
        // Release with no drag in progress sends nothing.
        assert_eq!(scrub.pointer_up(span, 200.0), None);
    }

    #[test]
    fn drag_clamps_to_span() {
        let span = span();
        let mut scrub = ScrubState::default();
        scrub.pointer_down(true, span.left());
        scrub.pointer_move(span, -500.0);
        assert_eq!(scrub.drag_x(), span.left());
        scrub.pointer_move(span, 5000.0);
        assert_eq!(scrub.pointer_up(span, 90.0), Some(90.0));
    }

    #[test]
    fn disabled_popup_never_starts_a_drag() {
        let span = span();
        let mut scrub = ScrubState::default();
        scrub.pointer_down(false, span.left() + 10.0);
        assert!(!scrub.dragging());
        scrub.pointer_move(span, span.left() + 50.0);
        assert_eq!(scrub.pointer_up(span, 200.0), None);
    }
}
