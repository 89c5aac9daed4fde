/// Point-in-time record of the tracked media session, as handed out by the
/// background controller. Either every field is valid or there is no snapshot
/// at all (`Option<MediaSnapshot>` with `None` meaning "no enabled, tracked
/// media") — the popup never sees a partially filled one.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSnapshot {
    pub platform: String,
    pub title: String,
    /// Empty string when the media has no chapter.
    pub chapter: String,
    /// Thumbnail image URL. May be empty; the popup then shows no artwork.
    pub thumbnail: String,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub paused: bool,
    pub is_looping: bool,
}

impl MediaSnapshot {
    /// Title line shown in the popup: the chapter is prefixed when present.
    pub fn display_title(&self) -> String {
        if self.chapter.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.chapter, self.title)
        }
    }

    /// Played fraction in `[0, 1]`. A zero or unavailable duration maps to
    /// the rest position rather than NaN.
    pub fn progress(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

pub fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_owned();
    }
    let total_seconds = seconds.max(0.0).floor() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
