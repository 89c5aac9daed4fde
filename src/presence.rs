//! Background rich-presence controller.
//!
//! The popup never touches session internals; it talks to a
//! [`BackgroundController`] through a narrow command/query surface and
//! receives pushed snapshots over an [`UpdateChannel`]. [`SessionController`]
//! is the in-process implementation: it owns the tracked session, runs its
//! playback clock on a worker thread, and fans snapshots out to every
//! attached channel.

use std::{
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use crate::{config::SessionSeed, media::MediaSnapshot};

/// Command/query surface the popup depends on. All failure collapses to
/// "no media" (`None`); none of these return errors.
pub trait BackgroundController {
    fn is_enabled(&self) -> bool;
    /// Turns rich presence on for the tracked session. Returns the first
    /// snapshot, or `None` when there is no session to track (the caller
    /// must then stay disabled).
    fn enable(&mut self) -> Option<MediaSnapshot>;
    fn disable(&mut self);
    fn current_media(&self) -> Option<MediaSnapshot>;
    fn set_playing(&mut self, playing: bool);
    fn seek_by(&mut self, delta_secs: f64);
    fn seek_to(&mut self, position_secs: f64);
    fn set_looping(&mut self, looping: bool);
    /// Attaches a fresh push channel, or `None` when no session is enabled.
    fn update_channel(&mut self) -> Option<UpdateChannel>;
}

/// Receiving half of a push subscription. Messages carry
/// `Option<MediaSnapshot>`; `None` means the session ended.
pub struct UpdateChannel {
    rx: Receiver<Option<MediaSnapshot>>,
    disconnected: bool,
}

impl UpdateChannel {
    pub fn new(rx: Receiver<Option<MediaSnapshot>>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// Drains at most one pending message without blocking.
    pub fn try_next(&mut self) -> Option<Option<MediaSnapshot>> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.disconnected = true;
                None
            }
        }
    }

    /// False once the sending side has gone away; the subscription should
    /// then be re-acquired rather than polled further.
    pub fn is_connected(&self) -> bool {
        !self.disconnected
    }
}

#[derive(Debug, Clone)]
struct TrackedSession {
    platform: String,
    title: String,
    chapter: String,
    thumbnail: String,
    position_secs: f64,
    duration_secs: f64,
    paused: bool,
    is_looping: bool,
}

impl TrackedSession {
    fn from_seed(seed: &SessionSeed) -> Self {
        Self {
            platform: seed.platform.clone(),
            title: seed.title.clone(),
            chapter: seed.chapter.clone(),
            thumbnail: seed.thumbnail.clone(),
            position_secs: 0.0,
            duration_secs: seed.duration_secs.max(0.0),
            paused: seed.start_paused,
            is_looping: false,
        }
    }

    /// Advances the playback clock. At end of track a looping session wraps
    /// to the start; otherwise it clamps at the duration and pauses.
    fn advance(&mut self, elapsed_secs: f64) {
        if self.paused || elapsed_secs <= 0.0 {
            return;
        }
        self.position_secs += elapsed_secs;
        if self.position_secs >= self.duration_secs {
            if self.is_looping && self.duration_secs > 0.0 {
                self.position_secs %= self.duration_secs;
            } else {
                self.position_secs = self.duration_secs;
                self.paused = true;
            }
        }
    }

    fn seek_to(&mut self, position_secs: f64) {
        self.position_secs = position_secs.clamp(0.0, self.duration_secs);
    }

    fn snapshot(&self) -> MediaSnapshot {
        MediaSnapshot {
            platform: self.platform.clone(),
            title: self.title.clone(),
            chapter: self.chapter.clone(),
            thumbnail: self.thumbnail.clone(),
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            paused: self.paused,
            is_looping: self.is_looping,
        }
    }
}

struct SessionState {
    session: Option<TrackedSession>,
    enabled: bool,
    subscribers: Vec<Sender<Option<MediaSnapshot>>>,
}

impl SessionState {
    fn current_media(&self) -> Option<MediaSnapshot> {
        if !self.enabled {
            return None;
        }
        self.session.as_ref().map(TrackedSession::snapshot)
    }

    /// Sends the current snapshot to every live subscriber and prunes the
    /// ones whose receiving popup has gone away.
    fn broadcast(&mut self) {
        let message = self.current_media();
        self.subscribers
            .retain(|tx| tx.send(message.clone()).is_ok());
    }

    fn with_session(&mut self, mutate: impl FnOnce(&mut TrackedSession)) {
        if !self.enabled {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            mutate(session);
        }
        self.broadcast();
    }
}

enum WorkerCommand {
    Shutdown,
}

const CLOCK_TICK: Duration = Duration::from_secs(1);

/// Worker-thread-backed controller over one tracked session. Cloning the
/// handle is not supported; the popup owns it for its whole lifetime.
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    worker_tx: Option<Sender<WorkerCommand>>,
}

impl SessionController {
    pub fn new(seed: Option<&SessionSeed>) -> Self {
        let state = Arc::new(Mutex::new(SessionState {
            session: seed.map(TrackedSession::from_seed),
            enabled: false,
            subscribers: Vec::new(),
        }));

        let (worker_tx, worker_rx) = mpsc::channel();
        let clock_state = Arc::clone(&state);
        thread::spawn(move || loop {
            match worker_rx.recv_timeout(CLOCK_TICK) {
                Ok(WorkerCommand::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let Ok(mut state) = clock_state.lock() else {
                        break;
                    };
                    if state.enabled {
                        let advanced = match state.session.as_mut() {
                            Some(session) if !session.paused => {
                                session.advance(CLOCK_TICK.as_secs_f64());
                                true
                            }
                            _ => false,
                        };
                        if advanced {
                            state.broadcast();
                        }
                    }
                }
            }
        });

        Self {
            state,
            worker_tx: Some(worker_tx),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        // A poisoned mutex here means the clock thread panicked mid-update;
        // the session data itself is still a consistent value.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl BackgroundController for SessionController {
    fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn enable(&mut self) -> Option<MediaSnapshot> {
        let mut state = self.lock();
        if state.session.is_none() {
            return None;
        }
        state.enabled = true;
        state.broadcast();
        state.current_media()
    }

    fn disable(&mut self) {
        let mut state = self.lock();
        state.enabled = false;
        state.broadcast();
    }

    fn current_media(&self) -> Option<MediaSnapshot> {
        self.lock().current_media()
    }

    fn set_playing(&mut self, playing: bool) {
        self.lock().with_session(|session| session.paused = !playing);
    }

    fn seek_by(&mut self, delta_secs: f64) {
        self.lock().with_session(|session| {
            let target = session.position_secs + delta_secs;
            session.seek_to(target);
        });
    }

    fn seek_to(&mut self, position_secs: f64) {
        self.lock().with_session(|session| session.seek_to(position_secs));
    }

    fn set_looping(&mut self, looping: bool) {
        self.lock().with_session(|session| session.is_looping = looping);
    }

    fn update_channel(&mut self) -> Option<UpdateChannel> {
        let mut state = self.lock();
        if !state.enabled {
            return None;
        }
        let (tx, rx) = mpsc::channel();
        state.subscribers.push(tx);
        Some(UpdateChannel::new(rx))
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(tx) = self.worker_tx.take() {
            let _ = tx.send(WorkerCommand::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> SessionSeed {
        SessionSeed {
            platform: "YouTube".to_owned(),
            title: "Ocean Documentary".to_owned(),
            chapter: String::new(),
            thumbnail: String::new(),
            duration_secs: 100.0,
            // Paused so the clock thread cannot move the position while a
            // test is between assertions.
            start_paused: true,
        }
    }

    #[test]
    fn enable_without_session_returns_none() {
        let mut controller = SessionController::new(None);
        assert!(controller.enable().is_none());
        assert!(!controller.is_enabled());
        assert!(controller.update_channel().is_none());
    }

    #[test]
    fn enable_reports_the_tracked_session() {
        let seed = seed();
        let mut controller = SessionController::new(Some(&seed));
        assert!(controller.current_media().is_none());

        let snap = controller.enable().expect("session is configured");
        assert_eq!(snap.platform, "YouTube");
        assert_eq!(snap.duration_secs, 100.0);
        assert!(controller.is_enabled());

        controller.disable();
        assert!(controller.current_media().is_none());
    }

    #[test]
    fn commands_are_inert_while_disabled() {
        let seed = seed();
        let mut controller = SessionController::new(Some(&seed));
        controller.seek_to(50.0);
        controller.set_playing(true);

        controller.enable();
        let snap = controller.current_media().unwrap();
        assert_eq!(snap.position_secs, 0.0);
    }

    #[test]
    fn seeks_clamp_into_the_track() {
        let seed = seed();
        let mut controller = SessionController::new(Some(&seed));
        controller.enable();

        controller.seek_to(250.0);
        assert_eq!(controller.current_media().unwrap().position_secs, 100.0);
        controller.seek_by(-30.0);
        assert_eq!(controller.current_media().unwrap().position_secs, 70.0);
        controller.seek_by(-500.0);
        assert_eq!(controller.current_media().unwrap().position_secs, 0.0);
    }

    #[test]
    fn mutations_push_to_update_channels() {
        let seed = seed();
        let mut controller = SessionController::new(Some(&seed));
        controller.enable();
        let mut channel = controller.update_channel().expect("enabled");

        controller.seek_to(40.0);
        let pushed = channel.try_next().expect("seek pushes a snapshot");
        assert_eq!(pushed.unwrap().position_secs, 40.0);

        controller.disable();
        assert_eq!(channel.try_next(), Some(None));
        assert!(channel.is_connected());
    }

    #[test]
    fn clock_wraps_when_looping_and_pauses_otherwise() {
        let mut session = TrackedSession::from_seed(&seed());
        session.paused = false;

        session.seek_to(95.0);
        session.advance(10.0);
        assert_eq!(session.position_secs, 100.0);
        assert!(session.paused);

        session.paused = false;
        session.is_looping = true;
        session.seek_to(95.0);
        session.advance(10.0);
        assert!((session.position_secs - 5.0).abs() < 1e-9);
        assert!(!session.paused);
    }

    #[test]
    fn paused_sessions_do_not_advance() {
        let mut session = TrackedSession::from_seed(&seed());
        session.paused = true;
        session.advance(30.0);
        assert_eq!(session.position_secs, 0.0);
    }
}
