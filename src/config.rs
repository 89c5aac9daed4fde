use anyhow::Context;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub window: WindowConfig,
    pub session: Option<SessionSeed>,
}

impl Config {
    /// Loads the first config file found next to the working directory or
    /// the executable; absence is not an error, a broken file is.
    pub fn load() -> anyhow::Result<Self> {
        match discover_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let doc: ConfigDocument = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(doc.into())
    }
}

pub fn discover_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(current_dir) = env::current_dir() {
        candidates.push(current_dir.join("config.toml"));
        candidates.push(current_dir.join("config").join("presence_popup.toml"));
    }

    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("config.toml"));
            candidates.push(dir.join("config").join("presence_popup.toml"));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub always_on_top: bool,
    pub pixels_per_point: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            always_on_top: false,
            pixels_per_point: 1.0,
        }
    }
}

impl WindowConfig {
    pub fn pixels_per_point(&self) -> f32 {
        self.pixels_per_point.clamp(0.5, 3.0)
    }
}

/// Describes the media session the in-process controller tracks. Without a
/// seed the controller has nothing to enable and the toggle reverts.
#[derive(Debug, Clone)]
pub struct SessionSeed {
    pub platform: String,
    pub title: String,
    pub chapter: String,
    pub thumbnail: String,
    pub duration_secs: f64,
    pub start_paused: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    window: WindowSection,
    session: Option<SessionSection>,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let window = WindowConfig {
            always_on_top: value.window.always_on_top.unwrap_or(false),
            pixels_per_point: value.window.pixels_per_point.unwrap_or(1.0),
        };

        let session = value.session.map(|section| SessionSeed {
            platform: section.platform.unwrap_or_else(|| "Unknown".to_owned()),
            title: section.title.unwrap_or_default(),
            chapter: section.chapter.unwrap_or_default(),
            thumbnail: section.thumbnail.unwrap_or_default(),
            duration_secs: section.duration_secs.unwrap_or(0.0).max(0.0),
            start_paused: section.start_paused.unwrap_or(true),
        });

        Config { window, session }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WindowSection {
    always_on_top: Option<bool>,
    pixels_per_point: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionSection {
    platform: Option<String>,
    title: Option<String>,
    chapter: Option<String>,
    thumbnail: Option<String>,
    duration_secs: Option<f64>,
    start_paused: Option<bool>,
}

/// Watches the discovered config file and re-parses the `[window]` section
/// when it changes. The session seed is fixed at startup; only window
/// options reload live.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    changes_rx: Receiver<notify::Result<notify::Event>>,
}

impl ConfigWatcher {
    pub fn watch(path: PathBuf) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        let watch_root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;
        Ok(Self {
            path,
            _watcher: watcher,
            changes_rx: rx,
        })
    }

    /// Drains pending filesystem events; returns freshly parsed window
    /// options when the config file changed and still parses.
    pub fn poll(&mut self) -> Option<WindowConfig> {
        let mut relevant = false;
        while let Ok(event) = self.changes_rx.try_recv() {
            if let Ok(event) = event {
                if event.paths.iter().any(|p| p == &self.path) {
                    relevant = true;
                }
            }
        }
        if !relevant {
            return None;
        }
        Config::load_from(&self.path)
            .ok()
            .map(|config| config.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let doc: ConfigDocument = toml::from_str("").unwrap();
        let config: Config = doc.into();
        assert!(!config.window.always_on_top);
        assert_eq!(config.window.pixels_per_point(), 1.0);
        assert!(config.session.is_none());
    }

    #[test]
    fn full_document_parses() {
        let doc: ConfigDocument = toml::from_str(
            r#"
            [window]
            always_on_top = true
            pixels_per_point = 1.5

            [session]
            platform = "YouTube"
            title = "Deep Sea"
            chapter = "Part 2"
            thumbnail = "https://example.com/t.jpg"
            duration_secs = 330.0
            start_paused = false
            "#,
        )
        .unwrap();
        let config: Config = doc.into();
        assert!(config.window.always_on_top);
        assert_eq!(config.window.pixels_per_point(), 1.5);
        let seed = config.session.expect("session section present");
        assert_eq!(seed.platform, "YouTube");
        assert_eq!(seed.chapter, "Part 2");
        assert_eq!(seed.duration_secs, 330.0);
        assert!(!seed.start_paused);
    }

    #[test]
    fn negative_duration_clamps_to_zero() {
        let doc: ConfigDocument =
            toml::from_str("[session]\nduration_secs = -10.0\n").unwrap();
        let config: Config = doc.into();
        assert_eq!(config.session.unwrap().duration_secs, 0.0);
    }

    #[test]
    fn pixels_per_point_is_clamped() {
        let window = WindowConfig {
            always_on_top: false,
            pixels_per_point: 40.0,
        };
        assert_eq!(window.pixels_per_point(), 3.0);
    }
}
