use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::editor::{Callback, Complex, MetaSettings, Mode, Phase, Registry, Tower};
use crate::error::TowerError;

mod key_bindings;
pub use key_bindings::{KeyBinding, KeyBindings};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_modes")]
    pub modes: Vec<ModeConfig>,
    #[serde(default = "default_towers")]
    pub towers: Vec<TowerConfig>,
    /// Name of the complex the configured towers are collected in
    #[serde(default = "default_complex_name")]
    pub complex_name: String,
    /// Tower governing a newly opened surface
    #[serde(default = "default_initial_tower")]
    pub initial_tower: String,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub key_bindings: KeyBindings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeConfig {
    pub name: String,
    /// Track the mode as an editing behavior that is switched off when another takes over
    #[serde(default)]
    pub behavior: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TowerConfig {
    pub name: String,
    /// Bottom level first
    pub levels: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaConfig {
    /// Tower governing tower views; unset means the edited surface's own tower
    #[serde(default)]
    pub view_tower: Option<String>,
    /// Mode the edited surface is parked in during a meta session
    #[serde(default)]
    pub ground_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_cursor_line")]
    pub cursor_line: String,
    #[serde(default = "default_status_line_bg")]
    pub status_line_bg: String,
    #[serde(default = "default_status_line_fg")]
    pub status_line_fg: String,
    #[serde(default = "default_tower_view_border")]
    pub tower_view_border: String,
}

fn mode(name: &str, behavior: bool) -> ModeConfig {
    ModeConfig {
        name: name.to_string(),
        behavior,
    }
}

fn tower(name: &str, levels: &[&str], default: Option<&str>) -> TowerConfig {
    TowerConfig {
        name: name.to_string(),
        levels: levels.iter().map(|l| l.to_string()).collect(),
        default: default.map(str::to_string),
    }
}

fn default_modes() -> Vec<ModeConfig> {
    vec![
        mode("char", true),
        mode("word", true),
        mode("line", true),
        mode("insert", false),
        mode("meta", false),
    ]
}

fn default_towers() -> Vec<TowerConfig> {
    vec![
        tower("editing", &["char", "word", "line"], Some("word")),
        tower("reflection", &["char", "line"], Some("line")),
    ]
}

fn default_complex_name() -> String { "default".to_string() }
fn default_initial_tower() -> String { "editing".to_string() }

fn default_cursor_line() -> String { "#3e4451".to_string() }
fn default_status_line_bg() -> String { "#4b5263".to_string() }
fn default_status_line_fg() -> String { "#abb2bf".to_string() }
fn default_tower_view_border() -> String { "#e5c07b".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            towers: default_towers(),
            complex_name: default_complex_name(),
            initial_tower: default_initial_tower(),
            meta: MetaConfig::default(),
            theme: Theme::default(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            view_tower: None,
            ground_mode: Some("meta".to_string()),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            cursor_line: default_cursor_line(),
            status_line_bg: default_status_line_bg(),
            status_line_fg: default_status_line_fg(),
            tower_view_border: default_tower_view_border(),
        }
    }
}

impl Config {
    /// Load `config.toml` from the user config directory, writing the defaults
    /// there on first run.
    pub fn load() -> Result<Self> {
        let config_path = get_config_dir()?.join("config.toml");

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            debug!(path = ?config_path, "wrote default config");
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_dir()?.join("config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        }

        let config_str = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(path, config_str)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Register every configured mode. Entry and behavior switches are traced.
    pub fn build_registry(&self) -> Registry {
        let mut registry = Registry::new();
        for config in &self.modes {
            let name = config.name.clone();
            let mut mode = Mode::new(&config.name).on(
                Phase::Entry,
                Callback::new("trace entry", move |_, t| {
                    debug!(surface = %t.surface, mode = %name, "entered mode");
                    Ok(())
                }),
            );

            if config.behavior {
                let (on, off) = (config.name.clone(), config.name.clone());
                mode = mode.with_behavior(
                    Callback::new("enable", move |_, t| {
                        debug!(surface = %t.surface, mode = %on, "behavior on");
                        Ok(())
                    }),
                    Callback::new("disable", move |_, t| {
                        debug!(surface = %t.surface, mode = %off, "behavior off");
                        Ok(())
                    }),
                );
            }

            registry.register(mode);
        }
        registry
    }

    pub fn build_complex(&self) -> Result<Complex, TowerError> {
        let towers = self
            .towers
            .iter()
            .map(|t| Tower::new(&t.name, t.levels.clone(), t.default.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Complex::new(&self.complex_name, towers)
    }

    /// Resolve the meta section against the towers of `complex`
    pub fn meta_settings(&self, complex: &Complex) -> Result<MetaSettings, TowerError> {
        let view_tower = match &self.meta.view_tower {
            Some(name) => Some(complex.require(name)?.clone()),
            None => None,
        };

        Ok(MetaSettings {
            view_tower,
            ground_mode: self.meta.ground_mode.clone(),
        })
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .with_context(|| "Failed to determine config directory")?
        .join("strata");

    Ok(config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_builds() {
        let config = Config::default();
        let registry = config.build_registry();
        assert_eq!(registry.names(), vec!["char", "insert", "line", "meta", "word"]);

        let complex = config.build_complex().unwrap();
        assert_eq!(complex.name(), "default");
        let editing = complex.get("editing").unwrap();
        assert_eq!(editing.members(), ["char", "word", "line"]);
        assert_eq!(editing.default(), Some("word"));

        let meta = config.meta_settings(&complex).unwrap();
        // Tower views mirror the edited surface's tower unless configured
        assert!(meta.view_tower.is_none());
        assert_eq!(meta.ground_mode.as_deref(), Some("meta"));
    }

    #[test]
    fn test_behavior_modes_get_switches() {
        let registry = Config::default().build_registry();
        let word = registry.get("word").unwrap();
        assert!(word.enable.is_some() && word.disable.is_some());
        assert!(word.callbacks.entry.is_some());

        let insert = registry.get("insert").unwrap();
        assert!(insert.enable.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.initial_tower = "reflection".to_string();
        config.meta.view_tower = None;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.initial_tower, "reflection");
        assert_eq!(loaded.meta.view_tower, None);
        assert_eq!(loaded.towers, config.towers);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            initial_tower = "lisp"

            [[towers]]
            name = "lisp"
            levels = ["char", "line"]
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.modes, default_modes());
        assert_eq!(config.towers, vec![tower("lisp", &["char", "line"], None)]);
        assert_eq!(config.complex_name, "default");
        assert_eq!(config.meta, MetaConfig::default());

        // Only the configured towers exist, and the defaults must not name others
        let (complex_name, initial_tower) = (config.complex_name.clone(), config.initial_tower.clone());
        let mut editor = crate::editor::Editor::new_with_config(config).unwrap();
        let s = editor
            .open_surface_from("scratch", &complex_name, &initial_tower)
            .unwrap();
        editor.enter_appropriate_mode(s).unwrap();
        assert_eq!(editor.surface(s).unwrap().active_mode(), Some("char"));
    }

    #[test]
    fn test_invalid_towers_are_rejected() {
        let mut config = Config::default();
        config.towers.push(tower("broken", &["char", "char"], None));
        assert!(matches!(
            config.build_complex(),
            Err(TowerError::DuplicateMember { .. })
        ));

        let mut config = Config::default();
        config.meta.view_tower = Some("missing".to_string());
        let complex = config.build_complex().unwrap();
        assert!(matches!(
            config.meta_settings(&complex),
            Err(TowerError::TowerNotFound { .. })
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "towers = 3").unwrap();
        assert!(Config::load_from(&path).is_err());
        assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
