mod buffer;
mod complex;
mod cursor;
mod interceptor;
mod meta;
mod mode;
mod navigator;
mod recall;
mod registry;
mod surface;
mod tower;
mod transition;

pub use buffer::Buffer;
pub use complex::Complex;
pub use cursor::Cursor;
pub use interceptor::{Advice, InterceptAction, InterceptorId, Interceptors, Primitive};
pub use meta::{MetaSession, MetaSettings};
pub use mode::{Callback, Hook, HookSet, Mode, ModeCallbacks, Phase, Transition};
pub use recall::RecallCell;
pub use registry::Registry;
pub use surface::{Surface, SurfaceId};
pub use tower::{parse_line, LineEntry, Lines, Tower};

use std::collections::BTreeMap;

use anyhow::Context;
use crossterm::event::KeyEvent;
use tracing::{debug, info};

use crate::config::{Config, KeyBindings};
use crate::error::{Error, Result};
use transition::TransitionQueue;

/// Oldest messages are dropped past this many
const MAX_MESSAGES: usize = 100;

/// Owns the mode registry and every surface, and runs all mode transitions.
pub struct Editor {
    registry: Registry,
    surfaces: BTreeMap<SurfaceId, Surface>,
    next_surface: usize,
    focus: Option<SurfaceId>,
    ground: Option<SurfaceId>,
    complexes: BTreeMap<String, Complex>,
    interceptors: Interceptors,
    meta: Option<MetaSession>,
    pub meta_settings: MetaSettings,
    transitions: TransitionQueue,
    messages: Vec<String>,
    pub key_bindings: KeyBindings,
}

impl Editor {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            surfaces: BTreeMap::new(),
            next_surface: 0,
            focus: None,
            ground: None,
            complexes: BTreeMap::new(),
            interceptors: Interceptors::new(),
            meta: None,
            meta_settings: MetaSettings::default(),
            transitions: TransitionQueue::default(),
            messages: Vec::new(),
            key_bindings: KeyBindings::default(),
        }
    }

    /// Build an editor from configuration: registry, the complex of configured
    /// towers, meta settings and key bindings. No surface is opened yet.
    ///
    /// Every tower level and the ground mode must name a configured mode.
    pub fn new_with_config(config: Config) -> anyhow::Result<Self> {
        let registry = config.build_registry();
        let complex = config.build_complex().context("Invalid tower configuration")?;
        for tower in complex.towers() {
            if let Some(missing) = tower.members().iter().find(|m| !registry.contains(m)) {
                return Err(Error::ModeNotFound(missing.clone())).with_context(|| {
                    format!("Invalid tower configuration: tower `{}`", tower.name())
                });
            }
        }

        let meta_settings = config
            .meta_settings(&complex)
            .context("Invalid meta configuration")?;
        if let Some(ground) = meta_settings.ground_mode.as_deref() {
            if !registry.contains(ground) {
                return Err(Error::ModeNotFound(ground.to_string()))
                    .context("Invalid meta configuration: ground mode");
            }
        }

        let mut editor = Self::new(registry);
        editor.add_complex(complex);
        editor.meta_settings = meta_settings;
        editor.key_bindings = config.key_bindings;
        Ok(editor)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registration entry point; modes are otherwise read-only
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Open a surface governed by `tower`. The first surface opened takes focus.
    /// Nothing is entered yet; call [`Editor::enter_appropriate_mode`] for that.
    pub fn open_surface(&mut self, name: &str, tower: Tower) -> SurfaceId {
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(id, Surface::new(id, name, tower));
        if self.focus.is_none() {
            self.focus = Some(id);
        }
        debug!(surface = %id, name, "opened surface");
        id
    }

    /// Open a surface with a tower taken from a complex, remembering the complex
    /// so tower reloads can update it.
    pub fn open_surface_from(&mut self, name: &str, complex: &str, tower: &str) -> Result<SurfaceId> {
        let tower = self
            .complexes
            .get(complex)
            .ok_or_else(|| Error::ComplexNotFound(complex.to_string()))?
            .require(tower)?
            .clone();
        let id = self.open_surface(name, tower);
        self.surface_mut(id)?.complex = Some(complex.to_string());
        Ok(id)
    }

    pub fn close_surface(&mut self, id: SurfaceId) -> Option<Surface> {
        let surface = self.surfaces.remove(&id)?;
        self.interceptors.remove_for_surface(id);
        if self.focus == Some(id) {
            self.focus = self.surfaces.keys().next().copied();
        }
        if self.ground == Some(id) {
            self.ground = None;
        }
        debug!(surface = %id, "closed surface");
        Some(surface)
    }

    pub fn surface(&self, id: SurfaceId) -> Result<&Surface> {
        self.surfaces.get(&id).ok_or(Error::SurfaceNotFound(id))
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut Surface> {
        self.surfaces.get_mut(&id).ok_or(Error::SurfaceNotFound(id))
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.values()
    }

    pub fn focus(&self) -> Option<SurfaceId> {
        self.focus
    }

    pub fn focused(&self) -> Result<SurfaceId> {
        self.focus.ok_or(Error::NoSurface)
    }

    pub fn set_focus(&mut self, id: SurfaceId) -> Result<()> {
        self.surface(id)?;
        self.focus = Some(id);
        Ok(())
    }

    /// The surface a meta session was opened from
    pub fn ground(&self) -> Option<SurfaceId> {
        self.ground
    }

    pub fn set_ground(&mut self, id: Option<SurfaceId>) {
        self.ground = id;
    }

    pub fn add_complex(&mut self, complex: Complex) {
        self.complexes.insert(complex.name().to_string(), complex);
    }

    pub fn complex(&self, name: &str) -> Option<&Complex> {
        self.complexes.get(name)
    }

    /// Replace the tower named like `tower` inside the complex `container`
    pub fn update_named_member(&mut self, container: &str, tower: Tower) -> bool {
        match self.complexes.get_mut(container) {
            Some(complex) => complex.update_named_member(tower),
            None => false,
        }
    }

    /// Show a message to the user
    pub fn report(&mut self, message: String) {
        info!(%message, "message");
        if self.messages.len() >= MAX_MESSAGES {
            self.messages.remove(0);
        }
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        let Some(focus) = self.focus else {
            return Ok(false);
        };
        let in_view = self.surface(focus)?.is_tower_view();

        let bindings = if in_view {
            &self.key_bindings.meta
        } else {
            &self.key_bindings.normal
        };
        let command = bindings
            .iter()
            .find(|(_, binding)| binding.matches(&key))
            .map(|(command, _)| command.clone());

        match command {
            Some(command) => self.run_command(focus, &command),
            None => Ok(true),
        }
    }

    /// Run a bound command on `focus`. Returns false to quit.
    pub fn run_command(&mut self, focus: SurfaceId, command: &str) -> anyhow::Result<bool> {
        debug!(surface = %focus, command, "command");
        let outcome = match command {
            "quit" => return Ok(false),
            "enter_higher_level" => self.enter_higher_level(focus),
            "enter_lower_level" => self.enter_lower_level(focus),
            "enter_highest_level" => self.enter_highest_level(focus),
            "enter_lowest_level" => self.enter_lowest_level(focus),
            "enter_appropriate_mode" => self.enter_appropriate_mode(focus),
            "cycle_tower" => self.cycle_tower(focus),
            "enter_meta" => self.enter_meta().map(|_| ()),
            "exit_meta" => self.exit_meta(),
            "move_line_down" => self.move_line_down(focus).map(|_| ()),
            "move_line_up" => self.move_line_up(focus).map(|_| ()),
            "select_level" => self.meta_select_level(),
            "make_default" => self.meta_make_default(),
            "move_down" => {
                let surface = self.surface_mut(focus)?;
                surface.cursor.move_down(&surface.buffer);
                Ok(())
            }
            "move_up" => {
                let surface = self.surface_mut(focus)?;
                surface.cursor.move_up(&surface.buffer);
                Ok(())
            }
            other => match other.strip_prefix("enter:") {
                Some(mode) => self.enter_mode(focus, mode),
                None => {
                    self.report(format!("Unknown command: {}", other));
                    Ok(())
                }
            },
        };

        // Engine errors are shown to the user, not fatal to the session
        if let Err(err) = outcome {
            self.report(err.to_string());
        }
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TowerConfig;
    use crossterm::event::{KeyCode, KeyModifiers};

    /// Registry with the tower modes plus two modes outside it
    pub(crate) fn registry() -> Registry {
        let mut registry = Registry::new();
        for name in ["char", "word", "tree", "insert", "emacs", "line", "meta"] {
            registry.register(Mode::new(name));
        }
        registry
    }

    pub(crate) fn tower() -> Tower {
        Tower::new(
            "editing",
            vec!["char".into(), "word".into(), "tree".into()],
            Some("word".into()),
        )
        .unwrap()
    }

    /// Editor with one surface governed by char/word/tree (default word),
    /// kept in a complex named "default"
    pub(crate) fn editor_with_tower() -> (Editor, SurfaceId) {
        let mut editor = Editor::new(registry());
        let other = Tower::new("lisp", vec!["char".into(), "tree".into()], None).unwrap();
        editor.add_complex(Complex::new("default", vec![tower(), other]).unwrap());
        let id = editor.open_surface_from("scratch", "default", "editing").unwrap();
        (editor, id)
    }

    pub(crate) fn enter(editor: &mut Editor, surface: SurfaceId, mode: &str) {
        editor.enter_mode(surface, mode).unwrap();
    }

    #[test]
    fn test_open_surface_takes_focus_once() {
        let mut editor = Editor::new(registry());
        let a = editor.open_surface("a", tower());
        let b = editor.open_surface("b", tower());

        assert_ne!(a, b);
        assert_eq!(editor.focus(), Some(a));
        editor.set_focus(b).unwrap();
        assert_eq!(editor.focused().unwrap(), b);
        assert_eq!(editor.set_focus(SurfaceId(42)), Err(Error::SurfaceNotFound(SurfaceId(42))));
    }

    #[test]
    fn test_open_surface_from_unknown_complex() {
        let mut editor = Editor::new(registry());
        assert_eq!(
            editor.open_surface_from("x", "nope", "editing"),
            Err(Error::ComplexNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_close_surface_moves_focus() {
        let (mut editor, s) = editor_with_tower();
        let other = editor.open_surface("other", tower());
        editor.set_ground(Some(s));

        assert!(editor.close_surface(s).is_some());
        assert_eq!(editor.focus(), Some(other));
        assert_eq!(editor.ground(), None);
        assert!(editor.close_surface(s).is_none());
    }

    #[test]
    fn test_update_named_member() {
        let (mut editor, _) = editor_with_tower();
        let taller = Tower::new(
            "editing",
            vec!["char".into(), "word".into(), "line".into(), "tree".into()],
            None,
        )
        .unwrap();

        assert!(editor.update_named_member("default", taller.clone()));
        assert_eq!(editor.complex("default").unwrap().get("editing"), Some(&taller));
        assert!(!editor.update_named_member("missing", taller));
    }

    #[test]
    fn test_handle_key_runs_bound_command() {
        let (mut editor, s) = editor_with_tower();
        editor.enter_appropriate_mode(s).unwrap();

        let higher = KeyEvent::new(KeyCode::Char(']'), KeyModifiers::NONE);
        assert!(editor.handle_key(higher).unwrap());
        assert_eq!(editor.surface(s).unwrap().active_mode(), Some("tree"));

        let quit = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(!editor.handle_key(quit).unwrap());
    }

    #[test]
    fn test_command_errors_become_messages() {
        let (mut editor, s) = editor_with_tower();

        assert!(editor.run_command(s, "enter:nonexistent").unwrap());
        assert_eq!(editor.last_message(), Some("mode not found: nonexistent"));

        assert!(editor.run_command(s, "frobnicate").unwrap());
        assert_eq!(editor.last_message(), Some("Unknown command: frobnicate"));
    }

    #[test]
    fn test_new_with_default_config() {
        let mut editor = Editor::new_with_config(Config::default()).unwrap();
        let config = Config::default();
        let s = editor
            .open_surface_from("scratch", &config.complex_name, &config.initial_tower)
            .unwrap();
        editor.enter_appropriate_mode(s).unwrap();

        let surface = editor.surface(s).unwrap();
        assert_eq!(surface.active_mode(), surface.tower().default());
    }

    #[test]
    fn test_config_levels_must_be_registered() {
        let mut config = Config::default();
        config.towers = vec![TowerConfig {
            name: "lisp".to_string(),
            levels: vec!["char".to_string(), "sexp".to_string()],
            default: None,
        }];
        config.initial_tower = "lisp".to_string();

        let err = Editor::new_with_config(config).err().unwrap();
        let message = format!("{:#}", err);
        assert!(message.contains("tower `lisp`"));
        assert!(message.contains("mode not found: sexp"));

        let mut config = Config::default();
        config.meta.ground_mode = Some("limbo".to_string());
        let err = Editor::new_with_config(config).err().unwrap();
        assert!(format!("{:#}", err).contains("mode not found: limbo"));
    }

    #[test]
    fn test_messages_keep_the_latest() {
        let (mut editor, _) = editor_with_tower();
        for i in 0..MAX_MESSAGES + 50 {
            editor.report(format!("message {}", i));
        }

        assert_eq!(editor.messages().len(), MAX_MESSAGES);
        assert_eq!(editor.messages()[0], "message 50");
        assert_eq!(editor.last_message(), Some("message 149"));
    }
}
