use std::collections::HashMap;

use tracing::debug;

use super::mode::{Hook, Mode, Phase};

/// Table of every known mode, keyed by name.
///
/// Built once at startup and handed to the [`Editor`](super::Editor); surfaces
/// only read it afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    modes: HashMap<String, Mode>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            modes: HashMap::new(),
        }
    }

    /// Insert (or overwrite) `mode` and wire the registry's own bindings into
    /// its hook lists. Registering the same mode again yields the same lists.
    pub fn register(&mut self, mut mode: Mode) -> &Mode {
        wire(&mut mode);
        let name = mode.name().to_string();
        debug!(mode = %name, hooks = mode.hooks.len(), "registered mode");
        self.modes.insert(name.clone(), mode);
        &self.modes[&name]
    }

    /// Remove a mode and strip the bindings `register` installed.
    /// Unknown names are ignored.
    pub fn unregister(&mut self, name: &str) -> Option<Mode> {
        let mut mode = self.modes.remove(name)?;
        mode.hooks.retain(|hook| !hook.is_binding_for(name));
        debug!(mode = %name, "unregistered mode");
        Some(mode)
    }

    pub fn get(&self, name: &str) -> Option<&Mode> {
        self.modes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

fn wire(mode: &mut Mode) {
    let name = mode.name().to_string();

    // Exclusive activation must run before the mode's own enable step.
    mode.hooks.add(Phase::PreEntry, Hook::DisableOtherBehaviors);
    if mode.enable.is_some() {
        mode.hooks.add(Phase::PreEntry, Hook::EnableBehavior(name.clone()));
    }

    for phase in [Phase::Entry, Phase::Exit, Phase::PostExit] {
        if mode.callbacks.get(phase).is_some() {
            mode.hooks.add(phase, Hook::Lifecycle(name.clone(), phase));
        }
    }

    mode.hooks.add(Phase::Entry, Hook::ReconcileLevel);
    mode.hooks.add(Phase::Exit, Hook::RememberForRecall);
}
