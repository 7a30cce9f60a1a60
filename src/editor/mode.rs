use std::fmt;
use std::rc::Rc;

use super::{Editor, SurfaceId};

/// Lifecycle phases a mode exposes hook lists for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the mode becomes active
    PreEntry,
    /// After the mode became active
    Entry,
    /// While leaving the mode, the mode is still active
    Exit,
    /// After the exit list ran
    PostExit,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::PreEntry, Phase::Entry, Phase::Exit, Phase::PostExit];
}

/// A single mode change on one surface, handed to every hook of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub surface: SurfaceId,
    /// Mode being left, `None` on a surface's first entry
    pub from: Option<String>,
    /// Mode being entered
    pub to: String,
}

type CallbackFn = dyn Fn(&mut Editor, &Transition) -> anyhow::Result<()>;

/// A shareable callback. Two callbacks are equal only if they share the same closure.
#[derive(Clone)]
pub struct Callback {
    label: String,
    f: Rc<CallbackFn>,
}

impl Callback {
    pub fn new<F>(label: &str, f: F) -> Self
    where
        F: Fn(&mut Editor, &Transition) -> anyhow::Result<()> + 'static,
    {
        Self {
            label: label.to_string(),
            f: Rc::new(f),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, editor: &mut Editor, transition: &Transition) -> anyhow::Result<()> {
        (self.f)(editor, transition)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({})", self.label)
    }
}

/// An entry in one of a mode's hook lists.
///
/// Everything but `Custom` is a binding the registry installs itself, and the
/// variants carry enough data to compare them by value.
#[derive(Debug, Clone, PartialEq)]
pub enum Hook {
    /// Run the named mode's enable callback and mark its behavior enabled
    EnableBehavior(String),
    /// Run the named mode's callback slot for the phase
    Lifecycle(String, Phase),
    /// Sync the surface's level counter with its active mode
    ReconcileLevel,
    /// Disable every enabled behavior except the incoming mode's
    DisableOtherBehaviors,
    /// Arm the recall cell when leaving the tower
    RememberForRecall,
    Custom(Callback),
}

impl Hook {
    /// Whether the registry installed this hook while wiring `mode`
    pub fn is_binding_for(&self, mode: &str) -> bool {
        match self {
            Hook::EnableBehavior(name) | Hook::Lifecycle(name, _) => name == mode,
            Hook::ReconcileLevel | Hook::DisableOtherBehaviors | Hook::RememberForRecall => true,
            Hook::Custom(_) => false,
        }
    }
}

/// The four ordered hook lists of a mode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookSet {
    pub pre_entry: Vec<Hook>,
    pub entry: Vec<Hook>,
    pub exit: Vec<Hook>,
    pub post_exit: Vec<Hook>,
}

impl HookSet {
    pub fn list(&self, phase: Phase) -> &[Hook] {
        match phase {
            Phase::PreEntry => &self.pre_entry,
            Phase::Entry => &self.entry,
            Phase::Exit => &self.exit,
            Phase::PostExit => &self.post_exit,
        }
    }

    fn list_mut(&mut self, phase: Phase) -> &mut Vec<Hook> {
        match phase {
            Phase::PreEntry => &mut self.pre_entry,
            Phase::Entry => &mut self.entry,
            Phase::Exit => &mut self.exit,
            Phase::PostExit => &mut self.post_exit,
        }
    }

    /// Append `hook` unless an equal hook is already in the list.
    /// Returns whether the hook was added.
    pub fn add(&mut self, phase: Phase, hook: Hook) -> bool {
        let list = self.list_mut(phase);
        if list.contains(&hook) {
            return false;
        }
        list.push(hook);
        true
    }

    pub fn remove(&mut self, phase: Phase, hook: &Hook) -> bool {
        let list = self.list_mut(phase);
        let before = list.len();
        list.retain(|h| h != hook);
        list.len() != before
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Hook) -> bool,
    {
        for phase in Phase::ALL {
            self.list_mut(phase).retain(|h| keep(h));
        }
    }

    pub fn len(&self) -> usize {
        Phase::ALL.iter().map(|p| self.list(*p).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Optional per-mode callbacks looked up by phase.
#[derive(Debug, Clone, Default)]
pub struct ModeCallbacks {
    pub entry: Option<Callback>,
    pub exit: Option<Callback>,
    pub post_exit: Option<Callback>,
}

impl ModeCallbacks {
    pub fn get(&self, phase: Phase) -> Option<&Callback> {
        match phase {
            Phase::PreEntry => None,
            Phase::Entry => self.entry.as_ref(),
            Phase::Exit => self.exit.as_ref(),
            Phase::PostExit => self.post_exit.as_ref(),
        }
    }
}

/// A named editing state
#[derive(Debug, Clone)]
pub struct Mode {
    name: String,
    pub hooks: HookSet,
    /// Turns the mode's editing behavior on
    pub enable: Option<Callback>,
    /// Turns the mode's editing behavior off
    pub disable: Option<Callback>,
    pub callbacks: ModeCallbacks,
}

impl Mode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hooks: HookSet::default(),
            enable: None,
            disable: None,
            callbacks: ModeCallbacks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_behavior(mut self, enable: Callback, disable: Callback) -> Self {
        self.enable = Some(enable);
        self.disable = Some(disable);
        self
    }

    /// Fill the callback slot for `phase`. Pre-entry has no slot; use a hook.
    pub fn on(mut self, phase: Phase, callback: Callback) -> Self {
        match phase {
            Phase::PreEntry => {
                self.hooks.add(phase, Hook::Custom(callback));
            }
            Phase::Entry => self.callbacks.entry = Some(callback),
            Phase::Exit => self.callbacks.exit = Some(callback),
            Phase::PostExit => self.callbacks.post_exit = Some(callback),
        }
        self
    }

    pub fn with_hook(mut self, phase: Phase, callback: Callback) -> Self {
        self.hooks.add(phase, Hook::Custom(callback));
        self
    }
}
