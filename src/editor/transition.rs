use std::collections::VecDeque;

use tracing::{debug, warn};

use super::mode::{Hook, Phase, Transition};
use super::{Editor, SurfaceId};
use crate::error::{Error, Result};

/// Upper bound on entries queued by hooks while one chain drains. A hook that
/// keeps requesting entries past this is cut off.
const MAX_CHAINED_TRANSITIONS: usize = 256;

/// Mode entries requested while a hook chain was running
#[derive(Debug, Default)]
pub(super) struct TransitionQueue {
    running: bool,
    pending: VecDeque<(SurfaceId, String)>,
}

impl Editor {
    /// Make `mode` the active mode of `surface`, running the exit chain of the
    /// mode being left and the entry chain of `mode`.
    ///
    /// Unknown modes and surfaces fail before anything changes. Called from
    /// inside a hook, the entry is queued and runs once the current chain is done.
    pub fn enter_mode(&mut self, surface: SurfaceId, mode: &str) -> Result<()> {
        if !self.registry.contains(mode) {
            return Err(Error::ModeNotFound(mode.to_string()));
        }
        self.surface(surface)?;

        if self.transitions.running {
            debug!(surface = %surface, mode, "queued mode entry");
            self.transitions
                .pending
                .push_back((surface, mode.to_string()));
            return Ok(());
        }

        self.transitions.running = true;
        self.run_transition(surface, mode.to_string());

        let mut chained = 0;
        while let Some((surface, mode)) = self.transitions.pending.pop_front() {
            chained += 1;
            if chained > MAX_CHAINED_TRANSITIONS {
                let dropped = self.transitions.pending.len() + 1;
                warn!(dropped, "too many chained mode entries");
                self.transitions.pending.clear();
                self.report(format!(
                    "Too many chained mode entries, dropped {}",
                    dropped
                ));
                break;
            }
            // The surface or mode may have gone away while the entry waited
            if !self.surfaces.contains_key(&surface) || !self.registry.contains(&mode) {
                warn!(surface = %surface, mode = %mode, "dropping stale queued mode entry");
                continue;
            }
            self.run_transition(surface, mode);
        }

        self.transitions.running = false;
        Ok(())
    }

    /// Whether a hook chain is currently running
    pub fn in_transition(&self) -> bool {
        self.transitions.running
    }

    fn run_transition(&mut self, surface: SurfaceId, to: String) {
        let from = self
            .surfaces
            .get(&surface)
            .and_then(|s| s.active.clone());
        let transition = Transition {
            surface,
            from: from.clone(),
            to: to.clone(),
        };
        debug!(surface = %surface, from = ?from, to = %to, "mode transition");

        // Re-entering the active mode only reruns its entry side
        if let Some(from) = from.as_deref().filter(|f| *f != to) {
            self.run_hooks(from, Phase::Exit, &transition);
            self.run_hooks(from, Phase::PostExit, &transition);
        }

        self.run_hooks(&to, Phase::PreEntry, &transition);
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.active = Some(to.clone());
        }
        self.run_hooks(&to, Phase::Entry, &transition);
    }

    fn run_hooks(&mut self, mode: &str, phase: Phase, transition: &Transition) {
        let hooks = match self.registry.get(mode) {
            Some(m) => m.hooks.list(phase).to_vec(),
            None => return,
        };

        for hook in hooks {
            if let Err(err) = self.run_hook(&hook, transition) {
                warn!(mode, ?phase, ?hook, error = %err, "hook failed");
                self.report(format!("{} hook of {} failed: {:#}", phase_label(phase), mode, err));
            }
        }
    }

    fn run_hook(&mut self, hook: &Hook, transition: &Transition) -> anyhow::Result<()> {
        match hook {
            Hook::EnableBehavior(mode) => self.enable_behavior(mode, transition),
            Hook::Lifecycle(mode, phase) => {
                let callback = self
                    .registry
                    .get(mode)
                    .and_then(|m| m.callbacks.get(*phase))
                    .cloned();
                match callback {
                    Some(callback) => callback.call(self, transition),
                    None => Ok(()),
                }
            }
            Hook::ReconcileLevel => {
                self.reconcile_level(transition.surface)?;
                Ok(())
            }
            Hook::DisableOtherBehaviors => self.disable_other_behaviors(transition),
            Hook::RememberForRecall => {
                self.remember_for_recall(transition);
                Ok(())
            }
            Hook::Custom(callback) => callback.call(self, transition),
        }
    }

    fn enable_behavior(&mut self, mode: &str, transition: &Transition) -> anyhow::Result<()> {
        let enable = self.registry.get(mode).and_then(|m| m.enable.clone());
        if let Some(enable) = enable {
            enable.call(self, transition)?;
        }
        if let Some(s) = self.surfaces.get_mut(&transition.surface) {
            s.behaviors.insert(mode.to_string());
        }
        Ok(())
    }

    /// Turn off every enabled behavior on the surface except the incoming mode's
    fn disable_other_behaviors(&mut self, transition: &Transition) -> anyhow::Result<()> {
        let others: Vec<String> = match self.surfaces.get(&transition.surface) {
            Some(s) => s
                .behaviors
                .iter()
                .filter(|m| **m != transition.to)
                .cloned()
                .collect(),
            None => return Ok(()),
        };

        let mut failure = None;
        for mode in others {
            if let Some(s) = self.surfaces.get_mut(&transition.surface) {
                s.behaviors.remove(&mode);
            }
            let disable = self.registry.get(&mode).and_then(|m| m.disable.clone());
            if let Some(disable) = disable {
                if let Err(err) = disable.call(self, transition) {
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::PreEntry => "pre-entry",
        Phase::Entry => "entry",
        Phase::Exit => "exit",
        Phase::PostExit => "post-exit",
    }
}
