use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::{Editor, SurfaceId};
use crate::error::Result;

/// Text edits that interceptors can attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    MoveLineDown,
    MoveLineUp,
    RewriteLine,
}

impl Primitive {
    pub const ALL: [Primitive; 3] = [
        Primitive::MoveLineDown,
        Primitive::MoveLineUp,
        Primitive::RewriteLine,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    Before,
    After,
}

type InterceptFn = dyn Fn(&mut Editor, SurfaceId) -> anyhow::Result<()>;

#[derive(Clone)]
pub enum InterceptAction {
    /// Reparse the surface's tower listing
    ReloadTower,
    Run(Rc<InterceptFn>),
}

impl fmt::Debug for InterceptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptAction::ReloadTower => write!(f, "ReloadTower"),
            InterceptAction::Run(_) => write!(f, "Run(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

#[derive(Debug, Clone)]
struct Interceptor {
    id: InterceptorId,
    primitive: Primitive,
    advice: Advice,
    surface: SurfaceId,
    action: InterceptAction,
}

/// Before/after actions attached to primitives on particular surfaces
#[derive(Debug, Default)]
pub struct Interceptors {
    next_id: usize,
    installed: Vec<Interceptor>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(
        &mut self,
        primitive: Primitive,
        advice: Advice,
        surface: SurfaceId,
        action: InterceptAction,
    ) -> InterceptorId {
        let id = InterceptorId(self.next_id);
        self.next_id += 1;
        self.installed.push(Interceptor {
            id,
            primitive,
            advice,
            surface,
            action,
        });
        id
    }

    pub fn remove(&mut self, id: InterceptorId) -> bool {
        let before = self.installed.len();
        self.installed.retain(|i| i.id != id);
        self.installed.len() != before
    }

    /// Actions to run for `primitive` on `surface`, in installation order
    pub fn matching(
        &self,
        primitive: Primitive,
        advice: Advice,
        surface: SurfaceId,
    ) -> Vec<InterceptAction> {
        self.installed
            .iter()
            .filter(|i| i.primitive == primitive && i.advice == advice && i.surface == surface)
            .map(|i| i.action.clone())
            .collect()
    }

    /// Drop every interceptor attached to `surface`
    pub fn remove_for_surface(&mut self, surface: SurfaceId) -> usize {
        let before = self.installed.len();
        self.installed.retain(|i| i.surface != surface);
        before - self.installed.len()
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

impl Editor {
    pub fn move_line_down(&mut self, surface: SurfaceId) -> Result<bool> {
        self.run_primitive(surface, Primitive::MoveLineDown, |s| {
            s.buffer.move_line_down(&mut s.cursor)
        })
    }

    pub fn move_line_up(&mut self, surface: SurfaceId) -> Result<bool> {
        self.run_primitive(surface, Primitive::MoveLineUp, |s| {
            s.buffer.move_line_up(&mut s.cursor)
        })
    }

    /// Replace the text of line `y`
    pub fn rewrite_line(&mut self, surface: SurfaceId, y: usize, text: &str) -> Result<bool> {
        self.run_primitive(surface, Primitive::RewriteLine, |s| s.buffer.set_line(y, text))
    }

    /// Run `edit` wrapped in the interceptors for `primitive`. After-actions only
    /// run when the edit changed something.
    fn run_primitive<F>(&mut self, surface: SurfaceId, primitive: Primitive, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut super::Surface) -> bool,
    {
        self.surface(surface)?;
        self.run_interceptors(surface, primitive, Advice::Before);

        let changed = edit(self.surface_mut(surface)?);
        if changed {
            self.run_interceptors(surface, primitive, Advice::After);
        }
        Ok(changed)
    }

    fn run_interceptors(&mut self, surface: SurfaceId, primitive: Primitive, advice: Advice) {
        for action in self.interceptors.matching(primitive, advice, surface) {
            let outcome = match action {
                InterceptAction::ReloadTower => self.reload(surface).map(|_| ()).map_err(Into::into),
                InterceptAction::Run(f) => f(self, surface),
            };
            if let Err(err) = outcome {
                warn!(surface = %surface, ?primitive, ?advice, error = %err, "interceptor failed");
                self.report(format!("{:?} interceptor failed: {}", primitive, err));
            }
        }
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    pub fn interceptors_mut(&mut self) -> &mut Interceptors {
        &mut self.interceptors
    }
}
