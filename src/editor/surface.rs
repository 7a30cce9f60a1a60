use std::collections::BTreeSet;
use std::fmt;

use super::recall::RecallCell;
use super::tower::Tower;
use super::{Buffer, Cursor};

/// Stable handle to a surface owned by the [`Editor`](super::Editor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(pub usize);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An editing surface: text plus the mode state governing it.
///
/// Tower, active mode, recall cell and level counter belong to this surface
/// alone; only the owning editor's transition logic for this surface touches them.
#[derive(Debug, Clone)]
pub struct Surface {
    pub id: SurfaceId,
    pub name: String,
    pub buffer: Buffer,
    pub cursor: Cursor,
    tower: Tower,
    pub(super) active: Option<String>,
    pub(super) recall: RecallCell,
    pub(super) level: usize,
    /// Modes whose editing behavior is currently enabled here
    pub(super) behaviors: BTreeSet<String>,
    /// Complex the tower was taken from, notified when the tower is reloaded
    pub complex: Option<String>,
    /// For tower views, the surface whose tower this one lists
    pub represents: Option<SurfaceId>,
}

impl Surface {
    pub fn new(id: SurfaceId, name: &str, tower: Tower) -> Self {
        Self {
            id,
            name: name.to_string(),
            buffer: Buffer::new(),
            cursor: Cursor::new(),
            tower,
            active: None,
            recall: RecallCell::new(),
            level: 0,
            behaviors: BTreeSet::new(),
            complex: None,
            represents: None,
        }
    }

    pub fn tower(&self) -> &Tower {
        &self.tower
    }

    /// Swap in a whole new tower, keeping the level counter inside it
    pub fn set_tower(&mut self, tower: Tower) {
        self.tower = tower;
        self.level = self.level.min(self.tower.height() - 1);
    }

    pub fn active_mode(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Index of the active mode in the tower, `None` while outside it
    pub fn active_level(&self) -> Option<usize> {
        self.active.as_deref().and_then(|m| self.tower.position(m))
    }

    pub fn behaviors(&self) -> impl Iterator<Item = &str> {
        self.behaviors.iter().map(String::as_str)
    }

    pub fn is_tower_view(&self) -> bool {
        self.represents.is_some()
    }
}
