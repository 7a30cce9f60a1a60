use tracing::debug;

use super::mode::Transition;
use super::{Editor, SurfaceId};
use crate::error::Result;

/// Remembers the in-tower mode a surface left for a detour outside its tower.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecallCell(Option<String>);

impl RecallCell {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn set(&mut self, mode: &str) {
        self.0 = Some(mode.to_string());
    }

    pub fn peek(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// Read and empty the cell in one step
    pub fn consume(&mut self) -> Option<String> {
        self.0.take()
    }

    /// Empty the cell only if it holds `mode`
    pub fn discard(&mut self, mode: &str) -> bool {
        if self.peek() == Some(mode) {
            self.0 = None;
            return true;
        }
        false
    }
}

impl Editor {
    /// Exit hook: arm the recall cell when `transition` leaves the tower from one
    /// of its members. Moves within the tower and moves from outside leave it alone.
    pub fn remember_for_recall(&mut self, transition: &Transition) {
        let Some(from) = transition.from.as_deref() else {
            return;
        };
        let Some(surface) = self.surfaces.get_mut(&transition.surface) else {
            return;
        };

        let tower = surface.tower();
        if tower.contains(from) && !tower.contains(&transition.to) {
            debug!(surface = %transition.surface, mode = from, next = %transition.to, "armed recall");
            surface.recall.set(from);
        }
    }

    pub fn recall(&self, surface: SurfaceId) -> Result<Option<&str>> {
        Ok(self.surface(surface)?.recall.peek())
    }

    pub fn clear_recall(&mut self, surface: SurfaceId) -> Result<()> {
        self.surface_mut(surface)?.recall.clear();
        Ok(())
    }

    pub fn consume_recall(&mut self, surface: SurfaceId) -> Result<Option<String>> {
        Ok(self.surface_mut(surface)?.recall.consume())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::tests::{editor_with_tower, enter};

    #[test]
    fn test_cell_operations() {
        let mut cell = RecallCell::new();
        assert_eq!(cell.peek(), None);

        cell.set("word");
        assert_eq!(cell.peek(), Some("word"));
        assert!(!cell.discard("char"));
        assert_eq!(cell.consume().as_deref(), Some("word"));
        // A consumed cell cannot be consumed twice
        assert_eq!(cell.consume(), None);

        cell.set("tree");
        assert!(cell.discard("tree"));
        assert_eq!(cell.peek(), None);
    }

    #[test]
    fn test_leaving_tower_arms_recall() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "tree");
        enter(&mut editor, s, "insert");

        assert_eq!(editor.recall(s).unwrap(), Some("tree"));
    }

    #[test]
    fn test_moves_inside_tower_leave_recall_alone() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "word");
        enter(&mut editor, s, "char");
        assert_eq!(editor.recall(s).unwrap(), None);

        // An earlier value survives moves within the tower
        editor.surface_mut(s).unwrap().recall.set("tree");
        enter(&mut editor, s, "word");
        assert_eq!(editor.recall(s).unwrap(), Some("tree"));
    }

    #[test]
    fn test_moves_outside_tower_leave_recall_alone() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "word");
        enter(&mut editor, s, "insert");
        enter(&mut editor, s, "emacs");

        // Still the in-tower mode, not "insert"
        assert_eq!(editor.recall(s).unwrap(), Some("word"));
    }

    #[test]
    fn test_clear_and_consume() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "word");
        enter(&mut editor, s, "insert");

        assert_eq!(editor.consume_recall(s).unwrap().as_deref(), Some("word"));
        assert_eq!(editor.consume_recall(s).unwrap(), None);

        editor.surface_mut(s).unwrap().recall.set("char");
        editor.clear_recall(s).unwrap();
        assert_eq!(editor.recall(s).unwrap(), None);
    }
}
