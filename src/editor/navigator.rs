use tracing::debug;

use super::{Editor, SurfaceId};
use crate::error::{Error, Result};

impl Editor {
    /// Enter the mode at `level` of the surface's tower. Out-of-range levels
    /// clamp to the nearest end of the tower.
    pub fn enter_level(&mut self, surface: SurfaceId, level: isize) -> Result<()> {
        let (index, mode) = {
            let tower = self.surface(surface)?.tower();
            (tower.clamp_level(level), tower.mode_at(level).to_string())
        };

        self.enter_mode(surface, &mode)?;

        // A queued entry, or a hook that moved on, owns the counter instead
        let s = self.surface_mut(surface)?;
        if s.active_mode() == Some(mode.as_str()) {
            s.level = index;
        }
        Ok(())
    }

    pub fn enter_lower_level(&mut self, surface: SurfaceId) -> Result<()> {
        match self.surface(surface)?.active_level() {
            Some(0) => Ok(()),
            Some(level) => self.enter_level(surface, level as isize - 1),
            None => self.enter_appropriate_mode(surface),
        }
    }

    pub fn enter_higher_level(&mut self, surface: SurfaceId) -> Result<()> {
        let s = self.surface(surface)?;
        let top = s.tower().height() - 1;
        match s.active_level() {
            Some(level) if level == top => Ok(()),
            Some(level) => self.enter_level(surface, level as isize + 1),
            None => self.enter_appropriate_mode(surface),
        }
    }

    pub fn enter_lowest_level(&mut self, surface: SurfaceId) -> Result<()> {
        self.enter_level(surface, 0)
    }

    pub fn enter_highest_level(&mut self, surface: SurfaceId) -> Result<()> {
        let top = self.surface(surface)?.tower().height() as isize - 1;
        self.enter_level(surface, top)
    }

    /// Settle the surface into its tower: re-enter the active mode if it is a
    /// member, else the recalled mode, else the tower's default.
    pub fn enter_appropriate_mode(&mut self, surface: SurfaceId) -> Result<()> {
        let (active, recalled, fallback) = {
            let s = self.surface(surface)?;
            let tower = s.tower();
            (
                s.active_mode().filter(|m| tower.contains(m)).map(str::to_string),
                s.recall.peek().map(str::to_string),
                tower.fallback().to_string(),
            )
        };

        if let Some(active) = active {
            return self.enter_mode(surface, &active);
        }

        if let Some(recalled) = recalled {
            // Check first so a bad name leaves the cell armed
            if !self.registry.contains(&recalled) {
                return Err(Error::ModeNotFound(recalled));
            }
            self.surface_mut(surface)?.recall.consume();
            debug!(surface = %surface, mode = %recalled, "recalling mode");
            return self.enter_mode(surface, &recalled);
        }

        self.enter_mode(surface, &fallback)
    }

    /// Point the level counter at the active mode if it is in the tower
    pub fn reconcile_level(&mut self, surface: SurfaceId) -> Result<()> {
        let s = self.surface_mut(surface)?;
        if let Some(level) = s.active_level() {
            s.level = level;
        }
        Ok(())
    }

    pub fn active_mode(&self, surface: SurfaceId) -> Result<Option<&str>> {
        Ok(self.surface(surface)?.active_mode())
    }

    pub fn level(&self, surface: SurfaceId) -> Result<usize> {
        Ok(self.surface(surface)?.level())
    }

    /// Govern the surface with another tower of its complex. The recall cell is
    /// cleared since it named a mode of the old tower.
    pub fn switch_tower(&mut self, surface: SurfaceId, tower: &str) -> Result<()> {
        let complex = self
            .surface(surface)?
            .complex
            .clone()
            .ok_or(Error::NoComplex(surface))?;
        let tower = self
            .complex(&complex)
            .ok_or_else(|| Error::ComplexNotFound(complex.clone()))?
            .require(tower)?
            .clone();

        debug!(surface = %surface, tower = tower.name(), "switching tower");
        let s = self.surface_mut(surface)?;
        s.set_tower(tower);
        s.recall.clear();
        self.enter_appropriate_mode(surface)
    }

    /// Switch to the tower after the current one in the surface's complex
    pub fn cycle_tower(&mut self, surface: SurfaceId) -> Result<()> {
        let s = self.surface(surface)?;
        let complex = s.complex.clone().ok_or(Error::NoComplex(surface))?;
        let next = self
            .complex(&complex)
            .ok_or_else(|| Error::ComplexNotFound(complex.clone()))?
            .next_after(s.tower().name())
            .map(|t| t.name().to_string());

        match next {
            Some(next) => self.switch_tower(surface, &next),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::tests::{editor_with_tower, enter};

    fn state(editor: &Editor, surface: SurfaceId) -> (Option<String>, usize) {
        let s = editor.surface(surface).unwrap();
        (s.active_mode().map(str::to_string), s.level())
    }

    fn at(mode: &str, level: usize) -> (Option<String>, usize) {
        (Some(mode.to_string()), level)
    }

    #[test]
    fn test_tower_walk() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "word");
        assert_eq!(state(&editor, s), at("word", 1));

        editor.enter_higher_level(s).unwrap();
        assert_eq!(state(&editor, s), at("tree", 2));

        // Already at the top
        editor.enter_higher_level(s).unwrap();
        assert_eq!(state(&editor, s), at("tree", 2));

        editor.enter_lowest_level(s).unwrap();
        assert_eq!(state(&editor, s), at("char", 0));

        // Already at the bottom
        editor.enter_lower_level(s).unwrap();
        assert_eq!(state(&editor, s), at("char", 0));

        editor.enter_highest_level(s).unwrap();
        assert_eq!(state(&editor, s), at("tree", 2));

        editor.enter_lower_level(s).unwrap();
        assert_eq!(state(&editor, s), at("word", 1));
    }

    #[test]
    fn test_enter_level_clamps() {
        for (requested, expected) in [(-10, at("char", 0)), (-1, at("char", 0)), (3, at("tree", 2)), (400, at("tree", 2))] {
            let (mut editor, s) = editor_with_tower();
            enter(&mut editor, s, "word");
            editor.enter_level(s, requested).unwrap();
            assert_eq!(state(&editor, s), expected, "requested level {}", requested);
        }
    }

    #[test]
    fn test_lower_from_outside_tower_uses_default() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "insert");

        editor.enter_lower_level(s).unwrap();
        assert_eq!(state(&editor, s).0.as_deref(), Some("word"));
        assert_eq!(editor.level(s).unwrap(), 1);
    }

    #[test]
    fn test_higher_from_outside_tower_uses_recall() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "tree");
        enter(&mut editor, s, "insert");

        editor.enter_higher_level(s).unwrap();
        assert_eq!(state(&editor, s), at("tree", 2));
        assert_eq!(editor.recall(s).unwrap(), None);
    }

    #[test]
    fn test_appropriate_mode_priority() {
        let (mut editor, s) = editor_with_tower();

        // Fresh surface: default
        editor.enter_appropriate_mode(s).unwrap();
        assert_eq!(state(&editor, s), at("word", 1));

        // Active member: stays put
        enter(&mut editor, s, "char");
        editor.surface_mut(s).unwrap().recall.set("tree");
        editor.enter_appropriate_mode(s).unwrap();
        assert_eq!(state(&editor, s), at("char", 0));
        assert_eq!(editor.recall(s).unwrap(), Some("tree"));

        // Outside the tower with recall set: recall wins over the default
        enter(&mut editor, s, "insert");
        assert_eq!(editor.recall(s).unwrap(), Some("char"));
        editor.surface_mut(s).unwrap().recall.set("tree");
        editor.enter_appropriate_mode(s).unwrap();
        assert_eq!(state(&editor, s), at("tree", 2));
        assert_eq!(editor.recall(s).unwrap(), None);
    }

    #[test]
    fn test_appropriate_mode_keeps_recall_on_unknown_mode() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "insert");
        editor.surface_mut(s).unwrap().recall.set("ghost");

        assert_eq!(
            editor.enter_appropriate_mode(s),
            Err(Error::ModeNotFound("ghost".to_string()))
        );
        assert_eq!(editor.recall(s).unwrap(), Some("ghost"));
        assert_eq!(editor.active_mode(s).unwrap(), Some("insert"));
    }

    #[test]
    fn test_reconcile_leaves_counter_outside_tower() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "tree");
        enter(&mut editor, s, "insert");
        assert_eq!(editor.level(s).unwrap(), 2);
    }

    #[test]
    fn test_switch_and_cycle_tower() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "word");
        enter(&mut editor, s, "insert");

        editor.cycle_tower(s).unwrap();
        let surface = editor.surface(s).unwrap();
        assert_eq!(surface.tower().name(), "lisp");
        // "lisp" has no default, so the bottom level is used
        assert_eq!(surface.active_mode(), Some("char"));
        assert_eq!(surface.recall.peek(), None);

        editor.cycle_tower(s).unwrap();
        assert_eq!(editor.surface(s).unwrap().tower().name(), "editing");
        // "char" is still a member, so it stays active
        assert_eq!(state(&editor, s), at("char", 0));

        assert!(matches!(
            editor.switch_tower(s, "missing"),
            Err(Error::InvalidTower(_))
        ));
    }

    #[test]
    fn test_switch_tower_needs_complex() {
        let (mut editor, _) = editor_with_tower();
        let loose = editor.open_surface("loose", crate::editor::tests::tower());
        assert_eq!(editor.cycle_tower(loose), Err(Error::NoComplex(loose)));
    }
}
