use tracing::{debug, info, warn};

use super::interceptor::{Advice, InterceptAction, InterceptorId, Primitive};
use super::tower::{parse_line, LineEntry, Tower};
use super::{Buffer, Cursor, Editor, SurfaceId};
use crate::error::{Error, ParseError, Result};

/// How meta sessions are set up
#[derive(Debug, Clone, Default)]
pub struct MetaSettings {
    /// Tower governing the tower view itself; `None` mirrors the origin's tower
    pub view_tower: Option<Tower>,
    /// Mode the origin is parked in while its tower is being edited
    pub ground_mode: Option<String>,
}

/// State of an open meta session
#[derive(Debug, Clone)]
pub struct MetaSession {
    pub origin: SurfaceId,
    pub view: SurfaceId,
    prior_focus: Option<SurfaceId>,
    prior_mode: Option<String>,
    parked: bool,
    interceptors: Vec<InterceptorId>,
    transient: Vec<SurfaceId>,
}

impl MetaSession {
    /// Surfaces created for this session and destroyed when it ends
    pub fn transient(&self) -> &[SurfaceId] {
        &self.transient
    }
}

impl Editor {
    pub fn meta_session(&self) -> Option<&MetaSession> {
        self.meta.as_ref()
    }

    /// Open a tower view for the focused surface and move focus to it.
    ///
    /// Line moves and rewrites in the view reparse the listing into the
    /// origin's live tower until [`Editor::exit_meta`].
    pub fn enter_meta(&mut self) -> Result<SurfaceId> {
        if self.meta.is_some() {
            return Err(Error::MetaSessionActive);
        }
        let origin = self.focused()?;

        let (name, tower, level, prior_mode) = {
            let s = self.surface(origin)?;
            (
                s.name.clone(),
                s.tower().clone(),
                s.level(),
                s.active_mode().map(str::to_string),
            )
        };
        let view_tower = self
            .meta_settings
            .view_tower
            .clone()
            .unwrap_or_else(|| tower.clone());
        let ground_mode = self.meta_settings.ground_mode.clone();

        // Fail before touching anything if a mode we need is missing
        for mode in ground_mode.iter().map(String::as_str).chain([view_tower.fallback()]) {
            if !self.registry.contains(mode) {
                return Err(Error::ModeNotFound(mode.to_string()));
            }
        }

        self.ground = Some(origin);
        if let Some(mode) = &ground_mode {
            self.enter_mode(origin, mode)?;
        }

        let view = self.open_surface(&format!("*tower:{}*", name), view_tower);
        {
            let v = self.surface_mut(view)?;
            v.buffer = Buffer::from_lines(tower.lines());
            v.cursor = Cursor::at_line(level);
            v.represents = Some(origin);
        }

        let interceptors = Primitive::ALL
            .iter()
            .map(|primitive| {
                self.interceptors
                    .install(*primitive, Advice::After, view, InterceptAction::ReloadTower)
            })
            .collect();

        let prior_focus = self.focus;
        self.focus = Some(view);
        self.meta = Some(MetaSession {
            origin,
            view,
            prior_focus,
            prior_mode,
            parked: ground_mode.is_some(),
            interceptors,
            transient: vec![view],
        });
        info!(origin = %origin, view = %view, tower = tower.name(), "entered meta session");

        self.enter_appropriate_mode(view)?;
        Ok(view)
    }

    /// Close the meta session: restore the origin's mode, drop the interceptors,
    /// destroy the session's views if the origin is still the ground, refocus.
    pub fn exit_meta(&mut self) -> Result<()> {
        let session = self.meta.take().ok_or(Error::NoMetaSession)?;
        let origin_alive = self.surfaces.contains_key(&session.origin);

        let restored = if origin_alive && session.parked {
            self.unpark(session.origin, session.prior_mode.as_deref())
        } else {
            Ok(())
        };

        for id in &session.interceptors {
            self.interceptors.remove(*id);
        }

        if origin_alive && self.ground == Some(session.origin) {
            for view in &session.transient {
                self.close_surface(*view);
            }
        } else {
            debug!(origin = %session.origin, "ground moved, keeping session views");
        }

        self.focus = if origin_alive {
            Some(session.origin)
        } else {
            session
                .prior_focus
                .filter(|id| self.surfaces.contains_key(id))
                .or_else(|| self.surfaces.keys().next().copied())
        };

        info!(origin = %session.origin, "exited meta session");
        restored
    }

    /// Bring the origin back into its tower after a session parked it. A level
    /// picked during the session stays; otherwise the mode it was parked from,
    /// if the tower still holds it, else the tower default.
    fn unpark(&mut self, origin: SurfaceId, prior: Option<&str>) -> Result<()> {
        let (in_tower, prior_in_tower) = {
            let s = self.surface_mut(origin)?;
            // Parking armed recall with the prior mode; the session owns that entry
            if let Some(prior) = prior {
                s.recall.discard(prior);
            }
            (
                s.active_level().is_some(),
                prior.filter(|p| s.tower().contains(p)).map(str::to_string),
            )
        };

        match (in_tower, prior_in_tower) {
            (true, _) => Ok(()),
            (false, Some(prior)) => self.enter_mode(origin, &prior),
            (false, None) => self.enter_appropriate_mode(origin),
        }
    }

    /// Reparse the listing in tower view `view` into the live tower it represents.
    ///
    /// On success the tower is swapped in whole, the listing is rewritten in
    /// canonical form and the owning complex is updated. On a bad listing the
    /// live tower is untouched, the view is reset to it, and a message is shown.
    /// Returns whether the new listing was taken.
    pub fn reload(&mut self, view: SurfaceId) -> Result<bool> {
        let (target, text) = {
            let v = self.surface(view)?;
            let target = v.represents.ok_or(Error::NotATowerView(view))?;
            (target, v.buffer.text())
        };
        let current = self.surface(target)?.tower().clone();

        let parsed = Tower::parse(current.name(), &text).and_then(|tower| {
            match self.unknown_mode(&text) {
                Some(err) => Err(err),
                None => Ok(tower),
            }
        });

        match parsed {
            Ok(tower) => {
                let complex = {
                    let t = self.surface_mut(target)?;
                    t.set_tower(tower.clone());
                    if let Some(level) = t.active_level() {
                        t.level = level;
                    }
                    t.complex.clone()
                };

                let v = self.surface_mut(view)?;
                v.buffer.set_lines(tower.lines());
                v.cursor.clamp_to(&v.buffer);

                if let Some(complex) = complex {
                    if !self.update_named_member(&complex, tower.clone()) {
                        warn!(complex = %complex, tower = tower.name(), "complex does not hold reloaded tower");
                    }
                }
                info!(surface = %target, tower = tower.name(), height = tower.height(), "reloaded tower");
                Ok(true)
            }
            Err(err) => {
                let v = self.surface_mut(view)?;
                v.buffer.set_lines(current.lines());
                v.cursor.clamp_to(&v.buffer);

                warn!(surface = %target, error = %err, "tower listing rejected");
                self.report(format!("Tower not updated: {}", err));
                Ok(false)
            }
        }
    }

    /// First line of a listing naming a mode the registry does not know
    fn unknown_mode(&self, text: &str) -> Option<ParseError> {
        text.lines()
            .enumerate()
            .filter_map(|(index, raw)| parse_line(index + 1, raw).ok().map(|e| (index + 1, e.name)))
            .find(|(_, name)| !self.registry.contains(name))
            .map(|(line, name)| ParseError::UnknownMode { line, name })
    }

    /// Enter, on the origin, the mode named by the view's cursor line
    pub fn meta_select_level(&mut self) -> Result<()> {
        let (origin, entry) = self.meta_cursor_entry()?;
        self.enter_mode(origin, &entry.name)
    }

    /// Make the mode on the view's cursor line the tower default. Each line
    /// changed is a rewrite, so the tower is reloaded as it goes.
    pub fn meta_make_default(&mut self) -> Result<()> {
        let (_, entry) = self.meta_cursor_entry()?;
        if entry.is_default {
            return Ok(());
        }
        let view = self.meta.as_ref().ok_or(Error::NoMetaSession)?.view;

        let lines = self.surface(view)?.buffer.lines.clone();
        for (y, raw) in lines.iter().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            if let Ok(other) = parse_line(y + 1, raw) {
                if other.is_default {
                    self.rewrite_line(view, y, &format!("{} | {}", other.level, other.name))?;
                }
            }
        }

        let y = self.surface(view)?.cursor.y;
        self.rewrite_line(view, y, &format!("{} | [{}]", entry.level, entry.name))?;
        Ok(())
    }

    fn meta_cursor_entry(&self) -> Result<(SurfaceId, LineEntry)> {
        let session = self.meta.as_ref().ok_or(Error::NoMetaSession)?;
        let v = self.surface(session.view)?;
        let y = v.cursor.y;
        let entry = parse_line(y + 1, v.buffer.get_line(y))?;
        Ok((session.origin, entry))
    }
}
