use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ParseError, TowerError};

/// An ordered stack of modes, bottom (most concrete) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tower {
    name: String,
    members: Vec<String>,
    default: Option<String>,
}

impl Tower {
    pub fn new(name: &str, members: Vec<String>, default: Option<String>) -> Result<Self, TowerError> {
        let tower = Self {
            name: name.to_string(),
            members,
            default,
        };
        tower.validate()?;
        Ok(tower)
    }

    fn validate(&self) -> Result<(), TowerError> {
        if self.members.is_empty() {
            return Err(TowerError::Empty {
                tower: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for member in &self.members {
            if !is_valid_name(member) {
                return Err(TowerError::InvalidMemberName {
                    tower: self.name.clone(),
                    name: member.clone(),
                });
            }
            if !seen.insert(member.as_str()) {
                return Err(TowerError::DuplicateMember {
                    tower: self.name.clone(),
                    name: member.clone(),
                });
            }
        }

        if let Some(default) = &self.default {
            if !seen.contains(default.as_str()) {
                return Err(TowerError::UnknownDefault {
                    tower: self.name.clone(),
                    name: default.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn height(&self) -> usize {
        self.members.len()
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// The mode entered when nothing better is known: the default, else the bottom
    pub fn fallback(&self) -> &str {
        self.default().unwrap_or(&self.members[0])
    }

    pub fn position(&self, mode: &str) -> Option<usize> {
        self.members.iter().position(|m| m == mode)
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.position(mode).is_some()
    }

    /// Clamp any requested level into `0..height`
    pub fn clamp_level(&self, level: isize) -> usize {
        let top = self.height() as isize - 1;
        level.clamp(0, top) as usize
    }

    /// Mode name at `level`, clamped into the tower
    pub fn mode_at(&self, level: isize) -> &str {
        &self.members[self.clamp_level(level)]
    }

    /// Swap the member named `old` for `new`, carrying the default along.
    pub fn replace_member(&mut self, old: &str, new: &str) -> Result<(), TowerError> {
        let index = self.position(old).ok_or_else(|| TowerError::MemberNotFound {
            tower: self.name.clone(),
            name: old.to_string(),
        })?;

        let mut candidate = self.clone();
        candidate.members[index] = new.to_string();
        if candidate.default.as_deref() == Some(old) {
            candidate.default = Some(new.to_string());
        }
        candidate.validate()?;

        *self = candidate;
        Ok(())
    }

    /// One display line per level, bottom to top. Restart by calling again or cloning.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            tower: self,
            next: 0,
            width: (self.height().saturating_sub(1)).to_string().len(),
        }
    }

    pub fn serialize(&self) -> String {
        let mut text = self.lines().collect::<Vec<_>>().join("\n");
        text.push('\n');
        text
    }

    /// Read a listing produced by [`Tower::lines`].
    ///
    /// Member order comes from line order; the level markers are only checked
    /// for being numbers.
    pub fn parse(name: &str, text: &str) -> Result<Self, ParseError> {
        let mut members: Vec<String> = Vec::new();
        let mut default: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            if raw.trim().is_empty() {
                continue;
            }

            let entry = parse_line(line, raw)?;
            if members.contains(&entry.name) {
                return Err(ParseError::DuplicateName {
                    line,
                    name: entry.name,
                });
            }
            if entry.is_default {
                if let Some(previous) = &default {
                    return Err(ParseError::MultipleDefaults {
                        line,
                        name: entry.name,
                        previous: previous.clone(),
                    });
                }
                default = Some(entry.name.clone());
            }
            members.push(entry.name);
        }

        if members.is_empty() {
            return Err(ParseError::Empty);
        }

        Ok(Self {
            name: name.to_string(),
            members,
            default,
        })
    }
}

/// Lazy listing of a tower's levels
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    tower: &'a Tower,
    next: usize,
    width: usize,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let name = self.tower.members.get(self.next)?;
        let level = self.next;
        self.next += 1;

        let line = if self.tower.default.as_ref() == Some(name) {
            format!("{:>width$} | [{}]", level, name, width = self.width)
        } else {
            format!("{:>width$} | {}", level, name, width = self.width)
        };
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tower.height() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Lines<'_> {}

/// A single parsed line of a tower listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    pub level: usize,
    pub name: String,
    pub is_default: bool,
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?P<level>[^|]*?)\s*\|\s*(?P<name>.*?)\s*$")
            .expect("tower line pattern is valid")
    })
}

/// Parse one non-blank line of a listing. `line` is only used for error reporting.
pub fn parse_line(line: usize, raw: &str) -> Result<LineEntry, ParseError> {
    let caps = line_pattern()
        .captures(raw)
        .ok_or_else(|| ParseError::Malformed {
            line,
            text: raw.to_string(),
        })?;

    let marker = &caps["level"];
    let level = marker.parse::<usize>().map_err(|_| ParseError::BadLevel {
        line,
        marker: marker.to_string(),
    })?;

    let field = &caps["name"];
    let (name, is_default) = match field.strip_prefix('[').and_then(|f| f.strip_suffix(']')) {
        Some(inner) => (inner.trim(), true),
        None => (field, false),
    };

    if name.is_empty() {
        return Err(ParseError::MissingName { line });
    }
    if !is_valid_name(name) {
        return Err(ParseError::InvalidName {
            line,
            name: name.to_string(),
        });
    }

    Ok(LineEntry {
        level,
        name: name.to_string(),
        is_default,
    })
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '[' | ']' | '|'))
}
