use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl KeyBinding {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: &str) -> Self {
        self.modifiers.push(modifier.to_string());
        self
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let key_matches = match event.code {
            KeyCode::Char(c) => self.key == c.to_string(),
            KeyCode::Enter => self.key == "enter",
            KeyCode::Tab => self.key == "tab",
            KeyCode::Backspace => self.key == "backspace",
            KeyCode::Esc => self.key == "esc",
            KeyCode::Left => self.key == "left",
            KeyCode::Right => self.key == "right",
            KeyCode::Up => self.key == "up",
            KeyCode::Down => self.key == "down",
            KeyCode::Home => self.key == "home",
            KeyCode::End => self.key == "end",
            KeyCode::PageUp => self.key == "pageup",
            KeyCode::PageDown => self.key == "pagedown",
            KeyCode::F(n) => self.key == format!("f{}", n),
            _ => false,
        };

        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);
        // Shift is already part of the character for printable keys ('J', '}')
        let shift = event.modifiers.contains(KeyModifiers::SHIFT)
            && !matches!(event.code, KeyCode::Char(_));

        let wants = |name: &str| self.modifiers.iter().any(|m| m == name);
        let modifiers_match = wants("ctrl") == ctrl && wants("alt") == alt && wants("shift") == shift;

        key_matches && modifiers_match
    }
}

/// Command name to key, per context. `meta` applies while a tower view has focus.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeyBindings {
    #[serde(default = "default_normal")]
    pub normal: HashMap<String, KeyBinding>,
    #[serde(default = "default_meta")]
    pub meta: HashMap<String, KeyBinding>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            normal: default_normal(),
            meta: default_meta(),
        }
    }
}

fn bind(pairs: &[(&str, &str)]) -> HashMap<String, KeyBinding> {
    pairs
        .iter()
        .map(|(command, key)| (command.to_string(), KeyBinding::new(key)))
        .collect()
}

fn default_normal() -> HashMap<String, KeyBinding> {
    bind(&[
        ("quit", "q"),
        ("enter_higher_level", "]"),
        ("enter_lower_level", "["),
        ("enter_highest_level", "}"),
        ("enter_lowest_level", "{"),
        ("enter_appropriate_mode", "esc"),
        ("cycle_tower", "t"),
        ("enter_meta", "m"),
        ("enter:insert", "i"),
        ("move_down", "j"),
        ("move_up", "k"),
    ])
}

fn default_meta() -> HashMap<String, KeyBinding> {
    bind(&[
        ("exit_meta", "esc"),
        ("move_line_down", "J"),
        ("move_line_up", "K"),
        ("move_down", "j"),
        ("move_up", "k"),
        ("select_level", "enter"),
        ("make_default", "d"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn test_key_binding_matches() {
        let binding = KeyBinding::new("c").with_modifier("ctrl");

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(binding.matches(&ctrl_c));

        let alt_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::ALT);
        assert!(!binding.matches(&alt_c));

        let just_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert!(!binding.matches(&just_c));
    }

    #[test]
    fn test_shifted_characters_match_plain_bindings() {
        let binding = KeyBinding::new("J");
        assert!(binding.matches(&KeyEvent::new(KeyCode::Char('J'), KeyModifiers::SHIFT)));
        assert!(binding.matches(&KeyEvent::new(KeyCode::Char('J'), KeyModifiers::NONE)));
        assert!(!binding.matches(&KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE)));

        // Outside printable keys shift still counts
        let tab = KeyBinding::new("tab");
        assert!(!tab.matches(&KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT)));
    }

    #[test]
    fn test_default_key_bindings() {
        let bindings = KeyBindings::default();

        assert_eq!(bindings.normal.get("enter_higher_level"), Some(&KeyBinding::new("]")));
        assert_eq!(bindings.normal.get("enter_meta"), Some(&KeyBinding::new("m")));
        assert_eq!(bindings.meta.get("exit_meta"), Some(&KeyBinding::new("esc")));
        assert_eq!(bindings.meta.get("move_line_up"), Some(&KeyBinding::new("K")));
    }

    #[test]
    fn test_contexts_bind_each_key_once() {
        let bindings = KeyBindings::default();
        for map in [&bindings.normal, &bindings.meta] {
            let mut keys: Vec<_> = map.values().map(|b| (&b.key, &b.modifiers)).collect();
            let total = keys.len();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), total);
        }
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let bindings: KeyBindings = toml::from_str(
            r#"
            [normal]
            quit = { key = "x" }
            "#,
        )
        .unwrap();

        assert_eq!(bindings.normal.len(), 1);
        assert_eq!(bindings.normal["quit"].key, "x");
        assert_eq!(bindings.meta, default_meta());
    }
}
