use anyhow::{Context, Result};
use std::fs;

use super::cursor::Cursor;

/// Line-oriented text held by a surface
#[derive(Debug, Clone)]
pub struct Buffer {
    pub lines: Vec<String>,
    pub file_path: Option<String>,
    pub is_modified: bool,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            file_path: None,
            is_modified: false,
        }
    }

    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut buffer = Self::new();
        buffer.set_lines(lines);
        buffer.is_modified = false;
        buffer
    }

    pub fn load_file(&mut self, path: &str) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path))?;

        self.set_lines(content.lines().map(str::to_string));
        self.file_path = Some(path.to_string());
        self.is_modified = false;

        Ok(())
    }

    /// Replace all content. An empty source still leaves one empty line.
    pub fn set_lines<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.lines = lines.into_iter().collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.is_modified = true;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn get_line(&self, y: usize) -> &str {
        self.lines.get(y).map(String::as_str).unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_length(&self, y: usize) -> usize {
        self.get_line(y).chars().count()
    }

    /// Swap the cursor's line with the one below, the cursor follows it.
    /// Returns false at the last line.
    pub fn move_line_down(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.y + 1 >= self.lines.len() {
            return false;
        }
        self.lines.swap(cursor.y, cursor.y + 1);
        cursor.y += 1;
        self.is_modified = true;
        true
    }

    /// Swap the cursor's line with the one above, the cursor follows it.
    /// Returns false at the first line.
    pub fn move_line_up(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.y == 0 || cursor.y >= self.lines.len() {
            return false;
        }
        self.lines.swap(cursor.y, cursor.y - 1);
        cursor.y -= 1;
        self.is_modified = true;
        true
    }

    /// Replace the content of line `y`. Returns false if there is no such line.
    pub fn set_line(&mut self, y: usize, text: &str) -> bool {
        match self.lines.get_mut(y) {
            Some(line) => {
                *line = text.to_string();
                self.is_modified = true;
                true
            }
            None => false,
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}
