use super::Buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub x: usize, // Column
    pub y: usize, // Row
}

impl Cursor {
    pub fn new() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn at_line(y: usize) -> Self {
        Self { x: 0, y }
    }

    pub fn move_up(&mut self, buffer: &Buffer) {
        if self.y > 0 {
            self.y -= 1;
            self.clamp_column(buffer);
        }
    }

    pub fn move_down(&mut self, buffer: &Buffer) {
        if self.y + 1 < buffer.line_count() {
            self.y += 1;
            self.clamp_column(buffer);
        }
    }

    /// Pull the cursor back inside the buffer after its content changed
    pub fn clamp_to(&mut self, buffer: &Buffer) {
        self.y = self.y.min(buffer.line_count().saturating_sub(1));
        self.clamp_column(buffer);
    }

    fn clamp_column(&mut self, buffer: &Buffer) {
        let line_length = buffer.line_length(self.y);
        if self.x > line_length {
            self.x = line_length;
        }
    }
}
