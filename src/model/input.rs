/// Single-line text field with a cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    /// Cursor position in chars (0-indexed).
    cursor: usize,
}

impl TextInput {
    /// Creates a field holding `value` with the cursor at the end.
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn delete_before(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
    }

    pub fn delete_at(&mut self) {
        if self.cursor >= self.char_len() {
            return;
        }
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Text to draw: the value, or one `*` per char when `masked`.
    pub fn display(&self, masked: bool) -> String {
        if masked {
            "*".repeat(self.char_len())
        } else {
            self.value.clone()
        }
    }

    /// The displayed text left of the cursor, for placing the terminal cursor.
    pub fn display_before_cursor(&self, masked: bool) -> String {
        if masked {
            "*".repeat(self.cursor)
        } else {
            self.value.chars().take(self.cursor).collect()
        }
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map_or(self.value.len(), |(i, _)| i)
    }
}
