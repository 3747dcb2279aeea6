use portal_core::error::ValidationErrors;

const MAX_FIELD_LEN: usize = 256;

/// Single-line text input with a byte cursor.
#[derive(Debug, Clone)]
pub struct TextField {
    pub name: &'static str,
    pub label: &'static str,
    pub input: String,
    pub cursor: usize,
    pub masked: bool,
}

impl TextField {
    pub fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            input: String::new(),
            cursor: 0,
            masked: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.input.len() as isize;
        let mut next = self.cursor as isize + delta;
        if next < 0 {
            next = 0;
        } else if next > len {
            next = len;
        }
        self.cursor = next as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.input.len() >= MAX_FIELD_LEN {
            return;
        }
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.input.insert(self.cursor, ch);
            self.cursor += ch.len_utf8();
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.input.len() {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }

    /// Text as drawn, masked for passwords.
    pub fn display(&self) -> String {
        if self.masked {
            "•".repeat(self.input.chars().count())
        } else {
            self.input.clone()
        }
    }
}

/// A set of fields with focus, validation feedback and an in-flight flag.
#[derive(Debug, Clone)]
pub struct FormState {
    pub fields: Vec<TextField>,
    pub focus: usize,
    pub errors: Option<ValidationErrors>,
    pub pending: bool,
}

impl FormState {
    pub fn new(fields: Vec<TextField>) -> Self {
        Self {
            fields,
            focus: 0,
            errors: None,
            pending: false,
        }
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn focused_mut(&mut self) -> Option<&mut TextField> {
        self.fields.get_mut(self.focus)
    }

    pub fn value(&self, name: &str) -> String {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.input.clone())
            .unwrap_or_default()
    }

    pub fn error_for(&self, name: &str) -> Option<&str> {
        self.errors.as_ref().and_then(|errors| errors.message_for(name))
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.input.clear();
            field.cursor = 0;
        }
        self.focus = 0;
        self.errors = None;
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_respects_cursor() {
        let mut field = TextField::new("email", "Email");
        for ch in "ad@x".chars() {
            field.insert(ch);
        }
        field.move_cursor(-2);
        field.backspace();
        assert_eq!(field.input, "a@x");
        field.move_home();
        field.delete();
        assert_eq!(field.input, "@x");
        field.move_end();
        field.insert('y');
        assert_eq!(field.input, "@xy");
    }

    #[test]
    fn masked_fields_hide_input() {
        let mut field = TextField::new("password", "Password").masked();
        field.insert('a');
        field.insert('b');
        assert_eq!(field.display(), "••");
    }

    #[test]
    fn focus_wraps_around() {
        let mut form = FormState::new(vec![
            TextField::new("a", "A"),
            TextField::new("b", "B"),
        ]);
        form.focus_prev();
        assert_eq!(form.focus, 1);
        form.focus_next();
        assert_eq!(form.focus, 0);
    }
}
