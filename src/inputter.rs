use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Snapshot of the input line after a keystroke. The model applies `input`
/// as the live query on every read; `finished`/`canceled` end the edit.
#[derive(Default, Clone, Debug)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

/// Minimal line editor for the search input. Tracks the curser in
/// characters; byte positions are resolved on every edit so multi-byte
/// input stays intact.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.finished = true,
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.finished = true;
                self.canceled = true;
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => {
                self.curser_pos = self.curser_pos.saturating_sub(1);
            }
            (KeyCode::Right, KeyModifiers::NONE) => {
                if self.curser_pos < self.char_count() {
                    self.curser_pos += 1;
                }
            }
            (code, modifiers) => {
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    && let Some(chr) = code.as_char()
                {
                    self.current_input.insert(self.byte_pos(self.curser_pos), chr);
                    self.curser_pos += 1;
                }
            }
        }
        self.get()
    }

    /// Seed the editor with an existing query, curser at the end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.curser_pos = self.char_count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            finished: self.finished,
            canceled: self.canceled,
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.current_input.clear();
        self.curser_pos = 0;
        self.finished = false;
        self.canceled = false;
    }

    fn backspace(&mut self) {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let begin = self.byte_pos(self.curser_pos);
            let end = self.byte_pos(self.curser_pos + 1);
            self.current_input.replace_range(begin..end, "");
        }
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_builds_the_input() {
        let mut inputter = Inputter::default();
        inputter.read(key(KeyCode::Char('a')));
        let result = inputter.read(key(KeyCode::Char('n')));
        assert_eq!(result.input, "an");
        assert_eq!(result.curser_pos, 2);
        assert!(!result.finished);
    }

    #[test]
    fn test_backspace_removes_at_curser() {
        let mut inputter = Inputter::default();
        inputter.set("ana");
        inputter.read(key(KeyCode::Left));
        let result = inputter.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "aa");
        assert_eq!(result.curser_pos, 1);
    }

    #[test]
    fn test_multibyte_input_edits_cleanly() {
        let mut inputter = Inputter::default();
        inputter.set("niño");
        let result = inputter.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "niñ");
        let result = inputter.read(key(KeyCode::Backspace));
        assert_eq!(result.input, "ni");
        assert_eq!(result.curser_pos, 2);
    }

    #[test]
    fn test_escape_cancels() {
        let mut inputter = Inputter::default();
        inputter.set("ana");
        let result = inputter.read(key(KeyCode::Esc));
        assert!(result.finished);
        assert!(result.canceled);
    }

    #[test]
    fn test_enter_finishes() {
        let mut inputter = Inputter::default();
        inputter.set("ana");
        let result = inputter.read(key(KeyCode::Enter));
        assert!(result.finished);
        assert!(!result.canceled);
        assert_eq!(result.input, "ana");
    }
}
