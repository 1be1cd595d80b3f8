//! Interactive terminal prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Prints `label` and reads one line from stdin, trimmed.
pub fn prompt_line(label: &str) -> io::Result<String> {
    print_label(label)?;
    read_line(&mut io::stdin().lock()).map(|line| line.trim().to_string())
}

/// Prints `label` and reads one line from stdin without echoing it.
///
/// Surrounding spaces are kept. Input that is not a terminal is read as a
/// plain line.
pub fn prompt_password(label: &str) -> io::Result<String> {
    print_label(label)?;
    if !io::stdin().is_terminal() {
        return read_line(&mut io::stdin().lock());
    }

    let password = {
        let _raw = RawMode::enable()?;
        read_hidden()
    };
    // Raw mode swallowed the Enter key.
    println!();
    password
}

fn print_label(label: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()
}

fn read_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no input available",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_hidden() -> io::Result<String> {
    let mut input = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_key(&mut input, key) {
                Entry::Editing => {}
                Entry::Done => return Ok(input),
                Entry::Cancelled => {
                    return Err(io::Error::new(
                        io::ErrorKind::Interrupted,
                        "password entry cancelled",
                    ));
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Entry {
    Editing,
    Done,
    Cancelled,
}

/// Applies one key press to the hidden input.
fn apply_key(input: &mut String, key: KeyEvent) -> Entry {
    if key.kind == KeyEventKind::Release {
        return Entry::Editing;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Enter, _) => Entry::Done,
        (KeyCode::Esc, _) => Entry::Cancelled,
        (KeyCode::Char('c' | 'd'), KeyModifiers::CONTROL) => Entry::Cancelled,
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
            input.clear();
            Entry::Editing
        }
        (KeyCode::Backspace, _) => {
            input.pop();
            Entry::Editing
        }
        (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
            input.push(c);
            Entry::Editing
        }
        _ => Entry::Editing,
    }
}

/// Keeps the terminal in raw mode until dropped.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    mod lines {
        use super::*;

        #[test]
        fn strips_line_terminators_only() {
            let mut input = Cursor::new(" s3cret \r\nnext\n");
            assert_eq!(read_line(&mut input).unwrap(), " s3cret ");
            assert_eq!(read_line(&mut input).unwrap(), "next");
        }

        #[test]
        fn last_line_without_newline() {
            let mut input = Cursor::new("alice");
            assert_eq!(read_line(&mut input).unwrap(), "alice");
        }

        #[test]
        fn closed_input_is_an_error() {
            let mut input = Cursor::new("");
            let err = read_line(&mut input).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        }
    }

    mod hidden {
        use super::*;

        fn key(code: KeyCode) -> KeyEvent {
            KeyEvent::new(code, KeyModifiers::NONE)
        }

        fn ctrl(c: char) -> KeyEvent {
            KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
        }

        fn type_keys(keys: impl IntoIterator<Item = KeyEvent>) -> (String, Entry) {
            let mut input = String::new();
            for key in keys {
                let entry = apply_key(&mut input, key);
                if entry != Entry::Editing {
                    return (input, entry);
                }
            }
            (input, Entry::Editing)
        }

        #[test]
        fn typed_characters_until_enter() {
            let keys = [
                key(KeyCode::Char(' ')),
                KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT),
                key(KeyCode::Char('3')),
                key(KeyCode::Enter),
                key(KeyCode::Char('x')),
            ];
            assert_eq!(type_keys(keys), (" S3".to_string(), Entry::Done));
        }

        #[test]
        fn backspace_and_clear() {
            let keys = [
                key(KeyCode::Char('a')),
                key(KeyCode::Char('b')),
                key(KeyCode::Backspace),
                key(KeyCode::Char('c')),
                key(KeyCode::Enter),
            ];
            assert_eq!(type_keys(keys), ("ac".to_string(), Entry::Done));

            let keys = [key(KeyCode::Char('a')), ctrl('u'), key(KeyCode::Enter)];
            assert_eq!(type_keys(keys), (String::new(), Entry::Done));
        }

        #[test]
        fn cancel_keys() {
            assert_eq!(type_keys([ctrl('c')]).1, Entry::Cancelled);
            assert_eq!(type_keys([ctrl('d')]).1, Entry::Cancelled);
            assert_eq!(type_keys([key(KeyCode::Esc)]).1, Entry::Cancelled);
        }

        #[test]
        fn key_releases_are_ignored() {
            let mut release = key(KeyCode::Char('a'));
            release.kind = KeyEventKind::Release;
            let (input, entry) = type_keys([release, key(KeyCode::Enter)]);
            assert_eq!(input, "");
            assert_eq!(entry, Entry::Done);
        }
    }
}
