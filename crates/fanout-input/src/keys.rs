//! Hotkey-style key sequence notation.
//!
//! `{Enter}`, `{Tab 4}`, `^a^v`, `+{Left}`, `{Space}{Backspace}`. Modifier
//! prefixes (`^` Ctrl, `+` Shift, `!` Alt, `#` Meta) apply to the next key
//! only. Braces escape a literal character: `{^}`.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single key, independent of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Escape,
    Space,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    Char(char),
}

impl Key {
    fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c));
        }
        let key = match name.to_ascii_lowercase().as_str() {
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "esc" | "escape" => Key::Escape,
            "space" => Key::Space,
            "backspace" | "bs" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "home" => Key::Home,
            "end" => Key::End,
            "pgup" | "pageup" => Key::PageUp,
            "pgdn" | "pagedown" => Key::PageDown,
            lower => {
                let n: u8 = lower.strip_prefix('f')?.parse().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                Key::F(n)
            }
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Enter => write!(f, "{{Enter}}"),
            Key::Tab => write!(f, "{{Tab}}"),
            Key::Escape => write!(f, "{{Esc}}"),
            Key::Space => write!(f, "{{Space}}"),
            Key::Backspace => write!(f, "{{Backspace}}"),
            Key::Delete => write!(f, "{{Delete}}"),
            Key::Up => write!(f, "{{Up}}"),
            Key::Down => write!(f, "{{Down}}"),
            Key::Left => write!(f, "{{Left}}"),
            Key::Right => write!(f, "{{Right}}"),
            Key::Home => write!(f, "{{Home}}"),
            Key::End => write!(f, "{{End}}"),
            Key::PageUp => write!(f, "{{PgUp}}"),
            Key::PageDown => write!(f, "{{PgDn}}"),
            Key::F(n) => write!(f, "{{F{}}}", n),
            Key::Char(c) if is_special(*c) => write!(f, "{{{}}}", c),
            Key::Char(c) => write!(f, "{}", c),
        }
    }
}

/// Modifier keys held while a key is tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.meta)
    }
}

/// One key tap with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyStroke {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        if m.ctrl {
            write!(f, "^")?;
        }
        if m.shift {
            write!(f, "+")?;
        }
        if m.alt {
            write!(f, "!")?;
        }
        if m.meta {
            write!(f, "#")?;
        }
        write!(f, "{}", self.key)
    }
}

fn is_special(c: char) -> bool {
    matches!(c, '^' | '+' | '!' | '#' | '{' | '}')
}

/// Upper bound for `{Name N}` repeats.
pub const MAX_REPEAT: usize = 100;

/// An ordered list of key strokes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeySequence(Vec<KeyStroke>);

impl KeySequence {
    /// Parse hotkey notation.
    pub fn parse(input: &str) -> crate::Result<Self> {
        let err = |reason: &str| Error::KeySequence {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut strokes = Vec::new();
        let mut pending = Modifiers::default();
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '^' => pending.ctrl = true,
                '+' => pending.shift = true,
                '!' => pending.alt = true,
                '#' => pending.meta = true,
                '{' => {
                    let mut body = String::new();
                    // `{}}` and `{{}` name the brace itself.
                    if let Some(&first) = chars.peek() {
                        if first == '}' || first == '{' {
                            body.push(first);
                            chars.next();
                        }
                    }
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(err("unterminated '{'"));
                    }

                    let (name, count) = match body.rsplit_once(' ') {
                        Some((name, n)) if !name.is_empty() => {
                            let n: usize = n
                                .parse()
                                .map_err(|_| err(&format!("bad repeat count '{}'", n)))?;
                            (name.to_string(), n)
                        }
                        _ => (body, 1),
                    };
                    if count == 0 {
                        return Err(err("repeat count must be at least 1"));
                    }
                    if count > MAX_REPEAT {
                        return Err(err(&format!("repeat count {} exceeds {}", count, MAX_REPEAT)));
                    }
                    let key = Key::from_name(&name)
                        .ok_or_else(|| err(&format!("unknown key '{}'", name)))?;

                    for _ in 0..count {
                        strokes.push(KeyStroke {
                            key,
                            modifiers: pending,
                        });
                    }
                    pending = Modifiers::default();
                }
                '}' => return Err(err("unmatched '}'")),
                other => {
                    strokes.push(KeyStroke {
                        key: Key::Char(other),
                        modifiers: pending,
                    });
                    pending = Modifiers::default();
                }
            }
        }

        if !pending.is_empty() {
            return Err(err("modifier without a key"));
        }
        Ok(Self(strokes))
    }

    pub fn strokes(&self) -> &[KeyStroke] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for KeySequence {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeySequence {
    type Error = Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::parse(&s)
    }
}

impl From<KeySequence> for String {
    fn from(seq: KeySequence) -> String {
        seq.to_string()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stroke in &self.0 {
            write!(f, "{}", stroke)?;
        }
        Ok(())
    }
}
