//! Key codes and key-press events

use crossterm::event::{KeyCode as TermKey, KeyEvent, KeyEventKind};

/// Opaque key identifier (DOM legacy `keyCode` numbering)
pub type KeyCode = u32;

/// Common key codes
pub mod codes {
    use super::KeyCode;

    pub const BACKSPACE: KeyCode = 8;
    pub const TAB: KeyCode = 9;
    pub const ENTER: KeyCode = 13;
    pub const ESC: KeyCode = 27;
    pub const SPACE: KeyCode = 32;

    pub const LEFT: KeyCode = 37;
    pub const UP: KeyCode = 38;
    pub const RIGHT: KeyCode = 39;
    pub const DOWN: KeyCode = 40;

    /// `0`; digits run contiguously to `9` (57)
    pub const DIGIT_0: KeyCode = 48;
    /// `A`; letters run contiguously to `Z` (90)
    pub const A: KeyCode = 65;
    pub const B: KeyCode = 66;

    /// `F1`; function keys run contiguously to `F12` (123)
    pub const F1: KeyCode = 112;

    pub const SEMICOLON: KeyCode = 186;
    pub const EQUALS: KeyCode = 187;
    pub const COMMA: KeyCode = 188;
    pub const MINUS: KeyCode = 189;
    pub const PERIOD: KeyCode = 190;
    pub const SLASH: KeyCode = 191;
    pub const BACKTICK: KeyCode = 192;
    pub const BRACKET_LEFT: KeyCode = 219;
    pub const BACKSLASH: KeyCode = 220;
    pub const BRACKET_RIGHT: KeyCode = 221;
    pub const QUOTE: KeyCode = 222;
}

/// A single key-down, as handed to step/complete callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: KeyCode,
    /// Capture time in milliseconds, if the source stamped one
    pub time_ms: Option<u64>,
}

impl KeyPress {
    /// Key-down without a timestamp; the matcher stamps it on arrival
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            time_ms: None,
        }
    }

    /// Key-down captured at `time_ms`
    pub fn at(code: KeyCode, time_ms: u64) -> Self {
        Self {
            code,
            time_ms: Some(time_ms),
        }
    }

    /// Convert a terminal key event.
    ///
    /// Returns `None` for key releases and for keys without a legacy code.
    pub fn from_crossterm(event: &KeyEvent) -> Option<Self> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        key_code_from_crossterm(event).map(Self::new)
    }
}

/// Map a terminal key to its DOM legacy key code
pub fn key_code_from_crossterm(event: &KeyEvent) -> Option<KeyCode> {
    let code = match event.code {
        TermKey::Backspace => codes::BACKSPACE,
        TermKey::Tab | TermKey::BackTab => codes::TAB,
        TermKey::Enter => codes::ENTER,
        TermKey::Esc => codes::ESC,
        TermKey::Left => codes::LEFT,
        TermKey::Up => codes::UP,
        TermKey::Right => codes::RIGHT,
        TermKey::Down => codes::DOWN,
        TermKey::F(n @ 1..=12) => codes::F1 + KeyCode::from(n - 1),
        TermKey::Char(c) => return char_key_code(c),
        _ => return None,
    };
    Some(code)
}

/// Legacy code for a printable character.
///
/// Letters fold to their uppercase code; shifted punctuation shares the code
/// of its unshifted key on a US layout.
pub fn char_key_code(c: char) -> Option<KeyCode> {
    let code = match c {
        ' ' => codes::SPACE,
        'a'..='z' => c.to_ascii_uppercase() as KeyCode,
        'A'..='Z' | '0'..='9' => c as KeyCode,
        ')' => codes::DIGIT_0,
        '!' => codes::DIGIT_0 + 1,
        '@' => codes::DIGIT_0 + 2,
        '#' => codes::DIGIT_0 + 3,
        '$' => codes::DIGIT_0 + 4,
        '%' => codes::DIGIT_0 + 5,
        '^' => codes::DIGIT_0 + 6,
        '&' => codes::DIGIT_0 + 7,
        '*' => codes::DIGIT_0 + 8,
        '(' => codes::DIGIT_0 + 9,
        ';' | ':' => codes::SEMICOLON,
        '=' | '+' => codes::EQUALS,
        ',' | '<' => codes::COMMA,
        '-' | '_' => codes::MINUS,
        '.' | '>' => codes::PERIOD,
        '/' | '?' => codes::SLASH,
        '`' | '~' => codes::BACKTICK,
        '[' | '{' => codes::BRACKET_LEFT,
        '\\' | '|' => codes::BACKSLASH,
        ']' | '}' => codes::BRACKET_RIGHT,
        '\'' | '"' => codes::QUOTE,
        _ => return None,
    };
    Some(code)
}

/// Parse a key token from a config file: a decimal code or a symbolic name
pub fn parse_key(token: &str) -> Option<KeyCode> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }

    let lower = token.to_ascii_lowercase();
    let code = match lower.as_str() {
        "left" => codes::LEFT,
        "up" => codes::UP,
        "right" => codes::RIGHT,
        "down" => codes::DOWN,
        "enter" | "return" => codes::ENTER,
        "esc" | "escape" => codes::ESC,
        "space" => codes::SPACE,
        "tab" => codes::TAB,
        "backspace" => codes::BACKSPACE,
        _ => {
            if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<KeyCode>().ok()) {
                if (1..=12).contains(&n) {
                    return Some(codes::F1 + n - 1);
                }
                return None;
            }
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => return char_key_code(c),
                _ => return None,
            }
        }
    };
    Some(code)
}

/// Inverse of [`parse_key`] for codes that have a symbolic name
pub fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        codes::LEFT => "left",
        codes::UP => "up",
        codes::RIGHT => "right",
        codes::DOWN => "down",
        codes::ENTER => "enter",
        codes::ESC => "esc",
        codes::SPACE => "space",
        codes::TAB => "tab",
        codes::BACKSPACE => "backspace",
        65..=90 => return char::from_u32(code + 32).map(String::from),
        112..=123 => return Some(format!("f{}", code - codes::F1 + 1)),
        _ => return None,
    };
    Some(name.to_string())
}
