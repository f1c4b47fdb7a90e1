//! Ordered key-sequence detection for keyseq

mod config;
mod dispatch;
mod error;
mod key;
mod matcher;
mod source;

pub use config::{Config, SequenceConfig};
pub use dispatch::{KeyDispatcher, KeyListener, ListenerId};
pub use error::ConfigError;
pub use key::{
    char_key_code, codes, key_code_from_crossterm, key_name, parse_key, KeyCode, KeyPress,
};
pub use matcher::{Callback, MatchOutcome, SequenceMatcher, SequenceMatcherBuilder};
pub use source::CrosstermSource;
