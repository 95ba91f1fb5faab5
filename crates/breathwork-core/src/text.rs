//! Display text tokens.
//!
//! The engine never produces human-readable labels itself. Titles and button
//! labels are emitted as [`DisplayText`] tokens and resolved by whoever renders
//! them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resource keys emitted by the engine.
pub mod keys {
    pub const ACTION_START: &str = "action_start";
    pub const ACTION_PAUSE: &str = "action_pause";
    pub const ACTION_RESUME: &str = "action_resume";
    pub const ACTION_NEXT: &str = "action_next";
    pub const LOWER_BREATHING_TITLE: &str = "exercise_lower_breathing_title";
}

/// Either a resource key or a literal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayText {
    Resource(String),
    Literal(String),
}

impl DisplayText {
    pub fn resource(key: &str) -> Self {
        DisplayText::Resource(key.to_string())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        DisplayText::Literal(text.into())
    }

    /// The key or literal text, unresolved.
    pub fn raw(&self) -> &str {
        match self {
            DisplayText::Resource(key) => key,
            DisplayText::Literal(text) => text,
        }
    }

    pub fn resolve(&self, resolver: &dyn TextResolver) -> String {
        match self {
            DisplayText::Resource(key) => resolver
                .lookup(key)
                .map(str::to_string)
                .unwrap_or_else(|| key.clone()),
            DisplayText::Literal(text) => text.clone(),
        }
    }
}

impl fmt::Display for DisplayText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// Resolves resource keys to human strings.
pub trait TextResolver {
    fn lookup(&self, key: &str) -> Option<&str>;
}

/// Built-in English strings for the keys in [`keys`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishText;

impl TextResolver for EnglishText {
    fn lookup(&self, key: &str) -> Option<&str> {
        let text = match key {
            keys::ACTION_START => "Start",
            keys::ACTION_PAUSE => "Pause",
            keys::ACTION_RESUME => "Resume",
            keys::ACTION_NEXT => "Next",
            keys::LOWER_BREATHING_TITLE => "Lower Breathing",
            _ => return None,
        };
        Some(text)
    }
}
