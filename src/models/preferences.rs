use serde::{Deserialize, Serialize};
use std::fmt;

/// The five preference labels the user picks before asking for suggestions.
///
/// Values are free-form; the option lists below are what the front end
/// offers, nothing checks against them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub gender: String,
    pub style: String,
    pub occasion: String,
    pub color: String,
    pub length: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceField {
    Gender,
    Style,
    Occasion,
    Color,
    Length,
}

impl PreferenceField {
    pub const ALL: [PreferenceField; 5] = [
        PreferenceField::Gender,
        PreferenceField::Style,
        PreferenceField::Occasion,
        PreferenceField::Color,
        PreferenceField::Length,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceField::Gender => "gender",
            PreferenceField::Style => "style",
            PreferenceField::Occasion => "occasion",
            PreferenceField::Color => "color",
            PreferenceField::Length => "length",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            PreferenceField::Gender => &["female", "male", "neutral"],
            PreferenceField::Style => &["natural", "elegant", "trendy", "cute", "edgy"],
            PreferenceField::Occasion => &["daily", "work", "date", "party", "wedding"],
            PreferenceField::Color => &["natural", "brown", "blonde", "red", "highlights"],
            PreferenceField::Length => &["short", "medium", "long"],
        }
    }
}

impl fmt::Display for PreferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: PreferenceField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: PreferenceField, value: impl Into<String>) {
        let value = value.into();
        match field {
            PreferenceField::Gender => self.gender = value,
            PreferenceField::Style => self.style = value,
            PreferenceField::Occasion => self.occasion = value,
            PreferenceField::Color => self.color = value,
            PreferenceField::Length => self.length = value,
        }
    }

    pub fn get(&self, field: PreferenceField) -> &str {
        match field {
            PreferenceField::Gender => &self.gender,
            PreferenceField::Style => &self.style,
            PreferenceField::Occasion => &self.occasion,
            PreferenceField::Color => &self.color,
            PreferenceField::Length => &self.length,
        }
    }

    pub fn is_empty(&self) -> bool {
        PreferenceField::ALL
            .iter()
            .all(|field| self.get(*field).trim().is_empty())
    }

    /// One `- field: value` line per filled preference, for prompts.
    pub fn describe(&self) -> String {
        let lines: Vec<String> = PreferenceField::ALL
            .iter()
            .filter(|field| !self.get(**field).trim().is_empty())
            .map(|field| format!("- {}: {}", field, self.get(*field).trim()))
            .collect();

        if lines.is_empty() {
            "No specific preferences".to_string()
        } else {
            lines.join("\n")
        }
    }
}
