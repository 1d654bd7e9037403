//! Engine configuration.
//!
//! Chooses which function set a [`Transformer`] starts from and which tag key
//! it reads. Values come from CLI flags or the environment:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `MOLD_PRESET` | `modifiers`, `scrubbers` or `none` | `modifiers` |
//! | `MOLD_TAG_NAME` | Tag key to read | the preset's (`mod`, `scrub`, `mold`) |
//!
//! The binary loads a `.env` file first, so both can live there.

use crate::error::ConfigError;
use crate::transform::Transformer;
use crate::{modifiers, scrubbers};
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

pub const PRESET_ENV: &str = "MOLD_PRESET";
pub const TAG_NAME_ENV: &str = "MOLD_TAG_NAME";

/// Built-in function set to start from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Input normalization (`trim`, `lcase`, `default`, ...), tag `mod`.
    #[default]
    #[value(alias = "mod")]
    Modifiers,
    /// De-identification (`emails`, `text`, `name`), tag `scrub`.
    #[value(alias = "scrub")]
    Scrubbers,
    /// No functions, tag `mold`.
    None,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Modifiers => "modifiers",
            Preset::Scrubbers => "scrubbers",
            Preset::None => "none",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "modifiers" | "mod" => Ok(Preset::Modifiers),
            "scrubbers" | "scrub" => Ok(Preset::Scrubbers),
            "none" => Ok(Preset::None),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

/// How to build a [`Transformer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub preset: Preset,

    /// Overrides the preset's tag key.
    pub tag_name: Option<String>,
}

impl EngineConfig {
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            tag_name: None,
        }
    }

    #[must_use]
    pub fn with_tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = Some(tag_name.into());
        self
    }

    /// Read `MOLD_PRESET` and `MOLD_TAG_NAME`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let preset = match lookup(PRESET_ENV) {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Preset::default(),
        };
        let tag_name = lookup(TAG_NAME_ENV).filter(|t| !t.trim().is_empty());
        Ok(Self { preset, tag_name })
    }

    /// Build the configured transformer.
    pub fn build(&self) -> Result<Transformer, ConfigError> {
        let mut t = match self.preset {
            Preset::Modifiers => modifiers::new(),
            Preset::Scrubbers => scrubbers::new(),
            Preset::None => Transformer::new(),
        };
        if let Some(tag_name) = &self.tag_name {
            let tag_name = tag_name.trim();
            if tag_name.is_empty() {
                return Err(ConfigError::EmptyTagName);
            }
            t.set_tag_name(tag_name);
        }
        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.build().unwrap().tag_name(), "mod");
    }

    #[test]
    fn test_from_lookup() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("MOLD_PRESET", "Scrubbers"),
            ("MOLD_TAG_NAME", "pii"),
        ]))
        .unwrap();
        assert_eq!(config.preset, Preset::Scrubbers);

        let t = config.build().unwrap();
        assert_eq!(t.tag_name(), "pii");
        assert_eq!(t.registered_tags(), vec!["emails", "name", "text"]);
    }

    #[test]
    fn test_unknown_preset() {
        let err = EngineConfig::from_lookup(lookup(&[("MOLD_PRESET", "bogus")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownPreset("bogus".to_string()));
    }

    #[test]
    fn test_preset_value_enum_accepts_short_names() {
        let parse = |s: &str| <Preset as ValueEnum>::from_str(s, true);
        assert_eq!(parse("scrub"), Ok(Preset::Scrubbers));
        assert_eq!(parse("Mod"), Ok(Preset::Modifiers));
        assert!(parse("bogus").is_err());
    }

    #[test]
    fn test_empty_tag_name() {
        let config = EngineConfig::new(Preset::None).with_tag_name(" ");
        assert_eq!(config.build().unwrap_err(), ConfigError::EmptyTagName);
        assert_eq!(EngineConfig::new(Preset::None).build().unwrap().tag_name(), "mold");
    }
}
