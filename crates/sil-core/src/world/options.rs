//! Simulation options
//!
//! Options can be read from a config file in the same `OPTIONS=` line
//! format the game's option file uses:
//!
//! ```text
//! # comments start with '#'
//! OPTIONS=depth:6,forgo_attacking_unwary,!truce
//! OPTIONS=turns:500
//! ```

#[cfg(not(feature = "std"))]
use crate::compat::*;

#[cfg(feature = "std")]
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MORGOTH_DEPTH;

/// Tunables that are data rather than rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Dungeon level the fight takes place on
    pub depth: i32,
    /// Don't sweep or follow through onto monsters that haven't noticed you
    pub forgo_attacking_unwary: bool,
    /// Morgoth's throne-room truce is in force
    pub truce: bool,
    /// The player is escaping with a Silmaril
    pub on_the_run: bool,
    /// Level of the throne room
    pub morgoth_depth: i32,
    /// Game turns the arena runs for
    pub turns: u32,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            forgo_attacking_unwary: true,
            truce: false,
            on_the_run: false,
            morgoth_depth: MORGOTH_DEPTH,
            turns: 200,
        }
    }
}

/// Options parsing error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Invalid value '{1}' for option '{0}'")]
    InvalidValue(String, String),

    #[error("Missing value for option '{0}'")]
    MissingValue(String),

    #[error("Bad options JSON: {0}")]
    Json(String),
}

impl SimOptions {
    /// Load options from a config file. A `.json` file holds the serialized
    /// options; anything else is read as `OPTIONS=` lines.
    #[cfg(feature = "std")]
    pub fn load_from_file(path: &Path) -> Result<Self, OptionsError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| OptionsError::IoError(e.to_string()))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&contents)
        } else {
            Self::parse_config(&contents)
        }
    }

    /// Options from JSON; missing fields keep their defaults
    #[cfg(feature = "std")]
    pub fn from_json(contents: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(contents).map_err(|e| OptionsError::Json(e.to_string()))
    }

    /// Parse options from config file contents
    pub fn parse_config(contents: &str) -> Result<Self, OptionsError> {
        let mut options = Self::default();

        for line in contents.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(opts) = line.strip_prefix("OPTIONS=") {
                for opt in opts.split(',') {
                    options.parse_option(opt.trim())?;
                }
            }
        }

        Ok(options)
    }

    /// Parse a single option
    fn parse_option(&mut self, opt: &str) -> Result<(), OptionsError> {
        if opt.is_empty() {
            return Ok(());
        }
        if let Some((key, value)) = opt.split_once(':').or_else(|| opt.split_once('=')) {
            return self.set_option(key.trim(), value.trim());
        }
        let (negated, name) = match opt.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, opt),
        };
        self.set_bool_option(name, !negated)
    }

    fn set_bool_option(&mut self, name: &str, value: bool) -> Result<(), OptionsError> {
        match name {
            "forgo_attacking_unwary" => self.forgo_attacking_unwary = value,
            "truce" => self.truce = value,
            "on_the_run" => self.on_the_run = value,
            "depth" | "morgoth_depth" | "turns" => {
                return Err(OptionsError::MissingValue(name.to_string()));
            }
            _ => return Err(OptionsError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), OptionsError> {
        let invalid = || OptionsError::InvalidValue(name.to_string(), value.to_string());
        match name {
            "depth" => self.depth = value.parse().map_err(|_| invalid())?,
            "morgoth_depth" => self.morgoth_depth = value.parse().map_err(|_| invalid())?,
            "turns" => self.turns = value.parse().map_err(|_| invalid())?,
            "forgo_attacking_unwary" | "truce" | "on_the_run" => {
                let flag = match value {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => return Err(invalid()),
                };
                self.set_bool_option(name, flag)?;
            }
            _ => return Err(OptionsError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    /// Render as a config string that [`SimOptions::parse_config`] reads back
    pub fn to_config_string(&self) -> String {
        let flag = |on: bool, name: &str| if on { name.to_string() } else { format!("!{name}") };
        format!(
            "OPTIONS=depth:{},morgoth_depth:{},turns:{},{},{},{}\n",
            self.depth,
            self.morgoth_depth,
            self.turns,
            flag(self.forgo_attacking_unwary, "forgo_attacking_unwary"),
            flag(self.truce, "truce"),
            flag(self.on_the_run, "on_the_run"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = SimOptions::default();
        assert_eq!(opts.depth, 1);
        assert!(opts.forgo_attacking_unwary);
        assert!(!opts.truce);
    }

    #[test]
    fn test_parse_config() {
        let config = "# arena\nOPTIONS=depth:6,!forgo_attacking_unwary\n\nOPTIONS=truce,turns:50";
        let opts = SimOptions::parse_config(config).unwrap();
        assert_eq!(opts.depth, 6);
        assert!(!opts.forgo_attacking_unwary);
        assert!(opts.truce);
        assert_eq!(opts.turns, 50);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            SimOptions::parse_config("OPTIONS=colour"),
            Err(OptionsError::UnknownOption("colour".into()))
        );
        assert_eq!(
            SimOptions::parse_config("OPTIONS=depth:deep"),
            Err(OptionsError::InvalidValue("depth".into(), "deep".into()))
        );
        assert_eq!(
            SimOptions::parse_config("OPTIONS=turns"),
            Err(OptionsError::MissingValue("turns".into()))
        );
    }

    #[test]
    fn test_roundtrip() {
        let opts = SimOptions { depth: 9, truce: true, ..SimOptions::default() };
        let parsed = SimOptions::parse_config(&opts.to_config_string()).unwrap();
        assert_eq!(parsed, opts);

        let json = serde_json::to_string(&opts).unwrap();
        let back: SimOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts = SimOptions::from_json(r#"{"depth": 12, "truce": true}"#).unwrap();
        assert_eq!(opts.depth, 12);
        assert!(opts.truce);
        assert_eq!(opts.turns, SimOptions::default().turns);
        assert!(matches!(SimOptions::from_json("{"), Err(OptionsError::Json(_))));
    }
}
