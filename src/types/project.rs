//! Tracking namespaces, entities and staged model names

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which tracking namespace a workflow writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingEnv {
    /// A developer running the workflow by hand
    #[default]
    Interactive,
    /// Continuous integration
    Ci,
}

impl TrackingEnv {
    /// Interpret the value of a `CI`-style flag; unset or falsey means interactive
    pub fn from_ci_flag(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "1" || v == "yes" => TrackingEnv::Ci,
            _ => TrackingEnv::Interactive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEnv::Interactive => "interactive",
            TrackingEnv::Ci => "ci",
        }
    }
}

impl fmt::Display for TrackingEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interactive" => Ok(TrackingEnv::Interactive),
            "ci" => Ok(TrackingEnv::Ci),
            other => Err(format!("Unknown tracking environment: {}", other)),
        }
    }
}

/// Project names for each tracking environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNamespace {
    pub interactive: String,
    pub ci: String,
}

impl ProjectNamespace {
    /// The single project every step of one workflow uses
    pub fn resolve(&self, env: TrackingEnv) -> &str {
        match env {
            TrackingEnv::Interactive => &self.interactive,
            TrackingEnv::Ci => &self.ci,
        }
    }
}

impl Default for ProjectNamespace {
    fn default() -> Self {
        Self {
            interactive: "fsdl-testing-2022".to_string(),
            ci: "fsdl-testing-2022-ci".to_string(),
        }
    }
}

/// Account selector passed to the tracking scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(String);

impl Entity {
    /// Sentinel understood by the scripts as "the logged-in default entity"
    pub const DEFAULT: &'static str = "DEFAULT";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable name a staged model is registered under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StagedModelName(String);

impl StagedModelName {
    pub fn parse(name: &str) -> Result<Self, String> {
        if name.is_empty() {
            return Err("Staged model name cannot be empty".to_string());
        }
        if name.chars().any(|c| c == '/' || c == ':' || c.is_whitespace()) {
            return Err(format!(
                "Staged model name {:?} must not contain '/', ':' or whitespace",
                name
            ));
        }
        if name == "." || name == ".." {
            return Err(format!("Staged model name {:?} is not a valid directory name", name));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagedModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StagedModelName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StagedModelName> for String {
    fn from(name: StagedModelName) -> Self {
        name.0
    }
}
