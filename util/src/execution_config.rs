use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::languages::Language;

/// Resource ceiling applied to every sandboxed run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecutionLimits {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Passed through to the container runtime, e.g. `"512m"`.
    #[serde(default = "default_max_memory")]
    pub max_memory: String,

    #[serde(default = "default_max_cpus")]
    pub max_cpus: u32,

    #[serde(default = "default_max_processes")]
    pub max_processes: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_memory: default_max_memory(),
            max_cpus: default_max_cpus(),
            max_processes: default_max_processes(),
        }
    }
}

/// Container image used per language.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunnerImages {
    #[serde(default = "default_python_image")]
    pub python: String,
    #[serde(default = "default_gcc_image")]
    pub c: String,
    #[serde(default = "default_gcc_image")]
    pub cpp: String,
    #[serde(default = "default_java_image")]
    pub java: String,
}

impl Default for RunnerImages {
    fn default() -> Self {
        Self {
            python: default_python_image(),
            c: default_gcc_image(),
            cpp: default_gcc_image(),
            java: default_java_image(),
        }
    }
}

impl RunnerImages {
    pub fn image_for(&self, language: Language) -> Option<&str> {
        match language {
            Language::Python => Some(&self.python),
            Language::C => Some(&self.c),
            Language::Cpp => Some(&self.cpp),
            Language::Java => Some(&self.java),
            Language::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GradingOptions {
    /// Upper bound on generated test cases per part.
    #[serde(default = "default_max_test_cases")]
    pub max_test_cases: usize,

    /// Minimum token-overlap score for a fragment/part pair to be accepted.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Ask the oracle whether a program reads stdin instead of relying on
    /// static inspection alone.
    #[serde(default)]
    pub oracle_input_check: bool,

    /// Let the oracle split submissions into programs, falling back to the
    /// heuristic splitter when it fails.
    #[serde(default)]
    pub oracle_split: bool,
}

impl Default for GradingOptions {
    fn default() -> Self {
        Self {
            max_test_cases: default_max_test_cases(),
            match_threshold: default_match_threshold(),
            oracle_input_check: false,
            oracle_split: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub execution: ExecutionLimits,

    #[serde(default)]
    pub images: RunnerImages,

    #[serde(default)]
    pub grading: GradingOptions,
}

impl ExecutionConfig {
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load a config file. Fields missing from the file take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        serde_json::from_str(&contents).map_err(|e| format!("Invalid config JSON format: {e}"))
    }
}

//Default Functions

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_memory() -> String {
    "512m".to_string()
}

fn default_max_cpus() -> u32 {
    1
}

fn default_max_processes() -> u32 {
    64
}

fn default_python_image() -> String {
    "python:3.9-slim".to_string()
}

fn default_gcc_image() -> String {
    "gcc:12".to_string()
}

fn default_java_image() -> String {
    "openjdk:17-slim".to_string()
}

fn default_max_test_cases() -> usize {
    5
}

fn default_match_threshold() -> f64 {
    0.05
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ExecutionConfig =
            serde_json::from_str(r#"{"execution":{"timeout_secs":3},"grading":{"oracle_split":true}}"#)
                .unwrap();
        assert_eq!(cfg.execution.timeout_secs, 3);
        assert_eq!(cfg.execution.max_memory, "512m");
        assert_eq!(cfg.grading.max_test_cases, 5);
        assert!(cfg.grading.oracle_split);
        assert_eq!(cfg.images.image_for(Language::Cpp), Some("gcc:12"));
        assert_eq!(cfg.images.image_for(Language::Unknown), None);
    }

    #[test]
    fn loads_file_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"images":{"python":"python:3.12-slim"}}"#).unwrap();

        let loaded = ExecutionConfig::from_file(&path).unwrap();
        assert_eq!(loaded.images.python, "python:3.12-slim");
        assert_eq!(loaded.execution, ExecutionLimits::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = ExecutionConfig::from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
