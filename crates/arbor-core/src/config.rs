//! Diff options, loadable from `arbor.toml`

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "arbor.toml";

/// Tunables for normalization, matching and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Minimum similarity for two same-kind subtrees to be paired as Updated.
    pub similarity_threshold: f64,
    /// Smallest subtree eligible as a hash anchor.
    pub min_anchor_size: u32,
    /// Ceiling on `old_children * new_children` for one sibling alignment.
    pub max_sibling_cells: usize,
    /// Total node visits the refinement phase may spend.
    pub node_visit_budget: u64,
    /// Wall-clock ceiling for the refinement phase.
    pub time_budget_ms: u64,
    /// Hash local identifiers by scope coordinate instead of name.
    pub alpha_rename: bool,
    /// Align top-level statements by hash only.
    pub line_mode: bool,
    /// Globals whose bare reads are stable across versions.
    pub stable_globals: Vec<String>,
    /// Functions whose call result is unknown by policy.
    pub import_functions: Vec<String>,
    /// Host globals that never count as unresolved references.
    pub builtin_globals: Vec<String>,
}

impl DiffOptions {
    pub fn new() -> Self {
        DiffOptions {
            similarity_threshold: 0.5,
            min_anchor_size: 2,
            max_sibling_cells: 250_000,
            node_visit_budget: 5_000_000,
            time_budget_ms: 10_000,
            alpha_rename: false,
            line_mode: false,
            stable_globals: to_strings(&["module", "exports"]),
            import_functions: to_strings(&["require", "import", "__import__", "importlib.import_module"]),
            builtin_globals: to_strings(DEFAULT_BUILTINS),
        }
    }

    /// Parse options from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let options: DiffOptions = toml::from_str(text).map_err(|source| ConfigError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load `arbor.toml` from `dir` if present, else defaults.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Loading options from {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::new())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) || self.similarity_threshold.is_nan() {
            return Err(ConfigError::InvalidOption {
                name: "similarity_threshold",
                reason: format!("{} is outside [0, 1]", self.similarity_threshold),
            });
        }
        if self.min_anchor_size == 0 {
            return Err(ConfigError::InvalidOption {
                name: "min_anchor_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_sibling_cells == 0 {
            return Err(ConfigError::InvalidOption {
                name: "max_sibling_cells",
                reason: "must be positive".to_string(),
            });
        }
        if self.node_visit_budget == 0 {
            return Err(ConfigError::InvalidOption {
                name: "node_visit_budget",
                reason: "must be positive".to_string(),
            });
        }
        if self.time_budget_ms == 0 {
            return Err(ConfigError::InvalidOption {
                name: "time_budget_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_stable_global(&self, name: &str) -> bool {
        self.stable_globals.iter().any(|g| g == name)
    }

    pub fn is_import_function(&self, name: &str) -> bool {
        self.import_functions.iter().any(|f| f == name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.is_stable_global(name)
            || self.is_import_function(name)
            || self.builtin_globals.iter().any(|g| g == name)
    }
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_BUILTINS: &[&str] = &[
    // JavaScript hosts
    "arguments", "Array", "Boolean", "Buffer", "clearInterval", "clearTimeout", "console",
    "Date", "decodeURIComponent", "document", "encodeURIComponent", "Error", "eval",
    "global", "globalThis", "Infinity", "isNaN", "JSON", "Map", "Math", "NaN", "Number",
    "Object", "parseFloat", "parseInt", "process", "Promise", "RangeError", "Reflect",
    "RegExp", "Set", "setImmediate", "setInterval", "setTimeout", "String", "Symbol",
    "SyntaxError", "TypeError", "undefined", "WeakMap", "window", "__dirname", "__filename",
    // Python builtins
    "print", "len", "range", "str", "int", "float", "dict", "list", "set", "tuple", "open",
    "isinstance", "super", "self", "None", "Exception", "ValueError", "KeyError",
    "enumerate", "zip", "map", "filter", "sorted", "min", "max", "sum", "any", "all",
];
