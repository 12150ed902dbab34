//! # Generation Inputs
//!
//! Facts the generation pipeline knows before policy resolution: the module
//! universe, which module headers include which, and optionally the
//! introspected symbol table used to validate rule targets.
//!
//! Files are YAML or JSON. A bare JSON array of module names (the
//! generator's module list) is accepted as a modules-only input.

use std::path::Path;

use bindcfg_core::IntrospectedSymbol;
use bindcfg_graph::ModuleEdge;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Module universe, dependency facts and introspected symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationInputs {
    /// Known modules, including ones without dependencies.
    pub modules: Vec<String>,
    /// Non-guard include facts: `from`'s header includes `to`'s.
    pub dependencies: Vec<ModuleEdge>,
    /// Introspected symbols. Empty disables target validation.
    pub symbols: Vec<IntrospectedSymbol>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputsDocument {
    Modules(Vec<String>),
    Full(GenerationInputs),
}

impl From<InputsDocument> for GenerationInputs {
    fn from(doc: InputsDocument) -> Self {
        match doc {
            InputsDocument::Modules(modules) => Self {
                modules,
                ..Self::default()
            },
            InputsDocument::Full(inputs) => inputs,
        }
    }
}

impl GenerationInputs {
    /// Inputs with only a module list.
    pub fn from_modules<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a dependency fact.
    pub fn with_dependency(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.dependencies.push(ModuleEdge::new(from, to));
        self
    }

    /// Add an introspected symbol.
    pub fn with_symbol(mut self, symbol: IntrospectedSymbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    /// Parse YAML text. JSON is a subset of YAML, so JSON text parses too.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Config`] if the document has the wrong shape.
    pub fn from_yaml_str(text: &str) -> PolicyResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: InputsDocument =
            serde_yaml::from_str(text).map_err(|e| PolicyError::Config(format!("generation inputs: {e}")))?;
        Ok(doc.into())
    }

    /// Load a file; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Io`], [`PolicyError::Json`] or
    /// [`PolicyError::Yaml`].
    pub fn load(path: &Path) -> PolicyResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let doc: InputsDocument = if is_json {
            serde_json::from_str(&text).map_err(|source| PolicyError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else if text.trim().is_empty() {
            return Ok(Self::default());
        } else {
            serde_yaml::from_str(&text).map_err(|source| PolicyError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };
        let inputs: Self = doc.into();
        tracing::debug!(
            path = %path.display(),
            modules = inputs.modules.len(),
            dependencies = inputs.dependencies.len(),
            symbols = inputs.symbols.len(),
            "generation inputs loaded"
        );
        Ok(inputs)
    }
}
