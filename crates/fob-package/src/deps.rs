//! External dependency tracking.
//!
//! Every package a generated file imports is left out of the bundle and
//! resolved by the runtime that loads it. [`DependencySet`] accumulates those
//! names across all generation calls of one request.

use indexmap::IndexMap;
use serde_json::Value;

use crate::generator::GeneratorOutput;

/// Framework runtime packages that are never inlined.
pub const BASELINE_EXTERNALS: [&str; 4] = [
    "react",
    "react-dom",
    "react-router-dom",
    "react/jsx-runtime",
];

/// Unique package names declared by generators, in first-seen order.
///
/// Names are the identity. When a package is declared again with a different
/// version descriptor the first descriptor wins and the conflict is logged.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    packages: IndexMap<String, Value>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every dependency declared by one generator call.
    pub fn merge(&mut self, output: &GeneratorOutput) {
        for (name, version) in &output.dependencies {
            self.insert(name, version);
        }
    }

    /// Declare one package.
    ///
    /// # Arguments
    ///
    /// * `name` - npm package name; this is what reaches the bundler.
    /// * `version` - The generator's version descriptor, kept as given.
    ///
    /// A name that is already present keeps its first descriptor. A
    /// different descriptor for it is logged at `warn` and dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fob_package::DependencySet;
    /// use serde_json::json;
    ///
    /// let mut deps = DependencySet::new();
    /// deps.insert("react-helmet", &json!("^6.1.0"));
    /// deps.insert("react-helmet", &json!("^5.0.0"));
    ///
    /// assert_eq!(deps.len(), 1);
    /// assert!(deps.externals().contains(&"react-helmet".to_string()));
    /// ```
    pub fn insert(&mut self, name: &str, version: &Value) {
        match self.packages.get(name) {
            Some(existing) if existing != version => {
                tracing::warn!(
                    package = name,
                    kept = %existing,
                    ignored = %version,
                    "dependency declared with conflicting versions"
                );
            }
            Some(_) => {}
            None => {
                self.packages.insert(name.to_string(), version.clone());
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Names declared by generators, excluding the baseline.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// The bundler exclusion list: baseline first, then declared names.
    pub fn externals(&self) -> Vec<String> {
        let mut externals: Vec<String> = BASELINE_EXTERNALS.iter().map(|s| s.to_string()).collect();
        for name in self.names() {
            if !externals.iter().any(|e| e == name) {
                externals.push(name.to_string());
            }
        }
        externals
    }
}
