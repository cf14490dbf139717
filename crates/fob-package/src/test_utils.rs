//! In-memory collaborators for exercising the pipeline without a generator
//! service, a bundler binary or a storage backend.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::bundler::{BundleError, BundleRequest, Bundler};
use crate::description::NormalizedDescription;
use crate::generator::{
    ComponentGenerator, FileType, GenerateError, GeneratedFile, GenerationOptions,
    GeneratorOutput, StyleSheetGenerator,
};
use crate::naming::camel_case_to_dash_case;
use crate::store::{ObjectStore, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded generator call.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub name: String,
    pub options: GenerationOptions,
}

/// Generator that emits one `.jsx` module per component, named after the
/// dash-cased component name, plus `style.css` for the root.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    fail_style_sheet: bool,
    empty_style_sheet: bool,
    failing_components: HashSet<String>,
    stalled_components: HashSet<String>,
    dependencies: IndexMap<String, IndexMap<String, Value>>,
    style_sheet_calls: Mutex<Vec<GenerationCall>>,
    component_calls: Mutex<Vec<GenerationCall>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_style_sheet(mut self) -> Self {
        self.fail_style_sheet = true;
        self
    }

    /// Return no files for the root.
    pub fn empty_style_sheet(mut self) -> Self {
        self.empty_style_sheet = true;
        self
    }

    pub fn failing_component(mut self, name: &str) -> Self {
        self.failing_components.insert(name.to_string());
        self
    }

    /// Never finish generating `name`, as a hung generator service would.
    pub fn stalled_component(mut self, name: &str) -> Self {
        self.stalled_components.insert(name.to_string());
        self
    }

    /// Declare `package@version` whenever `name` (a component or `root`) is
    /// generated.
    pub fn with_dependency(mut self, name: &str, package: &str, version: Value) -> Self {
        self.dependencies
            .entry(name.to_string())
            .or_default()
            .insert(package.to_string(), version);
        self
    }

    pub fn style_sheet_calls(&self) -> Vec<GenerationCall> {
        lock(&self.style_sheet_calls).clone()
    }

    pub fn component_calls(&self) -> Vec<GenerationCall> {
        lock(&self.component_calls).clone()
    }

    fn dependencies_of(&self, name: &str) -> IndexMap<String, Value> {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl StyleSheetGenerator for FakeGenerator {
    async fn generate_style_sheet(
        &self,
        root: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError> {
        lock(&self.style_sheet_calls).push(GenerationCall {
            name: root.name().to_string(),
            options: options.clone(),
        });

        if self.fail_style_sheet {
            return Err(GenerateError::Other("style sheet generator unavailable".into()));
        }
        if self.empty_style_sheet {
            return Ok(GeneratorOutput::default());
        }

        Ok(GeneratorOutput {
            files: vec![GeneratedFile {
                name: crate::generator::STYLE_SHEET_FILE_NAME.to_string(),
                file_type: FileType::Css,
                content: ":root { --generated: 1; }".to_string(),
            }],
            dependencies: self.dependencies_of(root.name()),
        })
    }
}

#[async_trait]
impl ComponentGenerator for FakeGenerator {
    async fn generate_component(
        &self,
        component: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError> {
        let name = component.name().to_string();
        lock(&self.component_calls).push(GenerationCall {
            name: name.clone(),
            options: options.clone(),
        });

        if self.stalled_components.contains(&name) {
            std::future::pending::<()>().await;
        }
        if self.failing_components.contains(&name) {
            return Err(GenerateError::Other(format!("cannot generate {name}")));
        }

        Ok(GeneratorOutput {
            files: vec![GeneratedFile {
                name: camel_case_to_dash_case(&name),
                file_type: FileType::Js,
                content: format!("export default function {name}() {{ return null; }}\n"),
            }],
            dependencies: self.dependencies_of(&name),
        })
    }
}

/// Bundler that copies the entry module to the output file.
#[derive(Debug, Default)]
pub struct FakeBundler {
    fail: bool,
    requests: Mutex<Vec<BundleRequest>>,
}

impl FakeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<BundleRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<(), BundleError> {
        lock(&self.requests).push(request.clone());

        if self.fail {
            return Err(BundleError::Engine("bundler crashed".into()));
        }

        let source = tokio::fs::read(&request.entry)
            .await
            .map_err(|_| BundleError::EntryNotFound(request.entry.clone()))?;
        tokio::fs::write(&request.outfile, source)
            .await
            .map_err(|source| BundleError::Write {
                path: request.outfile.clone(),
                source,
            })
    }
}

/// Object store that keeps uploads in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fail: bool,
    objects: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn objects(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.objects).clone()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, bytes)| bytes.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Io {
                path: PathBuf::from(key),
                source: std::io::Error::other("storage unavailable"),
            });
        }
        lock(&self.objects).push((key.to_string(), bytes));
        Ok(())
    }
}
