//! Request-scoped scratch directories.
//!
//! Each build gets its own directory under a shared root so concurrent
//! requests never read or overwrite each other's files. Generated files are
//! written with names derived from the generator output, which are validated
//! to stay inside the directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;
use tokio::fs;

use crate::generator::GeneratedFile;
use crate::naming::camel_case_to_dash_case;

/// File name of the combined bundler output inside a workspace.
pub const BUNDLE_FILE_NAME: &str = "bundle.js";

/// Extension used for component source modules (and thus the entry file).
pub const COMPONENT_EXTENSION: &str = "jsx";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid generated file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: &'static str },
}

/// Create `path` (and parents) if it does not exist yet.
pub async fn ensure(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await
}

/// Recursively remove `path`. A directory that is already gone is success.
pub async fn destroy(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// A scratch directory owned by one request.
///
/// The directory is removed by [`Workspace::destroy`]. A workspace dropped
/// without being destroyed (for example when the build future is cancelled)
/// removes its directory synchronously in `Drop`.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    destroyed: bool,
}

impl Workspace {
    /// Allocate a fresh directory `{root}/{uuid}` and create it.
    pub async fn create(root: &Path) -> Result<Self, WorkspaceError> {
        let dir = root.join(uuid::Uuid::new_v4().to_string()).clean();
        ensure(&dir).await.map_err(|source| WorkspaceError::Create {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            destroyed: false,
        })
    }

    /// The workspace directory, `{root}/{uuid}`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::path::Path;
    /// use fob_package::Workspace;
    ///
    /// # async fn example() -> Result<(), fob_package::WorkspaceError> {
    /// let workspace = Workspace::create(Path::new("/tmp/build")).await?;
    /// assert!(workspace.path().starts_with("/tmp/build"));
    /// workspace.destroy().await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry file for the component named `entry`.
    pub fn entry_path(&self, entry: &str) -> PathBuf {
        self.dir.join(format!(
            "{}.{}",
            camel_case_to_dash_case(entry),
            COMPONENT_EXTENSION
        ))
    }

    /// Fixed path the bundler writes its combined output to.
    pub fn bundle_path(&self) -> PathBuf {
        self.dir.join(BUNDLE_FILE_NAME)
    }

    /// Write a generated file as `{name}.{extension}` and return its path.
    pub async fn write(&self, file: &GeneratedFile) -> Result<PathBuf, WorkspaceError> {
        let path = self.file_path(&file.name, file.file_type.extension())?;
        fs::write(&path, file.content.as_bytes())
            .await
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "wrote generated file");
        Ok(path)
    }

    /// Read a file that lives in this workspace.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, WorkspaceError> {
        fs::read(path).await.map_err(|source| WorkspaceError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Remove the directory and everything in it.
    ///
    /// Failures are logged, never returned.
    pub async fn destroy(mut self) {
        self.destroyed = true;
        if let Err(e) = destroy(&self.dir).await {
            tracing::warn!(
                path = %self.dir.display(),
                error = %e,
                "failed to clean up workspace"
            );
        }
    }

    fn file_path(&self, name: &str, extension: &str) -> Result<PathBuf, WorkspaceError> {
        validate_file_name(name)?;
        validate_file_name(extension)?;

        let path = self.dir.join(format!("{name}.{extension}")).clean();
        if path.parent() != Some(self.dir.as_path()) {
            return Err(WorkspaceError::InvalidFileName {
                name: name.to_string(),
                reason: "resolves outside the workspace",
            });
        }
        Ok(path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!(path = %self.dir.display(), "removed abandoned workspace"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.dir.display(),
                error = %e,
                "failed to clean up abandoned workspace"
            ),
        }
    }
}

pub(crate) fn validate_file_name(name: &str) -> Result<(), WorkspaceError> {
    let invalid = |reason| {
        Err(WorkspaceError::InvalidFileName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("empty name");
    }
    if name.contains('\0') {
        return invalid("contains a null byte");
    }
    if name.contains('/') || name.contains('\\') {
        return invalid("contains a path separator");
    }
    if Path::new(name)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return invalid("contains a relative path component");
    }
    Ok(())
}
