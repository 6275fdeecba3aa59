//! Archive extraction collaborator and registry.
//!
//! Unarchivers are selected by archive file name. The registry keeps them in
//! registration order and hands out the first one that accepts a file.

use std::path::Path;
use std::sync::Arc;

use crate::Result;

/// Unpacks one family of archive formats.
pub trait Unarchiver: Send + Sync {
    /// Unarchiver name (e.g. "tar.gz", "zip").
    fn name(&self) -> &'static str;

    /// Whether this unarchiver understands `archive`, judged by its file name.
    fn can_handle(&self, archive: &Path) -> bool;

    /// Extract every entry of `archive` into the existing directory `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Extraction`] if the archive cannot be read or an
    /// entry cannot be written.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Case-insensitive file-name suffix check shared by unarchivers.
#[must_use]
pub fn has_suffix(archive: &Path, suffixes: &[&str]) -> bool {
    archive
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .is_some_and(|name| suffixes.iter().any(|s| name.ends_with(s)))
}

/// Ordered collection of unarchivers.
#[derive(Default, Clone)]
pub struct UnarchiverRegistry {
    unarchivers: Vec<Arc<dyn Unarchiver>>,
}

impl UnarchiverRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unarchiver.
    ///
    /// An unarchiver with the same name is replaced in place.
    pub fn register<U: Unarchiver + 'static>(&mut self, unarchiver: U) {
        self.register_arc(Arc::new(unarchiver));
    }

    /// Register an unarchiver wrapped in Arc.
    pub fn register_arc(&mut self, unarchiver: Arc<dyn Unarchiver>) {
        let name = unarchiver.name();
        if let Some(slot) = self.unarchivers.iter_mut().find(|u| u.name() == name) {
            *slot = unarchiver;
        } else {
            self.unarchivers.push(unarchiver);
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<U: Unarchiver + 'static>(mut self, unarchiver: U) -> Self {
        self.register(unarchiver);
        self
    }

    /// Get an unarchiver by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Unarchiver>> {
        self.unarchivers.iter().find(|u| u.name() == name)
    }

    /// Find the first unarchiver that can handle `archive`.
    #[must_use]
    pub fn find_for(&self, archive: &Path) -> Option<&Arc<dyn Unarchiver>> {
        self.unarchivers.iter().find(|u| u.can_handle(archive))
    }

    /// Number of registered unarchivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.unarchivers.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unarchivers.is_empty()
    }

    /// Names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.unarchivers.iter().map(|u| u.name()).collect()
    }
}

impl std::fmt::Debug for UnarchiverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnarchiverRegistry")
            .field("unarchivers", &self.names())
            .finish()
    }
}
