use std::io;
use std::path::{Component, Path, PathBuf};

use rand::Rng;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EngineError, Resource, Result};

/// The filesystem operations volume allocation needs.
pub trait VolumeFs {
    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl VolumeFs for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}

/// Hands out fresh directories under `<base>/<owner_id>/`.
///
/// `<base>/<owner_id>` is the owner's volume namespace: the materializer
/// refuses bind mounts from anywhere else.
pub struct VolumeAllocator<'a> {
    fs: &'a dyn VolumeFs,
    base: PathBuf,
    attempts: u32,
    id_len: usize,
}

impl<'a> VolumeAllocator<'a> {
    pub fn new(fs: &'a dyn VolumeFs, base: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            base: base.into(),
            attempts: 50,
            id_len: 16,
        }
    }

    pub fn from_config(fs: &'a dyn VolumeFs, config: &Config) -> Self {
        Self {
            fs,
            base: config.volume_base_path.clone(),
            attempts: config.volume_attempts,
            id_len: config.volume_id_length,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn owner_root(&self, owner_id: u32) -> PathBuf {
        owner_root(&self.base, owner_id)
    }

    pub fn contains(&self, owner_id: u32, path: &Path) -> bool {
        in_owner_namespace(&self.base, owner_id, path)
    }

    pub fn generate_free_volume(&self, owner_id: u32) -> Result<PathBuf> {
        self.generate_free_volume_with(owner_id, &mut rand::rng())
    }

    pub fn generate_free_volume_with<R: Rng>(
        &self,
        owner_id: u32,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let root = self.owner_root(owner_id);
        for attempt in 1..=self.attempts {
            let candidate = root.join(random_id(rng, self.id_len));
            if self.fs.exists(&candidate) {
                debug!(path = %candidate.display(), attempt, "volume id taken");
                continue;
            }
            self.fs.create_dir_all(&candidate)?;
            info!(owner_id, path = %candidate.display(), "allocated volume");
            return Ok(candidate);
        }
        Err(EngineError::Exhausted {
            resource: Resource::Volume,
            attempts: self.attempts,
        })
    }

    /// Remove one volume directory. Missing directories are fine.
    pub fn delete_volume(&self, path: &Path) -> Result<()> {
        if !is_strictly_under(&self.base, path) {
            return Err(EngineError::Permission(format!(
                "{} is outside the allowed directory {}",
                path.display(),
                self.base.display()
            )));
        }
        self.remove(path)
    }

    /// Remove the owner's whole namespace.
    pub fn delete_owner_volumes(&self, owner_id: u32) -> Result<()> {
        self.remove(&self.owner_root(owner_id))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if !self.fs.exists(path) {
            return Ok(());
        }
        self.fs.remove_dir_all(path)?;
        info!(path = %path.display(), "deleted volume");
        Ok(())
    }
}

pub fn owner_root(base: &Path, owner_id: u32) -> PathBuf {
    base.join(owner_id.to_string())
}

/// Whether `path` lies strictly inside `<base>/<owner_id>`.
///
/// Lexical check: paths with `..` components are never contained.
pub fn in_owner_namespace(base: &Path, owner_id: u32, path: &Path) -> bool {
    is_strictly_under(&owner_root(base, owner_id), path)
}

fn random_id<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

fn is_strictly_under(root: &Path, path: &Path) -> bool {
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return false;
    }
    match path.strip_prefix(root) {
        Ok(rest) => rest.components().next().is_some(),
        Err(_) => false,
    }
}
