//! User-profile cache management
//!
//! The spawned office process needs an isolated user profile directory so it
//! never fights a desktop instance over the same lock files. First-run
//! profile generation is slow, so an optional persisted copy is seeded into
//! the working profile before spawn and captured back once after the first
//! successful connection.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::error::ProfileError;

/// Name of the profile subdirectory inside the working directory; mirrors
/// the `<install>/user` layout the office expects under `UserInstallation`
const PROFILE_SUBDIR: &str = "user";

/// Manages the working directory and optional persisted profile copy
pub struct ProfileCache {
    /// Whether the persisted copy is used at all
    use_cache: bool,

    /// Explicitly configured persisted profile root; when None the
    /// platform-specific search order applies
    explicit_cache_path: Option<PathBuf>,

    /// Lazily created unique temp directory owned by this cache
    working_dir: Option<PathBuf>,

    /// Set once a copy in either direction has occurred; guards the
    /// one-time copy-back in [`ProfileCache::cache_profile`]
    profile_cached: bool,
}

impl ProfileCache {
    pub fn new(use_cache: bool) -> Self {
        Self {
            use_cache,
            explicit_cache_path: None,
            working_dir: None,
            profile_cached: false,
        }
    }

    /// Use an explicit persisted profile root instead of the search order
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_cache_path = Some(path.into());
        self
    }

    /// Whether a profile copy has already occurred
    pub fn profile_cached(&self) -> bool {
        self.profile_cached
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Lazily create and return the unique working directory
    ///
    /// Idempotent; failure is fatal because the spawned process's profile
    /// cannot be isolated without it.
    pub fn working_dir(&mut self) -> Result<PathBuf, ProfileError> {
        if let Some(dir) = &self.working_dir {
            return Ok(dir.clone());
        }

        let dir = std::env::temp_dir().join(format!(
            "uno-session-{}",
            uuid::Uuid::new_v4().simple()
        ));
        fs::create_dir_all(&dir).map_err(|source| ProfileError::WorkingDirCreation {
            path: dir.clone(),
            source,
        })?;

        debug!("Created working directory: {}", dir.display());
        self.working_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Path of the working profile root (`<working_dir>/user`)
    pub fn working_profile_dir(&mut self) -> Result<PathBuf, ProfileError> {
        Ok(self.working_dir()?.join(PROFILE_SUBDIR))
    }

    /// Resolve the persisted cache path
    ///
    /// An explicit path wins; otherwise the first existing, readable
    /// candidate from the platform-specific, version-qualified search order.
    pub fn resolve_cache_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_cache_path {
            return Some(path.clone());
        }

        for candidate in Self::candidate_cache_paths() {
            if candidate.is_dir() && fs::read_dir(&candidate).is_ok() {
                debug!("Resolved profile cache path: {}", candidate.display());
                return Some(candidate);
            }
        }
        None
    }

    /// Ordered candidate directories under the OS-conventional
    /// application-data location, newest profile version first
    fn candidate_cache_paths() -> Vec<PathBuf> {
        let Some(config_dir) = dirs::config_dir() else {
            return Vec::new();
        };

        let relative: &[&str] = if cfg!(target_os = "windows") || cfg!(target_os = "macos") {
            &["LibreOffice/5/user", "LibreOffice/4/user"]
        } else {
            &["libreoffice/5/user", "libreoffice/4/user"]
        };

        relative.iter().map(|rel| config_dir.join(rel)).collect()
    }

    /// Seed the working profile from the persisted cache
    ///
    /// Must run before the office process starts. No-op when caching is
    /// disabled or nothing resolves. When the persisted copy exists it is
    /// copied in and `profile_cached` is set; otherwise an empty working
    /// profile is created and the first-run state will be captured later by
    /// [`ProfileCache::cache_profile`].
    pub fn copy_cache_to_profile(&mut self) -> Result<(), ProfileError> {
        if !self.use_cache {
            return Ok(());
        }
        let Some(cache_path) = self.resolve_cache_path() else {
            debug!("No profile cache path resolved; starting with a fresh profile");
            return Ok(());
        };

        let profile_dir = self.working_profile_dir()?;

        if cache_path.is_dir() {
            info!(
                "Seeding working profile from cache: {} -> {}",
                cache_path.display(),
                profile_dir.display()
            );
            copy_tree_atomic(&cache_path, &profile_dir)?;
            self.profile_cached = true;
        } else if cache_path.exists() {
            return Err(ProfileError::CachePathNotDirectory { path: cache_path });
        } else {
            debug!(
                "Profile cache {} does not exist yet; creating empty working profile",
                cache_path.display()
            );
            fs::create_dir_all(&profile_dir)?;
        }

        Ok(())
    }

    /// Capture the live working profile back into the persisted cache
    ///
    /// Must run after a successful connection, so the copy reflects
    /// first-run state. One-time: guarded by `profile_cached`.
    pub fn cache_profile(&mut self) -> Result<(), ProfileError> {
        if !self.use_cache || self.profile_cached {
            return Ok(());
        }
        let Some(cache_path) = self.resolve_cache_path() else {
            return Ok(());
        };

        let profile_dir = self.working_profile_dir()?;
        if !profile_dir.is_dir() {
            debug!("Working profile not populated yet; skipping cache capture");
            return Ok(());
        }

        info!(
            "Caching profile: {} -> {}",
            profile_dir.display(),
            cache_path.display()
        );
        copy_tree_atomic(&profile_dir, &cache_path)?;
        self.profile_cached = true;
        Ok(())
    }

    /// Environment overrides for the spawned process when caching is active
    ///
    /// The office temp-dir variable is redirected into the working directory
    /// so cached first-run state never references shared system temp paths.
    pub fn env_overrides(&mut self) -> Result<HashMap<String, String>, ProfileError> {
        if !self.use_cache {
            return Ok(HashMap::new());
        }

        let tmp = self.working_dir()?.join("tmp");
        fs::create_dir_all(&tmp)?;

        let var = if cfg!(target_os = "windows") {
            "TEMP"
        } else {
            "TMPDIR"
        };
        Ok(HashMap::from([(
            var.to_string(),
            tmp.to_string_lossy().to_string(),
        )]))
    }

    /// Best-effort recursive removal of the working directory
    ///
    /// Called on teardown; never fatal.
    pub fn delete_working_dir(&mut self) {
        if let Some(dir) = self.working_dir.take() {
            match fs::remove_dir_all(&dir) {
                Ok(()) => debug!("Removed working directory: {}", dir.display()),
                Err(e) => warn!(
                    "Failed to remove working directory {}: {}",
                    dir.display(),
                    e
                ),
            }
        }
    }
}

/// Recursively copy `src` into `dst`, staging into a temporary sibling and
/// renaming into place so other processes never observe a half-populated
/// `dst`. An existing `dst` is replaced.
fn copy_tree_atomic(src: &Path, dst: &Path) -> Result<(), ProfileError> {
    let wrap = |source: std::io::Error| ProfileError::CopyFailed {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };

    let parent = dst
        .parent()
        .ok_or_else(|| wrap(std::io::Error::other("destination has no parent")))?;
    fs::create_dir_all(parent).map_err(wrap)?;

    let staging = parent.join(format!(
        ".{}.partial-{}",
        dst.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "profile".to_string()),
        uuid::Uuid::new_v4().simple()
    ));

    let result = copy_tree(src, &staging).and_then(|()| {
        if dst.exists() {
            fs::remove_dir_all(dst)?;
        }
        fs::rename(&staging, dst)
    });

    match result {
        Ok(()) => Ok(()),
        Err(source) => {
            // Leave no stale staging directory behind
            let _ = fs::remove_dir_all(&staging);
            Err(wrap(source))
        }
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<(), std::io::Error> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel_path = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let dst_path = dst.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst_path)?;
        } else {
            fs::copy(entry.path(), &dst_path)?;
        }
    }
    Ok(())
}
