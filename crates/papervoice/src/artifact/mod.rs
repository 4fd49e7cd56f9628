//! Audio artifact registry with a 24-hour time-to-live.
//!
//! Expiry is enforced lazily on read; a background reaper owned by the
//! deployment additionally sweeps the audio directory, but retrieval
//! must never hand out an expired artifact even if the reaper is late.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;

/// Default artifact retention window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A synthesized audio file for a completed job.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Tracks at most one artifact per job id.
///
/// The cache evicts entries after the TTL; retrieval additionally
/// checks file age so artifacts surviving a process restart (cache
/// miss, file still on disk) expire on the same schedule.
pub struct ArtifactStore {
    cache: Cache<String, AudioArtifact>,
    ttl: chrono::Duration,
    audio_directory: PathBuf,
}

impl ArtifactStore {
    pub fn new(audio_directory: PathBuf, ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).build();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        Self {
            cache,
            ttl,
            audio_directory,
        }
    }

    /// Destination path for a job's audio file.
    pub fn audio_path(&self, job_id: &str) -> PathBuf {
        self.audio_directory.join(format!("{}_audio.wav", job_id))
    }

    /// Records the artifact written for `job_id` by the synthesis
    /// collaborator. Called exactly once per completed job.
    pub fn register(&self, job_id: &str) -> AudioArtifact {
        let artifact = AudioArtifact {
            path: self.audio_path(job_id),
            created_at: Utc::now(),
        };
        self.cache.insert(job_id.to_string(), artifact.clone());
        artifact
    }

    /// Returns the artifact for a completed job, or `None` if it never
    /// existed or has expired. Expired artifacts are deleted on read.
    pub fn retrieve(&self, job_id: &str) -> Option<AudioArtifact> {
        if let Some(artifact) = self.cache.get(job_id) {
            if self.is_expired(&artifact) {
                self.cache.invalidate(job_id);
                remove_expired_file(&artifact.path);
                return None;
            }
            if !artifact.path.exists() {
                self.cache.invalidate(job_id);
                return None;
            }
            return Some(artifact);
        }

        // Cache miss — the process may have restarted. Fall back to the
        // file's own age.
        let path = self.audio_path(job_id);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let created_at = DateTime::<Utc>::from(modified);
        let artifact = AudioArtifact { path, created_at };

        if self.is_expired(&artifact) {
            remove_expired_file(&artifact.path);
            return None;
        }

        self.cache.insert(job_id.to_string(), artifact.clone());
        Some(artifact)
    }

    fn is_expired(&self, artifact: &AudioArtifact) -> bool {
        Utc::now() - artifact.created_at > self.ttl
    }
}

fn remove_expired_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::info!("Removed expired audio artifact {:?}", path.file_name()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove expired artifact: {}", e),
    }
}
