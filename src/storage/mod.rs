//! Artifact storage
//!
//! Generated images and videos live in a single output directory under
//! randomized names and are removed by the [`Janitor`] after their TTL.

pub mod janitor;

pub use janitor::Janitor;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Attempts at finding an unused artifact name before giving up
const NAME_ATTEMPTS: usize = 8;

/// Kind of deliverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Still PNG image
    Image,
    /// MP4 animation
    Video,
}

impl ArtifactKind {
    /// Filename prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "brat",
            ArtifactKind::Video => "bratvid",
        }
    }

    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Video => "mp4",
        }
    }

    /// Generate a fresh random filename for this kind
    pub fn random_name(&self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}.{}", self.prefix(), &id[..8], self.extension())
    }
}

/// A file exposed to clients through the download endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// What was produced
    pub kind: ArtifactKind,
    /// Name under the output directory
    pub file_name: String,
    /// Full path on disk
    pub path: PathBuf,
}

/// Output directory plus its deletion scheduler
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    janitor: Janitor,
}

impl ArtifactStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>, janitor: Janitor) -> Self {
        Self {
            dir: dir.into(),
            janitor,
        }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletion scheduler
    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    /// Reserve a name that does not exist yet. Used when another process
    /// (the encoder) writes the file.
    pub fn allocate(&self, kind: ArtifactKind) -> Result<Artifact> {
        for _ in 0..NAME_ATTEMPTS {
            let file_name = kind.random_name();
            let path = self.dir.join(&file_name);
            if !path.exists() {
                return Ok(Artifact {
                    kind,
                    file_name,
                    path,
                });
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "could not allocate a unique artifact name",
        )
        .into())
    }

    /// Write `bytes` to a new uniquely named file and schedule its deletion
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn persist(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<Artifact> {
        for _ in 0..NAME_ATTEMPTS {
            let file_name = kind.random_name();
            let path = self.dir.join(&file_name);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };

            if let Err(err) = write_all(&mut file, bytes).await {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(err.into());
            }

            let artifact = Artifact {
                kind,
                file_name,
                path,
            };
            self.publish(&artifact);
            return Ok(artifact);
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "could not allocate a unique artifact name",
        )
        .into())
    }

    /// Start the deletion timer of an artifact that is fully written
    pub fn publish(&self, artifact: &Artifact) {
        debug!("Publishing {}", artifact.file_name);
        self.janitor.schedule(&artifact.path);
    }

    /// Read an artifact by name. Unknown names, and names that are not a
    /// plain file name, yield `None`.
    ///
    /// A pending deletion is pushed back so the file outlives the read.
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if !is_plain_file_name(name) {
            return Ok(None);
        }

        let path = self.dir.join(name);
        self.janitor.reschedule(&path);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

async fn write_all(file: &mut tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Accepts single path components only
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn store(dir: &Path) -> ArtifactStore {
        ArtifactStore::new(dir, Janitor::new(Duration::from_secs(600)))
    }

    #[test]
    fn test_random_name_format() {
        let name = ArtifactKind::Image.random_name();
        assert!(name.starts_with("brat_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "brat_".len() + 8 + ".png".len());

        let video = ArtifactKind::Video.random_name();
        assert!(video.starts_with("bratvid_"));
        assert!(video.ends_with(".mp4"));
    }

    #[test]
    fn test_kind_metadata() {
        assert_eq!(ArtifactKind::Image.extension(), "png");
        assert_eq!(ArtifactKind::Video.prefix(), "bratvid");
        assert_eq!(
            serde_json::to_string(&ArtifactKind::Video).unwrap(),
            "\"video\""
        );
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("brat_1234abcd.png"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("../etc/passwd"));
        assert!(!is_plain_file_name("a/b.png"));
        assert!(!is_plain_file_name("a\\b.png"));
    }

    #[tokio::test]
    async fn test_persist_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let artifact = store
            .persist(ArtifactKind::Image, b"\x89PNG\r\n\x1a\nrest")
            .await
            .unwrap();
        assert_eq!(artifact.path, dir.path().join(&artifact.file_name));
        assert!(store.janitor().is_pending(&artifact.path));

        let bytes = store.read(&artifact.file_name).await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"\x89PNG\r\n\x1a\nrest"[..]));
    }

    #[tokio::test]
    async fn test_read_postpones_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), Janitor::new(Duration::from_millis(400)));

        let artifact = store.persist(ArtifactKind::Video, b"mp4").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.read(&artifact.file_name).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(artifact.path.exists());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!artifact.path.exists());
        assert!(store.read(&artifact.file_name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_unknown_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert!(store.read("brat_00000000.png").await.unwrap().is_none());
        assert!(store.read("../Cargo.toml").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_allocate_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let artifact = store.allocate(ArtifactKind::Video).unwrap();
        assert!(!artifact.path.exists());
        assert!(!store.janitor().is_pending(&artifact.path));
    }

    #[tokio::test]
    async fn test_persisted_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let mut names = HashSet::new();
        for _ in 0..200 {
            let artifact = store.persist(ArtifactKind::Image, b"x").await.unwrap();
            assert!(names.insert(artifact.file_name));
        }
        store.janitor().shutdown();
    }
}
