use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::core::EnvironmentMetadata;
use crate::orchestration::DEFINITION_FILE;

/// Name of the metadata record inside every environment directory.
pub const METADATA_FILE: &str = "meta.json";

/// Persistent home of environments, keyed by slug.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    /// Directory holding the environment, whether or not it exists.
    fn project_dir(&self, slug: &str) -> PathBuf;

    /// Slugs of every environment directory, sorted.
    async fn list_slugs(&self) -> io::Result<Vec<String>>;

    async fn exists(&self, slug: &str) -> bool;

    /// Create the environment directory. Fails with
    /// `io::ErrorKind::AlreadyExists` when it is already there.
    async fn create_dir(&self, slug: &str) -> io::Result<()>;

    async fn read_definition(&self, slug: &str) -> io::Result<Option<String>>;

    async fn write_definition(&self, slug: &str, contents: &str) -> io::Result<()>;

    /// Metadata, if present and readable.
    async fn read_metadata(&self, slug: &str) -> Option<EnvironmentMetadata>;

    async fn write_metadata(&self, slug: &str, metadata: &EnvironmentMetadata) -> io::Result<()>;

    /// Remove the environment directory and everything below it.
    async fn remove(&self, slug: &str) -> io::Result<()>;

    async fn has_definition(&self, slug: &str) -> bool {
        matches!(self.read_definition(slug).await, Ok(Some(_)))
    }
}

/// Store laid out as `<root>/<slug>/{docker-compose.yml,meta.json}`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open the store, creating the root directory when missing.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Environment store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn definition_path(&self, slug: &str) -> PathBuf {
        self.project_dir(slug).join(DEFINITION_FILE)
    }

    fn metadata_path(&self, slug: &str) -> PathBuf {
        self.project_dir(slug).join(METADATA_FILE)
    }
}

/// Write through a sibling temporary file so readers never see a torn file.
async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Directory test shared by listing and lookup; follows symlinks.
async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}

#[async_trait]
impl EnvironmentStore for FsStore {
    fn project_dir(&self, slug: &str) -> PathBuf {
        self.root.join(slug)
    }

    async fn list_slugs(&self) -> io::Result<Vec<String>> {
        let mut slugs = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            if !is_dir(&entry.path()).await {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => slugs.push(name),
                Err(name) => warn!(name = ?name, "Skipping directory with a non UTF-8 name"),
            }
        }

        slugs.sort();
        Ok(slugs)
    }

    async fn exists(&self, slug: &str) -> bool {
        is_dir(&self.project_dir(slug)).await
    }

    async fn create_dir(&self, slug: &str) -> io::Result<()> {
        fs::create_dir(self.project_dir(slug)).await
    }

    async fn read_definition(&self, slug: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.definition_path(slug)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_definition(&self, slug: &str, contents: &str) -> io::Result<()> {
        write_atomic(&self.definition_path(slug), contents.as_bytes()).await
    }

    async fn read_metadata(&self, slug: &str) -> Option<EnvironmentMetadata> {
        let raw = fs::read(self.metadata_path(slug)).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(slug, error = %e, "Ignoring unreadable metadata");
                None
            }
        }
    }

    async fn write_metadata(&self, slug: &str, metadata: &EnvironmentMetadata) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(metadata)?;
        write_atomic(&self.metadata_path(slug), &json).await
    }

    async fn remove(&self, slug: &str) -> io::Result<()> {
        fs::remove_dir_all(self.project_dir(slug)).await
    }
}
