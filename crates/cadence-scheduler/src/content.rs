use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SchedulerError;

/// On-disk shape of the content file.
#[derive(Debug, Deserialize)]
struct ContentFile {
    /// Pool of candidate posts. A file without the field is an empty pool,
    /// not a parse error.
    #[serde(default)]
    posts: Vec<String>,
}

/// Reads the post pool from disk.
///
/// The file is re-read at the start of every cycle so edits land without
/// a restart. No state is cached between reads.
#[derive(Debug, Clone)]
pub struct ContentStore {
    path: PathBuf,
}

impl ContentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full candidate pool.
    pub async fn load(&self) -> Result<Vec<String>, SchedulerError> {
        let bytes =
            tokio::fs::read(&self.path)
                .await
                .map_err(|source| SchedulerError::ContentRead {
                    path: self.path.clone(),
                    source,
                })?;

        let file: ContentFile =
            serde_json::from_slice(&bytes).map_err(|source| SchedulerError::ContentParse {
                path: self.path.clone(),
                source,
            })?;

        Ok(file.posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_content(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("posts.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn load_returns_posts_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_content(&dir, r#"{"posts": ["first", "second", "third"]}"#);

        let store = ContentStore::new(path);
        let posts = store.load().await.unwrap();

        assert_eq!(posts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn missing_posts_field_is_an_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_content(&dir, r#"{"author": "nobody"}"#);

        let store = ContentStore::new(path);
        let posts = store.load().await.unwrap();

        assert_eq!(posts, Vec::<String>::new());
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_content(&dir, "{not json");

        let store = ContentStore::new(path);
        let err = store.load().await.unwrap_err();

        assert!(matches!(err, SchedulerError::ContentParse { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");

        let store = ContentStore::new(path);
        let err = store.load().await.unwrap_err();

        assert!(matches!(err, SchedulerError::ContentRead { .. }));
    }

    #[tokio::test]
    async fn picks_up_edits_between_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_content(&dir, r#"{"posts": ["only"]}"#);

        let store = ContentStore::new(&path);
        assert_eq!(store.load().await.unwrap().len(), 1);

        std::fs::write(&path, r#"{"posts": ["one", "two"]}"#).unwrap();
        assert_eq!(store.load().await.unwrap().len(), 2);
    }
}
