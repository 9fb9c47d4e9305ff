use crate::error::{FanoutError, Result};
use crate::fingerprint::{Fingerprint, fingerprint};
use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const TMP_SUFFIX: &str = ".tmp";
/// Longest storage key kept verbatim as a file name; NAME_MAX is 255 bytes.
const MAX_INLINE_FILE_NAME: usize = 200;
/// Marks a committed file whose logical name was replaced by its digest.
const DIGEST_NAME_MARKER: char = '~';
const NAME_DIGEST_HEX_LEN: usize = 32;

/// Addressing unit on a storage node: `{fingerprint}_{logical_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub fingerprint: Fingerprint,
    pub logical_name: String,
}

impl StorageKey {
    pub fn new(fingerprint: Fingerprint, logical_name: &str) -> Result<Self> {
        Ok(Self {
            fingerprint,
            logical_name: validate_logical_name(logical_name)?,
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let (fingerprint, logical_name) = raw.split_once('_').ok_or_else(|| {
            FanoutError::InvalidRequest(format!("malformed storage key: {}", raw))
        })?;

        Self::new(Fingerprint::from_hex(fingerprint)?, logical_name)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.fingerprint, self.logical_name)
    }
}

#[derive(Debug, Clone)]
pub struct PutBlobResult {
    pub blob_path: PathBuf,
    pub size_bytes: u64,
    pub reused: bool,
}

/// BlobStore keeps one file per storage key:
/// `blobs/{fingerprint[0..2]}/{fingerprint}_{logical_name}`.
///
/// Keys too long for a single path component are stored as
/// `{fingerprint}_~{digest of logical_name}` instead.
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(base_path.join("blobs"))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn put_blob(&self, key: &StorageKey, data: Bytes) -> Result<PutBlobResult> {
        let blob_path = self.blob_path(key);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if fs::try_exists(&blob_path).await? {
            let size_bytes = fs::metadata(&blob_path).await?.len();
            return Ok(PutBlobResult {
                blob_path,
                size_bytes,
                reused: true,
            });
        }

        let tmp_path = tmp_path_in(&blob_path);
        let mut file = fs::File::create(&tmp_path).await?;
        if let Err(error) = write_and_sync(&mut file, &data).await {
            drop(file);
            let _ = fs::remove_file(&tmp_path).await;
            return Err(error);
        }
        drop(file);

        fs::rename(&tmp_path, &blob_path).await?;

        Ok(PutBlobResult {
            blob_path,
            size_bytes: data.len() as u64,
            reused: false,
        })
    }

    pub async fn get_blob(&self, key: &StorageKey) -> Result<Option<Bytes>> {
        match fs::read(self.blob_path(key)).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    pub fn blob_exists(&self, key: &StorageKey) -> bool {
        self.blob_path(key).exists()
    }

    /// Committed blobs only; in-flight temp files are skipped.
    pub async fn count_blobs(&self) -> Result<u64> {
        let blobs_dir = self.base_path.join("blobs");
        let mut count = 0u64;

        let mut shards = fs::read_dir(&blobs_dir).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }

            let mut entries = fs::read_dir(shard.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with('.') || name.ends_with(TMP_SUFFIX) {
                    continue;
                }
                if entry.file_type().await?.is_file() {
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    pub fn blob_path(&self, key: &StorageKey) -> PathBuf {
        let hex = key.fingerprint.to_hex();
        self.base_path
            .join("blobs")
            .join(&hex[..2])
            .join(file_name_for(key))
    }
}

fn file_name_for(key: &StorageKey) -> String {
    let rendered = key.to_string();
    if rendered.len() <= MAX_INLINE_FILE_NAME {
        return rendered;
    }

    let name_digest = fingerprint(key.logical_name.as_bytes()).to_hex();
    format!(
        "{}_{}{}",
        key.fingerprint,
        DIGEST_NAME_MARKER,
        &name_digest[..NAME_DIGEST_HEX_LEN]
    )
}

/// Temp names do not embed the key, so their length is fixed.
fn tmp_path_in(blob_path: &Path) -> PathBuf {
    blob_path.with_file_name(format!(".{}{}", ulid::Ulid::new(), TMP_SUFFIX))
}

async fn write_and_sync(file: &mut fs::File, data: &[u8]) -> Result<()> {
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

pub fn validate_logical_name(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(FanoutError::InvalidRequest(
            "logical name cannot be empty".to_string(),
        ));
    }

    if input == "." || input == ".." {
        return Err(FanoutError::InvalidRequest(format!(
            "invalid logical name: {}",
            input
        )));
    }

    if input.contains(['/', '\\', '\0']) {
        return Err(FanoutError::InvalidRequest(format!(
            "logical name contains a path separator: {}",
            input
        )));
    }

    Ok(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;

    fn key_for(body: &[u8], name: &str) -> StorageKey {
        StorageKey::new(fingerprint(body), name).unwrap()
    }

    #[tokio::test]
    async fn test_blob_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let body = Bytes::from("hello-world");
        let key = key_for(&body, "report.pdf");

        let put = store.put_blob(&key, body.clone()).await.unwrap();
        assert!(!put.reused);
        assert_eq!(put.size_bytes, body.len() as u64);
        assert!(put.blob_path.exists());

        let read = store.get_blob(&key).await.unwrap();
        assert_eq!(read, Some(body));
    }

    #[tokio::test]
    async fn test_empty_blob_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let key = key_for(b"", "empty.txt");
        store.put_blob(&key, Bytes::new()).await.unwrap();

        let read = store.get_blob(&key).await.unwrap();
        assert_eq!(read, Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_second_put_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let body = Bytes::from("same bytes");
        let key = key_for(&body, "a.bin");

        assert!(!store.put_blob(&key, body.clone()).await.unwrap().reused);
        assert!(store.put_blob(&key, body.clone()).await.unwrap().reused);
        assert_eq!(store.get_blob(&key).await.unwrap(), Some(body));
        assert_eq!(store.count_blobs().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let key = key_for(b"never stored", "ghost.txt");
        assert!(store.get_blob(&key).await.unwrap().is_none());
        assert!(!store.blob_exists(&key));
    }

    #[tokio::test]
    async fn test_count_skips_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let first = key_for(b"one", "one.txt");
        let second = key_for(b"two", "two.txt");
        store.put_blob(&first, Bytes::from("one")).await.unwrap();
        store.put_blob(&second, Bytes::from("two")).await.unwrap();

        let stray = tmp_path_in(&store.blob_path(&first));
        std::fs::write(stray, b"partial").unwrap();

        assert_eq!(store.count_blobs().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_puts_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(BlobStore::new(dir.path().to_path_buf()).unwrap());

        let body = Bytes::from(vec![7u8; 64 * 1024]);
        let key = key_for(&body, "race.bin");

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = store.clone();
            let key = key.clone();
            let body = body.clone();
            tasks.spawn(async move { store.put_blob(&key, body).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        assert_eq!(store.get_blob(&key).await.unwrap(), Some(body));
        assert_eq!(store.count_blobs().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_long_logical_name_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let long_name = format!("{}.pdf", "报".repeat(70));
        assert!(long_name.len() > 200);

        let body = Bytes::from("annual report");
        let key = key_for(&body, &long_name);
        let put = store.put_blob(&key, body.clone()).await.unwrap();
        assert!(!put.reused);

        let file_name = put.blob_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.len() <= MAX_INLINE_FILE_NAME);

        assert_eq!(store.get_blob(&key).await.unwrap(), Some(body.clone()));
        assert!(store.put_blob(&key, body).await.unwrap().reused);
        assert_eq!(store.count_blobs().await.unwrap(), 1);

        let parsed = StorageKey::parse(&key.to_string()).unwrap();
        assert_eq!(parsed.logical_name, long_name);
    }

    #[tokio::test]
    async fn test_long_names_sharing_a_prefix_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();

        let prefix = "x".repeat(240);
        let body = Bytes::from("same bytes");
        let first = key_for(&body, &format!("{}-a", prefix));
        let second = key_for(&body, &format!("{}-b", prefix));

        store.put_blob(&first, body.clone()).await.unwrap();
        assert!(!store.put_blob(&second, body).await.unwrap().reused);
        assert_ne!(store.blob_path(&first), store.blob_path(&second));
        assert_eq!(store.count_blobs().await.unwrap(), 2);
    }

    #[test]
    fn test_storage_key_format_and_parse() {
        let key = key_for(b"abc", "my_file_name.txt");
        let rendered = key.to_string();
        assert!(rendered.starts_with(&format!("{}_", fingerprint(b"abc"))));

        let parsed = StorageKey::parse(&rendered).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.logical_name, "my_file_name.txt");
    }

    #[test]
    fn test_logical_name_validation() {
        assert!(validate_logical_name("notes.txt").is_ok());
        assert!(validate_logical_name("").is_err());
        assert!(validate_logical_name("..").is_err());
        assert!(validate_logical_name("a/b").is_err());
        assert!(validate_logical_name("a\\b").is_err());
        assert!(StorageKey::parse("not-a-key").is_err());
    }
}
