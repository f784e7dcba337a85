use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use pinboard_core::MediaStore;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::signing::{LinkError, UrlSigner};

/// Objects on local disk, addressed by slash-separated keys.
///
/// Each object is a flat file at `{dir}/{key}`. Links handed out to clients point at
/// `{public_url}/media/{key}` and carry an expiry plus an HMAC over both.
pub struct LocalObjectStore {
    dir: PathBuf,
    public_url: String,
    signer: UrlSigner,
}

impl LocalObjectStore {
    pub async fn new(dir: PathBuf, public_url: &str, signer: UrlSigner) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Object storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    /// Filesystem path of an object. Keys that would escape the storage root are rejected.
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            bail!("invalid object key '{}'", key);
        }
        Ok(self.dir.join(relative))
    }

    /// Store `data` under `key`, replacing any previous object.
    /// Returns the SHA-256 of the stored bytes.
    pub async fn put_object(&self, key: &str, data: &[u8]) -> Result<String> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file and rename so readers never see a partial object
        let mut tmp = path.clone().into_os_string();
        tmp.push(".partial");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.flush().await?;
        fs::rename(&tmp, &path).await?;

        let digest = hex::encode(Sha256::digest(data));
        debug!("Stored {} ({} bytes, sha256 {})", key, data.len(), digest);
        Ok(digest)
    }

    /// Open an object for streaming. Returns the file and its length.
    pub async fn open_object(&self, key: &str) -> Result<(fs::File, u64)> {
        let path = self.object_path(key)?;
        let file = fs::File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    pub fn signed_url(&self, key: &str, now: i64) -> String {
        let expires = self.signer.expiry(now);
        format!(
            "{}/media/{}?expires={}&signature={}",
            self.public_url,
            key,
            expires,
            self.signer.signature(key, expires)
        )
    }

    pub fn verify_link(&self, key: &str, expires: i64, signature: &str) -> Result<(), LinkError> {
        self.signer
            .verify(key, expires, signature, Utc::now().timestamp())
    }
}

impl MediaStore for LocalObjectStore {
    fn user_file(&self, key: &str, name: &str) -> Result<String> {
        let object_key = format!("{}{}", key, name);
        if !self.object_path(&object_key)?.is_file() {
            bail!("object {} does not exist", object_key);
        }
        Ok(self.signed_url(&object_key, Utc::now().timestamp()))
    }
}
