use std::time::Duration;

use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("link expired")]
    Expired,
    #[error("bad signature")]
    BadSignature,
}

/// Signs `(object key, expiry)` pairs with HMAC-SHA256.
#[derive(Clone)]
pub struct UrlSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow!("invalid signing key: {}", e))?;
        Ok(Self { mac, ttl })
    }

    /// Unix timestamp at which a link issued at `now` stops working.
    pub fn expiry(&self, now: i64) -> i64 {
        now.saturating_add(self.ttl.as_secs() as i64)
    }

    pub fn signature(&self, key: &str, expires: i64) -> String {
        hex::encode(self.keyed(key, expires).finalize().into_bytes())
    }

    pub fn verify(&self, key: &str, expires: i64, signature: &str, now: i64) -> Result<(), LinkError> {
        if expires < now {
            return Err(LinkError::Expired);
        }
        let given = hex::decode(signature).map_err(|_| LinkError::BadSignature)?;
        self.keyed(key, expires)
            .verify_slice(&given)
            .map_err(|_| LinkError::BadSignature)
    }

    fn keyed(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}
