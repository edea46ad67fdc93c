use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE as BASE64_URL},
    Engine as _,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Seals provider API keys at rest with ChaCha20-Poly1305.
///
/// Sealed values are base64 of `nonce || ciphertext`, so each value carries
/// its own random nonce and can be opened independently.
#[derive(Clone)]
pub struct SecretBox {
    key: [u8; 32],
}

impl std::fmt::Debug for SecretBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretBox(..)")
    }
}

impl SecretBox {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Derive the sealing key from `ENCRYPTION_KEY`, falling back to
    /// `JWT_SECRET_KEY`. Fails when neither is set.
    ///
    /// An encryption key that decodes (standard or url-safe base64) to exactly
    /// 32 bytes is used as-is; anything else is hashed with SHA-256.
    pub fn from_env_values(
        encryption_key: Option<&str>,
        jwt_secret: Option<&str>,
    ) -> anyhow::Result<Self> {
        let encryption_key = encryption_key.map(str::trim).filter(|s| !s.is_empty());
        let jwt_secret = jwt_secret.map(str::trim).filter(|s| !s.is_empty());

        if let Some(raw) = encryption_key {
            if let Some(key) = decode_raw_key(raw) {
                return Ok(Self::new(key));
            }
            return Ok(Self::new(sha256(raw)));
        }
        if let Some(raw) = jwt_secret {
            return Ok(Self::new(sha256(raw)));
        }
        anyhow::bail!(
            "ENCRYPTION_KEY or JWT_SECRET_KEY must be set in environment for API key encryption"
        )
    }

    pub fn seal(&self, plaintext: &str) -> anyhow::Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| anyhow::anyhow!("Failed to encrypt API key"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    pub fn open(&self, sealed: &str) -> anyhow::Result<String> {
        let raw = BASE64
            .decode(sealed.trim())
            .map_err(|e| anyhow::anyhow!("Failed to decode sealed API key: {}", e))?;
        if raw.len() <= NONCE_LEN {
            anyhow::bail!("Sealed API key is too short");
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow::anyhow!("Failed to decrypt API key"))?;
        Ok(String::from_utf8(plaintext)?)
    }
}

fn decode_raw_key(raw: &str) -> Option<[u8; 32]> {
    let decoded = BASE64_URL
        .decode(raw)
        .or_else(|_| BASE64.decode(raw))
        .ok()?;
    decoded.try_into().ok()
}

fn sha256(raw: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(raw.as_bytes()));
    out
}
