//! Session identifier encryption.
//!
//! Tokens are signed with a keypair whose public half is published, so any
//! claim inside them is readable by anyone holding the token. The session id
//! is therefore encrypted with a second keypair that never leaves the
//! service: RSA-OAEP with SHA-256, output as unpadded base64url.

use std::fmt;
use std::path::Path;

use aws_lc_rs::rsa::{
    OAEP_SHA256_MGF1SHA256, OaepPrivateDecryptingKey, OaepPublicEncryptingKey,
    PrivateDecryptingKey,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{KeySource, load_or_generate_private_key};
use crate::pem;

/// Encrypts and decrypts session identifiers with a service-private key.
pub struct SessionCipher {
    encrypting: OaepPublicEncryptingKey,
    decrypting: OaepPrivateDecryptingKey,
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SessionCipher {
    /// Creates a cipher from a PKCS#8 PEM private key.
    pub fn from_pem(private_pem: &str) -> CryptoResult<Self> {
        let der = pem::decode(pem::PRIVATE_KEY, private_pem)?;
        let private = PrivateDecryptingKey::from_pkcs8(&der)
            .map_err(|e| CryptoError::InvalidKey(format!("session key: {e}")))?;
        Self::from_private_key(private)
    }

    /// Creates a cipher with a freshly generated key. Ciphertexts do not
    /// survive a restart.
    pub fn generate() -> CryptoResult<Self> {
        let keypair = crate::keys::generate_rsa_keypair()?;
        Self::from_pem(&keypair.private_pem)
    }

    /// Loads the key at `path`, generating and writing one if missing.
    pub fn load_or_generate(path: &Path) -> CryptoResult<(Self, KeySource)> {
        let (private_pem, source) = load_or_generate_private_key(path)?;
        Ok((Self::from_pem(&private_pem)?, source))
    }

    fn from_private_key(private: PrivateDecryptingKey) -> CryptoResult<Self> {
        let encrypting = OaepPublicEncryptingKey::new(private.public_key())
            .map_err(|_| CryptoError::InvalidKey("session key unusable for OAEP".to_string()))?;
        let decrypting = OaepPrivateDecryptingKey::new(private)
            .map_err(|_| CryptoError::InvalidKey("session key unusable for OAEP".to_string()))?;
        Ok(Self {
            encrypting,
            decrypting,
        })
    }

    /// Encrypts a session id.
    pub fn encrypt(&self, session_id: &str) -> CryptoResult<String> {
        let mut ciphertext = vec![0u8; self.encrypting.ciphertext_size()];
        let sealed = self
            .encrypting
            .encrypt(
                &OAEP_SHA256_MGF1SHA256,
                session_id.as_bytes(),
                &mut ciphertext,
                None,
            )
            .map_err(|_| CryptoError::Encryption)?;
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypts a value produced by [`SessionCipher::encrypt`].
    pub fn decrypt(&self, encrypted: &str) -> CryptoResult<String> {
        let ciphertext = URL_SAFE_NO_PAD
            .decode(encrypted)
            .map_err(|_| CryptoError::Decryption)?;
        let mut plaintext = vec![0u8; self.decrypting.min_output_size()];
        let opened = self
            .decrypting
            .decrypt(&OAEP_SHA256_MGF1SHA256, &ciphertext, &mut plaintext, None)
            .map_err(|_| CryptoError::Decryption)?;
        String::from_utf8(opened.to_vec()).map_err(|_| CryptoError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt() {
        let cipher = SessionCipher::generate().unwrap();
        let sealed = cipher.encrypt("Qm9vWc2LQ1yxj0vtUQ3kzKzzEe8s9r5b").unwrap();

        assert!(!sealed.contains("Qm9vWc2LQ1yxj0vtUQ3kzKzzEe8s9r5b"));
        assert_eq!(
            cipher.decrypt(&sealed).unwrap(),
            "Qm9vWc2LQ1yxj0vtUQ3kzKzzEe8s9r5b"
        );
    }

    #[test]
    fn encryption_is_randomized() {
        let cipher = SessionCipher::generate().unwrap();
        assert_ne!(cipher.encrypt("s1").unwrap(), cipher.encrypt("s1").unwrap());
    }

    #[test]
    fn foreign_key_cannot_decrypt() {
        let ours = SessionCipher::generate().unwrap();
        let theirs = SessionCipher::generate().unwrap();
        let sealed = theirs.encrypt("s1").unwrap();
        assert!(matches!(ours.decrypt(&sealed), Err(CryptoError::Decryption)));
        assert!(matches!(ours.decrypt("not base64!"), Err(CryptoError::Decryption)));
    }

    #[test]
    fn persisted_key_round_trips_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.key");

        let (first, source) = SessionCipher::load_or_generate(&path).unwrap();
        assert_eq!(source, KeySource::Generated);
        let sealed = first.encrypt("s1").unwrap();

        let (second, source) = SessionCipher::load_or_generate(&path).unwrap();
        assert_eq!(source, KeySource::Loaded);
        assert_eq!(second.decrypt(&sealed).unwrap(), "s1");
    }
}
