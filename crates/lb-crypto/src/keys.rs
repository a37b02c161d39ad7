//! RSA key management.
//!
//! Keys live on disk as PEM files. A missing keypair is generated on first
//! start; if only one half of a pair is present it is moved aside to a
//! numbered backup before a fresh pair is written, so an operator never
//! loses key material silently.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aws_lc_rs::digest::{SHA256, digest};
use aws_lc_rs::encoding::{AsDer, Pkcs8V1Der, PublicKeyX509Der};
use aws_lc_rs::rsa::{KeySize, PrivateDecryptingKey};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::{CryptoError, CryptoResult};
use crate::pem;

/// A PEM-encoded RSA keypair: PKCS#8 private key and SPKI public key.
#[derive(Clone)]
pub struct KeyPairPem {
    /// PKCS#8 private key.
    pub private_pem: String,
    /// `SubjectPublicKeyInfo` public key.
    pub public_pem: String,
}

impl fmt::Debug for KeyPairPem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairPem")
            .field("private_pem", &"[REDACTED]")
            .field("public_pem", &self.public_pem)
            .finish()
    }
}

/// Where a keypair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Read from existing files.
    Loaded,
    /// Freshly generated and written.
    Generated,
}

/// Generates a 2048-bit RSA keypair.
pub fn generate_rsa_keypair() -> CryptoResult<KeyPairPem> {
    let private =
        PrivateDecryptingKey::generate(KeySize::Rsa2048).map_err(|_| CryptoError::KeyGeneration)?;
    let private_der: Pkcs8V1Der<'static> =
        private.as_der().map_err(|_| CryptoError::KeyGeneration)?;
    let public_der: PublicKeyX509Der<'static> = private
        .public_key()
        .as_der()
        .map_err(|_| CryptoError::KeyGeneration)?;

    Ok(KeyPairPem {
        private_pem: pem::encode(pem::PRIVATE_KEY, private_der.as_ref()),
        public_pem: pem::encode(pem::PUBLIC_KEY, public_der.as_ref()),
    })
}

/// Derives a short key id from a PEM public key.
pub fn key_id(public_pem: &str) -> CryptoResult<String> {
    let der = pem::decode(pem::PUBLIC_KEY, public_pem)?;
    let hash = digest(&SHA256, &der);
    Ok(URL_SAFE_NO_PAD.encode(&hash.as_ref()[..8]))
}

/// Loads the keypair at the given paths, generating one if needed.
pub fn load_or_generate_keypair(
    private_path: &Path,
    public_path: &Path,
) -> CryptoResult<(KeyPairPem, KeySource)> {
    match (private_path.exists(), public_path.exists()) {
        (true, true) => {
            let keypair = KeyPairPem {
                private_pem: fs::read_to_string(private_path)?,
                public_pem: fs::read_to_string(public_path)?,
            };
            tracing::info!(path = %private_path.display(), "loaded RSA keypair");
            Ok((keypair, KeySource::Loaded))
        }
        (private_exists, public_exists) => {
            if private_exists || public_exists {
                tracing::warn!(
                    private = %private_path.display(),
                    public = %public_path.display(),
                    "incomplete keypair on disk, backing up and regenerating"
                );
            }
            for path in [private_path, public_path] {
                backup_existing(path)?;
            }
            let keypair = generate_rsa_keypair()?;
            write_key(private_path, &keypair.private_pem, 0o600)?;
            write_key(public_path, &keypair.public_pem, 0o644)?;
            tracing::info!(path = %private_path.display(), "generated new RSA keypair");
            Ok((keypair, KeySource::Generated))
        }
    }
}

/// Loads a single PKCS#8 private key, generating one if the file is missing.
pub fn load_or_generate_private_key(path: &Path) -> CryptoResult<(String, KeySource)> {
    if path.exists() {
        return Ok((fs::read_to_string(path)?, KeySource::Loaded));
    }
    let keypair = generate_rsa_keypair()?;
    write_key(path, &keypair.private_pem, 0o600)?;
    tracing::info!(path = %path.display(), "generated new private key");
    Ok((keypair.private_pem, KeySource::Generated))
}

/// Returns the first free `<path>.backup.<n>.key` name.
fn backup_path(path: &Path) -> PathBuf {
    let mut index = 1;
    loop {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".backup.{index}.key"));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

fn backup_existing(path: &Path) -> io::Result<()> {
    if path.exists() {
        let target = backup_path(path);
        tracing::warn!(from = %path.display(), to = %target.display(), "renaming key file");
        fs::rename(path, target)?;
    }
    Ok(())
}

fn write_key(path: &Path, contents: &str, mode: u32) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
