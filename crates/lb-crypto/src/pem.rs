//! Minimal PEM armour for DER key material.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{CryptoError, CryptoResult};

/// PEM label for PKCS#8 private keys.
pub const PRIVATE_KEY: &str = "PRIVATE KEY";

/// PEM label for X.509 `SubjectPublicKeyInfo` public keys.
pub const PUBLIC_KEY: &str = "PUBLIC KEY";

const LINE_WIDTH: usize = 64;

/// Wraps DER bytes in a PEM block with the given label.
#[must_use]
pub fn encode(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

/// Extracts the DER bytes of the first PEM block labelled `label`.
pub fn decode(label: &str, pem: &str) -> CryptoResult<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem
        .find(&begin)
        .ok_or_else(|| CryptoError::InvalidKey(format!("missing {begin}")))?
        + begin.len();
    let stop = pem[start..]
        .find(&end)
        .ok_or_else(|| CryptoError::InvalidKey(format!("missing {end}")))?
        + start;

    let body: String = pem[start..stop]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    STANDARD
        .decode(body)
        .map_err(|e| CryptoError::InvalidKey(format!("bad base64 in {label}: {e}")))
}
