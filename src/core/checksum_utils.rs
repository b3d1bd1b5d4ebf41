/*
 * SHA256 digests of packaged output. The command line front end prints the digest
 * next to each written artifact so a package can be verified after transfer.
 */
use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
