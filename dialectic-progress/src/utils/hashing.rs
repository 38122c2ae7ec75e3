//! Version hashes for rendered documents.

use sha2::{Digest, Sha256};

const VERSION_HASH_BYTES: usize = 8;

/// Derives the version hash of a rendered resource.
///
/// The hash is the first eight bytes of the SHA-256 digest of the resource
/// id, hex encoded. Equal ids always give equal hashes, which keeps
/// replayed render events from changing a descriptor.
#[must_use]
pub fn version_hash(resource_id: &str) -> String {
    let digest = Sha256::digest(resource_id.as_bytes());
    hex::encode(&digest[..VERSION_HASH_BYTES])
}
