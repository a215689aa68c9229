//! SHA-256 hashing for content addressing.

use sha2::{Digest, Sha256};

/// Calculate the SHA-256 hash of several byte chunks, each terminated by a
/// newline so that `["AB", "C"]` and `["A", "BC"]` hash differently.
pub fn sha256_lines<'a>(lines: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line);
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
