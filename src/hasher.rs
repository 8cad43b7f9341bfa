use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Read buffer size for streaming file hashing.
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The bytes could not be read. There is deliberately no "empty hash"
    /// fallback: a missing hash must never look like a zero-length file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed content hash {0:?}: expected 64 lowercase hex characters")]
    Malformed(String),
}

/// Content Hash
///
/// Lowercase hex SHA-256 digest of a byte sequence. The only way to obtain
/// one is to hash bytes or to parse an already well-formed hex string, so a
/// `ContentHash` is always exactly 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    pub const HEX_LEN: usize = 64;

    pub fn parse(s: &str) -> Result<Self, HashError> {
        let well_formed = s.len() == Self::HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(HashError::Malformed(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, the way the intake form shows a hash.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }

    fn from_digest(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// SHA-256 over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentHash::from_digest(hasher)
}

/// SHA-256 over the UTF-8 bytes of a string.
pub fn hash_str(content: &str) -> ContentHash {
    hash_bytes(content.as_bytes())
}

/// Streams a reader through SHA-256 in fixed-size chunks.
///
/// Returns the digest together with the number of bytes consumed. `origin` is
/// only used to label a read error.
pub fn hash_reader<R: Read>(mut reader: R, origin: &Path) -> Result<(ContentHash, u64), HashError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(HashError::Read {
                    path: origin.to_path_buf(),
                    source,
                })
            }
        };
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    Ok((ContentHash::from_digest(hasher), total))
}

/// Hashes a file on disk without loading it into memory in one piece.
pub fn hash_file(path: &Path) -> Result<(ContentHash, u64), HashError> {
    let file = File::open(path).map_err(|source| HashError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    hash_reader(BufReader::new(file), path)
}
