//! Seekable, known-length upload sources (SPEC_FULL.md §4.4 step 1).
//!
//! Generalizes the teacher's `fs.rs` (`hash_chunk`, `forward_file_to_tx`) and
//! SalahaldinBilal's `AsyncFileReader` trait-object pattern into a narrow abstraction
//! scoped to exactly what the upload orchestrator needs: a known length and independently
//! readable byte ranges, so concurrent part uploads don't contend on a single handle.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::B2Error;

/// Size of the chunks `whole_sha1` reads at a time, so hashing a large file doesn't buffer
/// it all in memory at once. Doubled when the `large_buffers` feature is enabled.
#[cfg(not(feature = "large_buffers"))]
const HASH_CHUNK_SIZE: usize = 8 * 1024;
#[cfg(feature = "large_buffers")]
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// A seekable, known-length byte source. Both variants can report their length up front and
/// can be read at arbitrary, independent ranges concurrently, which is what lets the upload
/// orchestrator fan part uploads out without serializing on one cursor.
#[derive(Clone)]
pub enum Source {
    Bytes(Bytes),
    File(Arc<PathBuf>),
}

impl Source {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Source::Bytes(bytes.into())
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Source::File(Arc::new(path.into()))
    }

    /// Total length of the source. Both variants always know this up front; neither
    /// represents the "non-seekable, unknown length" case described in SPEC_FULL.md §4.4
    /// step 1 — a caller with such a stream must buffer it into a [`Source::Bytes`] first,
    /// or accept the single-shot-only restriction by staying under the cutoff.
    pub async fn len(&self) -> Result<u64, B2Error> {
        match self {
            Source::Bytes(b) => Ok(b.len() as u64),
            Source::File(path) => Ok(tokio::fs::metadata(path.as_ref()).await?.len()),
        }
    }

    /// Reads bytes `[position, position+length)` independently of any other in-flight read.
    pub async fn read_range(&self, position: u64, length: u64) -> Result<Bytes, B2Error> {
        match self {
            Source::Bytes(b) => {
                let start = position as usize;
                let end = start + length as usize;
                Ok(b.slice(start..end))
            }
            Source::File(path) => {
                let mut file = tokio::fs::File::open(path.as_ref()).await?;
                file.seek(std::io::SeekFrom::Start(position)).await?;

                let mut buf = vec![0u8; length as usize];
                file.read_exact(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// SHA-1 of the whole source, hex-encoded, read in fixed-size chunks (SPEC_FULL.md §4.4a).
    pub async fn whole_sha1(&self) -> Result<String, B2Error> {
        match self {
            Source::Bytes(b) => Ok(sha1_hex(b)),
            Source::File(path) => {
                let mut file = tokio::fs::File::open(path.as_ref()).await?;
                let mut hasher = Sha1::new();
                let mut buf = vec![0u8; HASH_CHUNK_SIZE];

                loop {
                    let n = file.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }

                Ok(hex::encode(hasher.finalize()))
            }
        }
    }
}

/// SHA-1 of a byte slice, hex-encoded.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_source_reports_length_and_ranges() {
        let source = Source::from_bytes(Bytes::from_static(b"hello world"));
        assert_eq!(source.len().await.unwrap(), 11);
        assert_eq!(&source.read_range(6, 5).await.unwrap()[..], b"world");
    }

    #[tokio::test]
    async fn bytes_source_whole_sha1_matches_direct_hash() {
        let data = b"the quick brown fox";
        let source = Source::from_bytes(Bytes::from_static(data));
        assert_eq!(source.whole_sha1().await.unwrap(), sha1_hex(data));
    }

    #[tokio::test]
    async fn file_source_roundtrips_ranges_and_hash() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("b2-transfer-test-{}", std::process::id()));
        let data = vec![7u8; 20_000];
        tokio::fs::write(&path, &data).await.unwrap();

        let source = Source::from_path(path.clone());
        assert_eq!(source.len().await.unwrap(), 20_000);

        let range = source.read_range(10_000, 100).await.unwrap();
        assert_eq!(range.len(), 100);
        assert!(range.iter().all(|&b| b == 7));

        assert_eq!(source.whole_sha1().await.unwrap(), sha1_hex(&data));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
