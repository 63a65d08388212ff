//! Positioned-write destinations for the download orchestrator (SPEC_FULL.md §4.5 step 3).
//!
//! No direct teacher analogue — the teacher has no download orchestrator to speak of, only
//! the raw `download_file_by_id` call in `crate::session`. Shaped to mirror `crate::source`'s
//! `Source` for symmetry: a narrow trait scoped to exactly what concurrent ranged part
//! downloads need, independent positioned writes, rather than full `AsyncWrite`.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::B2Error;

/// A destination that accepts writes at arbitrary, independent byte offsets.
///
/// Implementations MUST serialize their own internal access: the download orchestrator
/// calls `write_at` concurrently from multiple part tasks with no ordering guarantee
/// between them (SPEC_FULL.md §4.5 step 3, §5).
pub trait Sink: Send + Sync {
    fn write_at<'a>(&'a self, position: u64, bytes: Bytes) -> BoxFuture<'a, Result<(), B2Error>>;
}

/// A [`Sink`] backed by an open file, using seek+write under a lock to serialize the
/// underlying single file handle across concurrent part writes.
pub struct FileSink {
    file: Arc<Mutex<tokio::fs::File>>,
}

impl FileSink {
    pub fn new(file: tokio::fs::File) -> Self {
        Self { file: Arc::new(Mutex::new(file)) }
    }

    pub async fn create(path: impl AsRef<std::path::Path>) -> Result<Self, B2Error> {
        Ok(Self::new(tokio::fs::File::create(path).await?))
    }
}

impl Sink for FileSink {
    fn write_at<'a>(&'a self, position: u64, bytes: Bytes) -> BoxFuture<'a, Result<(), B2Error>> {
        Box::pin(async move {
            let mut file = self.file.lock().await;
            file.seek(std::io::SeekFrom::Start(position)).await?;
            file.write_all(&bytes).await?;
            Ok(())
        })
    }
}

/// A [`Sink`] backed by an in-memory buffer, growing it as needed. Useful for tests and for
/// downloads a caller wants materialized as `bytes::Bytes` rather than written to disk.
#[derive(Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn into_bytes(self) -> Vec<u8> {
        match Arc::try_unwrap(self.buf) {
            Ok(mutex) => mutex.into_inner(),
            Err(arc) => arc.lock().await.clone(),
        }
    }
}

impl Sink for MemorySink {
    fn write_at<'a>(&'a self, position: u64, bytes: Bytes) -> BoxFuture<'a, Result<(), B2Error>> {
        Box::pin(async move {
            let mut buf = self.buf.lock().await;
            let end = position as usize + bytes.len();
            if buf.len() < end {
                buf.resize(end, 0);
            }
            buf[position as usize..end].copy_from_slice(&bytes);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_writes_out_of_order_parts_correctly() {
        let sink = MemorySink::new();

        sink.write_at(5, Bytes::from_static(b"world")).await.unwrap();
        sink.write_at(0, Bytes::from_static(b"hello")).await.unwrap();

        assert_eq!(sink.into_bytes().await, b"helloworld");
    }

    #[tokio::test]
    async fn file_sink_writes_at_positions() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("b2-transfer-sink-test-{}", std::process::id()));

        {
            let sink = FileSink::create(&path).await.unwrap();
            sink.write_at(3, Bytes::from_static(b"bar")).await.unwrap();
            sink.write_at(0, Bytes::from_static(b"foo")).await.unwrap();
        }

        let data = tokio::fs::read(&path).await.unwrap();
        assert_eq!(&data, b"foobar");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
