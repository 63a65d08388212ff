//! Upload orchestrator (SPEC_FULL.md §4.4): single-shot vs. large-file dispatch by cutoff,
//! whole-stream SHA-1, part planning, bounded-parallelism part upload through the bulkhead,
//! and ordered `FinishLargeFile`.
//!
//! Grounded in SalahaldinBilal's `file_upload.rs` for the overall shape (cutoff dispatch,
//! per-part retry via part-URL refetch, a part-number-indexed SHA-1 accumulator); adapted
//! onto the teacher's wire types (`crate::session`) instead of reimplementing the HTTP calls.
//! The teacher's own `fs.rs` large-file loop — sequential, with a `// TODO: parallel` marker
//! — is what this module replaces with the real bounded parallelism SPEC_FULL.md §4.7 calls
//! for.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use bytes::Bytes;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::error::{B2Error, TransferContext};
use crate::models;
use crate::parts::{self, Part};
use crate::policy::{self, cancellable};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::session::{Client, NewFileInfo, NewPartInfo, ServerSideEncryption};
use crate::source::{sha1_hex, Source};

/// Everything about the destination file that isn't derived from the source bytes
/// themselves (SPEC_FULL.md §3 "Large-file session" / upload request shape).
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub file_name: String,
    pub content_type: Option<String>,
    /// Custom file info, sent as `X-Bz-Info-*` headers.
    pub info: BTreeMap<String, String>,
    pub encryption: Option<ServerSideEncryption>,
}

impl UploadOptions {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self { file_name: file_name.into(), ..Default::default() }
    }
}

/// Uploads `source` to `bucket_id`, choosing the single-shot or large-file path by size
/// (SPEC_FULL.md §4.4 steps 1-2).
pub async fn upload(
    client: &Client,
    bucket_id: &str,
    source: &Source,
    options: &UploadOptions,
    progress: &dyn ProgressSink,
) -> Result<models::B2FileInfo, B2Error> {
    let total_length = source.len().await?;
    let (absolute_min, recommended) = client.part_size_bounds().await;

    let effective_part_size = parts::part_size(client.config.upload_part_size, recommended, absolute_min);
    let effective_cutoff = parts::cutoff(client.config.upload_cutoff_size, effective_part_size, absolute_min);

    if total_length < effective_cutoff {
        single_shot_upload(client, bucket_id, source, total_length, options, progress).await
    } else {
        large_file_upload(client, bucket_id, source, total_length, effective_part_size, options, progress).await
    }
}

/// SPEC_FULL.md §4.4 step 3: single POST of the whole body to a checked-out upload URL.
async fn single_shot_upload(
    client: &Client,
    bucket_id: &str,
    source: &Source,
    total_length: u64,
    options: &UploadOptions,
    progress: &dyn ProgressSink,
) -> Result<models::B2FileInfo, B2Error> {
    let cancel = client.cancellation_token();
    let ctx = || TransferContext {
        op: "b2_upload_file",
        bucket_id: Some(bucket_id.to_owned()),
        ..Default::default()
    };

    let mut tracker = ProgressTracker::new(progress, total_length);

    // Auth wraps Hash wraps the bulkheaded send (SPEC_FULL.md §4.2): a 401/expired_auth_token
    // from the POST itself must reauthenticate and retry with a freshly checked-out upload
    // URL, not just bubble up. `checkout_upload_url` lives inside the retry closure so each
    // attempt sees the cache `reauthorize` just evicted. The bulkhead permit is acquired fresh
    // per Hash-policy attempt, innermost around the actual send, so a part sitting through
    // backoff doesn't hold a slot hostage while it sleeps.
    let outcome = client
        .with_auth_retry(|| async {
            let mut url = client.checkout_upload_url(bucket_id).await.map_err(|e| e.with_context(ctx()))?;

            let result = policy::with_hash_policy(
                client.config.retry_count,
                &cancel,
                true, // a `Source` re-reads the same range on every attempt; always "seekable"
                || async {
                    cancellable(&cancel, async {
                        let bytes = source.read_range(0, total_length).await?;
                        let sha1 = sha1_hex(&bytes);

                        let info = NewFileInfo::builder()
                            .file_name(options.file_name.clone())
                            .content_type(options.content_type.clone())
                            .content_length(total_length)
                            .content_sha1(sha1.clone())
                            .encryption(options.encryption.clone())
                            .info(options.info.clone())
                            .build();

                        let _permit = client.upload_bulkhead.acquire().await;
                        let file_info = client.upload_file(&url, &info, bytes).await?;

                        if file_info.content_sha1.as_deref() != Some(sha1.as_str()) {
                            return Err(B2Error::HashMismatch);
                        }

                        Ok(file_info)
                    })
                    .await
                },
                || {}, // nothing to rewind: `read_range` above always re-reads from scratch
            )
            .await;

            client.return_upload_url(bucket_id, url, result.is_ok());
            result
        })
        .await;

    if outcome.is_ok() {
        tracker.advance(total_length);
    }

    let bytes_transferred = tracker.bytes_transferred();
    outcome.map_err(|e| e.with_context(TransferContext { bytes_transferred, ..ctx() }))
}

/// SPEC_FULL.md §4.4 step 4: whole-stream hash, `StartLargeFile`, bounded-parallelism part
/// uploads, then `FinishLargeFile` with SHA-1s in part-number order.
async fn large_file_upload(
    client: &Client,
    bucket_id: &str,
    source: &Source,
    total_length: u64,
    part_size: u64,
    options: &UploadOptions,
    progress: &dyn ProgressSink,
) -> Result<models::B2FileInfo, B2Error> {
    let cancel = client.cancellation_token();
    let ctx = || TransferContext {
        op: "b2_start_large_file",
        bucket_id: Some(bucket_id.to_owned()),
        ..Default::default()
    };

    let plan = parts::plan_parts(total_length, part_size);
    if plan.is_empty() {
        // total_length == 0: nothing to upload as a large file. The corrected behavior
        // (SPEC_FULL.md §9 Open Question 2) means callers never reach here for
        // `total_length <= part_size`, so an empty plan can only mean an empty source.
        return Err(B2Error::NonSeekableStream.with_context(ctx()));
    }

    let whole_sha1 = source.whole_sha1().await.map_err(|e| e.with_context(ctx()))?;
    let mut info = options.info.clone();
    info.insert("large_file_sha1".to_owned(), whole_sha1);

    let start_info = NewFileInfo::builder()
        .file_name(options.file_name.clone())
        .content_type(options.content_type.clone())
        .content_length(total_length)
        .content_sha1(String::new())
        .encryption(options.encryption.clone())
        .info(info)
        .build();

    let started = client.start_large_file(bucket_id, &start_info).await.map_err(|e| e.with_context(ctx()))?;
    let file_id = started.file_id.to_string();

    let sha1_slots: Vec<AsyncMutex<Option<String>>> = plan.iter().map(|_| AsyncMutex::new(None)).collect();
    let tracker = AsyncMutex::new(ProgressTracker::new(progress, total_length));

    let uploads = plan.iter().map(|part| {
        upload_one_part(client, &file_id, bucket_id, source, part, options, &cancel, &sha1_slots[(part.part_number - 1) as usize], &tracker)
    });

    let mut futs: FuturesUnordered<_> = uploads.collect();
    let mut first_err = None;

    while let Some(result) = futs.next().await {
        if let Err(e) = result {
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }

    if let Some(e) = first_err {
        let bytes_transferred = tracker.into_inner().bytes_transferred();
        return Err(e.with_context(TransferContext {
            op: "b2_upload_part",
            bucket_id: Some(bucket_id.to_owned()),
            file_id: Some(file_id),
            bytes_transferred,
            attempt: 0,
        }));
    }

    let sha1_list: Vec<String> = sha1_slots
        .into_iter()
        .map(|slot| slot.into_inner().expect("every part acknowledged before finish"))
        .collect();

    client
        .finish_large_file(&file_id, &sha1_list)
        .await
        .map_err(|e| e.with_context(TransferContext { op: "b2_finish_large_file", file_id: Some(file_id), ..Default::default() }))
}

#[allow(clippy::too_many_arguments)]
async fn upload_one_part<'a>(
    client: &Client,
    file_id: &str,
    bucket_id: &str,
    source: &Source,
    part: &Part,
    options: &UploadOptions,
    cancel: &CancellationToken,
    sha1_slot: &AsyncMutex<Option<String>>,
    tracker: &AsyncMutex<ProgressTracker<'a>>,
) -> Result<(), B2Error> {
    let part_number = NonZeroU32::new(part.part_number).expect("part numbers are 1-based");

    // Same Auth-wraps-Hash-wraps-send composition as `single_shot_upload`: a checked-out part
    // URL is scoped to a single auth-policy attempt so a reauthorized retry checks out fresh,
    // and the bulkhead permit is acquired fresh per Hash-policy attempt, innermost around the
    // send, so a part sitting through backoff doesn't hold a slot hostage while it sleeps.
    let outcome = client
        .with_auth_retry(|| async {
            let mut url = client.checkout_part_url(file_id, bucket_id).await?;

            let result = policy::with_hash_policy(
                client.config.retry_count,
                cancel,
                true,
                || async {
                    cancellable(cancel, async {
                        let bytes: Bytes = source.read_range(part.position, part.length).await?;
                        let sha1 = sha1_hex(&bytes);

                        let info = NewPartInfo::builder()
                            .part_number(part_number)
                            .content_length(part.length)
                            .content_sha1(sha1.clone())
                            .encryption(options.encryption.clone())
                            .build();

                        let _permit = client.upload_bulkhead.acquire().await;
                        let part_info = client.upload_part(&url, &info, bytes).await?;

                        if part_info.content_sha1.as_str() != sha1 {
                            return Err(B2Error::HashMismatch);
                        }

                        Ok(part_info)
                    })
                    .await
                },
                || {},
            )
            .await;

            client.return_part_url(file_id, url, result.is_ok());
            result
        })
        .await;

    let part_info = outcome?;
    *sha1_slot.lock().await = Some(part_info.content_sha1.to_string());
    tracker.lock().await.advance(part.length);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    // These exercise the pure planning math the orchestrator relies on; the HTTP-facing
    // paths need a live or mocked B2 endpoint and are covered by `crate::parts`,
    // `crate::policy`, and `crate::cache`'s own deterministic unit tests instead.

    #[test]
    fn upload_options_defaults_are_empty() {
        let opts = UploadOptions::new("a/b.txt");
        assert_eq!(opts.file_name, "a/b.txt");
        assert!(opts.info.is_empty());
        assert!(opts.content_type.is_none());
    }

    #[tokio::test]
    async fn no_progress_sink_is_a_valid_progress_arg() {
        let sink: &dyn ProgressSink = &NoProgress;
        let mut tracker = ProgressTracker::new(sink, 10);
        tracker.advance(10);
        assert_eq!(tracker.bytes_transferred(), 10);
    }
}
