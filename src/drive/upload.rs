//! Upload engine
//!
//! Bodies up to the configured threshold (4,000,000 bytes by default) go up
//! in a single PUT. Larger bodies use an upload session: the drive hands out
//! a pre-authenticated URL and the body is sent there in sequential chunks,
//! each declaring its `Content-Range`. The response to the last chunk carries
//! the finished item.
//!
//! The chunk loop is written against two small traits, [`ChunkSource`] and
//! [`ChunkSink`], so the reading and sending halves can be replaced
//! independently (a prefetching source, for instance) without touching the
//! session logic.

use std::io;
use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, trace};

use super::item::{normalize, DriveItem};
use super::{require_leaf, Drive};
use crate::error::{AdapterError, Result};
use crate::filesystem::Metadata;
use crate::graph::{GraphClient, GraphRequest};

/// Conflict behaviour requested for session uploads
const CONFLICT_BEHAVIOR: &str = "rename";

/// Inclusive byte range of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a body of `total` bytes
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Contiguous chunk ranges covering `[offset, total - 1]`.
///
/// A zero chunk size yields no ranges.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total: u64,
    chunk_size: u64,
    next: u64,
}

impl ChunkPlan {
    pub fn new(total: u64, chunk_size: u64) -> Self {
        Self::starting_at(0, total, chunk_size)
    }

    pub fn starting_at(offset: u64, total: u64, chunk_size: u64) -> Self {
        Self {
            total,
            chunk_size,
            next: offset,
        }
    }
}

impl Iterator for ChunkPlan {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        if self.next >= self.total || self.chunk_size == 0 {
            return None;
        }
        let start = self.next;
        let end = (start + self.chunk_size).min(self.total) - 1;
        self.next = end + 1;
        Some(ByteRange { start, end })
    }
}

/// Supplies the bytes of the next chunk
#[async_trait]
pub trait ChunkSource: Send {
    /// Read exactly `len` bytes; running out early is `UnexpectedEof`
    async fn read_chunk(&mut self, len: usize) -> io::Result<Bytes>;
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkSource for R {
    async fn read_chunk(&mut self, len: usize) -> io::Result<Bytes> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// What the remote side said about a chunk
#[derive(Debug)]
pub enum ChunkOutcome {
    /// More bytes expected
    Accepted { next_expected_ranges: Vec<String> },
    /// Upload finished; the item as stored
    Completed(DriveItem),
}

/// Delivers one chunk to the remote side
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn send_chunk(&self, range: ByteRange, total: u64, chunk: Bytes)
        -> Result<ChunkOutcome>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSession {
    upload_url: String,
    expiration_date_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionProgress {
    #[serde(default)]
    next_expected_ranges: Vec<String>,
}

/// Sends chunks to an upload session URL through a [`GraphClient`]
pub struct SessionSink {
    client: Arc<dyn GraphClient>,
    upload_url: String,
}

impl SessionSink {
    pub fn new(client: Arc<dyn GraphClient>, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }
}

#[async_trait]
impl ChunkSink for SessionSink {
    async fn send_chunk(
        &self,
        range: ByteRange,
        total: u64,
        chunk: Bytes,
    ) -> Result<ChunkOutcome> {
        let request = GraphRequest::new(Method::PUT, self.upload_url.as_str())
            .header("Content-Length", range.len())
            .header("Content-Range", range.content_range(total))
            .bytes(chunk);

        let response = self.client.execute(request).await?;

        if response.status == 202 {
            // Progress bodies are informational; an unreadable one is not fatal
            let progress: SessionProgress =
                serde_json::from_slice(&response.body).unwrap_or_default();
            return Ok(ChunkOutcome::Accepted {
                next_expected_ranges: progress.next_expected_ranges,
            });
        }

        Ok(ChunkOutcome::Completed(response.json()?))
    }
}

/// State of one chunked upload.
///
/// Lives only for the duration of [`UploadSession::run`]; nothing is kept
/// for resuming after a failure.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_url: String,
    pub total_size: u64,
    pub offset: u64,
    pub chunk_size: u64,
}

impl UploadSession {
    pub fn new(upload_url: impl Into<String>, total_size: u64, chunk_size: u64) -> Self {
        Self {
            upload_url: upload_url.into(),
            total_size,
            offset: 0,
            chunk_size,
        }
    }

    /// Remaining chunk ranges from the current offset
    pub fn plan(&self) -> ChunkPlan {
        ChunkPlan::starting_at(self.offset, self.total_size, self.chunk_size)
    }

    /// Send every remaining chunk in order and return the finished item.
    ///
    /// Each chunk is read only after the previous one was acknowledged, so at
    /// most one chunk is held in memory. The item is returned as soon as the
    /// remote reports completion. Any failure ends the upload; once bytes
    /// have been accepted the error is [`AdapterError::PartialUpload`], which
    /// includes a session that accepted every byte but never returned the
    /// stored item.
    pub async fn run<S, K>(&mut self, source: &mut S, sink: &K) -> Result<DriveItem>
    where
        S: ChunkSource + ?Sized,
        K: ChunkSink + ?Sized,
    {
        check_chunk_size(self.chunk_size)?;

        for range in self.plan() {
            let chunk = source
                .read_chunk(range.len() as usize)
                .await
                .map_err(|e| self.abort(e.into()))?;

            let outcome = sink
                .send_chunk(range, self.total_size, chunk)
                .await
                .map_err(|e| self.abort(e))?;
            self.offset = range.end + 1;

            match outcome {
                ChunkOutcome::Accepted {
                    next_expected_ranges,
                } => {
                    trace!(
                        "chunk {} accepted, next expected {:?}",
                        range.content_range(self.total_size),
                        next_expected_ranges
                    );
                }
                ChunkOutcome::Completed(item) => {
                    if self.offset < self.total_size {
                        debug!(
                            "upload completed after {} of {} bytes",
                            self.offset, self.total_size
                        );
                    }
                    return Ok(item);
                }
            }
        }

        Err(self.abort(AdapterError::MalformedResponse(
            "upload session ended without returning the stored item".to_string(),
        )))
    }

    fn abort(&self, error: AdapterError) -> AdapterError {
        if self.offset == 0 {
            return error;
        }
        AdapterError::PartialUpload {
            uploaded: self.offset,
            total: self.total_size,
            reason: error.to_string(),
        }
    }
}

fn check_chunk_size(chunk_size: u64) -> Result<()> {
    if chunk_size == 0 {
        return Err(AdapterError::Config(
            "upload chunk size must be non-zero".to_string(),
        ));
    }
    Ok(())
}

impl Drive {
    /// Upload an in-memory body
    pub async fn upload_bytes(&self, path: &str, contents: Bytes) -> Result<Metadata> {
        let size = contents.len() as u64;
        let mut source = std::io::Cursor::new(contents);
        self.upload_from(path, &mut source, size).await
    }

    /// Upload from a reader of unknown length.
    ///
    /// The reader is spooled into an unlinked temporary file to learn its
    /// size; the file is released on every return path.
    pub async fn upload_stream<R>(&self, path: &str, mut reader: R) -> Result<Metadata>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut spool = tokio::fs::File::from_std(tempfile::tempfile()?);
        let size = tokio::io::copy(&mut reader, &mut spool).await?;
        spool.flush().await?;
        spool.seek(SeekFrom::Start(0)).await?;
        trace!("upload_stream: spooled {} bytes for {:?}", size, path);

        self.upload_from(path, &mut spool, size).await
    }

    /// Upload `size` bytes from `source`, choosing single-shot or session upload
    pub async fn upload_from<S>(&self, path: &str, source: &mut S, size: u64) -> Result<Metadata>
    where
        S: ChunkSource + ?Sized,
    {
        let (parent, leaf) = require_leaf(path, "upload")?;
        check_chunk_size(self.upload.chunk_size)?;
        let context = self.paths.endpoint(parent);

        let item = if size <= self.upload.threshold {
            debug!("upload: {:?} size={} single request", path, size);
            let body = source.read_chunk(size as usize).await?;
            let request =
                GraphRequest::new(Method::PUT, self.paths.item_action(path, "content")).bytes(body);
            self.client.execute(request).await?.json()?
        } else {
            let mut session = self.create_upload_session(path, leaf, size).await?;
            debug!(
                "upload: {:?} size={} in {} chunk(s)",
                path,
                size,
                session.plan().count()
            );
            let sink = SessionSink::new(self.client.clone(), session.upload_url.clone());
            session.run(source, &sink).await?
        };

        info!("Uploaded {:?} ({} bytes)", path, size);
        Ok(normalize(&self.paths, &item, &context))
    }

    /// Open an upload session for `path`
    pub async fn create_upload_session(
        &self,
        path: &str,
        name: &str,
        size: u64,
    ) -> Result<UploadSession> {
        let request = GraphRequest::new(
            Method::POST,
            self.paths.item_action(path, "createUploadSession"),
        )
        .header("Content-Type", "application/json")
        .json(json!({
            "item": {
                "@microsoft.graph.conflictBehavior": CONFLICT_BEHAVIOR,
                "name": name,
            }
        }));

        let created: CreatedSession = self.client.execute(request).await?.json()?;
        trace!(
            "upload session for {:?} expires {:?}",
            path,
            created.expiration_date_time
        );

        Ok(UploadSession::new(
            created.upload_url,
            size,
            self.upload.chunk_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const MIB_60: u64 = 1024 * 1024 * 60;

    #[test]
    fn test_plan_single_chunk() {
        let ranges: Vec<_> = ChunkPlan::new(10_000_000, MIB_60).collect();
        assert_eq!(ranges, vec![ByteRange { start: 0, end: 9_999_999 }]);
        assert_eq!(ranges[0].content_range(10_000_000), "bytes 0-9999999/10000000");
    }

    #[test]
    fn test_plan_two_chunks() {
        let ranges: Vec<_> = ChunkPlan::new(100_000_000, MIB_60).collect();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].content_range(100_000_000), "bytes 0-62914559/100000000");
        assert_eq!(
            ranges[1].content_range(100_000_000),
            "bytes 62914560-99999999/100000000"
        );
        assert_eq!(ranges[1].len(), 100_000_000 - 62_914_560);
    }

    #[test]
    fn test_plan_covers_range_exactly_once() {
        for (total, chunk) in [(1u64, 1u64), (7, 3), (9, 3), (10, 3), (4_000_001, 327_680)] {
            let ranges: Vec<_> = ChunkPlan::new(total, chunk).collect();
            assert_eq!(ranges.len() as u64, total.div_ceil(chunk));
            assert_eq!(ranges[0].start, 0);
            assert_eq!(ranges.last().unwrap().end, total - 1);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end + 1, pair[1].start);
            }
            assert_eq!(ranges.iter().map(|r| r.len()).sum::<u64>(), total);
        }
    }

    #[test]
    fn test_plan_exact_multiple() {
        let ranges: Vec<_> = ChunkPlan::new(6, 3).collect();
        assert_eq!(
            ranges,
            vec![ByteRange { start: 0, end: 2 }, ByteRange { start: 3, end: 5 }]
        );
    }

    #[test]
    fn test_plan_empty_body() {
        assert_eq!(ChunkPlan::new(0, 3).count(), 0);
    }

    #[test]
    fn test_plan_zero_chunk_size_is_empty() {
        assert_eq!(ChunkPlan::new(10, 0).count(), 0);
    }

    /// Records chunks; fails on the given call index. Completes on the last
    /// range unless `complete_at` names another call index.
    struct RecordingSink {
        seen: Mutex<Vec<(ByteRange, Bytes)>>,
        fail_at: Option<usize>,
        complete_at: Option<usize>,
        never_complete: bool,
    }

    impl RecordingSink {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_at,
                complete_at: None,
                never_complete: false,
            }
        }
    }

    #[async_trait]
    impl ChunkSink for RecordingSink {
        async fn send_chunk(
            &self,
            range: ByteRange,
            total: u64,
            chunk: Bytes,
        ) -> Result<ChunkOutcome> {
            let mut seen = self.seen.lock();
            if self.fail_at == Some(seen.len()) {
                return Err(AdapterError::Transport("connection reset".to_string()));
            }
            let index = seen.len();
            seen.push((range, chunk));
            let done = match self.complete_at {
                Some(at) => index == at,
                None => range.end + 1 == total,
            };
            if done && !self.never_complete {
                Ok(ChunkOutcome::Completed(DriveItem {
                    name: Some("done.bin".to_string()),
                    size: Some(total),
                    ..Default::default()
                }))
            } else {
                Ok(ChunkOutcome::Accepted {
                    next_expected_ranges: vec![format!("{}-", range.end + 1)],
                })
            }
        }
    }

    #[tokio::test]
    async fn test_session_sends_chunks_in_order() {
        let data: Vec<u8> = (0..10u8).collect();
        let mut source = std::io::Cursor::new(data.clone());
        let sink = RecordingSink::new(None);
        let mut session = UploadSession::new("https://upload.example/s", 10, 4);

        let item = session.run(&mut source, &sink).await.unwrap();
        assert_eq!(item.size, Some(10));
        assert_eq!(session.offset, 10);

        let seen = sink.seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, ByteRange { start: 0, end: 3 });
        assert_eq!(seen[2].0, ByteRange { start: 8, end: 9 });
        let joined: Vec<u8> = seen.iter().flat_map(|(_, b)| b.to_vec()).collect();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn test_failure_on_first_chunk_keeps_error_kind() {
        let mut source = std::io::Cursor::new(vec![0u8; 10]);
        let sink = RecordingSink::new(Some(0));
        let mut session = UploadSession::new("https://upload.example/s", 10, 4);

        let err = session.run(&mut source, &sink).await.unwrap_err();
        assert!(matches!(err, AdapterError::Transport(_)));
    }

    #[tokio::test]
    async fn test_failure_after_accepted_chunk_is_partial() {
        let mut source = std::io::Cursor::new(vec![0u8; 10]);
        let sink = RecordingSink::new(Some(1));
        let mut session = UploadSession::new("https://upload.example/s", 10, 4);

        match session.run(&mut source, &sink).await.unwrap_err() {
            AdapterError::PartialUpload {
                uploaded, total, ..
            } => {
                assert_eq!(uploaded, 4);
                assert_eq!(total, 10);
            }
            other => panic!("Expected PartialUpload, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_short_source_is_an_error() {
        let mut source = std::io::Cursor::new(vec![0u8; 6]);
        let sink = RecordingSink::new(None);
        let mut session = UploadSession::new("https://upload.example/s", 10, 4);

        let err = session.run(&mut source, &sink).await.unwrap_err();
        assert!(matches!(err, AdapterError::PartialUpload { uploaded: 4, .. }));
        assert_eq!(sink.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_early_completion_stops_sending() {
        let mut source = std::io::Cursor::new(vec![0u8; 10]);
        let mut sink = RecordingSink::new(None);
        sink.complete_at = Some(0);
        let mut session = UploadSession::new("https://upload.example/s", 10, 4);

        let item = session.run(&mut source, &sink).await.unwrap();
        assert_eq!(item.name.as_deref(), Some("done.bin"));
        assert_eq!(sink.seen.lock().len(), 1);
        assert_eq!(session.offset, 4);
    }

    #[tokio::test]
    async fn test_missing_item_after_last_chunk_is_partial() {
        let mut source = std::io::Cursor::new(vec![0u8; 10]);
        let mut sink = RecordingSink::new(None);
        sink.never_complete = true;
        let mut session = UploadSession::new("https://upload.example/s", 10, 4);

        match session.run(&mut source, &sink).await.unwrap_err() {
            AdapterError::PartialUpload {
                uploaded, total, ..
            } => {
                assert_eq!(uploaded, 10);
                assert_eq!(total, 10);
            }
            other => panic!("Expected PartialUpload, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_chunk_size_is_config_error() {
        let mut source = std::io::Cursor::new(vec![0u8; 10]);
        let sink = RecordingSink::new(None);
        let mut session = UploadSession::new("https://upload.example/s", 10, 0);

        let err = session.run(&mut source, &sink).await.unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
        assert!(sink.seen.lock().is_empty());
    }
}
