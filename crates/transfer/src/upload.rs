//! Sequential chunked upload.

use std::future::Future;
use std::pin::Pin;

use planlink_connection::{ApiError, ConnectionContext};
use planlink_protocol::FileMetadata;
use tracing::{debug, info, warn};

use crate::chunked::{ChunkReader, ChunkSize};
use crate::progress::{RateMeter, format_rate};
use crate::types::{TransferSession, UploadOutcome, UploadSource};
use crate::validation::validate_target_id;
use crate::TransferError;

/// Remote side of an upload.
///
/// [`RemoteFile`] talks to the model file store; tests implement this trait
/// with recording mocks.
pub trait UploadTarget: Send + Sync {
    /// Announces the file with an unknown chunk count.
    fn declare<'a>(
        &'a self,
        file_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;

    /// Sends chunk `index`.
    fn put_chunk<'a>(
        &'a self,
        file_id: &'a str,
        index: u64,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;

    /// Marks the file complete with its final chunk count.
    fn complete<'a>(
        &'a self,
        file_id: &'a str,
        chunk_count: u64,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>>;
}

/// File store of the model bound to a [`ConnectionContext`].
pub struct RemoteFile<'c> {
    ctx: &'c ConnectionContext,
}

impl<'c> RemoteFile<'c> {
    pub fn new(ctx: &'c ConnectionContext) -> Self {
        Self { ctx }
    }
}

impl UploadTarget for RemoteFile<'_> {
    fn declare<'a>(
        &'a self,
        file_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.ctx.file_url(file_id);
            self.ctx
                .put_json(&url, &FileMetadata::declare(file_id))
                .await
        })
    }

    fn put_chunk<'a>(
        &'a self,
        file_id: &'a str,
        index: u64,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/chunks/{index}", self.ctx.file_url(file_id));
            self.ctx.put_bytes(&url, data).await
        })
    }

    fn complete<'a>(
        &'a self,
        file_id: &'a str,
        chunk_count: u64,
    ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/complete", self.ctx.file_url(file_id));
            self.ctx
                .put_json(&url, &FileMetadata::complete(file_id, chunk_count))
                .await
        })
    }
}

/// Uploads `source` to file `file_id` of the context's model.
///
/// `chunk_size_mb` must be between 1 and 50.
pub async fn upload(
    ctx: &ConnectionContext,
    file_id: &str,
    chunk_size_mb: u32,
    source: UploadSource,
) -> Result<UploadOutcome, TransferError> {
    let chunk_size = ChunkSize::from_mb(chunk_size_mb)?;
    upload_to(&RemoteFile::new(ctx), file_id, chunk_size, source).await
}

/// Runs the upload protocol against any [`UploadTarget`].
///
/// Nothing is sent when the source is missing or empty. A failed chunk
/// abandons the session without a completion marker.
pub async fn upload_to(
    target: &dyn UploadTarget,
    file_id: &str,
    chunk_size: ChunkSize,
    source: UploadSource,
) -> Result<UploadOutcome, TransferError> {
    validate_target_id(file_id)?;

    let mut reader = tokio::task::spawn_blocking(move || ChunkReader::open(source, chunk_size))
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))??;

    let mut session = TransferSession::new(file_id, reader.total_bytes(), chunk_size);
    info!(
        file_id,
        total_bytes = session.total_bytes(),
        chunks = session.chunk_count(),
        chunk_size = chunk_size.bytes(),
        "starting upload"
    );

    target
        .declare(file_id)
        .await
        .map_err(TransferError::Declare)?;

    let mut meter = RateMeter::new();
    while let Some(index) = session.next_index() {
        let (r, chunk) = tokio::task::spawn_blocking(move || {
            let chunk = reader.read_chunk(index);
            (reader, chunk)
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?;
        reader = r;

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                session.abandon();
                return Err(e);
            }
        };

        let len = chunk.data.len() as u64;
        if let Err(source) = target.put_chunk(file_id, index, chunk.data).await {
            session.abandon();
            warn!(file_id, chunk = index, error = %source, "chunk rejected, upload abandoned");
            return Err(TransferError::ChunkFailed { index, source });
        }
        session.acknowledge(index, len)?;
        meter.record(len);

        debug!(
            file_id,
            chunk = index,
            bytes = len,
            sent = session.transferred_bytes(),
            rate = %format_rate(meter.chunk_rate()),
            "chunk uploaded"
        );
    }

    let chunks = session.finish()?;
    target
        .complete(file_id, chunks)
        .await
        .map_err(TransferError::Complete)?;

    let outcome = UploadOutcome {
        file_id: file_id.to_string(),
        chunks,
        bytes: session.transferred_bytes(),
    };
    info!(
        file_id,
        chunks,
        bytes = outcome.bytes,
        elapsed_ms = session.elapsed().as_millis() as u64,
        rate = %format_rate(meter.overall_rate()),
        "{outcome}"
    );
    Ok(outcome)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chunked::MIB;
    use chrono::Utc;
    use planlink_connection::{ApiClient, Endpoints};
    use planlink_protocol::AuthToken;
    use planlink_test_support::{MockResponse, MockServer};
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Declare(String),
        Chunk(u64, u64),
        Complete(String, u64),
    }

    /// Records calls; fails `put_chunk` for `fail_chunk`.
    #[derive(Default)]
    pub(crate) struct RecordingTarget {
        pub calls: Mutex<Vec<Call>>,
        pub fail_declare: bool,
        pub fail_chunk: Option<u64>,
        pub stored: Mutex<Vec<u8>>,
    }

    impl RecordingTarget {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            body: "boom".into(),
        }
    }

    impl UploadTarget for RecordingTarget {
        fn declare<'a>(
            &'a self,
            file_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Declare(file_id.to_string()));
            let fail = self.fail_declare;
            Box::pin(async move { if fail { Err(server_error()) } else { Ok(()) } })
        }

        fn put_chunk<'a>(
            &'a self,
            _file_id: &'a str,
            index: u64,
            data: Vec<u8>,
        ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Chunk(index, data.len() as u64));
            let fail = self.fail_chunk == Some(index);
            if !fail {
                self.stored.lock().unwrap().extend_from_slice(&data);
            }
            Box::pin(async move { if fail { Err(server_error()) } else { Ok(()) } })
        }

        fn complete<'a>(
            &'a self,
            file_id: &'a str,
            chunk_count: u64,
        ) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Complete(file_id.to_string(), chunk_count));
            Box::pin(async { Ok(()) })
        }
    }

    fn bytes(n: u64) -> ChunkSize {
        ChunkSize::from_bytes(n).unwrap()
    }

    #[tokio::test]
    async fn large_file_uploads_in_three_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(120 * MIB).unwrap();
        drop(file);

        let target = RecordingTarget::default();
        let outcome = upload_to(
            &target,
            "113000000001",
            ChunkSize::from_mb(50).unwrap(),
            UploadSource::File(path),
        )
        .await
        .unwrap();

        assert_eq!(
            target.calls(),
            vec![
                Call::Declare("113000000001".into()),
                Call::Chunk(0, 50 * MIB),
                Call::Chunk(1, 50 * MIB),
                Call::Chunk(2, 20 * MIB),
                Call::Complete("113000000001".into(), 3),
            ]
        );
        assert_eq!(outcome.chunks, 3);
        assert_eq!(outcome.bytes, 120 * MIB);
        assert_eq!(outcome.to_string(), "Upload of file 113000000001 complete.");
    }

    #[tokio::test]
    async fn exact_multiple_has_full_last_chunk() {
        let target = RecordingTarget::default();
        upload_to(&target, "f", bytes(4), UploadSource::Bytes(b"abcdefgh".to_vec()))
            .await
            .unwrap();
        assert_eq!(
            target.calls(),
            vec![
                Call::Declare("f".into()),
                Call::Chunk(0, 4),
                Call::Chunk(1, 4),
                Call::Complete("f".into(), 2),
            ]
        );
        assert_eq!(*target.stored.lock().unwrap(), b"abcdefgh");
    }

    #[tokio::test]
    async fn file_and_buffer_sources_send_same_bytes() {
        let content = b"id,name\n1,alpha\n2,beta\n3,gamma\n".to_vec();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&content)
            .unwrap();

        let from_file = RecordingTarget::default();
        upload_to(&from_file, "f", bytes(7), UploadSource::File(path))
            .await
            .unwrap();
        let from_buf = RecordingTarget::default();
        upload_to(&from_buf, "f", bytes(7), UploadSource::Bytes(content.clone()))
            .await
            .unwrap();

        assert_eq!(from_file.calls(), from_buf.calls());
        assert_eq!(*from_file.stored.lock().unwrap(), content);
    }

    #[tokio::test]
    async fn failed_declare_sends_nothing_else() {
        let target = RecordingTarget {
            fail_declare: true,
            ..Default::default()
        };
        let err = upload_to(&target, "f", bytes(4), UploadSource::Bytes(vec![1; 10]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Declare(_)));
        assert_eq!(target.calls(), vec![Call::Declare("f".into())]);
    }

    #[tokio::test]
    async fn failed_chunk_skips_completion() {
        let target = RecordingTarget {
            fail_chunk: Some(1),
            ..Default::default()
        };
        let err = upload_to(&target, "f", bytes(4), UploadSource::Bytes(vec![1; 10]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::ChunkFailed { index: 1, .. }));
        assert!(
            !target
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Complete(..)))
        );
        assert_eq!(target.calls().len(), 3);
    }

    #[tokio::test]
    async fn missing_source_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = RecordingTarget::default();
        let err = upload_to(
            &target,
            "f",
            bytes(4),
            UploadSource::File(dir.path().join("missing.csv")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransferError::SourceNotFound(_)));
        assert!(target.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_source_sends_nothing() {
        let target = RecordingTarget::default();
        let err = upload_to(&target, "f", bytes(4), UploadSource::Bytes(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::EmptySource));
        assert!(target.calls().is_empty());
    }

    pub(crate) fn context(base: &str) -> ConnectionContext {
        let api = ApiClient::new(Endpoints::local(base)).unwrap();
        let token = AuthToken::new("tok", Utc::now() + chrono::Duration::minutes(30));
        ConnectionContext::new(api, token, "ws1", "m1")
    }

    #[tokio::test]
    async fn invalid_chunk_size_sends_nothing() {
        let server = MockServer::always(MockResponse::status(204)).await;
        let ctx = context(server.url());
        let err = upload(&ctx, "f", 51, UploadSource::Bytes(vec![1; 10]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidChunkSize(51)));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn remote_upload_request_sequence() {
        let server = MockServer::always(MockResponse::status(204)).await;
        let ctx = context(server.url());
        let data: Vec<u8> = (0..(MIB + 10)).map(|i| (i % 251) as u8).collect();

        let outcome = upload(&ctx, "113000000007", 1, UploadSource::Bytes(data.clone()))
            .await
            .unwrap();
        assert_eq!(outcome.chunks, 2);

        let base = "/2/0/workspaces/ws1/models/m1/files/113000000007";
        let reqs = server.requests();
        let lines: Vec<(String, String)> = reqs
            .iter()
            .map(|r| (r.method.clone(), r.path.clone()))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("PUT".to_string(), base.to_string()),
                ("PUT".to_string(), format!("{base}/chunks/0")),
                ("PUT".to_string(), format!("{base}/chunks/1")),
                ("PUT".to_string(), format!("{base}/complete")),
            ]
        );

        let declare: serde_json::Value = serde_json::from_slice(&reqs[0].body).unwrap();
        assert_eq!(declare["chunkCount"], -1);
        assert_eq!(declare["id"], "113000000007");
        assert_eq!(reqs[1].body.len() as u64, MIB);
        assert_eq!(reqs[2].body, data[MIB as usize..]);
        let complete: serde_json::Value = serde_json::from_slice(&reqs[3].body).unwrap();
        assert_eq!(complete["chunkCount"], 2);
    }
}
