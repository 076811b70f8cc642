//! Upload Client
//!
//! Drives one upload through `Idle → Hashing → {Verifying, Uploading}* →
//! Merging → Done | Failed`. Chunks are handled strictly in order, one at a
//! time; the first failing request aborts the upload and nothing is merged.
//! No retries happen here: re-running the upload resumes through the verify
//! step because identifiers are stable within a session.

use std::sync::Arc;

use super::error::UploadError;
use super::hashing::{hash_file, md5_hex};
use super::session::SessionScope;
use super::source::UploadFile;
use super::transport::{HttpTransport, UploadTransport};
use super::types::{
    BatchFailure, BatchOptions, BatchProgress, BatchReport, ChunkPayload, FileCompletion,
    MergeRequest, SingleUpload, SingleUploadKind, UploadClientConfig, UploadOptions, UploadPhase,
    UploadedAsset,
};

// ============================================================================
// Client
// ============================================================================

/// Image upload client
#[derive(Clone)]
pub struct UploadClient<T = HttpTransport> {
    transport: Arc<T>,
    config: UploadClientConfig,
    session: SessionScope,
}

impl UploadClient<HttpTransport> {
    /// Client over HTTP with a fresh session scope
    pub fn http(config: UploadClientConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self::new(transport, config, SessionScope::new())
    }
}

impl<T: UploadTransport> UploadClient<T> {
    pub fn new(transport: T, config: UploadClientConfig, session: SessionScope) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            session,
        }
    }

    pub fn config(&self) -> &UploadClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionScope {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ========================================================================
    // Single File
    // ========================================================================

    /// Upload one image, switching to the chunked path above the threshold
    pub async fn upload_image(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, UploadError> {
        if !file.is_image() {
            return Err(UploadError::NotAnImage);
        }
        if file.size() > self.config.max_image_size {
            return Err(UploadError::TooLarge {
                size: file.size(),
                max: self.config.max_image_size,
            });
        }

        if file.size() > self.config.chunk_threshold {
            tracing::info!(
                file_name = %file.name(),
                size = file.size(),
                threshold = self.config.chunk_threshold,
                "Image above chunk threshold, using chunked upload"
            );
            return self.upload_image_chunked(file, options).await;
        }

        let filename = options
            .filename
            .clone()
            .unwrap_or_else(|| file.name().to_string());

        let upload = SingleUpload {
            filename: filename.clone(),
            mime_type: file.mime_type().to_string(),
            data: file.read_all().await?,
            kind: SingleUploadKind::Image {
                watermark: options.watermark,
                watermark_opacity: options.watermark_opacity,
            },
        };

        let mut tracker = PhaseTracker::new(options);
        tracker.enter(UploadPhase::Uploading { chunk: 1 });

        let url = match tokio::time::timeout(
            self.config.single_upload_timeout,
            self.transport.upload_single(upload),
        )
        .await
        {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => return Err(tracker.fail(e)),
            Err(_) => {
                tracing::warn!(
                    file_name = %filename,
                    timeout_secs = self.config.single_upload_timeout.as_secs_f64(),
                    "Single upload timed out"
                );
                return Err(tracker.fail(UploadError::Timeout));
            }
        };

        tracker.enter(UploadPhase::Done);
        tracker.progress(100);

        Ok(UploadedAsset {
            url,
            original_name: filename,
            size: file.size(),
        })
    }

    /// Upload a cropped avatar; the server re-encodes it
    pub async fn upload_avatar(
        &self,
        data: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<UploadedAsset, UploadError> {
        if data.is_empty() {
            return Err(UploadError::MissingFile);
        }
        if !self.transport.has_credentials() {
            return Err(UploadError::NotAuthenticated);
        }

        let filename = filename.unwrap_or("avatar.png").to_string();
        let mime_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let size = data.len() as u64;

        let url = self
            .transport
            .upload_single(SingleUpload {
                filename: filename.clone(),
                mime_type,
                data,
                kind: SingleUploadKind::Avatar,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Avatar upload failed");
                e
            })?;

        Ok(UploadedAsset {
            url,
            original_name: filename,
            size,
        })
    }

    // ========================================================================
    // Chunked Path
    // ========================================================================

    /// Chunked, resumable upload of one image
    pub async fn upload_image_chunked(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, UploadError> {
        let mut tracker = PhaseTracker::new(options);

        match self.run_chunked(file, options, &mut tracker).await {
            Ok(asset) => {
                tracker.enter(UploadPhase::Done);
                Ok(asset)
            }
            Err(e) => {
                tracing::error!(file_name = %file.name(), error = %e, "Chunked image upload failed");
                Err(tracker.fail(e))
            }
        }
    }

    async fn run_chunked(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
        tracker: &mut PhaseTracker,
    ) -> Result<UploadedAsset, UploadError> {
        if !self.transport.has_credentials() {
            return Err(UploadError::NotAuthenticated);
        }

        let chunk_size = self.config.chunk_size.max(1);
        let total_chunks = chunk_count(file.size(), chunk_size)?;
        if total_chunks == 0 {
            return Err(UploadError::MissingFile);
        }

        tracker.enter(UploadPhase::Hashing);
        let file_hash = hash_file(file, self.config.hash_window).await?;
        let identifier = self.session.image_identifier(&file_hash, file.size());

        tracing::info!(
            identifier = %identifier,
            file_name = %file.name(),
            size = %super::format_file_size(file.size()),
            total_chunks = total_chunks,
            "Starting chunked upload"
        );

        let mut done: u32 = 0;

        for chunk_number in 1..=total_chunks {
            let start = (chunk_number as u64 - 1) * chunk_size;
            let data = file.read_range(start, start + chunk_size).await?;
            let chunk_hash = md5_hex(&data);

            tracker.enter(UploadPhase::Verifying { chunk: chunk_number });
            let status = self
                .transport
                .verify_chunk(&identifier, chunk_number, &chunk_hash)
                .await?;

            if status.reusable() {
                tracing::debug!(
                    identifier = %identifier,
                    chunk = chunk_number,
                    total_chunks = total_chunks,
                    "Chunk already stored, skipping"
                );
            } else {
                tracker.enter(UploadPhase::Uploading { chunk: chunk_number });
                self.transport
                    .upload_chunk(ChunkPayload {
                        identifier: &identifier,
                        chunk_number,
                        total_chunks,
                        filename: file.name(),
                        data,
                    })
                    .await?;

                tracing::debug!(
                    identifier = %identifier,
                    chunk = chunk_number,
                    total_chunks = total_chunks,
                    "Chunk uploaded"
                );
            }

            done += 1;
            tracker.progress(progress_percent(done, total_chunks));
        }

        tracker.enter(UploadPhase::Merging);
        let url = self
            .transport
            .merge_chunks(&MergeRequest {
                identifier: identifier.clone(),
                total_chunks,
                filename: file.name().to_string(),
                watermark: options.watermark,
                watermark_opacity: options.watermark_opacity,
            })
            .await?;

        tracing::info!(identifier = %identifier, url = %url, "Chunked upload complete");

        Ok(UploadedAsset {
            url,
            original_name: file.name().to_string(),
            size: file.size(),
        })
    }

    // ========================================================================
    // Batch
    // ========================================================================

    /// Upload files one after another, isolating per-file failures
    pub async fn upload_images(
        &self,
        files: &[UploadFile],
        options: &BatchOptions,
    ) -> Result<BatchReport, UploadError> {
        if files.is_empty() {
            return Err(UploadError::MissingFile);
        }
        if files.len() > options.max_count {
            return Err(UploadError::TooManyFiles {
                count: files.len(),
                max: options.max_count,
            });
        }

        let total = files.len();
        let per_file = UploadOptions {
            watermark: options.watermark,
            watermark_opacity: options.watermark_opacity,
            ..Default::default()
        };

        let mut uploaded = Vec::new();
        let mut errors = Vec::new();

        for (index, file) in files.iter().enumerate() {
            if let Some(cb) = &options.on_progress {
                cb(BatchProgress {
                    current: index + 1,
                    total,
                    percent: progress_percent(index as u32 + 1, total as u32),
                });
            }

            let result = self.upload_image(file, &per_file).await;

            let completion = FileCompletion {
                index,
                file_name: file.name().to_string(),
                result: result.as_ref().cloned().map_err(|e| e.to_string()),
            };
            if let Some(cb) = &options.on_file_complete {
                cb(&completion);
            }

            match result {
                Ok(asset) => uploaded.push(asset),
                Err(e) => {
                    tracing::warn!(file_name = %file.name(), error = %e, "Batch item failed");
                    errors.push(BatchFailure {
                        file: file.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = BatchReport {
            success_count: uploaded.len(),
            error_count: errors.len(),
            uploaded,
            errors,
            total,
        };

        tracing::info!(
            total = report.total,
            success = report.success_count,
            failed = report.error_count,
            "Batch upload finished"
        );

        Ok(report)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Number of chunks for a file; counts beyond `u32` are rejected
pub fn chunk_count(file_size: u64, chunk_size: u64) -> Result<u32, UploadError> {
    let chunks = file_size.div_ceil(chunk_size.max(1));
    u32::try_from(chunks).map_err(|_| UploadError::TooManyChunks { chunks })
}

/// `round(done / total * 100)`, held below 100 until the last chunk
pub fn progress_percent(done: u32, total: u32) -> u8 {
    if total == 0 || done >= total {
        return 100;
    }
    let rounded = (done as u64 * 200 + total as u64) / (2 * total as u64);
    rounded.min(99) as u8
}

/// Phase bookkeeping and callback fan-out for one invocation
struct PhaseTracker {
    phase: UploadPhase,
    last_progress: u8,
    on_progress: Option<super::types::ProgressFn>,
    on_phase: Option<super::types::PhaseFn>,
}

impl PhaseTracker {
    fn new(options: &UploadOptions) -> Self {
        Self {
            phase: UploadPhase::Idle,
            last_progress: 0,
            on_progress: options.on_progress.clone(),
            on_phase: options.on_phase.clone(),
        }
    }

    fn enter(&mut self, phase: UploadPhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "Upload phase transition");
        self.phase = phase;
        if let Some(cb) = &self.on_phase {
            cb(&self.phase);
        }
    }

    fn progress(&mut self, percent: u8) {
        let percent = percent.max(self.last_progress);
        self.last_progress = percent;
        if let Some(cb) = &self.on_progress {
            cb(percent);
        }
    }

    fn fail(&mut self, err: UploadError) -> UploadError {
        self.enter(UploadPhase::Failed);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::ChunkStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory server side of the protocol, recording every call
    #[derive(Default)]
    struct MockTransport {
        no_credentials: bool,
        stored: Mutex<HashMap<(String, u32), String>>,
        calls: Mutex<Vec<String>>,
        /// Chunk number whose upload fails; 0 disables
        fail_chunk: AtomicU32,
        /// Chunk number whose upload is refused with a non-success envelope code
        reject_chunk: AtomicU32,
        /// Chunk number whose verify is refused with a non-success envelope code
        reject_verify: AtomicU32,
        single_delay: Option<Duration>,
    }

    impl MockTransport {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl UploadTransport for MockTransport {
        fn has_credentials(&self) -> bool {
            !self.no_credentials
        }

        async fn verify_chunk(
            &self,
            identifier: &str,
            chunk_number: u32,
            md5: &str,
        ) -> Result<ChunkStatus, UploadError> {
            self.record(format!("verify:{}", chunk_number));
            if self.reject_verify.load(Ordering::SeqCst) == chunk_number {
                return Err(UploadError::Api(format!(
                    "chunk {} verify failed: storage unavailable",
                    chunk_number
                )));
            }
            let stored = self.stored.lock().unwrap();
            Ok(match stored.get(&(identifier.to_string(), chunk_number)) {
                Some(hash) => ChunkStatus {
                    exists: true,
                    valid: hash == md5,
                },
                None => ChunkStatus::default(),
            })
        }

        async fn upload_chunk(&self, chunk: ChunkPayload<'_>) -> Result<(), UploadError> {
            self.record(format!("upload:{}", chunk.chunk_number));
            if self.fail_chunk.load(Ordering::SeqCst) == chunk.chunk_number {
                return Err(UploadError::Http {
                    status: 500,
                    context: format!("chunk {} upload failed", chunk.chunk_number),
                });
            }
            if self.reject_chunk.load(Ordering::SeqCst) == chunk.chunk_number {
                return Err(UploadError::Api(format!(
                    "chunk {} upload failed: disk full",
                    chunk.chunk_number
                )));
            }
            self.stored.lock().unwrap().insert(
                (chunk.identifier.to_string(), chunk.chunk_number),
                md5_hex(&chunk.data),
            );
            Ok(())
        }

        async fn merge_chunks(&self, request: &MergeRequest) -> Result<String, UploadError> {
            self.record(format!("merge:{}", request.identifier));
            let stored = self.stored.lock().unwrap();
            let complete = (1..=request.total_chunks)
                .all(|n| stored.contains_key(&(request.identifier.clone(), n)));
            if !complete {
                return Err(UploadError::Api("missing chunks".to_string()));
            }
            Ok(format!("/media/{}.png", request.identifier))
        }

        async fn upload_single(&self, upload: SingleUpload) -> Result<String, UploadError> {
            self.record(format!("single:{}", upload.filename));
            if let Some(delay) = self.single_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(format!("/media/{}", upload.filename))
        }
    }

    fn small_chunks() -> UploadClientConfig {
        UploadClientConfig {
            chunk_size: 3,
            chunk_threshold: 3,
            hash_window: 2,
            ..UploadClientConfig::default().with_token("token")
        }
    }

    fn png(name: &str, len: usize) -> UploadFile {
        UploadFile::from_bytes(name, "image/png", (0..len).map(|i| i as u8).collect())
    }

    fn recording_options() -> (UploadOptions, Arc<Mutex<Vec<u8>>>, Arc<Mutex<Vec<UploadPhase>>>) {
        let progress: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let phases: Arc<Mutex<Vec<UploadPhase>>> = Arc::new(Mutex::new(Vec::new()));
        let p = progress.clone();
        let ph = phases.clone();
        let options = UploadOptions {
            on_progress: Some(Arc::new(move |n: u8| p.lock().unwrap().push(n))),
            on_phase: Some(Arc::new(move |phase: &UploadPhase| ph.lock().unwrap().push(phase.clone()))),
            ..Default::default()
        };
        (options, progress, phases)
    }

    #[test]
    fn test_chunk_count() {
        let mb = 1024 * 1024;
        assert_eq!(chunk_count(7 * mb, 3 * mb).unwrap(), 3);
        assert_eq!(chunk_count(6 * mb, 3 * mb).unwrap(), 2);
        assert_eq!(chunk_count(1, 3 * mb).unwrap(), 1);
        assert_eq!(chunk_count(0, 3 * mb).unwrap(), 0);
        assert_eq!(chunk_count(u32::MAX as u64, 1).unwrap(), u32::MAX);

        let err = chunk_count(u32::MAX as u64 + 1, 1).unwrap_err();
        assert!(matches!(err, UploadError::TooManyChunks { chunks } if chunks == u32::MAX as u64 + 1));
        assert!(err.is_validation());
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 2), 50);
        // Would round to 100 but the upload is not finished
        assert_eq!(progress_percent(200, 201), 99);
    }

    #[tokio::test]
    async fn test_chunked_upload_reports_monotonic_progress() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());
        let (options, progress, phases) = recording_options();

        let asset = client.upload_image(&png("a.png", 7), &options).await.unwrap();

        assert!(asset.url.starts_with("/media/img_"));
        assert_eq!(*progress.lock().unwrap(), vec![33, 67, 100]);
        assert_eq!(phases.lock().unwrap().first(), Some(&UploadPhase::Hashing));
        assert_eq!(phases.lock().unwrap().last(), Some(&UploadPhase::Done));
        assert_eq!(
            client.transport().calls()[..6],
            ["verify:1", "upload:1", "verify:2", "upload:2", "verify:3", "upload:3"]
        );
    }

    #[tokio::test]
    async fn test_failed_chunk_aborts_then_resumes() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());
        let file = png("b.png", 7);
        client.transport().fail_chunk.store(3, Ordering::SeqCst);

        let (options, _, phases) = recording_options();
        let err = client.upload_image(&file, &options).await.unwrap_err();
        assert!(matches!(err, UploadError::Http { status: 500, .. }));
        assert_eq!(phases.lock().unwrap().last(), Some(&UploadPhase::Failed));
        assert!(!client.transport().calls().iter().any(|c| c.starts_with("merge")));

        client.transport().fail_chunk.store(0, Ordering::SeqCst);
        client.transport().calls.lock().unwrap().clear();

        client.upload_image(&file, &UploadOptions::default()).await.unwrap();
        let calls = client.transport().calls();
        assert_eq!(calls[..4], ["verify:1", "verify:2", "verify:3", "upload:3"]);
        assert!(calls[4].starts_with("merge:img_"));
    }

    #[tokio::test]
    async fn test_rejected_chunk_aborts_without_merge() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());
        client.transport().reject_chunk.store(2, Ordering::SeqCst);

        let (options, progress, phases) = recording_options();
        let err = client.upload_image(&png("c.png", 7), &options).await.unwrap_err();

        assert!(matches!(err, UploadError::Api(ref msg) if msg.contains("disk full")));
        assert_eq!(phases.lock().unwrap().last(), Some(&UploadPhase::Failed));
        assert_eq!(*progress.lock().unwrap(), vec![33]);
        assert_eq!(
            client.transport().calls(),
            ["verify:1", "upload:1", "verify:2", "upload:2"]
        );
    }

    #[tokio::test]
    async fn test_rejected_verify_aborts_without_merge() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());
        client.transport().reject_verify.store(3, Ordering::SeqCst);

        let (options, _, phases) = recording_options();
        let err = client.upload_image(&png("d.png", 7), &options).await.unwrap_err();

        assert!(matches!(err, UploadError::Api(_)));
        assert_eq!(phases.lock().unwrap().last(), Some(&UploadPhase::Failed));
        let calls = client.transport().calls();
        assert_eq!(calls.last().map(String::as_str), Some("verify:3"));
        assert!(!calls.iter().any(|c| c.starts_with("upload:3") || c.starts_with("merge")));
    }

    #[tokio::test]
    async fn test_identifier_is_stable_within_session() {
        let session = SessionScope::new();
        let client = UploadClient::new(MockTransport::default(), small_chunks(), session.clone());
        let file = png("c.png", 5);

        client.upload_image(&file, &UploadOptions::default()).await.unwrap();
        client.upload_image(&file, &UploadOptions::default()).await.unwrap();

        let merges: Vec<String> = client
            .transport()
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("merge:"))
            .collect();
        assert_eq!(merges.len(), 2);
        assert_eq!(merges[0], merges[1]);
        assert!(merges[0].contains(session.token()));

        // Second run re-sent nothing
        let uploads = client.transport().calls().iter().filter(|c| c.starts_with("upload:")).count();
        assert_eq!(uploads, 2);
    }

    #[tokio::test]
    async fn test_chunked_upload_requires_credentials() {
        let transport = MockTransport {
            no_credentials: true,
            ..Default::default()
        };
        let client = UploadClient::new(transport, small_chunks(), SessionScope::new());

        let err = client.upload_image(&png("d.png", 7), &UploadOptions::default()).await.unwrap_err();
        assert!(matches!(err, UploadError::NotAuthenticated));
        assert!(client.transport().calls().is_empty());
        assert!(!client.session().is_initialized());
    }

    #[tokio::test]
    async fn test_single_upload_times_out() {
        let transport = MockTransport {
            single_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let config = UploadClientConfig {
            single_upload_timeout: Duration::from_millis(50),
            ..UploadClientConfig::default()
        };
        let client = UploadClient::new(transport, config, SessionScope::new());
        let (options, _, phases) = recording_options();

        let err = client.upload_image(&png("e.png", 10), &options).await.unwrap_err();
        assert!(matches!(err, UploadError::Timeout));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(phases.lock().unwrap().last(), Some(&UploadPhase::Failed));
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());

        let text = UploadFile::from_bytes("notes.txt", "text/plain", b"hello".to_vec());
        assert!(matches!(
            client.upload_image(&text, &UploadOptions::default()).await,
            Err(UploadError::NotAnImage)
        ));

        let config = UploadClientConfig {
            max_image_size: 4,
            ..small_chunks()
        };
        let client = UploadClient::new(MockTransport::default(), config, SessionScope::new());
        assert!(matches!(
            client.upload_image(&png("big.png", 5), &UploadOptions::default()).await,
            Err(UploadError::TooLarge { size: 5, max: 4 })
        ));
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());
        let files = vec![
            png("one.png", 2),
            UploadFile::from_bytes("two.txt", "text/plain", b"nope".to_vec()),
            png("three.png", 7),
        ];

        let progress: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let completed: Arc<Mutex<Vec<(usize, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let p = progress.clone();
        let c = completed.clone();
        let options = BatchOptions {
            on_progress: Some(Arc::new(move |bp: BatchProgress| p.lock().unwrap().push(bp.current))),
            on_file_complete: Some(Arc::new(move |fc: &FileCompletion| {
                c.lock().unwrap().push((fc.index, fc.result.is_ok()))
            })),
            ..Default::default()
        };

        let report = client.upload_images(&files, &options).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors[0].file, "two.txt");
        assert!(report.success());
        assert_eq!(*progress.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(*completed.lock().unwrap(), vec![(0, true), (1, false), (2, true)]);
    }

    #[tokio::test]
    async fn test_batch_limits() {
        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());

        assert!(matches!(
            client.upload_images(&[], &BatchOptions::default()).await,
            Err(UploadError::MissingFile)
        ));

        let files: Vec<UploadFile> = (0..3).map(|i| png(&format!("{}.png", i), 1)).collect();
        let options = BatchOptions {
            max_count: 2,
            ..Default::default()
        };
        assert!(matches!(
            client.upload_images(&files, &options).await,
            Err(UploadError::TooManyFiles { count: 3, max: 2 })
        ));
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_avatar_requires_credentials() {
        let transport = MockTransport {
            no_credentials: true,
            ..Default::default()
        };
        let client = UploadClient::new(transport, UploadClientConfig::default(), SessionScope::new());
        assert!(matches!(
            client.upload_avatar(vec![1, 2, 3], None).await,
            Err(UploadError::NotAuthenticated)
        ));

        let client = UploadClient::new(MockTransport::default(), small_chunks(), SessionScope::new());
        let asset = client.upload_avatar(vec![1, 2, 3], Some("me.png")).await.unwrap();
        assert_eq!(asset.url, "/media/me.png");
        assert_eq!(asset.size, 3);
    }
}
