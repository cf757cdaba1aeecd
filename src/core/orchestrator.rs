//! Search and download workflows
//!
//! Each workflow turns one user intent into calls on the extractor, the preview
//! fetcher and the storage index. Failures are reported through the notifier
//! and degrade to a "no result" value; nothing is retried.

use crate::config::Config;
use crate::core::media::{DownloadResult, Locator, MediaMetadata, Notice};
use crate::download::{ScratchArea, ThumbnailCache, ThumbnailFetcher};
use crate::error::{FailureKind, WebdlError};
use crate::platform::ExtractionBridge;
use crate::storage::{EntryAttributes, MediaStore, TargetFolder};
use crate::utils::filename::{timestamped_filename, MEDIA_PREFIX};
use crate::utils::url::{host_of, normalize_input};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Callback receiving user-visible messages
pub type Notifier = Arc<dyn Fn(Notice) + Send + Sync>;

/// Coordinates the extractor, preview cache and storage index
pub struct Orchestrator {
    bridge: Arc<dyn ExtractionBridge>,
    store: Arc<dyn MediaStore>,
    thumbnails: ThumbnailFetcher,
    cache: ThumbnailCache,
    scratch: ScratchArea,
    notifier: Option<Notifier>,
    // One slot per intent: a second request is rejected, never queued
    search_slot: Mutex<()>,
    download_slot: Mutex<()>,
}

impl Orchestrator {
    /// Create an orchestrator using the directories and HTTP settings of `config`
    pub fn new(
        bridge: Arc<dyn ExtractionBridge>,
        store: Arc<dyn MediaStore>,
        config: &Config,
    ) -> Result<Self, WebdlError> {
        Ok(Self {
            bridge,
            store,
            thumbnails: ThumbnailFetcher::with_config(config)?,
            cache: ThumbnailCache::new(&config.cache_dir),
            scratch: ScratchArea::new(&config.temp_dir),
            notifier: None,
            search_slot: Mutex::new(()),
            download_slot: Mutex::new(()),
        })
    }

    /// Set the callback receiving user-visible messages
    pub fn with_notifier(mut self, notifier: impl Fn(Notice) + Send + Sync + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Check if a search is in flight
    pub fn is_searching(&self) -> bool {
        self.search_slot.try_lock().is_err()
    }

    /// Check if a download is in flight
    pub fn is_downloading(&self) -> bool {
        self.download_slot.try_lock().is_err()
    }

    /// Resolve `url` into a title and a locally cached preview.
    ///
    /// Never fails: errors are reported to the notifier and yield
    /// [`MediaMetadata::empty`].
    pub async fn search(&self, url: &str) -> MediaMetadata {
        match self.try_search(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Search failed: {}", e);
                self.notify(Notice::error(e.to_string()));
                MediaMetadata::empty()
            }
        }
    }

    /// Search workflow, returning the error instead of reporting it
    pub async fn try_search(&self, url: &str) -> Result<MediaMetadata, WebdlError> {
        let url = normalize_input(url)?;
        let _slot = self
            .search_slot
            .try_lock()
            .map_err(|_| WebdlError::Busy("search"))?;
        info!("Searching {}", host_of(&url).unwrap_or_else(|| url.clone()));

        let thumbnail_dir = self
            .cache
            .prepare()
            .await
            .map_err(|e| e.attribute_to(FailureKind::Resolve))?;

        let resolved = self
            .bridge
            .resolve_metadata(&url, thumbnail_dir)
            .await
            .map_err(|e| e.attribute_to(FailureKind::Resolve))?;

        let thumbnail = match resolved.thumbnail_url() {
            Some(thumbnail_url) => {
                let path = self.cache.thumbnail_path();
                self.thumbnails
                    .fetch(thumbnail_url, &path)
                    .await
                    .map_err(|e| e.attribute_to(FailureKind::Thumbnail))?;
                Some(path)
            }
            None => {
                debug!("No thumbnail for {}", url);
                None
            }
        };

        let title = resolved.title.unwrap_or_default();
        if title.is_empty() {
            warn!("Extractor {} returned no title for {}", self.bridge.name(), url);
        }
        Ok(MediaMetadata { title, thumbnail })
    }

    /// Download `url` into `folder` of the storage index.
    ///
    /// Never fails: errors are reported to the notifier and yield
    /// [`DownloadResult::failed`].
    pub async fn download(&self, url: &str, folder: TargetFolder) -> DownloadResult {
        match self.try_download(url, folder).await {
            Ok(locator) => {
                self.notify(Notice::info(format!("Video saved to {}.", folder)));
                DownloadResult::succeeded(locator)
            }
            Err(e) => {
                warn!("Download failed: {}", e);
                self.notify(Notice::error(e.to_string()));
                DownloadResult::failed()
            }
        }
    }

    /// Download workflow, returning the error instead of reporting it.
    ///
    /// On failure after the index entry was created, the entry is aborted and
    /// the scratch file removed.
    pub async fn try_download(
        &self,
        url: &str,
        folder: TargetFolder,
    ) -> Result<Locator, WebdlError> {
        let url = normalize_input(url)?;
        let _slot = self
            .download_slot
            .try_lock()
            .map_err(|_| WebdlError::Busy("download"))?;

        let filename = timestamped_filename(MEDIA_PREFIX, "mp4");
        let collection = folder.collection();
        info!("Downloading {} as {} into {}", url, filename, collection);

        let scratch_path = self
            .scratch
            .path_for(&filename)
            .await
            .map_err(|e| e.attribute_to(FailureKind::MediaFetch))?;

        let locator = self
            .store
            .create_pending(collection, EntryAttributes::pending_video(&filename, folder))
            .await
            .map_err(|e| e.attribute_to(FailureKind::StorageIndex))?;

        match self.commit(&url, &locator, &scratch_path).await {
            Ok(()) => {
                info!("Saved {} as {}", filename, locator);
                Ok(locator)
            }
            Err(e) => {
                if let Err(abort_err) = self.store.abort(&locator).await {
                    warn!("Could not abort pending entry {}: {}", locator, abort_err);
                }
                self.scratch.discard(&scratch_path).await;
                Err(e)
            }
        }
    }

    async fn commit(
        &self,
        url: &str,
        locator: &Locator,
        scratch_path: &Path,
    ) -> Result<(), WebdlError> {
        let mut output = self
            .store
            .open_output(locator)
            .await
            .map_err(|e| e.attribute_to(FailureKind::StorageIndex))?;

        self.bridge
            .fetch_media(url, scratch_path)
            .await
            .map_err(|e| e.attribute_to(FailureKind::MediaFetch))?;

        if !scratch_exists(scratch_path).await {
            return Err(WebdlError::MediaFetch(format!(
                "{} produced no file",
                self.bridge.name()
            )));
        }

        let copied = async {
            let mut input = tokio::fs::File::open(scratch_path).await?;
            let copied = tokio::io::copy(&mut input, &mut output).await?;
            output.flush().await?;
            output.shutdown().await?;
            Ok::<u64, std::io::Error>(copied)
        }
        .await
        .map_err(|e| WebdlError::StorageIndex(format!("copy into {} failed: {}", locator, e)))?;
        drop(output);
        debug!("Copied {} bytes into {}", copied, locator);

        self.store
            .finalize(locator)
            .await
            .map_err(|e| e.attribute_to(FailureKind::StorageIndex))?;
        self.scratch.discard(scratch_path).await;
        Ok(())
    }

    fn notify(&self, notice: Notice) {
        if let Some(notifier) = &self.notifier {
            notifier(notice);
        }
    }
}

async fn scratch_exists(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::media::{NoticeLevel, ResolvedMetadata};
    use crate::storage::{Collection, ContentWriter, FsMediaStore, MediaEntry};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// What the fake extractor does when asked for media
    #[derive(Clone)]
    enum FetchBehavior {
        Write(Vec<u8>),
        WriteNothing,
        Raise,
        WritePartialThenRaise,
    }

    struct FakeBridge {
        metadata: Result<ResolvedMetadata, String>,
        fetch: FetchBehavior,
        delay: Option<Duration>,
        resolve_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        destinations: std::sync::Mutex<Vec<PathBuf>>,
    }

    impl FakeBridge {
        fn new(title: &str, thumbnail: Option<String>) -> Self {
            Self {
                metadata: Ok(ResolvedMetadata {
                    title: Some(title.to_string()),
                    thumbnail,
                }),
                fetch: FetchBehavior::Write(b"\x00\x00\x00\x18ftypmp42 fixture".to_vec()),
                delay: None,
                resolve_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
                destinations: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn failing_resolve(message: &str) -> Self {
            Self {
                metadata: Err(message.to_string()),
                ..Self::new("", None)
            }
        }

        fn with_fetch(mut self, fetch: FetchBehavior) -> Self {
            self.fetch = fetch;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl ExtractionBridge for FakeBridge {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn resolve_metadata(
            &self,
            _url: &str,
            thumbnail_dir: &Path,
        ) -> Result<ResolvedMetadata, WebdlError> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            assert!(thumbnail_dir.is_dir());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.metadata.clone().map_err(WebdlError::Bridge)
        }

        async fn fetch_media(&self, _url: &str, destination: &Path) -> Result<(), WebdlError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.destinations
                .lock()
                .unwrap()
                .push(destination.to_path_buf());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.fetch {
                FetchBehavior::Write(bytes) => {
                    tokio::fs::write(destination, bytes).await?;
                    Ok(())
                }
                FetchBehavior::WriteNothing => Ok(()),
                FetchBehavior::Raise => {
                    Err(WebdlError::Bridge("ERROR: Requested format is not available".to_string()))
                }
                FetchBehavior::WritePartialThenRaise => {
                    tokio::fs::write(destination, b"half").await?;
                    Err(WebdlError::Bridge("connection reset".to_string()))
                }
            }
        }
    }

    /// Store whose insertion always fails
    struct RefusingStore;

    #[async_trait]
    impl MediaStore for RefusingStore {
        async fn create_pending(
            &self,
            _collection: Collection,
            _attributes: EntryAttributes,
        ) -> Result<Locator, WebdlError> {
            Err(WebdlError::StorageIndex("insert returned no locator".to_string()))
        }

        async fn open_output(&self, _locator: &Locator) -> Result<ContentWriter, WebdlError> {
            unreachable!("no entry was ever created")
        }

        async fn finalize(&self, _locator: &Locator) -> Result<(), WebdlError> {
            unreachable!("no entry was ever created")
        }

        async fn abort(&self, _locator: &Locator) -> Result<(), WebdlError> {
            unreachable!("no entry was ever created")
        }

        async fn entries(&self, _collection: Collection) -> Result<Vec<MediaEntry>, WebdlError> {
            Ok(Vec::new())
        }

        async fn content_path(&self, _locator: &Locator) -> Option<PathBuf> {
            None
        }
    }

    /// Which step of an otherwise working store fails
    #[derive(Clone, Copy, PartialEq)]
    enum StoreFault {
        OpenOutput,
        Finalize,
    }

    /// Real store that fails one step after the entry exists
    struct FaultyStore {
        inner: FsMediaStore,
        fault: StoreFault,
        aborts: AtomicUsize,
    }

    #[async_trait]
    impl MediaStore for FaultyStore {
        async fn create_pending(
            &self,
            collection: Collection,
            attributes: EntryAttributes,
        ) -> Result<Locator, WebdlError> {
            self.inner.create_pending(collection, attributes).await
        }

        async fn open_output(&self, locator: &Locator) -> Result<ContentWriter, WebdlError> {
            if self.fault == StoreFault::OpenOutput {
                return Err(WebdlError::StorageIndex("stream could not be opened".to_string()));
            }
            self.inner.open_output(locator).await
        }

        async fn finalize(&self, locator: &Locator) -> Result<(), WebdlError> {
            if self.fault == StoreFault::Finalize {
                return Err(WebdlError::StorageIndex("commit rejected".to_string()));
            }
            self.inner.finalize(locator).await
        }

        async fn abort(&self, locator: &Locator) -> Result<(), WebdlError> {
            self.aborts.fetch_add(1, Ordering::SeqCst);
            self.inner.abort(locator).await
        }

        async fn entries(&self, collection: Collection) -> Result<Vec<MediaEntry>, WebdlError> {
            self.inner.entries(collection).await
        }

        async fn content_path(&self, locator: &Locator) -> Option<PathBuf> {
            self.inner.content_path(locator).await
        }
    }

    async fn faulty_setup(
        fault: StoreFault,
    ) -> (tempfile::TempDir, Config, Arc<FakeBridge>, Arc<FaultyStore>, Orchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(dir.path());
        let bridge = Arc::new(FakeBridge::new("Clip", None));
        let store = Arc::new(FaultyStore {
            inner: FsMediaStore::open(&config.storage_root).await.unwrap(),
            fault,
            aborts: AtomicUsize::new(0),
        });
        let orchestrator = Orchestrator::new(bridge.clone(), store.clone(), &config).unwrap();
        (dir, config, bridge, store, orchestrator)
    }

    struct Harness {
        _dir: tempfile::TempDir,
        config: Config,
        bridge: Arc<FakeBridge>,
        store: Arc<FsMediaStore>,
        notices: Arc<std::sync::Mutex<Vec<Notice>>>,
        orchestrator: Orchestrator,
    }

    impl Harness {
        async fn new(bridge: FakeBridge) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = Config::rooted_at(dir.path());
            let bridge = Arc::new(bridge);
            let store = Arc::new(FsMediaStore::open(&config.storage_root).await.unwrap());
            let notices = Arc::new(std::sync::Mutex::new(Vec::new()));
            let sink = notices.clone();
            let orchestrator = Orchestrator::new(bridge.clone(), store.clone(), &config)
                .unwrap()
                .with_notifier(move |notice| sink.lock().unwrap().push(notice));
            Self {
                _dir: dir,
                config,
                bridge,
                store,
                notices,
                orchestrator,
            }
        }

        fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }

        fn cache_files(&self) -> Vec<PathBuf> {
            std::fs::read_dir(&self.config.cache_dir)
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect()
        }

        fn scratch_files(&self) -> usize {
            match std::fs::read_dir(&self.config.temp_dir) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }
    }

    async fn thumbnail_server(path: &str, body: &[u8]) -> (mockito::ServerGuard, mockito::Mock) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(body)
            .create_async()
            .await;
        (server, mock)
    }

    #[tokio::test]
    async fn test_search_returns_title_and_local_thumbnail() {
        let (server, mock) = thumbnail_server("/vi/abc/hq.jpg", b"jpeg-bytes-1").await;
        let remote = format!("{}/vi/abc/hq.jpg", server.url());
        let h = Harness::new(FakeBridge::new("A talk", Some(remote.clone()))).await;

        let metadata = h.orchestrator.search("https://www.youtube.com/watch?v=abc").await;

        mock.assert_async().await;
        assert_eq!(metadata.title, "A talk");
        let thumbnail = metadata.thumbnail.unwrap();
        assert_ne!(thumbnail.to_string_lossy(), remote);
        assert!(thumbnail.starts_with(&h.config.cache_dir));
        assert_eq!(std::fs::read(&thumbnail).unwrap(), b"jpeg-bytes-1");
        assert!(h.notices().is_empty());
    }

    #[tokio::test]
    async fn test_second_search_leaves_one_thumbnail() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/thumb.jpg")
            .with_body("first preview")
            .expect(1)
            .create_async()
            .await;
        let h = Harness::new(FakeBridge::new(
            "Clip",
            Some(format!("{}/thumb.jpg", server.url())),
        ))
        .await;

        h.orchestrator.search("https://vimeo.com/1").await;
        std::fs::write(h.config.cache_dir.join("leftover.jpg"), b"x").unwrap();

        server.reset();
        let _second = server
            .mock("GET", "/thumb.jpg")
            .with_body("second preview")
            .create_async()
            .await;
        let metadata = h.orchestrator.search("https://vimeo.com/2").await;

        let files = h.cache_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], metadata.thumbnail.unwrap());
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"second preview");
    }

    #[tokio::test]
    async fn test_search_without_thumbnail() {
        let h = Harness::new(FakeBridge::new("Audio only", Some("  ".to_string()))).await;

        let metadata = h.orchestrator.search("https://soundcloud.com/x/y").await;
        assert_eq!(metadata.title, "Audio only");
        assert!(metadata.thumbnail.is_none());
        assert!(h.cache_files().is_empty());
    }

    #[tokio::test]
    async fn test_search_resolve_failure_yields_empty_result() {
        let h = Harness::new(FakeBridge::failing_resolve("ERROR: Unsupported URL")).await;

        let metadata = h.orchestrator.search("https://example.com/page").await;
        assert!(metadata.is_empty());
        assert!(metadata.thumbnail.is_none());

        let notices = h.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("Unsupported URL"));

        let err = h
            .orchestrator
            .try_search("https://example.com/page")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Resolve);
    }

    #[tokio::test]
    async fn test_search_thumbnail_failure_yields_empty_result() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone.jpg")
            .with_status(404)
            .create_async()
            .await;
        let h = Harness::new(FakeBridge::new(
            "Clip",
            Some(format!("{}/gone.jpg", server.url())),
        ))
        .await;

        let metadata = h.orchestrator.search("https://vimeo.com/1").await;
        assert!(metadata.is_empty());
        assert_eq!(h.notices().len(), 1);

        let err = h.orchestrator.try_search("https://vimeo.com/1").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Thumbnail);
    }

    #[tokio::test]
    async fn test_blank_url_is_rejected_without_calling_extractor() {
        let h = Harness::new(FakeBridge::new("never", None)).await;

        assert!(h.orchestrator.search("   ").await.is_empty());
        assert!(!h.orchestrator.download("", TargetFolder::Movies).await.success);

        assert_eq!(h.bridge.resolve_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.bridge.fetch_calls.load(Ordering::SeqCst), 0);
        let notices = h.notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.message == "Please enter a video URL."));
    }

    #[tokio::test]
    async fn test_download_finalizes_one_entry() {
        let h = Harness::new(FakeBridge::new("Clip", None)).await;

        let result = h
            .orchestrator
            .download("https://vimeo.com/1", TargetFolder::Movies)
            .await;
        assert!(result.success);
        let locator = result.locator.unwrap();

        let entries = h.store.entries(Collection::Video).await.unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.locator, locator);
        assert!(!entry.is_pending());
        assert_eq!(entry.attributes.mime_type, "video/mp4");
        assert_eq!(entry.attributes.relative_path, "Movies/Downloader/");
        assert!(entry.attributes.display_name.starts_with("video_"));
        assert!(entry.attributes.display_name.ends_with(".mp4"));

        let content = h.store.content_path(&locator).await.unwrap();
        assert!(content.ends_with(format!("Movies/Downloader/{}", entry.attributes.display_name)));
        assert_eq!(
            std::fs::read(content).unwrap(),
            b"\x00\x00\x00\x18ftypmp42 fixture"
        );

        // The extractor wrote to private scratch, never to the public target
        let destination = h.bridge.destinations.lock().unwrap()[0].clone();
        assert!(destination.starts_with(&h.config.temp_dir));
        assert_eq!(h.scratch_files(), 0);

        let notices = h.notices();
        assert_eq!(notices, vec![Notice::info("Video saved to Movies.")]);
    }

    #[tokio::test]
    async fn test_sequential_downloads_get_distinct_names() {
        let h = Harness::new(FakeBridge::new("Clip", None)).await;

        let first = h
            .orchestrator
            .download("https://vimeo.com/1", TargetFolder::Documents)
            .await;
        let second = h
            .orchestrator
            .download("https://vimeo.com/1", TargetFolder::Documents)
            .await;
        assert_ne!(first.locator.unwrap(), second.locator.unwrap());

        let entries = h.store.entries(Collection::Files).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_ne!(
            entries[0].attributes.display_name,
            entries[1].attributes.display_name
        );
        assert!(entries
            .iter()
            .all(|e| e.attributes.relative_path == "Documents/Downloader/"));
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_no_scratch_and_no_entry() {
        let h = Harness::new(FakeBridge::new("Clip", None).with_fetch(FetchBehavior::Raise)).await;

        let result = h
            .orchestrator
            .download("https://vimeo.com/1", TargetFolder::Downloads)
            .await;
        assert_eq!(result, DownloadResult::failed());
        assert_eq!(h.scratch_files(), 0);
        assert!(h.store.entries(Collection::Downloads).await.unwrap().is_empty());

        let notices = h.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("Requested format is not available"));
    }

    #[tokio::test]
    async fn test_partial_scratch_is_removed_on_error() {
        let h = Harness::new(
            FakeBridge::new("Clip", None).with_fetch(FetchBehavior::WritePartialThenRaise),
        )
        .await;

        let err = h
            .orchestrator
            .try_download("https://vimeo.com/1", TargetFolder::Movies)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::MediaFetch);
        assert_eq!(h.scratch_files(), 0);
        assert!(h.store.entries(Collection::Video).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_scratch_file_is_a_failure() {
        let h = Harness::new(
            FakeBridge::new("Clip", None).with_fetch(FetchBehavior::WriteNothing),
        )
        .await;

        let err = h
            .orchestrator
            .try_download("https://vimeo.com/1", TargetFolder::Pictures)
            .await
            .unwrap_err();
        assert!(matches!(err, WebdlError::MediaFetch(_)));
        assert!(h.store.entries(Collection::Images).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_refusal_skips_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(dir.path());
        let bridge = Arc::new(FakeBridge::new("Clip", None));
        let orchestrator =
            Orchestrator::new(bridge.clone(), Arc::new(RefusingStore), &config).unwrap();

        let err = orchestrator
            .try_download("https://vimeo.com/1", TargetFolder::Movies)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::StorageIndex);
        assert_eq!(bridge.fetch_calls.load(Ordering::SeqCst), 0);

        let result = orchestrator
            .download("https://vimeo.com/1", TargetFolder::Movies)
            .await;
        assert!(result.locator.is_none());
    }

    #[tokio::test]
    async fn test_stream_open_failure_aborts_entry_before_fetch() {
        let (_dir, config, bridge, store, orchestrator) =
            faulty_setup(StoreFault::OpenOutput).await;

        let result = orchestrator
            .download("https://vimeo.com/1", TargetFolder::Movies)
            .await;
        assert_eq!(result, DownloadResult::failed());

        assert_eq!(bridge.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.aborts.load(Ordering::SeqCst), 1);
        assert!(store.entries(Collection::Video).await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(&config.temp_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_aborts_entry_and_clears_scratch() {
        let (_dir, config, bridge, store, orchestrator) =
            faulty_setup(StoreFault::Finalize).await;

        let err = orchestrator
            .try_download("https://vimeo.com/1", TargetFolder::Movies)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::StorageIndex);

        assert_eq!(bridge.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.aborts.load(Ordering::SeqCst), 1);
        assert!(store.entries(Collection::Video).await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(&config.temp_dir).unwrap().count(), 0);
        let movies = config.storage_root.join("Movies/Downloader");
        assert_eq!(std::fs::read_dir(movies).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_second_download_is_rejected_while_busy() {
        let h = Harness::new(
            FakeBridge::new("Clip", None).with_delay(Duration::from_millis(300)),
        )
        .await;

        let (first, second) = tokio::join!(
            h.orchestrator
                .try_download("https://vimeo.com/1", TargetFolder::Movies),
            h.orchestrator
                .try_download("https://vimeo.com/2", TargetFolder::Movies),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(WebdlError::Busy("download"))));
        assert_eq!(h.bridge.fetch_calls.load(Ordering::SeqCst), 1);
        assert!(!h.orchestrator.is_downloading());
    }

    #[tokio::test]
    async fn test_search_and_download_slots_are_independent() {
        let h = Harness::new(
            FakeBridge::new("Clip", None).with_delay(Duration::from_millis(100)),
        )
        .await;

        let (metadata, download) = tokio::join!(
            h.orchestrator.search("https://vimeo.com/1"),
            h.orchestrator
                .download("https://vimeo.com/1", TargetFolder::Downloads),
        );
        assert_eq!(metadata.title, "Clip");
        assert!(download.success);
        assert!(!h.orchestrator.is_searching());
    }
}
