use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use larkdown::{Block, DocxService, FileBlock, ImageBlock, Operation, TransformResult};
use larkdown_archive::{ArchiveJob, ArchiveOptions, MediaKind, Progress};
use larkdown_core::{FetchError, Media, MediaSource};
use tokio_util::sync::CancellationToken;

struct Bytes(&'static [u8]);

#[async_trait]
impl MediaSource for Bytes {
    async fn fetch(&self, _cancel: CancellationToken) -> Result<Media, FetchError> {
        Ok(Media::new(self.0.to_vec()))
    }
}

struct Broken;

#[async_trait]
impl MediaSource for Broken {
    async fn fetch(&self, _cancel: CancellationToken) -> Result<Media, FetchError> {
        Err(FetchError::Failed("403 Forbidden".to_string()))
    }
}

/// Never finishes on its own
struct UntilCancelled;

#[async_trait]
impl MediaSource for UntilCancelled {
    async fn fetch(&self, cancel: CancellationToken) -> Result<Media, FetchError> {
        cancel.cancelled().await;
        Err(FetchError::Cancelled)
    }
}

/// Records how many fetches run at the same time
struct Tracked {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl MediaSource for Tracked {
    async fn fetch(&self, _cancel: CancellationToken) -> Result<Media, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Media::new(b"x".to_vec()))
    }
}

/// Yields a number of times before returning its bytes
struct Slow(usize, &'static [u8]);

#[async_trait]
impl MediaSource for Slow {
    async fn fetch(&self, _cancel: CancellationToken) -> Result<Media, FetchError> {
        for _ in 0..self.0 {
            tokio::task::yield_now().await;
        }
        Ok(Media::new(self.1.to_vec()))
    }
}

fn image(name: &str, source: impl MediaSource + 'static) -> Block {
    Block::image(ImageBlock::new("token", name, Arc::new(source)))
}

fn file(name: &str, source: impl MediaSource + 'static) -> Block {
    Block::file(FileBlock::new("token", name, Arc::new(source)))
}

fn convert(children: Vec<Block>) -> TransformResult {
    DocxService::new().convert(&Block::page(children)).unwrap()
}

fn unzip(bytes: &[u8]) -> zip::ZipArchive<Cursor<Vec<u8>>> {
    zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap()
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut content = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut content).unwrap();
    content
}

fn names(archive: &zip::ZipArchive<Cursor<Vec<u8>>>) -> Vec<String> {
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_packages_markdown_and_media() {
    let result = convert(vec![
        Block::heading(1, vec![Operation::new("Report")]),
        image("a.png", Bytes(b"first")),
        image("a.png", Bytes(b"second")),
        file("report.pdf", Bytes(b"%PDF")),
    ]);

    let job = ArchiveJob::new("Weekly", result, ArchiveOptions::default());
    let paths: Vec<&str> = job.entries().iter().map(|entry| entry.path()).collect();
    assert_eq!(paths, vec!["images/a.png", "images/a-1.png", "files/report.pdf"]);
    assert_eq!(job.entries()[2].kind(), MediaKind::File);

    let mut progress = Vec::new();
    let package = job.run(|step| progress.push(step)).await.unwrap();

    assert_eq!(package.file_name, "Weekly.zip");
    assert!(package.is_zip());
    assert!(package.failures.is_empty());
    assert!(package.cancelled.is_empty());

    assert_eq!(progress.len(), 4);
    assert_eq!(
        progress.last(),
        Some(&Progress {
            completed: 4,
            total: 4
        })
    );

    let mut archive = unzip(&package.bytes);
    assert_eq!(
        names(&archive),
        vec!["Weekly.md", "files/report.pdf", "images/a-1.png", "images/a.png"]
    );
    assert_eq!(read_entry(&mut archive, "images/a.png"), b"first");
    assert_eq!(read_entry(&mut archive, "images/a-1.png"), b"second");

    let markdown = String::from_utf8(read_entry(&mut archive, "Weekly.md")).unwrap();
    assert_eq!(
        markdown,
        "# Report\n\n![](images/a.png)\n\n![](images/a-1.png)\n\n[report.pdf](files/report.pdf)\n"
    );
}

#[tokio::test]
async fn test_document_without_media_is_plain_markdown() {
    let result = convert(vec![Block::text(vec![Operation::new("Just text")])]);

    let mut progress = Vec::new();
    let package = ArchiveJob::new("Notes", result, ArchiveOptions::default())
        .run(|step| progress.push(step))
        .await
        .unwrap();

    assert_eq!(package.file_name, "Notes.md");
    assert!(!package.is_zip());
    assert_eq!(package.bytes, b"Just text\n");
    assert_eq!(
        progress,
        vec![Progress {
            completed: 1,
            total: 1
        }]
    );
}

#[tokio::test]
async fn test_failed_fetch_does_not_abort_others() {
    let result = convert(vec![
        image("broken.png", Broken),
        image("ok.png", Bytes(b"ok")),
    ]);

    let package = ArchiveJob::new("", result, ArchiveOptions::default())
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(package.file_name, "doc.zip");
    assert_eq!(package.failures.len(), 1);
    assert_eq!(package.failures[0].path, "images/broken.png");
    assert_eq!(
        package.failures[0].error,
        FetchError::Failed("403 Forbidden".to_string())
    );

    let mut archive = unzip(&package.bytes);
    assert_eq!(names(&archive), vec!["doc.md", "images/ok.png"]);

    let markdown = String::from_utf8(read_entry(&mut archive, "doc.md")).unwrap();
    assert_eq!(markdown, "![](<>)\n\n![](images/ok.png)\n");
}

#[tokio::test]
async fn test_cancelling_one_fetch_leaves_siblings_alone() {
    let result = convert(vec![
        file("huge.bin", UntilCancelled),
        file("small.txt", Bytes(b"small")),
    ]);

    let job = ArchiveJob::new("Files", result, ArchiveOptions::default());
    let huge = job.entries()[0].clone();

    let package = job
        .run(|step| {
            if step.completed == 1 {
                huge.cancel();
            }
        })
        .await
        .unwrap();

    assert!(huge.is_cancelled());
    assert_eq!(package.cancelled, vec!["files/huge.bin".to_string()]);
    assert!(package.failures.is_empty());

    let mut archive = unzip(&package.bytes);
    assert_eq!(names(&archive), vec!["Files.md", "files/small.txt"]);
    assert_eq!(read_entry(&mut archive, "files/small.txt"), b"small");
}

#[tokio::test]
async fn test_cancelling_the_job_cancels_every_fetch() {
    let result = convert(vec![
        image("a.png", UntilCancelled),
        file("b.txt", UntilCancelled),
    ]);

    let job = ArchiveJob::new("Gone", result, ArchiveOptions::default());
    job.cancel();
    assert!(job.entries().iter().all(|entry| entry.is_cancelled()));

    let package = job.run(|_| {}).await.unwrap();
    assert_eq!(package.cancelled.len(), 2);

    let archive = unzip(&package.bytes);
    assert_eq!(names(&archive), vec!["Gone.md"]);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let children = (0..6)
        .map(|i| {
            image(
                &format!("{i}.png"),
                Tracked {
                    in_flight: Arc::clone(&in_flight),
                    peak: Arc::clone(&peak),
                },
            )
        })
        .collect();

    let options = ArchiveOptions::default().with_concurrency(2);
    let package = ArchiveJob::new("Bounded", convert(children), options)
        .run(|_| {})
        .await
        .unwrap();

    assert!(package.failures.is_empty());
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_names_follow_document_order_not_completion_order() {
    let result = convert(vec![
        image("shot.png", Slow(10, b"slow")),
        image("shot.png", Slow(0, b"fast")),
    ]);

    let package = ArchiveJob::new("Order", result, ArchiveOptions::default())
        .run(|_| {})
        .await
        .unwrap();

    let mut archive = unzip(&package.bytes);
    assert_eq!(read_entry(&mut archive, "images/shot.png"), b"slow");
    assert_eq!(read_entry(&mut archive, "images/shot-1.png"), b"fast");
}

#[tokio::test]
async fn test_custom_directories() {
    let result = convert(vec![image("a.png", Bytes(b"a"))]);
    let options = ArchiveOptions {
        images_dir: "assets".to_string(),
        ..Default::default()
    };

    let package = ArchiveJob::new("Custom", result, options)
        .run(|_| {})
        .await
        .unwrap();

    let mut archive = unzip(&package.bytes);
    let markdown = String::from_utf8(read_entry(&mut archive, "Custom.md")).unwrap();
    assert_eq!(markdown, "![](assets/a.png)\n");
}
