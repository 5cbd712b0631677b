//! Media fetching and packaging
//!
//! An [`ArchiveJob`] takes the output of a transformation, reserves a unique
//! archive path for every referenced image and file in document order, then
//! fetches the media with bounded concurrency. Every fetch settles on its
//! own: a failure or cancellation is recorded and the remaining fetches keep
//! going. Successful fetches resolve the destination of their node, so the
//! Markdown rendered afterwards points into the archive.

use std::io::{Cursor, Write};

use futures::stream::{self, StreamExt};
use larkdown::TransformResult;
use larkdown_core::{serialize_root, Destination, FetchError, MediaData, Options, Root};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::naming::{sanitize, FileNameRegistry};
use crate::options::ArchiveOptions;
use crate::Result;

const DEFAULT_TITLE: &str = "doc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    File,
}

/// Download progress; the rendered document counts as the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// A referenced image or file together with its reserved archive path
#[derive(Debug, Clone)]
pub struct MediaEntry {
    kind: MediaKind,
    path: String,
    data: MediaData,
    destination: Destination,
    cancel: CancellationToken,
}

impl MediaEntry {
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Path inside the archive
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name suggested by the document
    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn token(&self) -> &str {
        &self.data.token
    }

    /// Cancel this fetch only; sibling fetches are unaffected
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A fetch that did not produce bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFailure {
    pub kind: MediaKind,
    pub path: String,
    pub name: String,
    pub error: FetchError,
}

/// The assembled export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// `<title>.zip`, or `<title>.md` when the document references no media
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub failures: Vec<MediaFailure>,
    /// Archive paths whose fetch was cancelled
    pub cancelled: Vec<String>,
}

impl Package {
    pub fn is_zip(&self) -> bool {
        self.file_name.ends_with(".zip")
    }
}

/// One export of one transformed document
pub struct ArchiveJob {
    title: String,
    root: Root,
    entries: Vec<MediaEntry>,
    options: ArchiveOptions,
    markdown: Options,
    cancel: CancellationToken,
}

impl ArchiveJob {
    /// Plan an export; archive paths are reserved here, in document order
    pub fn new(title: &str, result: TransformResult, options: ArchiveOptions) -> Self {
        let registry = FileNameRegistry::new();
        let cancel = CancellationToken::new();

        let TransformResult {
            root,
            images,
            files,
        } = result;

        let images = images
            .into_iter()
            .filter_map(|image| Some((MediaKind::Image, image.data?, image.url)));
        let files = files
            .into_iter()
            .filter_map(|link| Some((MediaKind::File, link.data?, link.url)));

        let entries: Vec<MediaEntry> = images
            .chain(files)
            .filter(|(_, _, destination)| !destination.is_resolved())
            .map(|(kind, data, destination)| {
                let dir = match kind {
                    MediaKind::Image => options.images_dir.as_str(),
                    MediaKind::File => options.files_dir.as_str(),
                };
                MediaEntry {
                    kind,
                    path: registry.reserve(dir, &data.name),
                    data,
                    destination,
                    cancel: cancel.child_token(),
                }
            })
            .collect();

        debug!(title, media = entries.len(), "planned archive");

        Self {
            title: file_stem(title),
            root,
            entries,
            options,
            markdown: Options::default(),
            cancel,
        }
    }

    /// Serialize the document with custom options
    pub fn with_markdown_options(mut self, options: Options) -> Self {
        self.markdown = options;
        self
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    /// Token that cancels every fetch of this job
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Number of progress steps: one per media entry plus the document
    pub fn total(&self) -> usize {
        self.entries.len() + 1
    }

    /// Fetch all media, render the document and package everything
    pub async fn run<P>(self, mut progress: P) -> Result<Package>
    where
        P: FnMut(Progress),
    {
        let total = self.total();
        let mut completed = 0;
        let mut fetched: Vec<Option<Vec<u8>>> = vec![None; self.entries.len()];
        let mut failures = Vec::new();
        let mut cancelled = Vec::new();

        let mut fetches = stream::iter(self.entries.iter().enumerate())
            .map(|(index, entry)| async move {
                (index, entry.data.fetch(entry.cancel.clone()).await)
            })
            .buffer_unordered(self.options.effective_concurrency());

        while let Some((index, outcome)) = fetches.next().await {
            let entry = &self.entries[index];
            match outcome {
                Ok(media) => {
                    if let Err(err) = entry.destination.resolve(entry.path.as_str()) {
                        warn!(path = %entry.path, error = %err, "media destination already resolved");
                    }
                    fetched[index] = Some(media.bytes);
                }
                Err(err) if err.is_cancelled() => {
                    info!(path = %entry.path, "media fetch cancelled");
                    cancelled.push(entry.path.clone());
                }
                Err(err) => {
                    warn!(path = %entry.path, name = %entry.data.name, error = %err, "media fetch failed");
                    failures.push(MediaFailure {
                        kind: entry.kind,
                        path: entry.path.clone(),
                        name: entry.data.name.clone(),
                        error: err,
                    });
                }
            }

            completed += 1;
            progress(Progress { completed, total });
        }
        drop(fetches);

        let markdown = serialize_root(&self.root, &self.markdown);
        let markdown_name = format!("{}.md", self.title);

        let package = if self.entries.is_empty() {
            Package {
                file_name: markdown_name,
                bytes: markdown.into_bytes(),
                failures,
                cancelled,
            }
        } else {
            let media = self
                .entries
                .iter()
                .zip(&fetched)
                .filter_map(|(entry, bytes)| Some((entry.path.as_str(), bytes.as_deref()?)));
            Package {
                file_name: format!("{}.zip", self.title),
                bytes: write_zip(&markdown_name, &markdown, media)?,
                failures,
                cancelled,
            }
        };

        progress(Progress {
            completed: total,
            total,
        });

        debug!(
            file_name = %package.file_name,
            failures = package.failures.len(),
            cancelled = package.cancelled.len(),
            "assembled archive"
        );

        Ok(package)
    }
}

fn file_stem(title: &str) -> String {
    if title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        sanitize(title)
    }
}

fn write_zip<'a>(
    markdown_name: &str,
    markdown: &str,
    media: impl Iterator<Item = (&'a str, &'a [u8])>,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(markdown_name, options)?;
    zip.write_all(markdown.as_bytes())?;

    for (path, bytes) in media {
        zip.start_file(path, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
