//! Image harvesting into a content-addressed store
//!
//! Every absolute `img` source in a page tree is downloaded once per crawl
//! context and written as `<stem>_<hash><ext>` under the image directory.
//! Bytes already present in the store, under any stem, reuse that file.
//! Saved images are replaced in the tree by an `##IMAGE## <filename>` token.

use crate::config::ImageConfig;
use crate::crawler::embed::marker;
use crate::crawler::ContentHash;
use crate::document::Node;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Prefix of the token that replaces a saved image
pub const IMAGE_TOKEN: &str = "##IMAGE##";

const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
    "image/bmp",
];

const DEFAULT_EXTENSION: &str = ".png";

/// Image URL -> saved filename (None records a failed download)
#[derive(Debug, Clone, Default)]
pub struct ImageLedger {
    entries: HashMap<String, Option<String>>,
}

impl ImageLedger {
    pub fn contains(&self, src: &str) -> bool {
        self.entries.contains_key(src)
    }

    pub fn filename(&self, src: &str) -> Option<&str> {
        self.entries.get(src).and_then(|f| f.as_deref())
    }

    pub fn record(&mut self, src: impl Into<String>, filename: Option<String>) {
        self.entries.insert(src.into(), filename);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts for one call to [`ImageHarvester::harvest`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageReport {
    /// Images downloaded by this call
    pub saved: u64,
    /// Images whose download failed in this call
    pub failed: u64,
    /// `img` elements without an absolute http(s) source
    pub skipped: u64,
}

/// Outcome of a single download attempt
enum Attempt {
    Body(Vec<u8>),
    Retry(String),
    Abort(String),
}

/// Downloads page images with a fixed-delay retry
#[derive(Debug, Clone)]
pub struct ImageHarvester {
    client: Client,
    directory: PathBuf,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ImageHarvester {
    pub fn new(client: Client, config: &ImageConfig) -> Self {
        Self {
            client,
            directory: PathBuf::from(&config.directory),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Saves every image in `tree` and replaces the saved ones by tokens
    pub async fn harvest(
        &self,
        mut tree: Node,
        page_url: &Url,
        ledger: &mut ImageLedger,
    ) -> (Node, ImageReport) {
        let mut report = ImageReport::default();

        let mut sources = Vec::new();
        for image in tree.find_all("img") {
            match image.attr("src").and_then(absolute_http) {
                Some(src) => {
                    if !sources.contains(&src) {
                        sources.push(src);
                    }
                }
                None => report.skipped += 1,
            }
        }

        for src in sources {
            if ledger.contains(src.as_str()) {
                continue;
            }
            let filename = self.save_image(&src).await;
            match filename {
                Some(_) => report.saved += 1,
                None => report.failed += 1,
            }
            ledger.record(src.as_str(), filename);
        }

        replace_images(&mut tree, ledger);
        debug!(
            "Images on {}: {} saved, {} failed, {} skipped",
            page_url, report.saved, report.failed, report.skipped
        );
        (tree, report)
    }

    /// Downloads `url` into the image store, returning the stored filename
    pub async fn save_image(&self, url: &Url) -> Option<String> {
        for attempt in 1..=self.max_attempts {
            match self.try_download(url).await {
                Attempt::Body(bytes) => return self.store(url, &bytes).await,
                Attempt::Abort(reason) => {
                    warn!("Not saving image {}: {}", url, reason);
                    return None;
                }
                Attempt::Retry(reason) => {
                    debug!(
                        "Image {} attempt {}/{} failed: {}",
                        url, attempt, self.max_attempts, reason
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            "Giving up on image {} after {} attempts",
            url, self.max_attempts
        );
        None
    }

    async fn try_download(&self, url: &Url) -> Attempt {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return Attempt::Retry(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_image_content_type(&content_type) {
            return Attempt::Abort(format!("unsupported content type '{}'", content_type));
        }

        match response.bytes().await {
            Ok(bytes) => Attempt::Body(bytes.to_vec()),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }

    async fn store(&self, url: &Url, bytes: &[u8]) -> Option<String> {
        let hash = ContentHash::of_bytes(bytes);
        if let Some(existing) = self.stored_with_hash(&hash).await {
            debug!("Image {} already stored as {}", url, existing);
            return Some(existing);
        }

        let filename = image_filename(url, bytes);
        let path = self.directory.join(&filename);
        let written = async {
            tokio::fs::create_dir_all(&self.directory).await?;
            tokio::fs::write(&path, bytes).await
        }
        .await;

        match written {
            Ok(()) => {
                debug!("Saved image {} as {}", url, filename);
                Some(filename)
            }
            Err(e) => {
                warn!("Failed to write image {}: {}", path.display(), e);
                None
            }
        }
    }

    /// A stored file holding bytes with this hash, whatever its stem
    async fn stored_with_hash(&self, hash: &ContentHash) -> Option<String> {
        let needle = format!("_{}.", hash);
        let mut entries = tokio::fs::read_dir(&self.directory).await.ok()?;

        let mut matches = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if name.contains(&needle) {
                    matches.push(name.to_string());
                }
            }
        }
        matches.sort();
        matches.into_iter().next()
    }
}

/// Content-addressed filename: sanitized stem, hash of the bytes, extension from the URL
pub fn image_filename(url: &Url, bytes: &[u8]) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let (stem, extension) = match segment.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < segment.len() => {
            let ext = &segment[dot + 1..];
            if ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                (&segment[..dot], format!(".{}", ext.to_ascii_lowercase()))
            } else {
                (segment, DEFAULT_EXTENSION.to_string())
            }
        }
        _ => (segment, DEFAULT_EXTENSION.to_string()),
    };

    format!(
        "{}_{}{}",
        sanitize_stem(stem),
        ContentHash::of_bytes(bytes),
        extension
    )
}

fn sanitize_stem(stem: &str) -> String {
    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "image".to_string()
    } else {
        sanitized
    }
}

fn is_image_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    IMAGE_CONTENT_TYPES.contains(&essence.as_str())
}

fn absolute_http(src: &str) -> Option<Url> {
    Url::parse(src.trim())
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

/// Replaces every `img` with a saved source by its image token
fn replace_images(node: &mut Node, ledger: &ImageLedger) {
    let Some(element) = node.as_element_mut() else {
        return;
    };

    for child in element.children.iter_mut() {
        let saved = child
            .as_element()
            .filter(|e| e.is("img"))
            .and_then(|e| e.attr("src"))
            .and_then(absolute_http)
            .and_then(|src| ledger.filename(src.as_str()).map(str::to_string));

        match saved {
            Some(filename) => *child = marker(format!("{} {}", IMAGE_TOKEN, filename)),
            None => replace_images(child, ledger),
        }
    }
}
