//! The append-only text artifacts
//!
//! Every crawl root has its own artifact file, named after the root URL. The
//! root document and each navigation widget or page expanded from it become
//! one entry with a small front matter block. Entries are only ever appended.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use url::Url;

/// Line that closes every entry
pub const ENTRY_DELIMITER: &str = "===================================";

/// Prefix of the first line of a crawl root's content
pub const ROOT_MARKER: &str = "##START##:";

/// Formats one artifact entry
///
/// Double quotes inside the title are escaped so the front matter stays parseable.
pub fn format_entry(title: &str, url: &str, content: &str) -> String {
    format!(
        "---\nTITLE: \"{}\"\nurl: \"{}\"\n---\n\n{}\n\n{}\n\n",
        escape(title),
        escape(url),
        content,
        ENTRY_DELIMITER
    )
}

/// Content of a crawl root's entry: the root marker followed by the flattened page
pub fn root_content(url: &str, flattened: &str) -> String {
    format!("{} {}\n\n{}", ROOT_MARKER, url, flattened)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Artifact file name of a crawl root: `<host>_<path>.md`
///
/// The path's slashes become `_` and an empty path becomes `index`; a query
/// is kept so roots that only differ in it get their own files. Anything
/// outside `[A-Za-z0-9._-]` is replaced by `_`.
pub fn artifact_filename(root: &Url) -> String {
    let host = match root.port() {
        Some(port) => format!("{}_{}", root.host_str().unwrap_or("unknown"), port),
        None => root.host_str().unwrap_or("unknown").to_string(),
    };

    let mut path = root.path().trim_matches('/').replace('/', "_");
    if path.is_empty() {
        path = "index".to_string();
    }
    if let Some(query) = root.query().filter(|q| !q.is_empty()) {
        path = format!("{}_{}", path, query);
    }

    let name: String = format!("{}_{}", host, path)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.md", name)
}

/// An entry waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl ArtifactEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Appends entries to the artifact file
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    path: PathBuf,
}

impl ArtifactWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The artifact of `root` under the output directory
    pub fn for_root(directory: impl AsRef<Path>, root: &Url) -> Self {
        Self::new(directory.as_ref().join(artifact_filename(root)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry, creating the file and its directory if needed
    pub fn append_entry(&self, title: &str, url: &str, content: &str) -> io::Result<()> {
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_entry(title, url, content).as_bytes())?;
        file.flush()
    }

    /// Appends `entries` in order with a single open
    pub fn append_all(&self, entries: &[ArtifactEntry]) -> io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for entry in entries {
            file.write_all(format_entry(&entry.title, &entry.url, &entry.content).as_bytes())?;
        }
        file.flush()
    }

    /// Empties the artifact before a fresh run
    pub fn truncate(&self) -> io::Result<()> {
        self.ensure_parent()?;
        File::create(&self.path).map(|_| ())
    }

    fn ensure_parent(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}
