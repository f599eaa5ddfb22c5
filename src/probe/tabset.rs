//! The fixed set of tab targets the sweep opens
//!
//! Each target is a captured-site fixture served from the local data tree:
//! `<prefix>/<site>/index.html`, opened via a file:// URL.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Site fixtures opened during the sweep, in open order
pub const TAB_SWITCHING_SITES: [&str; 10] = [
    "espn.go.com",
    "bugzilla.mozilla.org",
    "news.cnet.com",
    "www.amazon.com",
    "kannada.chakradeo.net",
    "allegro.pl",
    "ml.wikipedia.org",
    "www.bbc.co.uk",
    "126.com",
    "www.altavista.com",
];

/// Tab set construction errors
#[derive(Error, Debug)]
pub enum TabSetError {
    #[error("Fixture path {0} cannot be expressed as a file URL")]
    InvalidPath(PathBuf),
}

/// One tab target: a site name mapped to its local fixture page
#[derive(Debug, Clone)]
pub struct TabEntry {
    site: String,
    path: PathBuf,
    url: Url,
}

impl TabEntry {
    /// Site name the fixture was captured from
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Local path of the fixture page
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// file:// URL the tab is navigated to
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Ordered tab targets. Built once at probe start, never mutated.
#[derive(Debug, Clone)]
pub struct TabSet {
    entries: Vec<TabEntry>,
}

impl TabSet {
    /// Build the tab set from a fixture prefix and site list.
    ///
    /// The prefix must be absolute so every page has a valid file URL.
    pub fn from_sites(prefix: &Path, sites: &[&str]) -> Result<Self, TabSetError> {
        let mut entries = Vec::with_capacity(sites.len());

        for site in sites {
            let path = prefix.join(site).join("index.html");
            let url =
                Url::from_file_path(&path).map_err(|_| TabSetError::InvalidPath(path.clone()))?;
            entries.push(TabEntry {
                site: (*site).to_string(),
                path,
                url,
            });
        }

        Ok(Self { entries })
    }

    /// Number of tab targets
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Targets in open order
    pub fn iter(&self) -> impl Iterator<Item = &TabEntry> {
        self.entries.iter()
    }
}
