// src/repository/fetch.rs

//! Fetcher collaborator
//!
//! Every network transfer goes through [`Fetcher::fetch`]. TLS policy and
//! proxy are carried by each [`FetchRequest`], so no fetch can observe
//! another repository's verification setting. Fetches are blocking and
//! are issued one at a time.

use super::proxy::ProxySettings;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use reqwest::header::RANGE;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default connect timeout for HTTP requests (30 seconds)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Byte range of a partial fetch (`end` inclusive, open-ended when `None`)
///
/// A range starting past zero resumes `dest`: the fetched bytes are
/// appended to the file already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }

    fn len(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start) + 1)
    }
}

/// Write `body` to `dest` through a `.tmp` sibling, keeping the current
/// content of `dest` as a prefix when `resume` is set
fn store_body<R: Read>(body: &mut R, dest: &Path, resume: bool) -> io::Result<()> {
    let temp_path = dest.with_extension("tmp");
    if let Err(e) = write_temp(body, dest, &temp_path, resume) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, dest)
}

fn write_temp<R: Read>(body: &mut R, dest: &Path, temp_path: &Path, resume: bool) -> io::Result<()> {
    let mut file = if resume && dest.exists() {
        fs::copy(dest, temp_path)?;
        fs::OpenOptions::new().append(true).open(temp_path)?
    } else {
        File::create(temp_path)?
    };
    io::copy(body, &mut file)?;
    Ok(())
}

/// One transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub dest: PathBuf,
    pub proxy: Option<ProxySettings>,
    pub range: Option<ByteRange>,
    /// Verify the peer certificate for this transfer only
    pub verify_tls: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            proxy: None,
            range: None,
            verify_tls: true,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<ProxySettings>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

/// Network fetch layer: url (+proxy, +range) → local file
pub trait Fetcher {
    /// Transfer `request.url` to `request.dest`, returning the local path
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf>;
}

/// Blocking HTTP(S) fetcher built on reqwest
///
/// A client is built per request so that TLS verification and proxy are
/// scoped to that request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    connect_timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn client_for(&self, request: &FetchRequest) -> Result<Client> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(!request.verify_tls);

        builder = match &request.proxy {
            Some(settings) => {
                let mut proxy = reqwest::Proxy::all(&settings.url).map_err(|e| {
                    Error::Configuration(format!("Invalid proxy '{}': {}", settings.url, e))
                })?;
                if let Some(username) = &settings.username {
                    proxy = proxy.basic_auth(username, settings.password.as_deref().unwrap_or(""));
                }
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))
    }

    /// Copy a `file://` URL without going through HTTP
    fn fetch_local(&self, request: &FetchRequest, source: &Path) -> Result<PathBuf> {
        debug!("Copying {} to {}", source.display(), request.dest.display());
        let copy = || -> io::Result<()> {
            let mut file = File::open(source)?;
            match request.range {
                Some(range) => {
                    file.seek(SeekFrom::Start(range.start))?;
                    let mut body = file.take(range.len().unwrap_or(u64::MAX));
                    store_body(&mut body, &request.dest, range.start > 0)
                }
                None => store_body(&mut file, &request.dest, false),
            }
        };
        copy().map_err(|e| {
            Error::Download(format!("Failed to copy {}: {}", source.display(), e))
        })?;
        Ok(request.dest.clone())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        if let Some(parent) = request.dest.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Some(path) = request.url.strip_prefix("file://") {
            return self.fetch_local(request, Path::new(path));
        }

        info!("Downloading {} to {}", request.url, request.dest.display());

        let client = self.client_for(request)?;
        let mut get = client.get(&request.url);
        if let Some(range) = &request.range {
            get = get.header(RANGE, range.header_value());
        }

        let mut response = get
            .send()
            .map_err(|e| Error::Download(format!("Failed to fetch {}: {}", request.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "HTTP {} from {}",
                response.status(),
                request.url
            )));
        }

        // A server that ignores the range sends the whole file (200)
        let resume = response.status() == StatusCode::PARTIAL_CONTENT
            && request.range.is_some_and(|r| r.start > 0);
        store_body(&mut response, &request.dest, resume).map_err(|e| {
            Error::Download(format!("Failed to write data from {}: {}", request.url, e))
        })?;

        debug!("Downloaded {}", request.dest.display());
        Ok(request.dest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_range_header_value() {
        let closed = ByteRange {
            start: 0,
            end: Some(1023),
        };
        assert_eq!(closed.header_value(), "bytes=0-1023");

        let open = ByteRange {
            start: 512,
            end: None,
        };
        assert_eq!(open.header_value(), "bytes=512-");
    }

    #[test]
    fn test_request_builder_defaults_to_verification() {
        let request = FetchRequest::new("https://example.com/a.rpm", "/tmp/a.rpm");
        assert!(request.verify_tls);
        assert!(request.proxy.is_none());

        let insecure = request.with_verify_tls(false);
        assert!(!insecure.verify_tls);
    }

    #[test]
    fn test_file_url_is_copied() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("repomd.xml");
        std::fs::write(&source, b"<repomd/>").unwrap();
        let dest = dir.path().join("out/repomd.xml");

        let request = FetchRequest::new(format!("file://{}", source.display()), &dest);
        let path = HttpFetcher::new().fetch(&request).unwrap();

        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"<repomd/>");
    }

    #[test]
    fn test_ranged_fetch_resumes_existing_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("pkg.rpm");
        std::fs::write(&source, b"hello world").unwrap();
        let dest = dir.path().join("cache/pkg.rpm");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"hello ").unwrap();

        let request = FetchRequest::new(format!("file://{}", source.display()), &dest)
            .with_range(ByteRange { start: 6, end: None });
        HttpFetcher::new().fetch(&request).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert!(!dest.with_extension("tmp").exists());

        let head = FetchRequest::new(format!("file://{}", source.display()), &dest)
            .with_range(ByteRange { start: 0, end: Some(4) });
        HttpFetcher::new().fetch(&head).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn test_missing_file_url_is_download_error() {
        let dir = tempdir().unwrap();
        let request = FetchRequest::new("file:///nonexistent/repomd.xml", dir.path().join("x"));
        let result = HttpFetcher::new().fetch(&request);
        assert!(matches!(result, Err(Error::Download(_))));
    }

    #[test]
    fn test_invalid_proxy_is_configuration_error() {
        let request = FetchRequest::new("http://example.com/a", "/tmp/a")
            .with_proxy(Some(ProxySettings::new("::not a proxy::")));
        let result = HttpFetcher::new().client_for(&request);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
