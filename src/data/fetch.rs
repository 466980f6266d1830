use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;

use super::loader::load_file;
use super::model::DataFrame;
use crate::error::FetchError;

/// Datasets from *An Introduction to Statistical Learning*.
pub const PRIMARY_URL: &str = "http://www-bcf.usc.edu/~gareth/ISL";

/// Mirror used whenever the primary host cannot serve the file.
pub const FALLBACK_URL: &str = "https://raw.githubusercontent.com/selva86/datasets/master";

/// `data/` next to this crate's manifest.
pub fn default_cache_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where datasets come from and where they are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub primary_url: String,
    pub fallback_url: String,
    pub cache_dir: PathBuf,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            primary_url: PRIMARY_URL.to_string(),
            fallback_url: FALLBACK_URL.to_string(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl FetcherConfig {
    pub fn with_primary_url(mut self, url: impl Into<String>) -> Self {
        self.primary_url = url.into();
        self
    }

    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = url.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Transport – the network seam
// ---------------------------------------------------------------------------

/// The two network operations the fetcher needs.
pub trait Transport {
    /// Succeeds only if `url` is reachable and answers with a success status.
    fn probe(&self, url: &str) -> Result<(), FetchError>;

    /// Write the body of `url` to `dest`, returning the number of bytes.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Blocking HTTP(S) transport. Requests have no timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Download {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.get(url).map(drop)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.get(url)?;
        let mut file = fs::File::create(dest).map_err(|e| FetchError::io(dest, e))?;
        let written = response
            .copy_to(&mut file)
            .map_err(|source| FetchError::Download {
                url: url.to_string(),
                source,
            })?;
        file.flush().map_err(|e| FetchError::io(dest, e))?;
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// DataFetcher
// ---------------------------------------------------------------------------

/// Downloads datasets into a local cache and parses them.
///
/// A cached file is reused until the caller asks for a reload; a cache hit
/// never touches the network.
#[derive(Debug)]
pub struct DataFetcher<T = HttpTransport> {
    config: FetcherConfig,
    transport: T,
}

impl DataFetcher<HttpTransport> {
    /// Fetcher over HTTP with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }
}

impl<T: Transport> DataFetcher<T> {
    pub fn with_transport(config: FetcherConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Local path a dataset is cached at. Does not check that it exists.
    pub fn cache_path(&self, filename: &str) -> Result<PathBuf, FetchError> {
        validate_filename(filename)?;
        Ok(self.config.cache_dir.join(filename))
    }

    pub fn is_cached(&self, filename: &str) -> bool {
        self.cache_path(filename).is_ok_and(|p| p.is_file())
    }

    /// URL to download `filename` from: the primary host if a probe succeeds,
    /// otherwise the fallback mirror. Never fails on network errors.
    pub fn resolve_url(&self, filename: &str) -> Result<String, FetchError> {
        validate_filename(filename)?;
        let primary = join_url(&self.config.primary_url, filename);
        match self.transport.probe(&primary) {
            Ok(()) => {
                log::debug!("{primary} is reachable");
                Ok(primary)
            }
            Err(e) => {
                let fallback = join_url(&self.config.fallback_url, filename);
                log::debug!("probe failed: {e}");
                log::warn!("{primary} unavailable, falling back to {fallback}");
                Ok(fallback)
            }
        }
    }

    /// Make sure `filename` is in the cache, downloading it when missing or
    /// when `reload` is set, and return its local path.
    pub fn fetch(&self, filename: &str, reload: bool) -> Result<PathBuf, FetchError> {
        let dest = self.cache_path(filename)?;
        if !reload && dest.is_file() {
            log::debug!("cache hit: {}", dest.display());
            return Ok(dest);
        }

        let url = self.resolve_url(filename)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
        }

        // Download beside the target and swap in only a complete file.
        let partial = partial_path(&dest);
        let written = match self.transport.download(&url, &partial) {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };
        fs::rename(&partial, &dest).map_err(|e| FetchError::io(&dest, e))?;

        log::info!("downloaded {url} ({written} bytes) to {}", dest.display());
        Ok(dest)
    }

    /// Fetch `filename` (see [`DataFetcher::fetch`]) and parse it as a table.
    pub fn get_data(&self, filename: &str, reload: bool) -> Result<DataFrame, FetchError> {
        let path = self.fetch(filename, reload)?;
        let df = load_file(&path)?;
        log::info!("{filename}: {} rows x {} columns", df.n_rows(), df.n_cols());
        Ok(df)
    }
}

/// Fetch and parse a dataset with the default hosts and cache directory.
pub fn get_data(filename: &str, reload: bool) -> Result<DataFrame, FetchError> {
    DataFetcher::new(FetcherConfig::default())?.get_data(filename, reload)
}

fn validate_filename(filename: &str) -> Result<(), FetchError> {
    let path = Path::new(filename);
    let plain = !filename.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if plain && path.file_name().is_some() {
        Ok(())
    } else {
        Err(FetchError::InvalidFilename(filename.to_string()))
    }
}

fn join_url(base: &str, filename: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), filename)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_urls_without_doubling_slashes() {
        assert_eq!(join_url("http://a/b/", "Auto.csv"), "http://a/b/Auto.csv");
        assert_eq!(join_url("http://a/b", "x/y.csv"), "http://a/b/x/y.csv");
    }

    #[test]
    fn rejects_escaping_filenames() {
        for bad in ["", "..", "../secret.csv", "/etc/passwd", "a/../../b.csv"] {
            assert!(
                matches!(validate_filename(bad), Err(FetchError::InvalidFilename(_))),
                "{bad:?} should be rejected"
            );
        }
        for good in ["Auto.csv", "sub/Default.csv", "./Wage.csv"] {
            assert!(validate_filename(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn cache_path_is_deterministic() {
        let fetcher = DataFetcher::new(FetcherConfig::default().with_cache_dir("/tmp/isl")).unwrap();
        assert_eq!(
            fetcher.cache_path("Auto.csv").unwrap(),
            PathBuf::from("/tmp/isl/Auto.csv")
        );
        assert_eq!(
            fetcher.cache_path("Auto.csv").unwrap(),
            fetcher.cache_path("Auto.csv").unwrap()
        );
    }

    #[test]
    fn client_errors_name_no_url() {
        // A malformed URL fails inside reqwest before any connection.
        let source = Client::new().get("not a url").send().unwrap_err();
        let err = FetchError::Client(source);
        assert!(err.to_string().starts_with("building HTTP client: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn partial_file_sits_beside_target() {
        assert_eq!(
            partial_path(Path::new("/c/Auto.csv")),
            PathBuf::from("/c/Auto.csv.part")
        );
    }

    #[test]
    fn default_config_points_at_both_hosts() {
        let config = FetcherConfig::default();
        assert_eq!(config.primary_url, PRIMARY_URL);
        assert_eq!(config.fallback_url, FALLBACK_URL);
        assert!(config.cache_dir.ends_with("data"));
    }
}
