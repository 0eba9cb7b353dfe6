//! Request formatting for manifest and file fetches.

use bridge_traits::HttpRequest;
use std::time::Duration;
use url::Url;

use crate::error::{Result, SyncError};

/// Builds the HTTP request for one file of one scene directory.
///
/// The access key is opaque to the sync engine; only the formatter knows
/// how it travels (query string, header, ...).
pub trait RequestFormatter: Send + Sync {
    fn request(&self, dir: &str, filename: &str, access_key: &str) -> Result<HttpRequest>;
}

/// `GET {base}/{dir}/{filename}?{access_key}` with a shared-access signature
/// as the query string.
#[derive(Debug, Clone)]
pub struct SasRequestFormatter {
    base_url: Url,
    timeout: Option<Duration>,
}

impl SasRequestFormatter {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl RequestFormatter for SasRequestFormatter {
    fn request(&self, dir: &str, filename: &str, access_key: &str) -> Result<HttpRequest> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SyncError::Config(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push(dir)
            .push(filename);

        let key = access_key.strip_prefix('?').unwrap_or(access_key);
        url.set_query((!key.is_empty()).then_some(key));

        let request = HttpRequest::get(url.to_string());
        Ok(match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        })
    }
}
