//! Fetch seam between the cache and the network.

use std::future::Future;

use crate::error::FetchError;

/// Something that can turn a request key into an encoded image payload.
///
/// The cache calls [`SliceSource::fetch`] exactly once per cache miss, so an
/// implementation never has to deduplicate on its own.
pub trait SliceSource: 'static {
    fn fetch(&self, key: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

/// [`SliceSource`] backed by the viewer HTTP API.
///
/// Keys are request paths such as
/// `/api/viewer/get_slice?view=axial&window_center=40&window_width=400&slice_index=12`
/// and are resolved against `base_url`. Absolute keys are used verbatim.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a request key.
    pub fn url_for(&self, key: &str) -> String {
        if key.starts_with("http://") || key.starts_with("https://") {
            return key.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if key.starts_with('/') {
            format!("{}{}", base, key)
        } else {
            format!("{}/{}", base, key)
        }
    }
}

impl SliceSource for HttpSource {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(key);
        log::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("Slice request {} failed with status {}", url, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
