//! Blocking REST client for the host item and metadata API

use indexmap::IndexMap;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::model::{RestItem, RestMetadata};

#[derive(Debug, Error)]
pub enum RestError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("'{path}' returned HTTP {status}")]
    Status { status: StatusCode, path: String },
}

pub type RestResult<T> = Result<T, RestError>;

/// Client for `http://{host}/rest/...`
pub struct RestClient {
    base: String,
    http: Client,
}

impl RestClient {
    /// Create a client for a host address like `localhost:8080`
    ///
    /// A scheme may be given; trailing slashes are stripped.
    pub fn new(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let base = if host.contains("://") {
            format!("{host}/rest")
        } else {
            format!("http://{host}/rest")
        };
        Self {
            base,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Check that the server is reachable
    pub fn ping(&self) -> RestResult<()> {
        let path = format!("{}/", self.base);
        let resp = self.http.get(&path).send()?;
        self.expect_ok(resp.status(), &path)
    }

    /// Fetch an item with its `eos` metadata, or None if it doesn't exist
    pub fn get_item(&self, name: &str) -> RestResult<Option<RestItem>> {
        let path = format!("{}/items/{}?metadata=eos", self.base, name);
        debug!(item = name, "GET item");
        let resp = self.http.get(&path).send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.expect_ok(resp.status(), &path)?;
        Ok(Some(resp.json()?))
    }

    /// Fetch the `eos` metadata of an item, empty if absent
    pub fn get_metadata(&self, item: &str) -> RestResult<RestMetadata> {
        Ok(self
            .get_item(item)?
            .and_then(|i| i.eos_metadata().cloned())
            .unwrap_or_default())
    }

    /// Replace the `eos` metadata namespace on an item
    pub fn put_metadata(
        &self,
        item: &str,
        value: Option<&str>,
        config: &IndexMap<String, serde_json::Value>,
    ) -> RestResult<()> {
        let path = format!("{}/items/{}/metadata/eos", self.base, item);
        debug!(item, "PUT metadata");
        let body = serde_json::json!({"value": value, "config": config});
        let resp = self.http.put(&path).json(&body).send()?;
        match resp.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            status => Err(RestError::Status { status, path }),
        }
    }

    /// Remove the `eos` metadata namespace from an item
    pub fn delete_metadata(&self, item: &str) -> RestResult<()> {
        let path = format!("{}/items/{}/metadata/eos", self.base, item);
        debug!(item, "DELETE metadata");
        let resp = self.http.delete(&path).send()?;
        self.expect_ok(resp.status(), &path)
    }

    fn expect_ok(&self, status: StatusCode, path: &str) -> RestResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(RestError::Status {
                status,
                path: path.to_string(),
            })
        }
    }
}
