//! Remote comic catalog client.
//!
//! The catalog speaks the xkcd JSON shape: `GET {base}/info.0.json` for the
//! latest entry and `GET {base}/{id}/info.0.json` for a specific one.
//! 200 is a document, 404 means the id does not exist (some numbers were
//! never published), anything else is a dependency failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::ComicInfo;

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// The catalog's current latest id.
    async fn latest_id(&self) -> Result<i64>;

    /// One catalog entry. `Error::NotFound` when the id does not exist.
    async fn get(&self, id: i64) -> Result<ComicInfo>;
}

#[derive(Debug, Deserialize)]
struct EntryPayload {
    num: i64,
    #[serde(default)]
    img: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    alt: String,
    #[serde(default)]
    transcript: String,
}

#[derive(Debug)]
pub struct XkcdClient {
    client: reqwest::Client,
    base_url: String,
}

impl XkcdClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if base_url.is_empty() {
            return Err(Error::BadArguments);
        }
        let url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.to_string()
        } else {
            format!("https://{base_url}")
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for XkcdClient {
    async fn latest_id(&self) -> Result<i64> {
        let url = format!("{}/info.0.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("catalog latest: {e}")))?;

        if response.status() != StatusCode::OK {
            return Err(Error::Unavailable(format!(
                "catalog latest: http {}",
                response.status().as_u16()
            )));
        }

        let payload: EntryPayload = response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("catalog latest: {e}")))?;
        if payload.num <= 0 {
            return Err(Error::Unavailable(format!(
                "catalog latest: invalid num {}",
                payload.num
            )));
        }
        Ok(payload.num)
    }

    async fn get(&self, id: i64) -> Result<ComicInfo> {
        let url = format!("{}/{}/info.0.json", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Unavailable(format!("catalog {id}: {e}")))?;

        match response.status() {
            StatusCode::OK => {
                let payload: EntryPayload = response
                    .json()
                    .await
                    .map_err(|e| Error::Unavailable(format!("catalog {id}: {e}")))?;
                Ok(ComicInfo {
                    id: payload.num,
                    img_url: payload.img,
                    title: payload.title,
                    alt: payload.alt,
                    transcript: payload.transcript.trim().to_string(),
                })
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => Err(Error::Unavailable(format!(
                "catalog {id}: http {}",
                status.as_u16()
            ))),
        }
    }
}
