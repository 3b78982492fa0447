use anyhow::{bail, Context};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

use crate::api::SavedBook;

/// Client for the external book catalog (a Google-Books-style volumes API).
/// The catalog is only a search source; whatever the user saves is
/// denormalized into their own record at save time.
pub struct BookSearchClient {
    catalog_url: String,
    client: ClientWithMiddleware,
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    // Absent when the catalog has no hits
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    // The catalog omits volumeInfo entirely for some entries
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
    info_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl BookSearchClient {
    pub fn new(catalog_url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            // Retry transient catalog failures before giving up
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            catalog_url: catalog_url.to_string(),
            client,
        })
    }

    /// Calls GET {catalog_url}/volumes?q={query}
    /// Maps every hit into the shape a client can pass straight to the
    /// save endpoint
    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<SavedBook>> {
        let response = self
            .client
            .get(format!("{}/volumes", self.catalog_url))
            .query(&[("q", query)])
            .send()
            .await
            .context("Failed to query the book catalog")?;

        if !response.status().is_success() {
            bail!("Book catalog returned {}", response.status())
        }

        let volumes: VolumesResponse = response
            .json()
            .await
            .context("Failed to decode catalog response")?;

        Ok(volumes.items.into_iter().map(volume_to_saved_book).collect())
    }
}

fn volume_to_saved_book(volume: Volume) -> SavedBook {
    SavedBook {
        book_id: volume.id,
        title: volume.volume_info.title.unwrap_or_default(),
        authors: volume.volume_info.authors,
        description: volume.volume_info.description.unwrap_or_default(),
        image: volume
            .volume_info
            .image_links
            .and_then(|links| links.thumbnail),
        link: volume.volume_info.info_link,
    }
}
