use bytes::Bytes;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{CritterEvent, CritterId, CritterSnapshot, LabelDistribution, Season, TerrainTile};
use crate::viewport::Viewport;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("world service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("world service returned {status} for {endpoint}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

#[derive(Deserialize)]
struct TerrainResponse {
    tiles: Vec<TerrainTile>,
}

#[derive(Deserialize)]
struct CrittersResponse {
    critters: Vec<CritterSnapshot>,
}

/// Read-only client for the World Service. One method per endpoint; every
/// parameter travels as a plain query value and every failure maps onto
/// `ServiceError` for the pollers to log and retry on the next interval.
#[derive(Debug, Clone)]
pub struct HttpWorldService {
    client: Client,
    base_url: String,
}

impl HttpWorldService {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn terrain(&self, viewport: Viewport) -> Result<Vec<TerrainTile>, ServiceError> {
        let url = self.url("/api/world/terrain");
        let response = self
            .client
            .get(url)
            .query(&viewport_query(viewport))
            .send()
            .await?;
        let body: TerrainResponse = decode(response, "terrain").await?;
        Ok(body.tiles)
    }

    pub async fn critters(&self, viewport: Viewport) -> Result<Vec<CritterSnapshot>, ServiceError> {
        let url = self.url("/api/world/critters");
        let response = self
            .client
            .get(url)
            .query(&viewport_query(viewport))
            .send()
            .await?;
        let body: CrittersResponse = decode(response, "critters").await?;
        Ok(body.critters)
    }

    pub async fn critter_events(&self, id: CritterId) -> Result<Vec<CritterEvent>, ServiceError> {
        let url = self.url(&format!("/api/critter/{id}/events"));
        let response = self.client.get(url).send().await?;
        decode(response, "critter events").await
    }

    /// Raw portrait image bytes (SVG) for one critter.
    pub async fn critter_portrait(&self, id: CritterId) -> Result<Bytes, ServiceError> {
        let url = self.url(&format!("/api/critter/{id}/image.svg"));
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                endpoint: "critter portrait",
                status,
            });
        }
        Ok(response.bytes().await?)
    }

    pub async fn stats_history(
        &self,
        limit: u32,
    ) -> Result<Vec<crate::model::StatsEntry>, ServiceError> {
        let url = self.url("/api/stats/history");
        let response = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        decode(response, "stats history").await
    }

    pub async fn death_counts(&self) -> Result<LabelDistribution, ServiceError> {
        let url = self.url("/api/stats/deaths");
        let response = self.client.get(url).send().await?;
        decode(response, "death counts").await
    }

    pub async fn current_season(&self) -> Result<Season, ServiceError> {
        let url = self.url("/api/season");
        let response = self.client.get(url).send().await?;
        decode(response, "season").await
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

fn viewport_query(viewport: Viewport) -> [(&'static str, i64); 4] {
    [
        ("x", viewport.origin_x),
        ("y", viewport.origin_y),
        ("w", viewport.width as i64),
        ("h", viewport.height as i64),
    ]
}

async fn decode<T>(response: reqwest::Response, endpoint: &'static str) -> Result<T, ServiceError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Status { endpoint, status });
    }
    Ok(response.json::<T>().await?)
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:5000/", "/api/season"),
            "http://localhost:5000/api/season"
        );
        assert_eq!(
            join_url("http://localhost:5000", "api/season"),
            "http://localhost:5000/api/season"
        );
    }

    #[test]
    fn viewport_query_uses_origin_form() {
        let query = viewport_query(Viewport::new(50, -3, 20, 10));
        assert_eq!(query, [("x", 50), ("y", -3), ("w", 20), ("h", 10)]);
    }
}
