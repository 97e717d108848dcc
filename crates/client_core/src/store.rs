use async_trait::async_trait;
use reqwest::{Client, Url};
use shared::{domain::Unit, protocol::UnitPatch};

use crate::error::ClientError;

/// Request/response side of the remote unit store.
#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn list_units(&self) -> Result<Vec<Unit>, ClientError>;
    /// The response body is not interpreted beyond success or failure.
    async fn update_unit(&self, unit_number: &str, patch: &UnitPatch) -> Result<(), ClientError>;
}

pub struct HttpUnitStore {
    http: Client,
    api_url: Url,
}

impl HttpUnitStore {
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let api_url = Url::parse(api_url).map_err(|err| ClientError::InvalidStoreUrl {
            url: api_url.to_string(),
            reason: err.to_string(),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ClientError::InvalidStoreUrl {
                url: api_url.to_string(),
                reason: "url cannot carry a unit path".to_string(),
            });
        }
        Ok(Self {
            http: Client::new(),
            api_url,
        })
    }

    fn unit_url(&self, unit_number: &str) -> Result<Url, ClientError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidStoreUrl {
                url: self.api_url.to_string(),
                reason: "url cannot carry a unit path".to_string(),
            })?
            .pop_if_empty()
            .push(unit_number);
        Ok(url)
    }
}

#[async_trait]
impl UnitStore for HttpUnitStore {
    async fn list_units(&self) -> Result<Vec<Unit>, ClientError> {
        let units = self
            .http
            .get(self.api_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(units)
    }

    async fn update_unit(&self, unit_number: &str, patch: &UnitPatch) -> Result<(), ClientError> {
        self.http
            .put(self.unit_url(unit_number)?)
            .json(patch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
