//! The artifact marker and parameter snapshot kept in the parameter store.
//!
//! The marker is always written before the snapshot, so a snapshot never
//! exists without a marker. Reads return `None` only for a missing parameter;
//! every other failure is an error.

use deploy_automation_core::contract::{ArtifactMarker, ParameterSnapshot};
use deploy_automation_core::error::ProviderError;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use crate::adapters::parameter_store::ParameterStore;

#[derive(Debug, Error)]
pub enum MarkerStoreError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: ProviderError,
    },
    #[error("{name} does not hold valid JSON: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize value for {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: ProviderError,
    },
}

pub struct MarkerStore<'a> {
    parameters: &'a dyn ParameterStore,
    marker_parameter: &'a str,
    snapshot_parameter: &'a str,
}

impl<'a> MarkerStore<'a> {
    pub fn new(
        parameters: &'a dyn ParameterStore,
        marker_parameter: &'a str,
        snapshot_parameter: &'a str,
    ) -> Self {
        Self {
            parameters,
            marker_parameter,
            snapshot_parameter,
        }
    }

    pub async fn read_marker(&self) -> Result<Option<ArtifactMarker>, MarkerStoreError> {
        self.read_json(self.marker_parameter).await
    }

    pub async fn read_snapshot(&self) -> Result<Option<ParameterSnapshot>, MarkerStoreError> {
        self.read_json(self.snapshot_parameter).await
    }

    pub async fn write(
        &self,
        marker: &ArtifactMarker,
        snapshot: &ParameterSnapshot,
    ) -> Result<(), MarkerStoreError> {
        let marker_json = marker.to_json().map_err(|source| MarkerStoreError::Serialize {
            name: self.marker_parameter.to_string(),
            source,
        })?;
        let snapshot_json = snapshot
            .to_json()
            .map_err(|source| MarkerStoreError::Serialize {
                name: self.snapshot_parameter.to_string(),
                source,
            })?;

        self.write_raw(self.marker_parameter, &marker_json).await?;
        self.write_raw(self.snapshot_parameter, &snapshot_json)
            .await?;

        info!(
            source_bucket = %marker.source_bucket,
            source_key = %marker.source_key,
            parameter_count = snapshot.len(),
            "artifact marker recorded"
        );
        Ok(())
    }

    async fn read_json<T>(&self, name: &str) -> Result<Option<T>, MarkerStoreError>
    where
        T: DeserializeOwned,
    {
        let raw = match self.parameters.get_parameter(name).await {
            Ok(raw) => raw,
            Err(error) if error.is_not_found() => {
                info!(parameter = name, "parameter does not exist yet");
                return Ok(None);
            }
            Err(source) => {
                return Err(MarkerStoreError::Read {
                    name: name.to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| MarkerStoreError::Malformed {
                name: name.to_string(),
                source,
            })
    }

    async fn write_raw(&self, name: &str, value: &str) -> Result<(), MarkerStoreError> {
        self.parameters
            .put_secure_parameter(name, value)
            .await
            .map_err(|source| MarkerStoreError::Write {
                name: name.to_string(),
                source,
            })
    }
}
