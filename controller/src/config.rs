/*!

The `config` module reads the controller-wide settings from the container environment. These are
the defaults that the settings of each `LoggingTrait` are laid over.

!*/

use crate::error::{self, Result};
use logsidecar_injector::ArtifactBuilder;
use logsidecar_model::constants::{
    ENV_CONFIG_NAMING, ENV_DEFAULT_IMAGE, ENV_IMAGE_PULL_POLICY, ENV_RETAIN_STORAGE_VOLUME,
    ENV_STORAGE_MOUNT_PATH, ENV_STORAGE_VOLUME,
};
use logsidecar_model::{ConfigNaming, LoggingConfig, StorageVolume};
use snafu::{ensure, ResultExt};
use std::env::VarError;
use std::str::FromStr;

/// Settings read once at startup.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ControllerConfig {
    /// The sidecar image used for traits that do not name one.
    pub(crate) default_image: String,
    pub(crate) base_config: LoggingConfig,
}

impl ControllerConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Reads the settings through `lookup`, which behaves like [`std::env::var`].
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, VarError>,
    {
        let default_image = lookup(ENV_DEFAULT_IMAGE).context(error::EnvReadSnafu {
            key: ENV_DEFAULT_IMAGE,
        })?;
        ensure!(
            !default_image.trim().is_empty(),
            error::EnvEmptySnafu {
                key: ENV_DEFAULT_IMAGE
            }
        );

        let mut base_config = LoggingConfig::default();
        if let Some(policy) = optional(&lookup, ENV_IMAGE_PULL_POLICY)? {
            base_config.image_pull_policy = policy;
        }

        base_config.storage = match (
            optional(&lookup, ENV_STORAGE_VOLUME)?,
            optional(&lookup, ENV_STORAGE_MOUNT_PATH)?,
        ) {
            (Some(name), Some(mount_path)) => Some(StorageVolume { name, mount_path }),
            (None, None) => None,
            (Some(_), None) => {
                return error::StorageIncompleteSnafu {
                    volume_key: ENV_STORAGE_VOLUME,
                    mount_path_key: ENV_STORAGE_MOUNT_PATH,
                    present: ENV_STORAGE_VOLUME,
                }
                .fail()
            }
            (None, Some(_)) => {
                return error::StorageIncompleteSnafu {
                    volume_key: ENV_STORAGE_VOLUME,
                    mount_path_key: ENV_STORAGE_MOUNT_PATH,
                    present: ENV_STORAGE_MOUNT_PATH,
                }
                .fail()
            }
        };

        if let Some(value) = optional(&lookup, ENV_RETAIN_STORAGE_VOLUME)? {
            let retain = value.trim().parse::<bool>().context(error::EnvParseBoolSnafu {
                key: ENV_RETAIN_STORAGE_VOLUME,
                value: value.clone(),
            })?;
            base_config.retain_storage_volume_on_remove = retain;
        }

        if let Some(value) = optional(&lookup, ENV_CONFIG_NAMING)? {
            base_config.config_naming =
                ConfigNaming::from_str(value.trim()).context(error::EnvParseNamingSnafu {
                    key: ENV_CONFIG_NAMING,
                    value: value.clone(),
                })?;
        }

        Ok(Self {
            default_image,
            base_config,
        })
    }

    pub(crate) fn artifact_builder(&self) -> ArtifactBuilder {
        ArtifactBuilder::new(&self.default_image)
    }
}

/// An unset or empty variable is `None`.
fn optional<F>(lookup: &F, key: &str) -> Result<Option<String>>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    match lookup(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).context(error::EnvReadSnafu { key }),
    }
}
