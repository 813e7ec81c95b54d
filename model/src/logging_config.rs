use crate::constants::{
    DEFAULT_IMAGE_PULL_POLICY, DEFAULT_MOUNT_PATH, DEFAULT_SUB_PATH_KEY, DEFAULT_VOLUME_NAME,
    LOGGING_NAME_PART,
};
use crate::error;
use crate::LoggingTraitSpec;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::collections::BTreeMap;

/// The rendered sidecar configuration. It is written to the `data` of the configuration
/// `ConfigMap`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderedConfig {
    /// A single file, stored under the sub-path key.
    Text(String),
    /// Several files keyed by file name.
    Files(BTreeMap<String, String>),
}

impl Default for RenderedConfig {
    fn default() -> Self {
        RenderedConfig::Text(String::new())
    }
}

impl RenderedConfig {
    /// The `ConfigMap` data for this configuration. Text is stored under `sub_path_key`.
    pub fn to_data(&self, sub_path_key: &str) -> BTreeMap<String, String> {
        match self {
            RenderedConfig::Text(text) => {
                [(sub_path_key.to_owned(), text.to_owned())].into_iter().collect()
            }
            RenderedConfig::Files(files) => files.clone(),
        }
    }
}

/// An `emptyDir` volume shared between the application and the sidecar, e.g. for log files that
/// are written to disk instead of stdout.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageVolume {
    pub name: String,
    pub mount_path: String,
}

/// How the configuration `ConfigMap` appears in the sidecar.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConfigMount {
    pub mount_path: String,
    /// Set when a single key is mounted as a file.
    pub sub_path: Option<String>,
    /// The file that the sidecar loads, exported as `FLUENTD_CONF`.
    pub entry_file: String,
}

/// How the name of the configuration `ConfigMap` is derived from the resource that owns it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigNaming {
    /// `<prefix>-<resource name>`
    ResourceName,
    /// `<prefix>-<resource name>-<lowercased kind>`, which keeps resources of different kinds
    /// with the same name apart.
    ResourceNameAndKind,
}

impl Default for ConfigNaming {
    fn default() -> Self {
        ConfigNaming::ResourceNameAndKind
    }
}

serde_plain::derive_fromstr_from_deserialize!(ConfigNaming, |e| -> crate::Error {
    crate::error::OpaqueError::SerdePlain { source: e }.into()
});
serde_plain::derive_display_from_serialize!(ConfigNaming);

impl ConfigNaming {
    pub fn config_name(&self, prefix: &str, resource_name: &str, kind: &str) -> String {
        match self {
            ConfigNaming::ResourceName => format!("{}-{}", prefix, resource_name),
            ConfigNaming::ResourceNameAndKind => {
                format!("{}-{}-{}", prefix, resource_name, kind.to_lowercase())
            }
        }
    }
}

/// Everything that is needed to build the logging sidecar for one reconciliation pass.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Overrides the builder's default image when present.
    pub image: Option<String>,
    pub image_pull_policy: String,
    pub rendered_config: RenderedConfig,
    pub mount_path: String,
    pub sub_path_key: String,
    pub volume_name: String,
    pub log_path: Option<String>,
    pub storage: Option<StorageVolume>,
    /// Mount every volume that the application containers mount into the sidecar as well.
    pub share_application_mounts: bool,
    /// Leave the storage volume in place when the sidecar is removed.
    pub retain_storage_volume_on_remove: bool,
    pub config_naming: ConfigNaming,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            image: None,
            image_pull_policy: DEFAULT_IMAGE_PULL_POLICY.to_owned(),
            rendered_config: RenderedConfig::default(),
            mount_path: DEFAULT_MOUNT_PATH.to_owned(),
            sub_path_key: DEFAULT_SUB_PATH_KEY.to_owned(),
            volume_name: DEFAULT_VOLUME_NAME.to_owned(),
            log_path: None,
            storage: None,
            share_application_mounts: true,
            retain_storage_volume_on_remove: true,
            config_naming: ConfigNaming::default(),
        }
    }
}

impl LoggingConfig {
    /// Combines the settings of a `LoggingTrait` with `base`, which holds the controller-wide
    /// defaults. Fields that the trait sets win.
    pub fn from_trait(spec: &LoggingTraitSpec, base: &LoggingConfig) -> Self {
        let rendered_config = match (&spec.config_files, &spec.logging_config) {
            (Some(files), _) if !files.is_empty() => RenderedConfig::Files(files.clone()),
            (_, Some(text)) => RenderedConfig::Text(text.clone()),
            _ => base.rendered_config.clone(),
        };
        Self {
            image: spec
                .logging_image
                .clone()
                .filter(|image| !image.is_empty())
                .or_else(|| base.image.clone()),
            image_pull_policy: spec
                .image_pull_policy
                .clone()
                .filter(|policy| !policy.is_empty())
                .unwrap_or_else(|| base.image_pull_policy.clone()),
            rendered_config,
            mount_path: spec
                .mount_path
                .clone()
                .unwrap_or_else(|| base.mount_path.clone()),
            log_path: spec.log_path.clone().or_else(|| base.log_path.clone()),
            ..base.clone()
        }
    }

    /// A single text is mounted as the file `mount_path`. Several files are mounted together as
    /// the directory of `mount_path`, and the file that `mount_path` names is the one loaded.
    pub fn config_mount(&self) -> ConfigMount {
        match &self.rendered_config {
            RenderedConfig::Text(_) => ConfigMount {
                mount_path: self.mount_path.clone(),
                sub_path: Some(self.sub_path_key.clone()),
                entry_file: self.sub_path_key.clone(),
            },
            RenderedConfig::Files(_) => {
                let (directory, file) = match self.mount_path.trim_end_matches('/').rsplit_once('/')
                {
                    Some((directory, file)) => (directory, file),
                    None => ("", self.mount_path.as_str()),
                };
                ConfigMount {
                    mount_path: if directory.is_empty() {
                        "/".to_owned()
                    } else {
                        directory.to_owned()
                    },
                    sub_path: None,
                    entry_file: file.to_owned(),
                }
            }
        }
    }

    /// Config files must not be mounted over the root directory and must include the file that
    /// `mount_path` names.
    pub fn check_config_files(&self) -> crate::Result<()> {
        let files = match &self.rendered_config {
            RenderedConfig::Files(files) => files,
            RenderedConfig::Text(_) => return Ok(()),
        };
        let mount = self.config_mount();
        ensure!(
            mount.mount_path != "/",
            error::ConfigDirectorySnafu {
                mount_path: &self.mount_path
            }
        );
        ensure!(
            files.contains_key(&mount.entry_file),
            error::MissingEntryFileSnafu {
                directory: mount.mount_path,
                file: mount.entry_file,
            }
        );
        Ok(())
    }

    /// The deterministic name of the configuration `ConfigMap` for a resource.
    pub fn config_name(&self, resource_name: &str, kind: &str) -> String {
        self.config_naming
            .config_name(LOGGING_NAME_PART, resource_name, kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::WorkloadReference;
    use maplit::btreemap;

    #[test]
    fn config_names_are_deterministic() {
        let config = LoggingConfig::default();
        assert_eq!(
            config.config_name("web", "StatefulSet"),
            "logging-stdout-web-statefulset"
        );
        let config = LoggingConfig {
            config_naming: ConfigNaming::ResourceName,
            ..LoggingConfig::default()
        };
        assert_eq!(config.config_name("web", "StatefulSet"), "logging-stdout-web");
    }

    #[test]
    fn trait_settings_override_base() {
        let base = LoggingConfig {
            image: Some("fluentd:default".to_owned()),
            ..LoggingConfig::default()
        };
        let spec = LoggingTraitSpec {
            workload_ref: WorkloadReference::default(),
            logging_image: Some("fluentd:1".to_owned()),
            logging_config: Some("<match **>".to_owned()),
            ..LoggingTraitSpec::default()
        };
        let config = LoggingConfig::from_trait(&spec, &base);
        assert_eq!(config.image.as_deref(), Some("fluentd:1"));
        assert_eq!(config.image_pull_policy, "IfNotPresent");
        assert_eq!(
            config.rendered_config,
            RenderedConfig::Text("<match **>".to_owned())
        );
        assert_eq!(config.mount_path, DEFAULT_MOUNT_PATH);
    }

    #[test]
    fn empty_image_falls_back_to_base() {
        let base = LoggingConfig {
            image: Some("fluentd:default".to_owned()),
            ..LoggingConfig::default()
        };
        let spec = LoggingTraitSpec {
            logging_image: Some(String::new()),
            ..LoggingTraitSpec::default()
        };
        let config = LoggingConfig::from_trait(&spec, &base);
        assert_eq!(config.image.as_deref(), Some("fluentd:default"));
    }

    #[test]
    fn config_files_win_over_text() {
        let spec = LoggingTraitSpec {
            logging_config: Some("ignored".to_owned()),
            config_files: Some(btreemap! {
                "fluent.conf".to_owned() => "a".to_owned(),
                "parsers.conf".to_owned() => "b".to_owned(),
            }),
            ..LoggingTraitSpec::default()
        };
        let config = LoggingConfig::from_trait(&spec, &LoggingConfig::default());
        let data = config.rendered_config.to_data(&config.sub_path_key);
        assert_eq!(data.len(), 2);
        assert_eq!(data["parsers.conf"], "b");
    }

    #[test]
    fn config_files_are_mounted_as_a_directory() {
        let config = LoggingConfig {
            rendered_config: RenderedConfig::Files(btreemap! {
                "fluent.conf".to_owned() => "a".to_owned(),
                "parsers.conf".to_owned() => "b".to_owned(),
            }),
            mount_path: "/fluentd/etc/fluent.conf".to_owned(),
            ..LoggingConfig::default()
        };
        assert_eq!(
            config.config_mount(),
            ConfigMount {
                mount_path: "/fluentd/etc".to_owned(),
                sub_path: None,
                entry_file: "fluent.conf".to_owned(),
            }
        );
        assert!(config.check_config_files().is_ok());
    }

    #[test]
    fn config_files_must_contain_the_loaded_file() {
        let config = LoggingConfig {
            rendered_config: RenderedConfig::Files(btreemap! {
                "fluent.conf".to_owned() => "a".to_owned(),
            }),
            ..LoggingConfig::default()
        };
        let err = config.check_config_files().unwrap_err();
        assert!(err.to_string().contains("custom.conf"), "{}", err);

        let config = LoggingConfig {
            mount_path: "/fluent.conf".to_owned(),
            ..config
        };
        assert!(config.check_config_files().is_err());
    }

    #[test]
    fn text_is_mounted_as_a_single_file() {
        let config = LoggingConfig::default();
        let mount = config.config_mount();
        assert_eq!(mount.mount_path, "/fluentd/etc/custom.conf");
        assert_eq!(mount.sub_path.as_deref(), Some("custom.conf"));
        assert_eq!(mount.entry_file, "custom.conf");
        assert!(config.check_config_files().is_ok());
    }

    #[test]
    fn config_naming_parses_from_plain_string() {
        let naming: ConfigNaming = "resourceName".parse().unwrap();
        assert_eq!(naming, ConfigNaming::ResourceName);
        assert_eq!(ConfigNaming::ResourceNameAndKind.to_string(), "resourceNameAndKind");
        assert!("kindOnly".parse::<ConfigNaming>().is_err());
    }

    #[test]
    fn text_is_stored_under_sub_path_key() {
        let data = RenderedConfig::Text("conf".to_owned()).to_data("custom.conf");
        assert_eq!(data, btreemap! {"custom.conf".to_owned() => "conf".to_owned()});
    }
}
