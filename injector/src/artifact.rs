use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    ObjectFieldSelector, Volume, VolumeMount,
};
use logsidecar_model::constants::{
    CONFIG_VOLUME_DEFAULT_MODE, LABEL_OAM_APP_COMPONENT, LABEL_OAM_APP_NAME, LOGGING_NAME_PART,
    SIDECAR_ENV_APP_NAME, SIDECAR_ENV_COMPONENT_NAME, SIDECAR_ENV_CONF, SIDECAR_ENV_LOG_PATH,
    SIDECAR_ENV_NAMESPACE,
};
use logsidecar_model::LoggingConfig;

/// The objects that make up the logging sidecar of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct SidecarArtifact {
    /// The sidecar container. Its mounts are held separately so that they can be merged.
    pub container: Container,
    /// The volume that projects the configuration `ConfigMap`.
    pub volume: Volume,
    /// Mounts the configuration file into the sidecar.
    pub volume_mount: VolumeMount,
    pub storage: Option<StorageArtifact>,
}

/// An `emptyDir` that the application writes its logs to and the sidecar reads them from.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageArtifact {
    pub volume: Volume,
    /// Read-only.
    pub sidecar_mount: VolumeMount,
    pub application_mount: VolumeMount,
}

/// Builds [`SidecarArtifact`]s. The default image is used whenever the configuration does not
/// name one.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBuilder {
    default_image: String,
}

impl ArtifactBuilder {
    pub fn new<S: Into<String>>(default_image: S) -> Self {
        Self {
            default_image: default_image.into(),
        }
    }

    pub fn default_image(&self) -> &str {
        &self.default_image
    }

    /// Builds the sidecar for `config`, sourcing the configuration from the `ConfigMap` called
    /// `config_name`.
    pub fn build(&self, config: &LoggingConfig, config_name: &str) -> SidecarArtifact {
        let image = config
            .image
            .clone()
            .unwrap_or_else(|| self.default_image.clone());
        let config_mount = config.config_mount();

        SidecarArtifact {
            container: Container {
                name: LOGGING_NAME_PART.to_owned(),
                image: Some(image),
                image_pull_policy: Some(config.image_pull_policy.clone()),
                env: Some(env_vars(config, &config_mount.entry_file)),
                ..Container::default()
            },
            volume: Volume {
                name: config.volume_name.clone(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(config_name.to_owned()),
                    default_mode: Some(CONFIG_VOLUME_DEFAULT_MODE),
                    ..ConfigMapVolumeSource::default()
                }),
                ..Volume::default()
            },
            volume_mount: VolumeMount {
                name: config.volume_name.clone(),
                mount_path: config_mount.mount_path,
                sub_path: config_mount.sub_path,
                read_only: Some(true),
                ..VolumeMount::default()
            },
            storage: config.storage.as_ref().map(|storage| StorageArtifact {
                volume: Volume {
                    name: storage.name.clone(),
                    empty_dir: Some(EmptyDirVolumeSource::default()),
                    ..Volume::default()
                },
                sidecar_mount: VolumeMount {
                    name: storage.name.clone(),
                    mount_path: storage.mount_path.clone(),
                    read_only: Some(true),
                    ..VolumeMount::default()
                },
                application_mount: VolumeMount {
                    name: storage.name.clone(),
                    mount_path: storage.mount_path.clone(),
                    ..VolumeMount::default()
                },
            }),
        }
    }
}

fn env_vars(config: &LoggingConfig, entry_file: &str) -> Vec<EnvVar> {
    let mut vars = vec![EnvVar {
        name: SIDECAR_ENV_CONF.to_owned(),
        value: Some(entry_file.to_owned()),
        value_from: None,
    }];
    if let Some(log_path) = &config.log_path {
        vars.push(EnvVar {
            name: SIDECAR_ENV_LOG_PATH.to_owned(),
            value: Some(log_path.clone()),
            value_from: None,
        });
    }
    vars.push(field_ref(SIDECAR_ENV_NAMESPACE, "metadata.namespace".to_owned()));
    vars.push(field_ref(SIDECAR_ENV_APP_NAME, label_field(LABEL_OAM_APP_NAME)));
    vars.push(field_ref(
        SIDECAR_ENV_COMPONENT_NAME,
        label_field(LABEL_OAM_APP_COMPONENT),
    ));
    vars
}

/// An environment variable filled in from the pod's own fields by the downward API.
fn field_ref(name: &str, field_path: String) -> EnvVar {
    EnvVar {
        name: name.to_owned(),
        value: None,
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".to_owned()),
                field_path,
            }),
            ..EnvVarSource::default()
        }),
    }
}

fn label_field(label: &str) -> String {
    format!("metadata.labels['{}']", label)
}

#[cfg(test)]
mod test {
    use super::*;
    use logsidecar_model::{RenderedConfig, StorageVolume};
    use maplit::btreemap;

    fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a EnvVar> {
        container
            .env
            .as_ref()
            .unwrap()
            .iter()
            .find(|var| var.name == name)
    }

    #[test]
    fn default_image_is_used_without_override() {
        let builder = ArtifactBuilder::new("fluentd:default");
        let artifact = builder.build(&LoggingConfig::default(), "logging-stdout-web-deployment");
        assert_eq!(artifact.container.name, "logging-stdout");
        assert_eq!(artifact.container.image.as_deref(), Some("fluentd:default"));
        assert_eq!(
            artifact.container.image_pull_policy.as_deref(),
            Some("IfNotPresent")
        );
        assert!(artifact.container.volume_mounts.is_none());
        assert!(artifact.storage.is_none());
    }

    #[test]
    fn volume_and_mount_reference_the_config_map() {
        let config = LoggingConfig {
            image: Some("fluentd:1".to_owned()),
            mount_path: "/fluentd/etc/fluentd.conf".to_owned(),
            ..LoggingConfig::default()
        };
        let artifact = ArtifactBuilder::new("fluentd:default").build(&config, "logging-stdout-p-pod");
        assert_eq!(artifact.container.image.as_deref(), Some("fluentd:1"));

        let source = artifact.volume.config_map.unwrap();
        assert_eq!(artifact.volume.name, "logging-stdout-volume");
        assert_eq!(source.name.as_deref(), Some("logging-stdout-p-pod"));
        assert_eq!(source.default_mode, Some(0o644));

        assert_eq!(artifact.volume_mount.name, "logging-stdout-volume");
        assert_eq!(artifact.volume_mount.mount_path, "/fluentd/etc/fluentd.conf");
        assert_eq!(artifact.volume_mount.sub_path.as_deref(), Some("custom.conf"));
        assert_eq!(artifact.volume_mount.read_only, Some(true));
    }

    #[test]
    fn environment_is_wired_to_labels() {
        let config = LoggingConfig {
            log_path: Some("/var/log/app/*.log".to_owned()),
            ..LoggingConfig::default()
        };
        let artifact = ArtifactBuilder::new("fluentd").build(&config, "cm");
        let container = &artifact.container;
        assert_eq!(
            env_value(container, "FLUENTD_CONF").unwrap().value.as_deref(),
            Some("custom.conf")
        );
        assert_eq!(
            env_value(container, "LOG_PATH").unwrap().value.as_deref(),
            Some("/var/log/app/*.log")
        );
        let component = env_value(container, "COMPONENT_NAME").unwrap();
        let field = component
            .value_from
            .as_ref()
            .unwrap()
            .field_ref
            .as_ref()
            .unwrap();
        assert_eq!(field.field_path, "metadata.labels['app.oam.dev/component']");
        assert!(env_value(container, "NAMESPACE").is_some());
        assert!(env_value(container, "APP_CONF_NAME").is_some());
    }

    #[test]
    fn log_path_is_optional() {
        let artifact = ArtifactBuilder::new("fluentd").build(&LoggingConfig::default(), "cm");
        assert!(env_value(&artifact.container, "LOG_PATH").is_none());
    }

    #[test]
    fn storage_volume_is_an_empty_dir() {
        let config = LoggingConfig {
            storage: Some(StorageVolume {
                name: "app-logs".to_owned(),
                mount_path: "/var/log/app".to_owned(),
            }),
            ..LoggingConfig::default()
        };
        let storage = ArtifactBuilder::new("fluentd")
            .build(&config, "cm")
            .storage
            .unwrap();
        assert_eq!(storage.volume.name, "app-logs");
        assert!(storage.volume.empty_dir.is_some());
        assert_eq!(storage.sidecar_mount.mount_path, "/var/log/app");
        assert_eq!(storage.sidecar_mount.read_only, Some(true));
        assert_eq!(storage.application_mount.name, "app-logs");
        assert_eq!(storage.application_mount.read_only, None);
    }

    #[test]
    fn config_files_are_mounted_whole() {
        let config = LoggingConfig {
            rendered_config: RenderedConfig::Files(btreemap! {
                "fluent.conf".to_owned() => "a".to_owned(),
            }),
            mount_path: "/fluentd/etc/fluent.conf".to_owned(),
            ..LoggingConfig::default()
        };
        let artifact = ArtifactBuilder::new("fluentd").build(&config, "cm");
        assert_eq!(artifact.volume_mount.mount_path, "/fluentd/etc");
        assert!(artifact.volume_mount.sub_path.is_none());
        assert_eq!(
            env_value(&artifact.container, "FLUENTD_CONF")
                .unwrap()
                .value
                .as_deref(),
            Some("fluent.conf")
        );
    }
}
