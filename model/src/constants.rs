/// Helper macro to avoid retyping the base domain-like name of our system when creating further
/// string constants from it. When given no parameters, this returns the base domain-like name of
/// the system. When given a string literal parameter it adds `/parameter` to the end.
macro_rules! logsidecar {
    () => {
        "logsidecar.dev"
    };
    ($s:literal) => {
        concat!(logsidecar!(), "/", $s)
    };
}

// System identifiers
pub const API_VERSION: &str = logsidecar!("v1");
pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";

// Sidecar artifact names
pub const LOGGING_NAME_PART: &str = "logging-stdout";
pub const DEFAULT_VOLUME_NAME: &str = "logging-stdout-volume";
pub const DEFAULT_MOUNT_PATH: &str = "/fluentd/etc/custom.conf";
pub const DEFAULT_SUB_PATH_KEY: &str = "custom.conf";
pub const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";
/// `0o644`, the file mode used for the projected configuration file.
pub const CONFIG_VOLUME_DEFAULT_MODE: i32 = 420;

// Environment variables read by the controller
pub const ENV_DEFAULT_IMAGE: &str = "DEFAULT_FLUENTD_IMAGE";
pub const ENV_IMAGE_PULL_POLICY: &str = "LOGGING_IMAGE_PULL_POLICY";
pub const ENV_STORAGE_VOLUME: &str = "LOGGING_STORAGE_VOLUME";
pub const ENV_STORAGE_MOUNT_PATH: &str = "LOGGING_STORAGE_MOUNT_PATH";
pub const ENV_RETAIN_STORAGE_VOLUME: &str = "LOGGING_RETAIN_STORAGE_VOLUME";
pub const ENV_CONFIG_NAMING: &str = "LOGGING_CONFIG_NAMING";

// Environment variables set on the sidecar container
pub const SIDECAR_ENV_CONF: &str = "FLUENTD_CONF";
pub const SIDECAR_ENV_LOG_PATH: &str = "LOG_PATH";
pub const SIDECAR_ENV_NAMESPACE: &str = "NAMESPACE";
pub const SIDECAR_ENV_APP_NAME: &str = "APP_CONF_NAME";
pub const SIDECAR_ENV_COMPONENT_NAME: &str = "COMPONENT_NAME";

// Label keys read by the sidecar through the downward API
pub const LABEL_OAM_APP_NAME: &str = "app.oam.dev/name";
pub const LABEL_OAM_APP_COMPONENT: &str = "app.oam.dev/component";

// Names of finalizers used by the controller
pub const FINALIZER_SIDECAR_CLEANUP: &str = logsidecar!("sidecar-cleanup");

#[test]
fn logsidecar_constants_macro_test() {
    assert_eq!("logsidecar.dev", logsidecar!());
    assert_eq!("logsidecar.dev/v1", API_VERSION);
    assert_eq!("logsidecar.dev/foo", logsidecar!("foo"));
    assert_eq!(
        "logsidecar.dev/sidecar-cleanup",
        FINALIZER_SIDECAR_CLEANUP
    );
}
