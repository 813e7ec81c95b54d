use crate::config::ControllerConfig;
use crate::error::{self, Result};
use log::trace;
use logsidecar_injector::Injector;
use logsidecar_model::clients::{ClusterSchemaCatalog, KubeStore, TraitClient};
use logsidecar_model::{CrdExt, LoggingTrait, LoggingTraitStatus};
use snafu::ResultExt;
use std::sync::Arc;

/// This is used by `kube-runtime` to pass any custom information we need when [`reconcile`] is
/// called.
pub(super) type Context = Arc<ContextData>;

pub(super) type TraitInjector = Injector<KubeStore, ClusterSchemaCatalog>;

pub(super) fn new_context(client: kube::Client, config: ControllerConfig) -> Context {
    let builder = config.artifact_builder();
    Arc::new(ContextData {
        trait_client: TraitClient::new_from_k8s_client(client.clone()),
        injector: Injector::new(
            KubeStore::new(client.clone()),
            ClusterSchemaCatalog::new(client),
            builder,
            config.base_config,
        ),
    })
}

/// Contains the clients we need during [`reconcile`].
pub(crate) struct ContextData {
    trait_client: TraitClient,
    injector: TraitInjector,
}

/// The [`reconcile`] function has [`LoggingTrait`] and [`Context`] as its inputs. For
/// convenience, we combine these and provide accessor and helper functions.
pub(super) struct TraitInterface {
    logging_trait: LoggingTrait,
    context: Context,
}

impl TraitInterface {
    pub(super) fn new(logging_trait: LoggingTrait, context: Context) -> Self {
        Self {
            logging_trait,
            context,
        }
    }

    pub(super) fn name(&self) -> &str {
        self.logging_trait.object_name()
    }

    pub(super) fn logging_trait(&self) -> &LoggingTrait {
        &self.logging_trait
    }

    pub(super) fn trait_client(&self) -> &TraitClient {
        &self.context.trait_client
    }

    pub(super) fn injector(&self) -> &TraitInjector {
        &self.context.injector
    }

    pub(super) fn store(&self) -> &KubeStore {
        self.context.injector.store()
    }

    /// Writes `status` unless the trait already has it.
    pub(super) async fn set_status(&self, status: LoggingTraitStatus) -> Result<()> {
        if self.logging_trait.status.as_ref() == Some(&status) {
            trace!("status of logging trait '{}' is unchanged", self.name());
            return Ok(());
        }
        self.trait_client()
            .set_status(&self.logging_trait, status)
            .await
            .context(error::SetStatusSnafu {
                trait_name: self.name(),
            })?;
        Ok(())
    }
}
