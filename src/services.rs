//! Construction of the real services from settings.

use std::sync::Arc;

use crate::{
    config::{self, AppConfig, ConfigError, ResolverKind},
    player::{
        CurrentFileResolver, HelperScriptResolver, OpenFilesResolver, PlayerControl, PlayerProbe,
        SystemLocator,
    },
    process::{CommandRunner, SystemRunner},
    session::Reconciler,
    tags::{TagStore, attributes::XattrStore, fallback::JxaTagWriter},
};

/// Shared handles wired from one [`AppConfig`].
#[derive(Clone)]
pub struct Services {
    pub store: TagStore,
    pub probe: Arc<PlayerProbe>,
    pub control: PlayerControl,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Wire services that spawn every subprocess through `runner`.
    pub fn with_runner(
        config: &AppConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, ConfigError> {
        let resolver: Arc<dyn CurrentFileResolver> = match config.player.resolver {
            ResolverKind::OpenFiles => Arc::new(OpenFilesResolver::new(Arc::clone(&runner))),
            ResolverKind::HelperScript => Arc::new(HelperScriptResolver::new(
                Arc::clone(&runner),
                config::helper_script_path(&config.player)?,
                config.player.no_file_markers.clone(),
            )),
        };
        let target = config.player.target();
        tracing::debug!(
            "Probing {} ({}) with {:?} resolver",
            target.app_name,
            target.bundle_id,
            config.player.resolver
        );
        Ok(Self {
            store: tag_store(Arc::clone(&runner)),
            probe: Arc::new(PlayerProbe::new(
                target.clone(),
                Arc::new(SystemLocator::new()),
                resolver,
            )),
            control: PlayerControl::new(runner, target),
        })
    }

    pub fn reconciler(&self, config: &AppConfig) -> Reconciler {
        let mut reconciler =
            Reconciler::new(Arc::clone(&self.probe), self.store.clone(), config.catalog());
        reconciler.set_auto_refresh(config.auto_refresh);
        reconciler
    }
}

/// Tag store on real extended attributes with the `osascript` fallback.
pub fn tag_store(runner: Arc<dyn CommandRunner>) -> TagStore {
    TagStore::new(
        Arc::new(XattrStore),
        Some(Arc::new(JxaTagWriter::new(runner))),
    )
}
