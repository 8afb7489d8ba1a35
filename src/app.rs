//! Composition root
//!
//! Wires one resolver, one content store and one scheduler from a [`Config`].
//! Everything is shared through `Arc` so the HTTP layer and the job tasks see
//! the same instances.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::OptionalMirror;
use crate::config::Config;
use crate::content::{ContentProducer, TemplateProducer};
use crate::resolver::AnswerResolver;
use crate::scheduler::Scheduler;
use crate::server::AppState;
use crate::storage::ContentStore;
use crate::utils::{Clock, SystemClock};

/// Fully wired application
pub struct App {
    pub config: Config,
    pub resolver: Arc<AnswerResolver>,
    pub store: Arc<ContentStore>,
    pub scheduler: Arc<Scheduler>,
}

impl App {
    /// Build against the system clock
    pub async fn build(config: Config) -> Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Build against an explicit clock and load the store snapshot
    pub async fn build_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let resolver = Arc::new(
            AnswerResolver::new(config.resolver.clone(), clock.clone())
                .context("Failed to create answer resolver")?,
        );

        let mirror = OptionalMirror::from_config(&config.cache).await;
        let store = Arc::new(
            ContentStore::new(config.store.clone(), clock.clone())
                .with_mirror(mirror.into_shared()),
        );
        store.initialize().await;

        let producer: Arc<dyn ContentProducer> = match &config.template_dir {
            Some(dir) => Arc::new(TemplateProducer::with_template_dir(dir)?),
            None => Arc::new(TemplateProducer::new()?),
        };

        let scheduler = Arc::new(
            Scheduler::new(
                config.scheduler.clone(),
                resolver.clone(),
                store.clone(),
                producer,
                clock,
            )
            .map_err(|e| anyhow::anyhow!("Failed to create scheduler: {e}"))?,
        );

        tracing::info!(
            endpoints = config.resolver.endpoints.len(),
            snapshot = %config.store.snapshot_path.display(),
            "Application initialized"
        );

        Ok(Self {
            config,
            resolver,
            store,
            scheduler,
        })
    }

    /// State handed to the HTTP router
    pub fn state(&self) -> AppState {
        AppState::new(
            self.store.clone(),
            self.resolver.clone(),
            self.scheduler.clone(),
        )
    }
}
