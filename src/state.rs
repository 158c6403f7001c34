use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobStore;
use crate::service::TranslationService;
use crate::translate::{Translator, TranslatorFactory};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<TranslationService>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let translator = TranslatorFactory::create_translator(&config.translator_config)?;
        Self::with_translator(config, translator)
    }

    /// Build the state around an already constructed translator.
    pub fn with_translator(config: Config, translator: Arc<dyn Translator>) -> anyhow::Result<Self> {
        let store = JobStore::new(config.system_config.temp_dir.clone())?;
        let service = Arc::new(TranslationService::new(store, translator));

        Ok(Self { config, service })
    }
}
