use crate::analyzer::Analyzer;
use crate::classifier::{self, ClassificationInput};
use crate::config::AppConfig;
use crate::corpus;
use crate::error::ConfigError;
use crate::lexicon::Lexicon;
use crate::models::{Document, SourceFormat, StoredDocument};
use crate::qa::QaEngine;
use crate::synthesis::ExternalSynthesizer;
use anyhow::Context;
use chrono::Utc;
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::sync::Arc;
use std::time::Duration;
use storage::documents::DocumentRepository;
use storage::{connect, migrate};
use tracing::{debug, info, warn};

/// Classify-then-analyze over the shared, read-only lexicon. Holds no
/// per-document state.
pub struct Pipeline {
    lexicon: Arc<Lexicon>,
    analyzer: Analyzer,
    config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub row_id: i64,
    pub stored: StoredDocument,
    /// Earlier rows with the same extracted text.
    pub duplicates: Vec<i64>,
}

impl Pipeline {
    /// Validates the configuration and the static tables. Any error here is
    /// fatal.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let lexicon = Arc::new(Lexicon::builtin()?);
        let analyzer = Analyzer::new(lexicon.clone(), config.analyzer.clone())?;
        Ok(Self {
            lexicon,
            analyzer,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn process(&self, document: Document) -> StoredDocument {
        let classification = classifier::classify(
            ClassificationInput {
                text: &document.normalized,
                filename: Some(&document.filename),
            },
            &self.lexicon,
            &self.config.classifier,
        );
        let analysis = self.analyzer.analyze(&document, &classification);
        debug!(
            filename = %document.filename,
            category = %classification.primary,
            confidence = classification.confidence,
            "document processed"
        );
        StoredDocument {
            row_id: None,
            document,
            classification,
            analysis,
        }
    }

    /// Builds a document from already-extracted text and processes it.
    pub fn process_text(&self, filename: &str, format: SourceFormat, raw_text: &str) -> StoredDocument {
        self.process(Document::new(filename, format, raw_text, Utc::now()))
    }

    /// Processes and persists. Identical text already on file is reported,
    /// not rejected.
    pub async fn ingest(
        &self,
        repo: &DocumentRepository,
        filename: &str,
        format: SourceFormat,
        raw_text: &str,
    ) -> anyhow::Result<IngestOutcome> {
        let mut stored = self.process_text(filename, format, raw_text);
        let duplicates = corpus::find_duplicates(repo, &stored.document.content_hash).await?;
        if !duplicates.is_empty() {
            warn!(filename, ?duplicates, "identical content already stored");
        }
        let row_id = corpus::save(repo, &stored).await?;
        stored.row_id = Some(row_id);
        Ok(IngestOutcome {
            row_id,
            stored,
            duplicates,
        })
    }

    pub fn qa_engine(&self) -> QaEngine {
        build_qa_engine(&self.config, &build_registry(&self.config))
    }
}

/// Connects to the configured database and applies migrations.
pub async fn open_repository(config: &AppConfig) -> anyhow::Result<DocumentRepository> {
    let pool = connect(&config.database.path).await.context("db connect")?;
    migrate(&pool).await.context("db migrate")?;
    Ok(DocumentRepository::new(pool))
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new().with_llm("none", Arc::new(NoopProvider));

    if config.llm.provider == "openai" {
        let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| config.llm.base_url.clone());
        match OpenAiProvider::new(OpenAiConfig {
            api_key: key,
            base_url,
            chat_model: config.llm.model.clone(),
            timeout: Duration::from_secs(config.llm.timeout_secs),
        }) {
            Ok(provider) => reg = reg.with_llm("openai", Arc::new(provider)),
            Err(e) => warn!(error = %e, "openai provider unavailable"),
        }
    }

    reg.set_preferred_llm(&config.llm.provider)
}

/// External synthesis is wired only when a real provider resolved.
pub fn build_qa_engine(config: &AppConfig, registry: &ProviderRegistry) -> QaEngine {
    let engine = QaEngine::new(config.qa.clone());
    if config.llm.provider == "none" {
        return engine;
    }
    match registry.llm(None) {
        Ok(provider) => {
            info!(provider = %config.llm.provider, "external synthesis enabled");
            let synth = ExternalSynthesizer::new(provider, Duration::from_secs(config.llm.timeout_secs))
                .with_sampling(config.llm.temperature, config.llm.max_tokens)
                .with_context_chars(config.qa.external_context_chars);
            engine.with_external(Arc::new(synth))
        }
        Err(e) => {
            debug!(error = %e, "no external synthesizer");
            engine
        }
    }
}
