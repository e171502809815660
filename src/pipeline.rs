//! Pipeline driver: document → chunks → retrieval → prompt → model → cards.
//!
//! The pipeline owns its collaborators but no per-document state: every
//! call builds its own chunk list and vector index and drops them on return,
//! so one `Pipeline` can serve concurrent requests. Any collaborator failure
//! aborts the request; there are no retries.

use std::path::Path;

use crate::config::Config;
use crate::document::{Chunk, DocumentLoader, FormatLoader, TextSplitter};
use crate::embed::{Embedder, embedder_for};
use crate::error::FlashcardResult;
use crate::flashcard::{Flashcard, assemble};
use crate::index::{RetrievedChunk, VectorIndex};
use crate::llm::{GenerativeModel, model_for};
use crate::prompt::{PromptTemplate, join_context};
use crate::recovery::{RawModelResponse, RecoveredMapping, ResponseRecovery};

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub flashcards: Vec<Flashcard>,
    /// Chunks the document was split into.
    pub chunk_count: usize,
    /// Chunks that made it into the prompt context.
    pub retrieved: usize,
}

/// The model's raw answer plus the context it was given.
#[derive(Debug, Clone)]
pub struct RawGeneration {
    pub response: RawModelResponse,
    pub retrieved: Vec<RetrievedChunk>,
}

pub struct Pipeline {
    loader: Box<dyn DocumentLoader>,
    splitter: TextSplitter,
    embedder: Box<dyn Embedder>,
    model: Box<dyn GenerativeModel>,
    prompt: PromptTemplate,
    recovery: ResponseRecovery,
    top_k: usize,
    query: String,
}

impl Pipeline {
    /// Wire up the collaborators named in `config`.
    pub fn from_config(config: &Config) -> FlashcardResult<Self> {
        config.validate()?;
        let embedder = embedder_for(config)?;
        let model = model_for(config)?;
        let prompt = PromptTemplate::from_config(&config.prompt)?;

        tracing::debug!(
            embedding = %config.embedding.backend,
            llm = %config.llm.provider,
            model = model.model_name(),
            "pipeline configured"
        );

        Ok(Self::new(Box::new(FormatLoader), embedder, model)
            .with_splitter(TextSplitter::from_config(&config.chunking))
            .with_prompt(prompt)
            .with_recovery(ResponseRecovery::from_config(&config.recovery))
            .with_retrieval(config.retrieval.top_k, config.retrieval.query.clone()))
    }

    /// Build from injected collaborators with default chunking, prompt,
    /// recovery and retrieval settings.
    pub fn new(
        loader: Box<dyn DocumentLoader>,
        embedder: Box<dyn Embedder>,
        model: Box<dyn GenerativeModel>,
    ) -> Self {
        let defaults = Config::default();
        Self {
            loader,
            splitter: TextSplitter::from_config(&defaults.chunking),
            embedder,
            model,
            prompt: PromptTemplate::builtin(defaults.prompt.style),
            recovery: ResponseRecovery::from_config(&defaults.recovery),
            top_k: defaults.retrieval.top_k,
            query: defaults.retrieval.query,
        }
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_recovery(mut self, recovery: ResponseRecovery) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_retrieval(mut self, top_k: usize, query: impl Into<String>) -> Self {
        self.top_k = top_k.max(1);
        self.query = query.into();
        self
    }

    /// Load the document and split each page into chunks.
    pub fn load_and_chunk(&self, path: &Path) -> FlashcardResult<Vec<Chunk>> {
        let pages = self.loader.load(path)?;
        let chunks = self.splitter.split_pages(&pages);
        tracing::info!(
            path = %path.display(),
            pages = pages.len(),
            chunks = chunks.len(),
            "document chunked"
        );
        Ok(chunks)
    }

    /// Embed and index `chunks`, then return the top-K for the query.
    pub fn retrieve(&self, chunks: &[Chunk]) -> FlashcardResult<Vec<RetrievedChunk>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts)?;
        let index = VectorIndex::build(chunks.to_vec(), embeddings)?;
        let query_vector = self.embedder.embed_query(&self.query)?;
        let retrieved = index.retrieve(&query_vector, self.top_k)?;
        tracing::info!(
            backend = %self.embedder.backend(),
            indexed = index.len(),
            retrieved = retrieved.len(),
            "retrieved context"
        );
        Ok(retrieved)
    }

    /// Retrieve context for `chunks` and ask the model for cards.
    pub fn generate_raw(&self, chunks: &[Chunk]) -> FlashcardResult<RawGeneration> {
        let retrieved = self.retrieve(chunks)?;
        let prompt = self.prompt.render(&join_context(&retrieved));
        tracing::info!(model = self.model.model_name(), "querying generative model");
        let response = self.model.generate(&prompt, &self.query)?;
        Ok(RawGeneration {
            response,
            retrieved,
        })
    }

    /// Recover a question → answer mapping. Never fails.
    pub fn recover(&self, raw: &RawModelResponse) -> RecoveredMapping {
        self.recovery.recover(raw)
    }

    /// Run the whole pipeline for one document.
    pub fn run(&self, path: &Path) -> FlashcardResult<GenerationReport> {
        let chunks = self.load_and_chunk(path)?;
        let generation = self.generate_raw(&chunks)?;
        let mapping = self.recover(&generation.response);
        let flashcards = assemble(mapping);
        tracing::info!(flashcards = flashcards.len(), "generation finished");
        Ok(GenerationReport {
            flashcards,
            chunk_count: chunks.len(),
            retrieved: generation.retrieved.len(),
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("loader", &self.loader.name())
            .field("embedder", &self.embedder.backend())
            .field("model", &self.model.model_name())
            .field("top_k", &self.top_k)
            .finish()
    }
}
