//! Core Extractor implementation

use crate::chunking::{ChunkSplitter, SplitReport};
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::metadata::{ChunkMetadata, ChunkMetadataStore};
use crate::parser::parse_extraction_response;
use crate::prompt::PromptBuilder;
use crate::scanner::{DocumentDialect, DocumentStructureScanner};
use crate::types::{ChunkReport, ChunkStatus, DocumentExtraction, RunSummary};
use solgraph_domain::traits::LlmProvider;
use solgraph_domain::{Chunk, ChunkId, ExtractionConstraints, OntologySchema, RunId, StructureScan};
use solgraph_gatekeeper::{Gatekeeper, ValidationOutcome, ValidationStats};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A document that has been scanned and split but not yet extracted
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Source document identifier
    pub document_id: String,
    /// Result of the structure scan
    pub scan: StructureScan,
    /// Chunks and split diagnostics
    pub split: SplitReport,
    /// Metadata recorded for this document's chunks
    pub metadata: ChunkMetadataStore,
}

impl PreparedDocument {
    /// Chunks in document order
    pub fn chunks(&self) -> &[Chunk] {
        &self.split.chunks
    }
}

/// Everything a spawned chunk task needs, without borrowing the extractor
struct ChunkTask<L> {
    llm_provider: Arc<L>,
    gatekeeper: Arc<Gatekeeper>,
    schema: Arc<OntologySchema>,
    constraints: Arc<ExtractionConstraints>,
    timeout: Duration,
}

impl<L> Clone for ChunkTask<L> {
    fn clone(&self) -> Self {
        Self {
            llm_provider: Arc::clone(&self.llm_provider),
            gatekeeper: Arc::clone(&self.gatekeeper),
            schema: Arc::clone(&self.schema),
            constraints: Arc::clone(&self.constraints),
            timeout: self.timeout,
        }
    }
}

/// Outcome of one chunk, before aggregation
struct ChunkResult {
    report: ChunkReport,
    outcome: Option<ValidationOutcome>,
}

/// The Extractor turns a solicitation into validated entities and relationships
///
/// A run scans the document for structure, splits it into bounded chunks,
/// sends every chunk to the extraction engine concurrently and filters what
/// comes back through the [`Gatekeeper`]. Chunk-local failures end up in the
/// run summary; they never abort the run.
pub struct Extractor<L>
where
    L: LlmProvider,
{
    llm_provider: Arc<L>,
    gatekeeper: Arc<Gatekeeper>,
    schema: Arc<OntologySchema>,
    constraints: Arc<ExtractionConstraints>,
    scanner: DocumentStructureScanner,
    splitter: ChunkSplitter,
    metadata: Arc<RwLock<ChunkMetadataStore>>,
    config: ExtractorConfig,
}

impl<L> Extractor<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    /// Create a new Extractor for the uniform contract format
    pub fn new(
        llm_provider: L,
        gatekeeper: Gatekeeper,
        schema: Arc<OntologySchema>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        Self::with_dialect(
            llm_provider,
            gatekeeper,
            schema,
            config,
            DocumentDialect::uniform_contract_format(),
        )
    }

    /// Create a new Extractor for a custom document dialect
    pub fn with_dialect(
        llm_provider: L,
        gatekeeper: Gatekeeper,
        schema: Arc<OntologySchema>,
        config: ExtractorConfig,
        dialect: DocumentDialect,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        let splitter = ChunkSplitter::new(&config, dialect.clone())?;
        let scanner = DocumentStructureScanner::new(dialect, config.min_section_pattern_matches);
        let constraints = Arc::new(schema.render_extraction_constraints());

        Ok(Self {
            llm_provider: Arc::new(llm_provider),
            gatekeeper: Arc::new(gatekeeper),
            schema,
            constraints,
            scanner,
            splitter,
            metadata: Arc::new(RwLock::new(ChunkMetadataStore::new())),
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Schema used for prompts and validation
    pub fn schema(&self) -> &OntologySchema {
        &self.schema
    }

    /// Scan and split a document, and make its metadata the current run's
    pub fn prepare(&self, document_id: &str, text: &str) -> Result<PreparedDocument, ExtractorError> {
        let scan = self.scanner.scan(text);
        let split = self.splitter.split(document_id, text, &scan);

        let mut metadata = ChunkMetadataStore::new();
        for chunk in &split.chunks {
            metadata.record_chunk(chunk)?;
        }
        debug!(document_id, recorded = metadata.len(), "Recorded chunk metadata");
        self.install_metadata(metadata.clone());

        Ok(PreparedDocument {
            document_id: document_id.to_string(),
            scan,
            split,
            metadata,
        })
    }

    fn install_metadata(&self, metadata: ChunkMetadataStore) {
        *self.metadata.write().unwrap_or_else(PoisonError::into_inner) = metadata;
    }

    /// Scan, split and extract a whole document
    pub async fn process_document(
        &self,
        document_id: &str,
        text: &str,
    ) -> Result<DocumentExtraction, ExtractorError> {
        let prepared = self.prepare(document_id, text)?;
        self.run(prepared, CancellationToken::new()).await
    }

    /// Extract every chunk of a prepared document
    ///
    /// At most `max_concurrent_extractions` engine calls are in flight,
    /// including calls whose chunk already timed out. Once
    /// `cancel` fires, chunks not yet submitted are reported as cancelled;
    /// submitted chunks still finish or time out.
    pub async fn run(
        &self,
        prepared: PreparedDocument,
        cancel: CancellationToken,
    ) -> Result<DocumentExtraction, ExtractorError> {
        let run_id = RunId::new();
        let started = Instant::now();
        let PreparedDocument {
            document_id,
            split,
            metadata,
            ..
        } = prepared;
        let SplitReport {
            chunks,
            mode,
            overflow_count,
            truncated_bytes,
        } = split;
        let chunk_count = chunks.len();
        let chunks_per_section = metadata.chunks_per_section();
        let requirements_per_section = metadata.requirements_per_section();
        self.install_metadata(metadata);

        info!(
            %run_id,
            document_id = %document_id,
            chunks = chunk_count,
            max_concurrent = self.config.max_concurrent_extractions,
            "Starting extraction run"
        );

        let task = ChunkTask {
            llm_provider: Arc::clone(&self.llm_provider),
            gatekeeper: Arc::clone(&self.gatekeeper),
            schema: Arc::clone(&self.schema),
            constraints: Arc::clone(&self.constraints),
            timeout: self.config.extraction_timeout(),
        };
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_extractions));

        let mut handles = Vec::with_capacity(chunk_count);
        let mut cancelled = Vec::new();
        let mut pending = chunks.into_iter();

        while let Some(chunk) = pending.next() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                cancelled.push(chunk);
                cancelled.extend(pending.by_ref());
                break;
            };

            let identity = (chunk.id.clone(), chunk.ordinal, chunk.section_id.clone());
            let task = task.clone();
            let handle = tokio::spawn(extract_chunk(task, chunk, permit));
            handles.push((identity, handle));
        }

        if !cancelled.is_empty() {
            warn!(
                %run_id,
                cancelled = cancelled.len(),
                "Run cancelled, discarding unsubmitted chunks"
            );
        }

        let mut results = Vec::with_capacity(chunk_count);
        for ((chunk_id, ordinal, section_id), handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(chunk = %chunk_id, "Chunk task failed: {}", e);
                    ChunkResult {
                        report: ChunkReport::new(
                            &chunk_id,
                            ordinal,
                            section_id,
                            ChunkStatus::EngineFailure {
                                error: format!("Task join error: {}", e),
                            },
                        ),
                        outcome: None,
                    }
                }
            };
            results.push(result);
        }
        results.extend(cancelled.iter().map(|chunk| ChunkResult {
            report: ChunkReport::new(
                &chunk.id,
                chunk.ordinal,
                chunk.section_id.clone(),
                ChunkStatus::Cancelled,
            ),
            outcome: None,
        }));

        let mut entities = Vec::new();
        let mut relationships = Vec::new();
        let mut validation = ValidationStats::default();
        let mut chunk_reports = Vec::with_capacity(results.len());
        for result in results {
            if let Some(outcome) = result.outcome {
                validation.merge(&outcome.stats);
                entities.extend(outcome.entities);
                relationships.extend(outcome.relationships);
            }
            chunk_reports.push(result.report);
        }

        let summary = RunSummary {
            run_id: run_id.to_string(),
            document_id,
            schema_version: self.schema.version().to_string(),
            structure_mode: mode,
            chunk_count,
            chunks_per_section,
            requirements_per_section,
            overflow_count,
            truncated_bytes,
            chunk_reports,
            validation,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            %run_id,
            ok = summary.ok_count(),
            malformed = summary.malformed_count(),
            timeout = summary.timeout_count(),
            failed = summary.engine_failure_count(),
            cancelled = summary.cancelled_count(),
            entities = entities.len(),
            relationships = relationships.len(),
            elapsed_ms = summary.elapsed_ms,
            "Extraction run finished"
        );

        Ok(DocumentExtraction {
            summary,
            entities,
            relationships,
        })
    }

    /// Metadata recorded for one chunk of the current run
    pub fn chunk_metadata(&self, chunk_id: &ChunkId) -> Option<ChunkMetadata> {
        self.metadata
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(chunk_id)
            .cloned()
    }

    /// Copy of the metadata store of the current run
    pub fn metadata_snapshot(&self) -> ChunkMetadataStore {
        self.metadata
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Prompt, call, parse and validate one chunk
async fn extract_chunk<L>(
    task: ChunkTask<L>,
    chunk: Chunk,
    permit: OwnedSemaphorePermit,
) -> ChunkResult
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let mut report = ChunkReport::new(&chunk.id, chunk.ordinal, chunk.section_id.clone(), ChunkStatus::Ok);
    let prompt = PromptBuilder::new(&chunk, &task.constraints).build();
    debug!(chunk = %chunk.id, prompt_chars = prompt.len(), "Submitting chunk");

    let response = match call_llm(&task, prompt, permit).await {
        Ok(response) => response,
        Err(ExtractorError::Timeout(secs)) => {
            warn!(chunk = %chunk.id, "Extraction timed out after {}s", secs);
            report.status = ChunkStatus::Timeout { after_secs: secs };
            return ChunkResult { report, outcome: None };
        }
        Err(e) => {
            warn!(chunk = %chunk.id, "Extraction engine failed: {}", e);
            report.status = ChunkStatus::EngineFailure {
                error: e.to_string(),
            };
            return ChunkResult { report, outcome: None };
        }
    };

    let batch = match parse_extraction_response(&response, &chunk.id) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(chunk = %chunk.id, "Malformed extraction output: {}", e);
            report.status = ChunkStatus::Malformed {
                reason: e.to_string(),
            };
            return ChunkResult { report, outcome: None };
        }
    };

    let outcome = task
        .gatekeeper
        .validate(&task.schema, &batch.entities, &batch.relationships);
    for rejection in &outcome.rejections {
        debug!(
            chunk = %chunk.id,
            label = %rejection.label,
            reason = rejection.reason.code(),
            "Rejected candidate"
        );
    }

    report.entities_accepted = outcome.entities.len();
    report.relationships_accepted = outcome.relationships.len();
    report.rejections = outcome.rejections.len();
    debug!(
        chunk = %chunk.id,
        entities = report.entities_accepted,
        relationships = report.relationships_accepted,
        rejected = report.rejections,
        skipped = batch.skipped,
        "Chunk extracted"
    );

    ChunkResult {
        report,
        outcome: Some(outcome),
    }
}

/// Call the engine with a time budget
///
/// `LlmProvider` is blocking, so the call runs on the blocking pool. A call
/// that outlives its budget is abandoned, not interrupted, and keeps its
/// concurrency permit until the engine returns.
async fn call_llm<L>(
    task: &ChunkTask<L>,
    prompt: String,
    permit: OwnedSemaphorePermit,
) -> Result<String, ExtractorError>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let llm = Arc::clone(&task.llm_provider);

    let call = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        llm.generate(&prompt)
            .map_err(|e| ExtractorError::Llm(e.to_string()))
    });

    match timeout(task.timeout, call).await {
        Ok(joined) => {
            joined.map_err(|e| ExtractorError::Llm(format!("Task join error: {}", e)))?
        }
        Err(_) => Err(ExtractorError::Timeout(task.timeout.as_secs())),
    }
}
