use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use lexchunk_chunker::HybridChunker;
use lexchunk_core::config::PipelineConfig;
use lexchunk_core::error::{Issue, Result, StructureError};
use lexchunk_core::types::{Chunk, DocumentInput, HierarchyKind, QualityFlag};
use lexchunk_quality::{Deduplicator, DocumentValidator};
use lexchunk_structure::{StructureParser, StructureStats};
use lexchunk_tokenize::TokenBudgetChecker;

use crate::mapper::MetadataMapper;
use crate::record::ChunkRecord;

/// Records and findings for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub document_id: String,
    pub stats: StructureStats,
    pub records: Vec<ChunkRecord>,
    pub issues: Vec<Issue>,
}

impl DocumentOutcome {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Documents that went through the pipeline, in input order.
    pub documents: Vec<DocumentOutcome>,
    /// Whole documents skipped as duplicates of an earlier one.
    pub duplicate_documents: Vec<Issue>,
}

impl BatchOutcome {
    pub fn records(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.documents.iter().flat_map(|d| d.records.iter())
    }

    pub fn record_count(&self) -> usize {
        self.documents.iter().map(|d| d.records.len()).sum()
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.duplicate_documents.iter().chain(self.documents.iter().flat_map(|d| d.issues.iter()))
    }

    /// Histogram of [`Issue::kind`].
    pub fn issue_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for issue in self.issues() {
            *counts.entry(issue.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Parsed and chunked, not yet mapped.
struct Prepared {
    document_id: String,
    stats: StructureStats,
    chunks: Vec<Chunk>,
    issues: Vec<Issue>,
}

/// parse -> structure check -> chunk -> validate -> map, per document, with
/// batch-level deduplication around it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    chunker: HybridChunker,
    document_validator: DocumentValidator,
    chunk_validator: DocumentValidator,
    mapper: MetadataMapper,
}

impl Pipeline {
    /// Validates `config` and resolves the tokenizer for its model name.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let budget = TokenBudgetChecker::from_config(&config.tokenizer);
        Self::with_budget(config, budget)
    }

    /// Use an already-built token budget instead of the configured model's.
    pub fn with_budget(config: PipelineConfig, budget: TokenBudgetChecker) -> Result<Self> {
        config.validate()?;
        info!(
            tokenizer = budget.counter_name(),
            token_limit = budget.token_limit(),
            max_chunk_size = config.chunking.max_chunk_size,
            "pipeline ready"
        );
        Ok(Self {
            chunker: HybridChunker::new(config.chunking.clone(), budget),
            document_validator: DocumentValidator::new(config.validation.document.clone())?,
            chunk_validator: DocumentValidator::new(config.validation.chunk.clone())?,
            mapper: MetadataMapper::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    pub fn chunker(&self) -> &HybridChunker { &self.chunker }

    pub fn mapper(&self) -> &MetadataMapper { &self.mapper }

    pub fn process_document(&self, input: &DocumentInput) -> DocumentOutcome {
        self.process_document_at(input, Utc::now())
    }

    pub fn process_document_at(&self, input: &DocumentInput, now: DateTime<Utc>) -> DocumentOutcome {
        let prepared = self.prepare(input);
        self.finish(prepared, input, now)
    }

    pub fn process_batch(&self, inputs: Vec<DocumentInput>) -> BatchOutcome {
        self.process_batch_at(inputs, Utc::now())
    }

    pub fn process_batch_at(&self, inputs: Vec<DocumentInput>, now: DateTime<Utc>) -> BatchOutcome {
        self.run_batch(inputs, now, |_| {})
    }

    /// `on_document` is called with each document id once it is chunked,
    /// from worker threads.
    pub fn process_batch_with<F>(&self, inputs: Vec<DocumentInput>, on_document: F) -> BatchOutcome
    where
        F: Fn(&str) + Sync,
    {
        self.run_batch(inputs, Utc::now(), on_document)
    }

    /// Document dedup, then parallel parse and chunk, then sequential chunk
    /// dedup and mapping. Output order follows `inputs`.
    fn run_batch<F>(&self, inputs: Vec<DocumentInput>, now: DateTime<Utc>, on_document: F) -> BatchOutcome
    where
        F: Fn(&str) + Sync,
    {
        let total = inputs.len();
        let mut doc_dedup = Deduplicator::new(self.config.dedup.clone());
        let deduped = doc_dedup.deduplicate(inputs);
        let duplicate_documents: Vec<Issue> =
            deduped.duplicates.iter().map(|(doc, found)| found.to_issue(doc.metadata.document_id.clone())).collect();

        let mut prepared: Vec<Prepared> = deduped
            .kept
            .par_iter()
            .map(|doc| {
                let p = self.prepare(doc);
                on_document(&p.document_id);
                p
            })
            .collect();

        let mut chunk_dedup = Deduplicator::new(self.config.dedup.clone());
        for p in &mut prepared {
            let outcome = chunk_dedup.deduplicate(std::mem::take(&mut p.chunks));
            p.issues.extend(outcome.duplicates.iter().map(|(chunk, found)| found.to_issue(chunk.id.clone())));
            p.chunks = outcome.kept;
        }

        let documents: Vec<DocumentOutcome> =
            prepared.into_iter().zip(&deduped.kept).map(|(p, input)| self.finish(p, input, now)).collect();
        let outcome = BatchOutcome { documents, duplicate_documents };
        info!(
            documents = total,
            processed = outcome.documents.len(),
            duplicate_documents = outcome.duplicate_documents.len(),
            records = outcome.record_count(),
            "batch processed"
        );
        outcome
    }

    fn prepare(&self, input: &DocumentInput) -> Prepared {
        let document_id = input.metadata.document_id.clone();
        let mut issues = Vec::new();

        let tree = StructureParser::new(input.doc_type()).parse(&input.raw_text);
        let stats = tree.stats();
        if let Some(err) = tree.structure_error() {
            warn!(document_id = %document_id, error = %err, "structure check failed");
            issues.push(Issue::Structure(err));
            if err == StructureError::EmptyDocument {
                return Prepared { document_id, stats, chunks: Vec::new(), issues };
            }
        }

        let doc_check = self.document_validator.validate(&input.raw_text);
        if !doc_check.is_valid {
            warn!(document_id = %document_id, issues = ?doc_check.messages(), "document failed validation");
            issues.push(doc_check.to_issue(document_id.clone()));
        }

        let mut chunks = self.chunker.chunk(&tree, &document_id);
        for chunk in &chunks {
            if chunk.has_flag(QualityFlag::ExceedsMaxSize) {
                issues.push(Issue::SizeConstraintViolation {
                    chunk_id: chunk.id.clone(),
                    detail: format!("{} chars > max {}", chunk.char_count, self.config.chunking.max_chunk_size),
                });
            }
            if chunk.has_flag(QualityFlag::ExceedsTokenLimit) {
                issues.push(Issue::SizeConstraintViolation {
                    chunk_id: chunk.id.clone(),
                    detail: format!("{} tokens > limit {}", chunk.token_count, self.chunker.budget().token_limit()),
                });
            }
        }

        let drop_invalid = self.config.drop_invalid_chunks;
        chunks.retain_mut(|chunk| {
            let result = self.chunk_validator.validate(&chunk.text);
            if result.is_valid {
                return true;
            }
            debug!(chunk_id = %chunk.id, issues = ?result.messages(), dropped = drop_invalid, "chunk failed validation");
            issues.push(result.to_issue(chunk.id.clone()));
            chunk.quality_flags.insert(QualityFlag::ValidationFailed);
            !drop_invalid
        });

        debug!(
            document_id = %document_id,
            articles = stats.get(HierarchyKind::Article),
            depth = stats.max_depth,
            chunks = chunks.len(),
            issues = issues.len(),
            "prepared document"
        );
        Prepared { document_id, stats, chunks, issues }
    }

    fn finish(&self, prepared: Prepared, input: &DocumentInput, now: DateTime<Utc>) -> DocumentOutcome {
        let total = prepared.chunks.len();
        let records = prepared
            .chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| self.mapper.map_at(chunk, &input.metadata, index, total, now))
            .collect();
        DocumentOutcome { document_id: prepared.document_id, stats: prepared.stats, records, issues: prepared.issues }
    }
}
