//! Batch generation over a document's chunks.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::normalize::normalize;
use super::prompts;
use super::retry::{RetryController, RetryPolicy};
use super::validate::{deserialize_items, validate};
use crate::config::LecternConfig;
use crate::error::{LecternError, LecternResult};
use crate::logging::{ErrorLog, JsonFileErrorLog, LogEntry, TracingErrorLog};
use crate::traits::Llm;
use crate::types::{FlashcardItem, QuizItem, StudyItem, TextChunk};

/// What happened to one chunk of a batch.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// The chunk contributed this many items.
    Accepted { items: usize },
    /// Generation or validation failed; the chunk contributed nothing.
    Failed { error: LecternError },
    /// The batch was cancelled before the chunk finished.
    Skipped,
}

/// Per-chunk outcome, in chunk order.
#[derive(Debug)]
pub struct ChunkReport {
    pub index: usize,
    pub outcome: ChunkOutcome,
}

impl ChunkReport {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, ChunkOutcome::Accepted { .. })
    }
}

/// Items accepted across a batch plus how each chunk fared.
#[derive(Debug)]
pub struct GenerationBatch<T> {
    /// Accepted items, grouped by chunk in input order.
    pub items: Vec<T>,
    pub reports: Vec<ChunkReport>,
    /// Set when cancellation stopped the batch early.
    pub partial: bool,
}

impl<T> GenerationBatch<T> {
    /// Number of chunks whose items were rejected or never produced.
    pub fn failed_chunks(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, ChunkOutcome::Failed { .. }))
            .count()
    }
}

/// Generates study material from chunks, one independent model call per
/// chunk.
pub struct Generator {
    llm: Arc<dyn Llm>,
    policy: RetryPolicy,
    error_log: Arc<dyn ErrorLog>,
    concurrency: usize,
    cancel: CancellationToken,
    deadline: Option<Duration>,
}

impl Generator {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self {
            llm,
            policy: RetryPolicy::default(),
            error_log: Arc::new(TracingErrorLog),
            concurrency: 1,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Build a generator from loaded configuration.
    pub fn from_config(llm: Arc<dyn Llm>, config: &LecternConfig) -> Self {
        let error_log: Arc<dyn ErrorLog> = match &config.error_log_path {
            Some(path) => Arc::new(JsonFileErrorLog::new(path)),
            None => Arc::new(TracingErrorLog),
        };
        let mut generator = Self::new(llm)
            .with_retry_policy(config.retry)
            .with_error_log(error_log)
            .with_concurrency(config.generation.concurrency);
        if let Some(secs) = config.generation.deadline_secs {
            generator = generator.with_deadline(Duration::from_secs(secs));
        }
        generator
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_error_log(mut self, error_log: Arc<dyn ErrorLog>) -> Self {
        self.error_log = error_log;
        self
    }

    /// Maximum chunks in flight at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stop batches when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancel each batch that runs longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Token that cancels every batch run by this generator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn generate_quizzes(
        &self,
        chunks: &[TextChunk],
    ) -> LecternResult<GenerationBatch<QuizItem>> {
        self.generate(chunks).await
    }

    pub async fn generate_flashcards(
        &self,
        chunks: &[TextChunk],
    ) -> LecternResult<GenerationBatch<FlashcardItem>> {
        self.generate(chunks).await
    }

    /// Generate items for every chunk.
    ///
    /// A failing chunk is logged and skipped. Fails with
    /// [`LecternError::NoValidContentGenerated`] only when no chunk produced
    /// anything and the batch was not cancelled.
    pub async fn generate<T: StudyItem>(
        &self,
        chunks: &[TextChunk],
    ) -> LecternResult<GenerationBatch<T>> {
        if chunks.is_empty() {
            return Err(LecternError::NoValidContentGenerated { chunks: 0 });
        }

        let cancel = self.cancel.child_token();
        let timer = self.deadline.map(|deadline| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            })
        });

        let controller = self.controller(cancel.clone());
        let results: Vec<(ChunkReport, Vec<T>)> = stream::iter(chunks)
            .map(|chunk| self.process::<T>(&controller, &cancel, chunk))
            .buffered(self.concurrency)
            .collect()
            .await;

        if let Some(timer) = timer {
            timer.abort();
        }
        let partial = cancel.is_cancelled();

        let mut items = Vec::new();
        let mut reports = Vec::with_capacity(results.len());
        for (report, chunk_items) in results {
            items.extend(chunk_items);
            reports.push(report);
        }

        if items.is_empty() && !partial {
            let err = LecternError::NoValidContentGenerated {
                chunks: chunks.len(),
            };
            self.error_log
                .record(LogEntry::error(&err, json!({ "kind": T::KIND })))
                .await;
            return Err(err);
        }

        info!(
            kind = %T::KIND,
            chunks = chunks.len(),
            items = items.len(),
            partial,
            "Generation batch finished"
        );
        Ok(GenerationBatch {
            items,
            reports,
            partial,
        })
    }

    /// Generate items for a single chunk of text.
    pub async fn generate_chunk<T: StudyItem>(&self, chunk: &str) -> LecternResult<Vec<T>> {
        let controller = self.controller(self.cancel.clone());
        self.run_chunk(&controller, None, chunk).await
    }

    fn controller(&self, cancel: CancellationToken) -> RetryController {
        RetryController::new(self.llm.clone(), self.policy)
            .with_error_log(self.error_log.clone())
            .with_cancellation(cancel)
    }

    async fn process<T: StudyItem>(
        &self,
        controller: &RetryController,
        cancel: &CancellationToken,
        chunk: &TextChunk,
    ) -> (ChunkReport, Vec<T>) {
        let index = chunk.index;
        if cancel.is_cancelled() {
            return (
                ChunkReport {
                    index,
                    outcome: ChunkOutcome::Skipped,
                },
                Vec::new(),
            );
        }

        match self.run_chunk::<T>(controller, Some(index), &chunk.text).await {
            Ok(items) => {
                debug!(chunk_index = index, items = items.len(), "Chunk accepted");
                let outcome = ChunkOutcome::Accepted { items: items.len() };
                (ChunkReport { index, outcome }, items)
            }
            Err(LecternError::Cancelled) => {
                debug!(chunk_index = index, "Chunk cancelled");
                (
                    ChunkReport {
                        index,
                        outcome: ChunkOutcome::Skipped,
                    },
                    Vec::new(),
                )
            }
            Err(error) => {
                warn!(chunk_index = index, error = %error, "Skipping chunk");
                // Rejections were already logged with the offending content.
                if !matches!(error, LecternError::ValidationRejected { .. }) {
                    self.error_log
                        .record(LogEntry::error(
                            &error,
                            json!({ "chunkIndex": index, "kind": T::KIND }),
                        ))
                        .await;
                }
                (
                    ChunkReport {
                        index,
                        outcome: ChunkOutcome::Failed { error },
                    },
                    Vec::new(),
                )
            }
        }
    }

    async fn run_chunk<T: StudyItem>(
        &self,
        controller: &RetryController,
        index: Option<usize>,
        chunk: &str,
    ) -> LecternResult<Vec<T>> {
        let prompt = prompts::prompt_for(T::KIND, chunk);
        let raw = controller.invoke(&prompt).await?;
        let items = normalize(raw);

        if let Err(issues) = validate(&items, T::KIND) {
            let context = json!({
                "chunkIndex": index,
                "kind": T::KIND,
                "issues": &issues,
                "content": &items,
            });
            let err = LecternError::validation_rejected(issues);
            self.error_log.record(LogEntry::error(&err, context)).await;
            return Err(err);
        }

        deserialize_items(items)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("model", &self.llm.model_name())
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryErrorLog;
    use crate::traits::{GenerationOptions, LlmResponse, MockLlm};
    use crate::types::Message;
    use async_trait::async_trait;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: 0.1,
        }
    }

    fn chunks(texts: &[&str]) -> Vec<TextChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextChunk::new(i, *t, i * 10..(i + 1) * 10))
            .collect()
    }

    /// Answers with one flashcard per chunk, echoing a marker from the
    /// prompt; fails for chunks containing "FAIL" and sleeps for chunks
    /// containing "SLOW".
    struct EchoLlm;

    #[async_trait]
    impl Llm for EchoLlm {
        async fn generate(
            &self,
            messages: &[Message],
            _options: Option<GenerationOptions>,
        ) -> LecternResult<LlmResponse> {
            let prompt = &messages[1].content;
            let marker = ["alpha", "beta", "gamma", "delta"]
                .into_iter()
                .find(|m| prompt.contains(m))
                .unwrap_or("unknown");
            if prompt.contains("SLOW") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if prompt.contains("HANG") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if prompt.contains("FAIL") {
                return Err(LecternError::llm("model overloaded"));
            }
            Ok(LlmResponse::text(
                json!({"flashcards": [{"front": marker, "back": "definition"}]}).to_string(),
            ))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn fronts(batch: &GenerationBatch<FlashcardItem>) -> Vec<&str> {
        batch.items.iter().map(|c| c.front.as_str()).collect()
    }

    #[tokio::test]
    async fn test_failed_chunk_is_isolated() {
        let generator = Generator::new(Arc::new(EchoLlm)).with_retry_policy(fast_policy());
        let batch = generator
            .generate_flashcards(&chunks(&["alpha", "beta FAIL", "gamma"]))
            .await
            .unwrap();

        assert_eq!(fronts(&batch), vec!["alpha", "gamma"]);
        assert!(!batch.partial);
        assert_eq!(batch.failed_chunks(), 1);
        assert!(matches!(
            batch.reports[1].outcome,
            ChunkOutcome::Failed {
                error: LecternError::GenerationFailed { attempts: 2, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_all_chunks_failing_is_an_error() {
        let log = Arc::new(MemoryErrorLog::new());
        let generator = Generator::new(Arc::new(EchoLlm))
            .with_retry_policy(fast_policy())
            .with_error_log(log.clone());

        let err = generator
            .generate_flashcards(&chunks(&["alpha FAIL", "beta FAIL"]))
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::NoValidContentGenerated { chunks: 2 }));
        // Two attempts and one skip per chunk, plus the batch failure.
        assert_eq!(log.errors().len(), 7);
    }

    #[tokio::test]
    async fn test_empty_chunk_list_is_an_error() {
        let generator = Generator::new(Arc::new(EchoLlm));
        let err = generator.generate_quizzes(&[]).await.unwrap_err();
        assert!(matches!(err, LecternError::NoValidContentGenerated { chunks: 0 }));
    }

    #[tokio::test]
    async fn test_concurrency_preserves_chunk_order() {
        let generator = Generator::new(Arc::new(EchoLlm)).with_concurrency(4);
        let batch = generator
            .generate_flashcards(&chunks(&["alpha SLOW", "beta", "gamma SLOW", "delta"]))
            .await
            .unwrap();
        assert_eq!(fronts(&batch), vec!["alpha", "beta", "gamma", "delta"]);
        assert!(batch.reports.iter().all(ChunkReport::is_accepted));
    }

    #[tokio::test]
    async fn test_validation_rejects_whole_chunk() {
        let mut llm = MockLlm::new();
        llm.expect_generate().returning(|_, _| {
            Ok(LlmResponse::text(
                json!({"questions": [
                    {"question": "q1", "options": ["a", "b", "c", "d"], "correctAnswer": "a"},
                    {"question": "q2", "options": ["a", "b", "c"], "correctAnswer": "a"}
                ]})
                .to_string(),
            ))
        });

        let log = Arc::new(MemoryErrorLog::new());
        let generator = Generator::new(Arc::new(llm)).with_error_log(log.clone());
        let err = generator
            .generate_chunk::<QuizItem>("Some lecture text")
            .await
            .unwrap_err();

        assert!(matches!(err, LecternError::ValidationRejected { .. }));
        let rejected = log.errors();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].context["content"].as_array().unwrap().len(), 2);
        assert_eq!(rejected[0].context["issues"][0]["field"], json!("options"));
    }

    #[tokio::test]
    async fn test_rejected_middle_chunk_keeps_neighbours_in_order() {
        let mut llm = MockLlm::new();
        llm.expect_generate().returning(|messages, _| {
            let prompt = &messages[1].content;
            let (question, options) = if prompt.contains("second") {
                ("two", json!(["a", "b", "c"]))
            } else if prompt.contains("third") {
                ("three", json!(["a", "b", "c", "d"]))
            } else {
                ("one", json!(["a", "b", "c", "d"]))
            };
            Ok(LlmResponse::text(
                json!({"questions": [
                    {"question": question, "options": options, "correctAnswer": "a"}
                ]})
                .to_string(),
            ))
        });

        let log = Arc::new(MemoryErrorLog::new());
        let generator = Generator::new(Arc::new(llm))
            .with_retry_policy(fast_policy())
            .with_concurrency(3)
            .with_error_log(log.clone());
        let batch = generator
            .generate_quizzes(&chunks(&["first", "second", "third"]))
            .await
            .unwrap();

        let questions: Vec<&str> = batch.items.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(questions, vec!["one", "three"]);
        assert_eq!(batch.failed_chunks(), 1);
        assert!(batch.reports[0].is_accepted());
        assert!(batch.reports[2].is_accepted());
        assert!(matches!(
            batch.reports[1].outcome,
            ChunkOutcome::Failed {
                error: LecternError::ValidationRejected { .. }
            }
        ));

        let rejected = log.errors();
        assert_eq!(rejected.len(), 1);
        assert_eq!(
            rejected[0].error.as_ref().unwrap().name,
            "ValidationRejected"
        );
        assert_eq!(rejected[0].context["chunkIndex"], json!(1));
        assert_eq!(rejected[0].context["issues"][0]["field"], json!("options"));
    }

    #[tokio::test]
    async fn test_recovered_generation_flows_through_validation() {
        let mut llm = MockLlm::new();
        llm.expect_generate().returning(|_, _| {
            Err(LecternError::llm_with_failed_generation(
                "json_validate_failed",
                r#"{"front": "Osmosis", "back": "Diffusion of water"}"#,
            ))
        });

        let generator = Generator::new(Arc::new(llm)).with_retry_policy(RetryPolicy {
            max_retries: 0,
            ..fast_policy()
        });
        let cards = generator
            .generate_chunk::<FlashcardItem>("Osmosis")
            .await
            .unwrap();
        assert_eq!(cards[0].front, "Osmosis");
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_batch() {
        let generator = Generator::new(Arc::new(EchoLlm))
            .with_retry_policy(fast_policy())
            .with_deadline(Duration::from_millis(100));

        let batch = tokio::time::timeout(
            Duration::from_secs(5),
            generator.generate_flashcards(&chunks(&["alpha", "beta HANG", "gamma"])),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(batch.partial);
        assert_eq!(fronts(&batch), vec!["alpha"]);
        assert!(matches!(batch.reports[1].outcome, ChunkOutcome::Skipped));
        assert!(matches!(batch.reports[2].outcome, ChunkOutcome::Skipped));
    }

    #[tokio::test]
    async fn test_cancelled_batch_never_reports_no_content() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let generator = Generator::new(Arc::new(EchoLlm)).with_cancellation(cancel);

        let batch = generator
            .generate_flashcards(&chunks(&["alpha", "beta"]))
            .await
            .unwrap();
        assert!(batch.partial);
        assert!(batch.items.is_empty());
        assert_eq!(batch.reports.len(), 2);
    }
}
