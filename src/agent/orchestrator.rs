//! Agent orchestrator - main coordinator
//!
//! One driver runs the whole state machine for a request:
//! rewrite → judge → retrieve (bounded loop) → generate → complete/error.
//! Each transition emits a step result into a [`StepSink`]; the streaming
//! and batch interfaces differ only in the sink they pass in and in the
//! generation mode.

use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::agent::{AgentState, StateEvent, ThoughtLog};
use crate::backends::{
    Embedder, GenerationRequest, Generator, HttpReranker, OllamaClient, QdrantSearch,
};
use crate::config::Config;
use crate::conversation::{mint_conversation_id, ConversationStore};
use crate::errors::{RagError, Result};
use crate::events::{ChannelSink, CollectingSink, EventStream, StepResult, StepSink};
use crate::rag::prompt::{deeper_query_prompt, system_prompt, user_prompt};
use crate::rag::{AssembledContext, ContextBuilder, ContextConfig, RetrievalOutcome, RetrievalScorer};
use crate::refiner::{KeywordJudge, PunctuationRewriter, QueryRewriter, RetrievalJudge};
use crate::types::{
    AgentThought, ChatFailure, ChatRequest, ChatResponse, RetrievedDocument, ThoughtStep, Turn,
};

/// Output cap for the deeper-query generation call
pub const DEEPER_QUERY_MAX_TOKENS: u32 = 100;

/// Orchestration parameters
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Retrieval turns in agent mode
    pub max_turns: usize,

    /// Documents per agent retrieval turn
    pub agent_top_k: usize,

    /// Documents for the single simple-mode pass
    pub simple_top_k: usize,

    pub use_reranker: bool,

    /// Context at or above this many characters ends the loop
    pub context_char_threshold: usize,

    /// Representative sources returned on completion
    pub max_sources: usize,

    /// History turns folded into the user prompt
    pub history_turns: usize,

    pub context: ContextConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_turns: config.agent.max_turns,
            agent_top_k: config.retrieval.agent_top_k,
            simple_top_k: config.retrieval.default_top_k,
            use_reranker: config.retrieval.use_reranker,
            context_char_threshold: config.agent.context_char_threshold,
            max_sources: config.agent.max_sources,
            history_turns: config.agent.history_turns,
            context: ContextConfig {
                max_documents: config.agent.context_docs,
                doc_char_limit: config.agent.doc_char_limit,
            },
        }
    }
}

/// How the Generate step calls the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Single completion; no chunk results
    Complete,

    /// Streamed fragments, each forwarded as a chunk result
    Streamed,
}

/// Mutable state of one run; never shared across runs
struct RunState {
    state: AgentState,
    conversation_id: String,
    trail: ThoughtLog,
    started: Instant,
}

impl RunState {
    fn new(conversation_id: String) -> Self {
        Self {
            state: AgentState::Start,
            conversation_id,
            trail: ThoughtLog::new(),
            started: Instant::now(),
        }
    }

    fn advance(&mut self, event: StateEvent) -> Result<()> {
        let next = self.state.transition(event)?;
        debug!(
            conversation_id = %self.conversation_id,
            from = self.state.display_name(),
            to = next.display_name(),
            "state transition"
        );
        self.state = next;
        Ok(())
    }
}

/// What the retrieval phase hands to generation
#[derive(Default)]
struct Gathered {
    context: AssembledContext,
    /// Documents the current context was built from
    cited: Vec<RetrievedDocument>,
    /// Every document retrieved across turns
    documents: Vec<RetrievedDocument>,
}

/// Main agent orchestrator
pub struct Orchestrator {
    retriever: RetrievalScorer,
    rewriter: Arc<dyn QueryRewriter>,
    judge: Arc<dyn RetrievalJudge>,
    generator: Arc<dyn Generator>,
    store: Arc<ConversationStore>,
    context_builder: ContextBuilder,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create orchestrator with heuristic refiners and default parameters
    pub fn new(
        retriever: RetrievalScorer,
        generator: Arc<dyn Generator>,
        store: Arc<ConversationStore>,
    ) -> Self {
        let config = OrchestratorConfig::default();
        Self {
            retriever,
            rewriter: Arc::new(PunctuationRewriter),
            judge: Arc::new(KeywordJudge::default()),
            generator,
            store,
            context_builder: ContextBuilder::with_config(config.context.clone()),
            config,
        }
    }

    /// Wire the network collaborators described by `config`
    pub fn from_config(config: &Config, store: Arc<ConversationStore>) -> Result<Self> {
        let ollama = Arc::new(OllamaClient::new(&config.ollama)?);
        let embedder: Arc<dyn Embedder> = ollama.clone();
        let search = Arc::new(QdrantSearch::new(&config.qdrant, embedder)?);

        let mut retriever =
            RetrievalScorer::new(search).with_weights(config.retrieval.weights());
        if let Some(url) = &config.reranker.url {
            retriever =
                retriever.with_reranker(Arc::new(HttpReranker::new(url, config.reranker.timeout_secs)?));
        }

        info!(
            model = ollama.model(),
            collection = %config.qdrant.collection,
            reranker = retriever.has_reranker(),
            "orchestrator configured"
        );

        Ok(Self::new(retriever, ollama, store)
            .with_judge(Arc::new(KeywordJudge::new(config.agent.signal_terms.clone())))
            .with_config(OrchestratorConfig::from(config)))
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn QueryRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_judge(mut self, judge: Arc<dyn RetrievalJudge>) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.context_builder = ContextBuilder::with_config(config.context.clone());
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Run a request to completion and return the aggregate result.
    ///
    /// A run that ends in the error state returns `RagError::RunFailed`
    /// carrying the partial thought trail.
    pub async fn process(&self, request: ChatRequest) -> Result<ChatResponse> {
        request.validate()?;

        let mut sink = CollectingSink::new();
        self.drive(request, &mut sink, GenerationMode::Complete).await?;
        sink.into_result()
    }

    /// Start a run on a background task and return its event stream.
    ///
    /// Dropping the returned stream cancels the run.
    pub fn stream(self: &Arc<Self>, request: ChatRequest) -> Result<EventStream> {
        request.validate()?;

        let (mut sink, receiver) = ChannelSink::channel();
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move {
            match orchestrator
                .drive(request, &mut sink, GenerationMode::Streamed)
                .await
            {
                Ok(()) => {
                    let _ = sink.finish().await;
                }
                Err(e) => debug!(error = %e, "streamed run stopped early"),
            }
        });

        Ok(EventStream::new(receiver, task))
    }

    /// Retrieval only, without generation
    pub async fn search(&self, query: &str, top_k: usize) -> Result<RetrievalOutcome> {
        if query.trim().is_empty() {
            return Err(RagError::Validation("query must not be empty".to_string()));
        }
        Ok(self
            .retriever
            .retrieve(query, top_k, self.config.use_reranker)
            .await)
    }

    pub fn conversation(&self, conversation_id: &str) -> Result<Vec<Turn>> {
        self.store.get(conversation_id)
    }

    pub fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.store.delete(conversation_id)
    }

    /// Drive one run, emitting every step into `sink`.
    ///
    /// Returns `Ok` once a terminal result (completed or failed) has been
    /// delivered; `Err` only when the sink rejected a step.
    async fn drive<S: StepSink>(
        &self,
        request: ChatRequest,
        sink: &mut S,
        mode: GenerationMode,
    ) -> Result<()> {
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(mint_conversation_id);
        let mut run = RunState::new(conversation_id);

        let history = if request.history.is_empty() {
            self.store.get(&run.conversation_id).unwrap_or_default()
        } else {
            request.history.clone()
        };

        info!(
            conversation_id = %run.conversation_id,
            agent = request.use_agent,
            history = history.len(),
            "run started"
        );

        match self.execute(&request, &history, &mut run, sink, mode).await {
            Ok(response) => {
                sink.accept(StepResult::Completed(response.clone())).await?;
                self.store.append_all(
                    &run.conversation_id,
                    [Turn::user(request.query), Turn::assistant(response.answer)],
                );
                info!(
                    conversation_id = %run.conversation_id,
                    thoughts = run.trail.len(),
                    elapsed = response.elapsed_time,
                    "run complete"
                );
                Ok(())
            }
            Err(RagError::Cancelled) => {
                warn!(conversation_id = %run.conversation_id, "run cancelled by consumer");
                Err(RagError::Cancelled)
            }
            Err(e) => {
                error!(conversation_id = %run.conversation_id, error = %e, "run failed");
                let _ = run.advance(StateEvent::Failure);
                run.trail.record(
                    AgentThought::new(ThoughtStep::Error, "an error occurred while processing")
                        .with_action("handle error")
                        .with_result(e.to_string()),
                );
                sink.accept(StepResult::Failed(ChatFailure {
                    error: e.to_string(),
                    conversation_id: run.conversation_id.clone(),
                    thought_trail: run.trail.to_vec(),
                }))
                .await
            }
        }
    }

    async fn execute<S: StepSink>(
        &self,
        request: &ChatRequest,
        history: &[Turn],
        run: &mut RunState,
        sink: &mut S,
        mode: GenerationMode,
    ) -> Result<ChatResponse> {
        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::Start, format!("received query: {}", request.query)),
        )
        .await?;

        let gathered = if request.use_agent {
            self.agent_flow(&request.query, history, run, sink).await?
        } else {
            self.simple_flow(&request.query, run, sink).await?
        };

        let answer = self
            .generate(&request.query, history, &gathered, run, sink, mode)
            .await?;

        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::Complete, "answer generated")
                .with_action("assemble result")
                .with_result(format!("generated {} characters", answer.chars().count())),
        )
        .await?;
        run.advance(StateEvent::Generated)?;

        Ok(ChatResponse {
            answer,
            conversation_id: run.conversation_id.clone(),
            sources: representative_sources(&gathered.documents, self.config.max_sources),
            thought_trail: run.trail.to_vec(),
            elapsed_time: run.started.elapsed().as_secs_f64(),
        })
    }

    /// Rewrite, judge, then the bounded retrieval loop
    async fn agent_flow<S: StepSink>(
        &self,
        query: &str,
        history: &[Turn],
        run: &mut RunState,
        sink: &mut S,
    ) -> Result<Gathered> {
        run.advance(StateEvent::Begin)?;

        let rewritten = self.rewriter.rewrite(query, history).await?;
        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::QueryRewrite, format!("original: {}", query))
                .with_action("rewrite query")
                .with_result(format!("rewritten: {}", rewritten)),
        )
        .await?;
        run.advance(StateEvent::Rewritten)?;

        let decision = self.judge.judge(&rewritten, history).await?;
        let verdict = if decision.needed {
            "retrieval needed"
        } else {
            "retrieval not needed"
        };
        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::RetrievalJudgment, "judge whether retrieval is needed")
                .with_action("classify query")
                .with_result(format!("{}: {}", verdict, decision.reason)),
        )
        .await?;

        let mut gathered = Gathered::default();
        if !decision.needed {
            run.advance(StateEvent::RetrievalSkipped)?;
            return Ok(gathered);
        }
        run.advance(StateEvent::RetrievalNeeded)?;

        let mut turn_query = rewritten;
        // At least one turn once retrieval is judged necessary
        for turn in 1..=self.config.max_turns.max(1) {
            self.emit(
                run,
                sink,
                AgentThought::new(ThoughtStep::RetrievalTurn(turn), format!("retrieval turn {}", turn))
                    .with_action("search documents")
                    .with_result(format!("query: {}", turn_query)),
            )
            .await?;

            let outcome = self
                .retriever
                .retrieve(&turn_query, self.config.agent_top_k, self.config.use_reranker)
                .await;
            self.record_warnings(&outcome, run, sink).await?;
            run.advance(StateEvent::Retrieved)?;

            let built = self.context_builder.build(&outcome.documents);
            let result = if built.fragment_count > 0 {
                format!(
                    "collected {} documents, folded {} fragments",
                    outcome.documents.len(),
                    built.fragment_count
                )
            } else {
                "no fragments, keeping previous context".to_string()
            };
            if built.fragment_count > 0 {
                gathered.context = built;
                gathered.cited = outcome.documents.clone();
            }
            gathered.documents.extend(outcome.documents);
            self.emit(
                run,
                sink,
                AgentThought::new(ThoughtStep::ContextBuilding, "build retrieval context")
                    .with_action("merge retrieval results")
                    .with_result(result),
            )
            .await?;
            run.advance(StateEvent::ContextBuilt)?;

            if !self.should_continue(turn, &gathered.context) {
                debug!(turn, chars = gathered.context.char_len(), "retrieval loop finished");
                break;
            }

            turn_query = self.deeper_query(query, &gathered.context, run, sink).await?;
            run.advance(StateEvent::NextTurn)?;
        }

        run.advance(StateEvent::LoopExhausted)?;
        Ok(gathered)
    }

    /// Exactly one retrieval pass with the raw query
    async fn simple_flow<S: StepSink>(
        &self,
        query: &str,
        run: &mut RunState,
        sink: &mut S,
    ) -> Result<Gathered> {
        run.advance(StateEvent::BeginSimple)?;

        let outcome = self
            .retriever
            .retrieve(query, self.config.simple_top_k, self.config.use_reranker)
            .await;
        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::SimpleRetrieval, "run retrieval")
                .with_result(format!("retrieved {} documents", outcome.documents.len())),
        )
        .await?;
        self.record_warnings(&outcome, run, sink).await?;
        run.advance(StateEvent::Retrieved)?;

        let context = self.context_builder.build(&outcome.documents);
        run.advance(StateEvent::SinglePassDone)?;

        Ok(Gathered {
            context,
            cited: outcome.documents.clone(),
            documents: outcome.documents,
        })
    }

    async fn generate<S: StepSink>(
        &self,
        query: &str,
        history: &[Turn],
        gathered: &Gathered,
        run: &mut RunState,
        sink: &mut S,
        mode: GenerationMode,
    ) -> Result<String> {
        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::Generation, "start generating the answer")
                .with_action("call generator for the final answer"),
        )
        .await?;

        let request = GenerationRequest::new(user_prompt(
            query,
            &gathered.context,
            history,
            self.config.history_turns,
        ))
        .with_system(system_prompt(&gathered.context, &gathered.cited));

        match mode {
            GenerationMode::Complete => self.generator.complete(&request).await,
            GenerationMode::Streamed => {
                let mut fragments = self.generator.stream(&request).await?;
                let mut answer = String::new();
                while let Some(fragment) = fragments.next().await {
                    let fragment = fragment?;
                    if fragment.is_empty() {
                        continue;
                    }
                    answer.push_str(&fragment);
                    sink.accept(StepResult::Chunk(fragment)).await?;
                }
                Ok(answer)
            }
        }
    }

    /// Continue iff turns remain and the context is still thin
    fn should_continue(&self, turn: usize, context: &AssembledContext) -> bool {
        turn < self.config.max_turns
            && (context.is_empty() || context.char_len() < self.config.context_char_threshold)
    }

    /// Ask the generator for a more specific follow-up query.
    ///
    /// Falls back to the original query on empty output or failure.
    async fn deeper_query<S: StepSink>(
        &self,
        original: &str,
        context: &AssembledContext,
        run: &mut RunState,
        sink: &mut S,
    ) -> Result<String> {
        let request = GenerationRequest::new(deeper_query_prompt(original, context))
            .with_max_tokens(DEEPER_QUERY_MAX_TOKENS);

        let (next, result) = match self.generator.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                let result = format!("new query: {}", text);
                (text, result)
            }
            Ok(_) => (original.to_string(), format!("new query: {}", original)),
            Err(e) => {
                warn!(error = %e, "deeper query generation failed, reusing original query");
                (
                    original.to_string(),
                    format!("generation failed ({}), reusing query: {}", e, original),
                )
            }
        };

        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::QueryDeepening, "deepen the query for more relevant information")
                .with_action("generate follow-up query")
                .with_result(result),
        )
        .await?;

        Ok(next)
    }

    async fn record_warnings<S: StepSink>(
        &self,
        outcome: &RetrievalOutcome,
        run: &mut RunState,
        sink: &mut S,
    ) -> Result<()> {
        if outcome.warnings.is_empty() {
            return Ok(());
        }
        self.emit(
            run,
            sink,
            AgentThought::new(ThoughtStep::RetrievalWarning, "retrieval encountered an error")
                .with_action("continue without documents")
                .with_result(outcome.warnings.join("; ")),
        )
        .await
    }

    /// Append to the trail, then deliver to the sink
    async fn emit<S: StepSink>(
        &self,
        run: &mut RunState,
        sink: &mut S,
        thought: AgentThought,
    ) -> Result<()> {
        debug!(step = %thought.step, "thought");
        let recorded = run.trail.record(thought).clone();
        sink.accept(StepResult::Thought(recorded)).await
    }
}

/// Up to `limit` distinct documents, in the order first retrieved
fn representative_sources(documents: &[RetrievedDocument], limit: usize) -> Vec<RetrievedDocument> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter(|doc| seen.insert(doc.content.as_str()))
        .take(limit)
        .cloned()
        .collect()
}
