//! Integration tests for the orchestration pipeline
//!
//! Drives the full state machine with deterministic collaborator stubs;
//! no Ollama or Qdrant required.

mod common;

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use common::{hit, orchestrator, StubGenerator, StubSearch, ANSWER, DEEPER};
use ragbuddy::types::{Turn, ThoughtStep};
use ragbuddy::{ChatRequest, RagError, StreamEvent};

fn steps_of(trail: &[ragbuddy::types::AgentThought]) -> Vec<ThoughtStep> {
    trail.iter().map(|t| t.step).collect()
}

fn is_retrieval_step(step: &ThoughtStep) -> bool {
    matches!(
        step,
        ThoughtStep::SimpleRetrieval | ThoughtStep::RetrievalTurn(_) | ThoughtStep::RetrievalWarning
    )
}

#[tokio::test]
async fn test_agent_run_with_rich_context_takes_one_turn() {
    let search = StubSearch::sized(5, 500);
    let generator = StubGenerator::answering(ANSWER);
    let orch = orchestrator(search.clone(), generator.clone());

    let response = orch
        .process(ChatRequest::new("How does chunking work?"))
        .await
        .unwrap();

    assert_eq!(response.answer, ANSWER);
    assert!(response.conversation_id.starts_with("conv_"));
    assert_eq!(
        steps_of(&response.thought_trail),
        vec![
            ThoughtStep::Start,
            ThoughtStep::QueryRewrite,
            ThoughtStep::RetrievalJudgment,
            ThoughtStep::RetrievalTurn(1),
            ThoughtStep::ContextBuilding,
            ThoughtStep::Generation,
            ThoughtStep::Complete,
        ]
    );
    assert_eq!(search.calls(), 1);
    assert_eq!(search.queries.lock().unwrap()[0], "How does chunking work");
    assert_eq!(response.sources.len(), 5);
    assert!(response.elapsed_time >= 0.0);

    let prompts = generator.prompts.lock().unwrap();
    let system = prompts[0].system_prompt.as_deref().unwrap();
    assert!(system.contains("Source 1: doc0.pdf (page: 1)"));
    assert!(system.contains("[doc 1 - doc0.pdf]"));
}

#[tokio::test]
async fn test_thin_context_runs_every_turn_with_deeper_queries() {
    let search = StubSearch::sized(2, 50);
    let generator = StubGenerator::answering(ANSWER);
    let orch = orchestrator(search.clone(), generator.clone());

    let response = orch
        .process(ChatRequest::new("explain the indexing method"))
        .await
        .unwrap();

    let turns = response
        .thought_trail
        .iter()
        .filter(|t| matches!(t.step, ThoughtStep::RetrievalTurn(_)))
        .count();
    assert_eq!(turns, 3);
    assert_eq!(search.calls(), 3);

    let deepenings = response
        .thought_trail
        .iter()
        .filter(|t| t.step == ThoughtStep::QueryDeepening)
        .count();
    assert_eq!(deepenings, 2);

    let queries = search.queries.lock().unwrap();
    assert_eq!(queries[1], DEEPER);
    assert_eq!(queries[2], DEEPER);

    // Same two documents each turn; sources are distinct
    assert_eq!(response.sources.len(), 2);
}

fn retrieval_turns(trail: &[ragbuddy::types::AgentThought]) -> usize {
    trail
        .iter()
        .filter(|t| matches!(t.step, ThoughtStep::RetrievalTurn(_)))
        .count()
}

#[tokio::test]
async fn test_context_of_exactly_threshold_stops_loop() {
    // "[doc 1 - s]: " is 13 characters; 13 + 500 + 2 + 13 + 472 = 1000
    let search = StubSearch::with_hits(vec![
        hit(&"a".repeat(500), "s", 0.9),
        hit(&"b".repeat(472), "s", 0.8),
    ]);
    let orch = orchestrator(search.clone(), StubGenerator::answering(ANSWER));

    let response = orch.process(ChatRequest::new("How does chunking work?")).await.unwrap();

    assert_eq!(retrieval_turns(&response.thought_trail), 1);
    assert_eq!(search.calls(), 1);
}

#[tokio::test]
async fn test_context_one_below_threshold_keeps_looping() {
    let search = StubSearch::with_hits(vec![
        hit(&"a".repeat(500), "s", 0.9),
        hit(&"b".repeat(471), "s", 0.8),
    ]);
    let orch = orchestrator(search.clone(), StubGenerator::answering(ANSWER));

    let response = orch.process(ChatRequest::new("How does chunking work?")).await.unwrap();

    assert_eq!(retrieval_turns(&response.thought_trail), 3);
    assert_eq!(search.calls(), 3);
}

#[tokio::test]
async fn test_cited_sources_match_final_context() {
    let search = StubSearch::stepped(vec![
        vec![hit("alpha fragment", "first.pdf", 0.9)],
        vec![hit("beta fragment", "second.pdf", 0.9)],
        vec![hit("gamma fragment", "third.pdf", 0.9)],
    ]);
    let generator = StubGenerator::answering(ANSWER);
    let orch = orchestrator(search.clone(), generator.clone());

    let response = orch.process(ChatRequest::new("How does chunking work?")).await.unwrap();
    assert_eq!(search.calls(), 3);

    let prompts = generator.prompts.lock().unwrap();
    let system = prompts.last().unwrap().system_prompt.as_deref().unwrap();
    assert!(system.contains("[doc 1 - third.pdf]: gamma fragment"));
    assert!(system.contains("Source 1: third.pdf (page: 1)"));
    assert!(!system.contains("first.pdf"));

    // Response sources still cover every turn
    let sources: Vec<&str> = response.sources.iter().filter_map(|d| d.source()).collect();
    assert_eq!(sources, vec!["first.pdf", "second.pdf", "third.pdf"]);
}

#[tokio::test]
async fn test_turns_never_exceed_configured_maximum() {
    let search = StubSearch::empty();
    let orch = orchestrator(search.clone(), StubGenerator::answering(ANSWER));
    let mut config = orch.config().clone();
    config.max_turns = 2;
    let orch = orch.with_config(config);

    let response = orch.process(ChatRequest::new("why is the sky blue")).await.unwrap();

    assert_eq!(search.calls(), 2);
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn test_judge_skips_retrieval() {
    let search = StubSearch::sized(3, 100);
    let orch = orchestrator(search.clone(), StubGenerator::answering("Hi!"));

    let response = orch.process(ChatRequest::new("hello there")).await.unwrap();

    assert_eq!(
        steps_of(&response.thought_trail),
        vec![
            ThoughtStep::Start,
            ThoughtStep::QueryRewrite,
            ThoughtStep::RetrievalJudgment,
            ThoughtStep::Generation,
            ThoughtStep::Complete,
        ]
    );
    assert_eq!(search.calls(), 0);
    assert!(response.sources.is_empty());
    let judgment = &response.thought_trail[2];
    assert!(judgment.result.as_deref().unwrap().starts_with("retrieval not needed"));
}

#[tokio::test]
async fn test_simple_mode_greeting_without_documents() {
    let search = StubSearch::empty();
    let orch = orchestrator(search.clone(), StubGenerator::answering("你好！"));

    let response = orch
        .process(ChatRequest::new("你好").simple())
        .await
        .unwrap();

    assert!(response.sources.is_empty());
    let retrieval_thoughts = response
        .thought_trail
        .iter()
        .filter(|t| is_retrieval_step(&t.step))
        .count();
    assert_eq!(retrieval_thoughts, 1);
    assert!(!response.thought_trail.iter().any(|t| t.step == ThoughtStep::Error));
    assert_eq!(
        response.thought_trail.last().map(|t| t.step),
        Some(ThoughtStep::Complete)
    );
    assert_eq!(search.calls(), 1);
    assert_eq!(search.queries.lock().unwrap()[0], "你好");
}

#[tokio::test]
async fn test_retrieval_unavailable_degrades_to_generation() {
    let search = StubSearch::unavailable();
    let generator = StubGenerator::answering(ANSWER);
    let orch = orchestrator(search, generator.clone());

    let response = orch
        .process(ChatRequest::new("what is a vector store"))
        .await
        .unwrap();

    assert_eq!(response.answer, ANSWER);
    assert!(response.sources.is_empty());
    let steps = steps_of(&response.thought_trail);
    assert!(steps.contains(&ThoughtStep::RetrievalWarning));
    assert!(steps.contains(&ThoughtStep::Generation));
    assert!(!steps.contains(&ThoughtStep::Error));

    let warning = response
        .thought_trail
        .iter()
        .find(|t| t.step == ThoughtStep::RetrievalWarning)
        .unwrap();
    assert!(warning.result.as_deref().unwrap().contains("connection refused"));

    // Generation ran with the no-context system prompt
    let prompts = generator.prompts.lock().unwrap();
    let last = prompts.last().unwrap();
    assert!(!last.system_prompt.as_deref().unwrap().contains("Sources:"));
}

#[tokio::test]
async fn test_generation_failure_ends_in_error_without_persisting() {
    let orch = orchestrator(StubSearch::sized(3, 500), StubGenerator::failing());

    let result = orch
        .process(ChatRequest::new("how do embeddings work").with_conversation("conv_failtest"))
        .await;

    match result {
        Err(RagError::RunFailed(failure)) => {
            assert!(failure.error.contains("model crashed"));
            assert_eq!(failure.conversation_id, "conv_failtest");
            let last = failure.thought_trail.last().unwrap();
            assert_eq!(last.step, ThoughtStep::Error);
            assert!(last.result.as_deref().unwrap().contains("model crashed"));
            assert!(failure
                .thought_trail
                .iter()
                .any(|t| t.step == ThoughtStep::Generation));
        }
        other => panic!("expected RunFailed, got {:?}", other.map(|r| r.answer)),
    }

    assert!(matches!(
        orch.conversation("conv_failtest"),
        Err(RagError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_deeper_query_is_not_fatal() {
    // Generation fails everywhere, so the loop falls back to the original
    // query; the run still fails, but only at the Generate step.
    let search = StubSearch::empty();
    let orch = orchestrator(search.clone(), StubGenerator::failing());

    let result = orch.process(ChatRequest::new("how does it work")).await;

    let failure = match result {
        Err(RagError::RunFailed(failure)) => failure,
        other => panic!("expected RunFailed, got {:?}", other.map(|r| r.answer)),
    };
    assert_eq!(search.calls(), 3);
    assert!(search
        .queries
        .lock()
        .unwrap()
        .iter()
        .all(|q| q == "how does it work"));
    let deepenings = failure
        .thought_trail
        .iter()
        .filter(|t| t.step == ThoughtStep::QueryDeepening)
        .count();
    assert_eq!(deepenings, 2);
}

#[tokio::test]
async fn test_identical_runs_produce_identical_steps() {
    let orch = orchestrator(StubSearch::sized(2, 80), StubGenerator::answering(ANSWER));

    let first = orch.process(ChatRequest::new("what is reranking")).await.unwrap();
    let second = orch.process(ChatRequest::new("what is reranking")).await.unwrap();

    assert_ne!(first.conversation_id, second.conversation_id);
    assert_eq!(steps_of(&first.thought_trail), steps_of(&second.thought_trail));
    assert_eq!(first.answer, second.answer);
}

#[tokio::test]
async fn test_completed_run_appends_both_turns_and_seeds_history() {
    let generator = StubGenerator::answering(ANSWER);
    let orch = orchestrator(StubSearch::sized(3, 500), generator.clone());

    let first = orch
        .process(ChatRequest::new("how are documents chunked"))
        .await
        .unwrap();

    let turns = orch.conversation(&first.conversation_id).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "how are documents chunked");
    assert_eq!(turns[1].content, ANSWER);
    assert!(turns[0].timestamp <= turns[1].timestamp);

    orch.process(ChatRequest::new("and why that size").with_conversation(first.conversation_id.as_str()))
        .await
        .unwrap();

    let prompts = generator.prompts.lock().unwrap();
    let last = &prompts.last().unwrap().prompt;
    assert!(last.contains("Conversation history"));
    assert!(last.contains("how are documents chunked"));
    assert!(last.contains("Current question: and why that size"));
    drop(prompts);

    assert_eq!(orch.conversation(&first.conversation_id).unwrap().len(), 4);
}

#[tokio::test]
async fn test_explicit_history_wins_over_store() {
    let generator = StubGenerator::answering(ANSWER);
    let orch = orchestrator(StubSearch::empty(), generator.clone());

    orch.process(
        ChatRequest::new("hello")
            .with_conversation("conv_hist")
            .with_history(vec![Turn::user("earlier question"), Turn::assistant("earlier answer")]),
    )
    .await
    .unwrap();

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].prompt.contains("earlier question"));
}

#[tokio::test]
async fn test_delete_conversation() {
    let orch = orchestrator(StubSearch::empty(), StubGenerator::answering("ok"));
    let response = orch.process(ChatRequest::new("hello")).await.unwrap();

    orch.delete_conversation(&response.conversation_id).unwrap();
    assert!(matches!(
        orch.conversation(&response.conversation_id),
        Err(RagError::NotFound(_))
    ));
    assert!(matches!(
        orch.delete_conversation(&response.conversation_id),
        Err(RagError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_validation_rejects_empty_query() {
    let orch = Arc::new(orchestrator(StubSearch::empty(), StubGenerator::answering("ok")));

    assert!(matches!(
        orch.process(ChatRequest::new("  ")).await,
        Err(RagError::Validation(_))
    ));
    assert!(matches!(orch.stream(ChatRequest::new("")), Err(RagError::Validation(_))));
    assert!(matches!(orch.search("", 5).await, Err(RagError::Validation(_))));
}

#[tokio::test]
async fn test_stream_matches_batch() {
    let orch = Arc::new(orchestrator(StubSearch::sized(4, 120), StubGenerator::answering(ANSWER)));

    let batch = orch
        .process(ChatRequest::new("how is the index built"))
        .await
        .unwrap();

    let events: Vec<StreamEvent> = orch
        .stream(ChatRequest::new("how is the index built"))
        .unwrap()
        .collect()
        .await;

    let streamed_thoughts: Vec<ThoughtStep> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Thought(t) => Some(t.step),
            _ => None,
        })
        .collect();
    assert_eq!(streamed_thoughts, steps_of(&batch.thought_trail));

    let chunks: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Chunk { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, batch.answer);

    let complete_answer = events.iter().find_map(|e| match e {
        StreamEvent::Complete { answer, .. } => Some(answer.clone()),
        _ => None,
    });
    assert_eq!(complete_answer.as_deref(), Some(ANSWER));

    let summary = events.iter().find_map(|e| match e {
        StreamEvent::ThoughtsSummary { count, thoughts } => Some((*count, steps_of(thoughts))),
        _ => None,
    });
    let (count, summary_steps) = summary.unwrap();
    assert_eq!(count, batch.thought_trail.len());
    assert_eq!(summary_steps, steps_of(&batch.thought_trail));

    let sources = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Source { .. }))
        .count();
    assert_eq!(sources, batch.sources.len());

    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}

#[tokio::test]
async fn test_stream_event_order() {
    let orch = Arc::new(orchestrator(StubSearch::sized(1, 10), StubGenerator::answering("a b")));

    let tags: Vec<&'static str> = orch
        .stream(ChatRequest::new("hello").simple())
        .unwrap()
        .map(|e| e.tag())
        .collect()
        .await;

    assert_eq!(
        tags,
        vec![
            "thought", // start
            "thought", // simple_retrieval
            "thought", // generation
            "chunk",
            "chunk",
            "thought", // complete
            "complete",
            "source",
            "thoughtsSummary",
            "done",
        ]
    );
}

#[tokio::test]
async fn test_stream_generation_failure_emits_error_then_done() {
    let orch = Arc::new(orchestrator(StubSearch::empty(), StubGenerator::failing()));

    let events: Vec<StreamEvent> = orch
        .stream(ChatRequest::new("hello").with_conversation("conv_streamfail"))
        .unwrap()
        .collect()
        .await;

    let n = events.len();
    assert!(n >= 2);
    match &events[n - 2] {
        StreamEvent::Error {
            message,
            conversation_id,
            thoughts,
        } => {
            assert!(message.contains("model crashed"));
            assert_eq!(conversation_id, "conv_streamfail");
            assert_eq!(thoughts.last().map(|t| t.step), Some(ThoughtStep::Error));
        }
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(matches!(events[n - 1], StreamEvent::Done));
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Complete { .. })));
    assert!(orch.conversation("conv_streamfail").is_err());
}

#[tokio::test]
async fn test_dropping_stream_cancels_run() {
    let answer = "w ".repeat(200);
    let generator = StubGenerator::slow(&answer, Duration::from_millis(5));
    let orch = Arc::new(orchestrator(StubSearch::empty(), generator.clone()));

    let mut events = orch
        .stream(ChatRequest::new("hello").with_conversation("conv_cancel"))
        .unwrap();

    while let Some(event) = events.next().await {
        if matches!(event, StreamEvent::Chunk { .. }) {
            break;
        }
    }
    drop(events);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_drop = generator.produced();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(generator.produced(), after_drop, "generation kept running after cancel");
    assert!(after_drop < 200);
    assert!(orch.conversation("conv_cancel").is_err());
}

#[tokio::test]
async fn test_search_operation() {
    let orch = orchestrator(StubSearch::sized(8, 20), StubGenerator::answering("unused"));

    let outcome = orch.search("vectors", 3).await.unwrap();
    assert_eq!(outcome.documents.len(), 3);
    assert!(outcome.warnings.is_empty());

    let orch = orchestrator(StubSearch::unavailable(), StubGenerator::answering("unused"));
    let outcome = orch.search("vectors", 3).await.unwrap();
    assert!(outcome.documents.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
}
