// Prompt construction for the generation step
use crate::rag::context::{truncate_chars, AssembledContext, UNKNOWN_SOURCE};
use crate::types::{RetrievedDocument, Turn};

/// Sources listed in the system prompt
const CITED_SOURCES: usize = 3;

/// Context characters shown to the deeper-query generator
const DEEPER_QUERY_CONTEXT_CHARS: usize = 1000;

/// System prompt: answer strictly from context, cite sources by index,
/// and say "unknown" when the context is insufficient
pub fn system_prompt(context: &AssembledContext, documents: &[RetrievedDocument]) -> String {
    if context.is_empty() {
        return "You are a helpful AI assistant. Answer professionally and accurately. \
                If you do not know the answer, say \"unknown\" instead of guessing."
            .to_string();
    }

    let sources: Vec<String> = documents
        .iter()
        .take(CITED_SOURCES)
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Source {}: {} (page: {})",
                i + 1,
                doc.source().unwrap_or(UNKNOWN_SOURCE),
                doc.page().unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
            )
        })
        .collect();

    format!(
        r#"You are a document-grounded assistant. Answer strictly from the context below.

Context:
{}

Sources:
{}

Rules:
1. Use only the context; do not invent facts.
2. If the context does not contain the answer, say "unknown".
3. Cite sources by index (e.g. "according to Source 1").
4. Be accurate and concise."#,
        context.text,
        sources.join("\n")
    )
}

/// User prompt folding in the most recent history turns
pub fn user_prompt(query: &str, context: &AssembledContext, history: &[Turn], history_turns: usize) -> String {
    if history.is_empty() || history_turns == 0 {
        return format!("Question: {}", query);
    }

    let start = history.len().saturating_sub(history_turns);
    let conversation: Vec<String> = history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect();

    let instruction = if context.is_empty() {
        "Please answer the question."
    } else {
        "Please answer the question from the context."
    };

    format!(
        "Conversation history:\n{}\n\nCurrent question: {}\n\n{}",
        conversation.join("\n"),
        query,
        instruction
    )
}

/// Prompt asking the generator for a more specific follow-up query
pub fn deeper_query_prompt(original_query: &str, context: &AssembledContext) -> String {
    format!(
        "Based on the original query and the context gathered so far, write one deeper, \
         more specific search query that would retrieve additional relevant information.\n\n\
         Original query: {}\n\
         Context so far: {}...\n\n\
         Reply with the new query only.",
        original_query,
        truncate_chars(&context.text, DEEPER_QUERY_CONTEXT_CHARS)
    )
}
