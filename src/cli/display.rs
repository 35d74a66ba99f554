//! Terminal rendering for answers, thoughts and search results

use colored::*;
use std::io::{self, Write};

use crate::backends::CollectionSummary;
use crate::cli::Verbosity;
use crate::events::StreamEvent;
use crate::rag::RetrievalOutcome;
use crate::types::{AgentThought, ChatResponse, Role, Turn};

/// Display manager for CLI output
pub struct DisplayManager {
    verbosity: Verbosity,
    /// A chunk was printed without a trailing newline
    mid_answer: bool,
}

impl DisplayManager {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            mid_answer: false,
        }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, model: &str) {
        let width = 64;
        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", format!("  RagBuddy {} - Document Chat", version).bold().cyan());
        println!("{}", format!("  Model: {}", model).dimmed());
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Ask a question (or {} / {}, {} to quit)\n",
            "/history".green(),
            "/clear".green(),
            "/exit".green()
        );
    }

    /// Render one stream event as it arrives
    pub fn render_event(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Thought(thought) => self.show_thought(thought),
            StreamEvent::Chunk { text } => {
                if !self.mid_answer {
                    println!();
                    self.mid_answer = true;
                }
                print!("{}", text);
                let _ = io::stdout().flush();
            }
            StreamEvent::Complete {
                conversation_id,
                elapsed_time,
                ..
            } => {
                self.end_answer();
                if self.verbosity.show_thoughts() {
                    println!(
                        "\n{} {} | {}",
                        "✓".green().bold(),
                        format!("{:.1}s", elapsed_time).dimmed(),
                        conversation_id.dimmed()
                    );
                }
            }
            StreamEvent::Source {
                index,
                content,
                metadata,
                ..
            } => {
                if self.verbosity.show_thoughts() {
                    let source = metadata
                        .get("source")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    println!("  {}. {}", index.to_string().cyan(), source);
                    if self.verbosity.show_details() {
                        println!("     {}", content.dimmed());
                    }
                }
            }
            StreamEvent::ThoughtsSummary { count, .. } => {
                if self.verbosity.show_details() {
                    println!("{}", format!("{} thoughts recorded", count).dimmed());
                }
            }
            StreamEvent::Error { message, .. } => {
                self.end_answer();
                self.show_error(message);
            }
            StreamEvent::Done => self.end_answer(),
        }
    }

    /// Show a thought trail entry
    pub fn show_thought(&self, thought: &AgentThought) {
        if !self.verbosity.show_thoughts() {
            return;
        }
        println!("{} {} {}", "→".cyan(), thought.step.to_string().dimmed(), thought.narrative);
        if self.verbosity.show_details() {
            if let Some(result) = &thought.result {
                println!("    {}", result.dimmed());
            }
        }
    }

    /// Show an aggregate (non-streamed) response
    pub fn show_response(&mut self, response: &ChatResponse) {
        for thought in &response.thought_trail {
            self.show_thought(thought);
        }
        println!("\n{}", response.answer);
        let events: Vec<StreamEvent> = response
            .sources
            .iter()
            .enumerate()
            .map(|(i, doc)| StreamEvent::source(i + 1, doc))
            .collect();
        if !events.is_empty() && self.verbosity.show_thoughts() {
            self.show_section("Sources");
        }
        for event in &events {
            self.render_event(event);
        }
        if self.verbosity.show_thoughts() {
            println!(
                "\n{} {} | {}",
                "✓".green().bold(),
                format!("{:.1}s", response.elapsed_time).dimmed(),
                response.conversation_id.dimmed()
            );
        }
    }

    /// Show search results
    pub fn show_search(&self, outcome: &RetrievalOutcome) {
        for warning in &outcome.warnings {
            self.show_warning(warning);
        }
        if outcome.documents.is_empty() {
            self.show_info("no documents found");
            return;
        }
        for (i, doc) in outcome.documents.iter().enumerate() {
            let score = match doc.rerank_score {
                Some(rerank) => format!(
                    "vector {:.3} | rerank {:.3} | combined {:.3}",
                    doc.vector_score,
                    rerank,
                    doc.rank_score()
                ),
                None => format!("vector {:.3}", doc.vector_score),
            };
            println!(
                "\n{}. {} {}",
                (i + 1).to_string().cyan(),
                doc.source().unwrap_or("unknown").bold(),
                score.dimmed()
            );
            println!("{}", doc.content);
        }
    }

    /// Show collection size and status
    pub fn show_collection(&self, summary: &CollectionSummary) {
        let status = match summary.status.as_str() {
            "green" => summary.status.green(),
            "yellow" | "grey" => summary.status.yellow(),
            "red" => summary.status.red(),
            _ => summary.status.dimmed(),
        };
        self.show_section(&format!("Collection {}", summary.name));
        println!("{:<12} {}", "Status", status);
        println!("{:<12} {}", "Points", summary.points_count);
        println!("{:<12} {}", "Segments", summary.segments_count);
        if summary.is_empty() {
            self.show_warning("no documents ingested yet");
        }
    }

    /// Show conversation history
    pub fn show_history(&self, turns: &[Turn]) {
        for turn in turns {
            let role = match turn.role {
                Role::User => "user".green().bold(),
                Role::Assistant => "assistant".cyan().bold(),
                Role::System => "system".dimmed(),
            };
            println!(
                "{} {} {}",
                turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
                role,
                turn.content
            );
        }
    }

    /// Show section header
    pub fn show_section(&self, title: &str) {
        println!("\n{}", title.bold().cyan());
        println!("{}", "-".repeat(60).cyan());
    }

    /// Display error message
    pub fn show_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error.red());
    }

    /// Display warning message
    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    /// Display info message
    pub fn show_info(&self, info: &str) {
        if self.verbosity.show_thoughts() {
            println!("{} {}", "Info:".cyan(), info);
        }
    }

    fn end_answer(&mut self) {
        if self.mid_answer {
            println!();
            self.mid_answer = false;
        }
    }
}
