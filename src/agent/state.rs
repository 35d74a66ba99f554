//! Orchestrator state machine
//!
//! Deterministic transition table for one orchestration run:
//! - Safety: invalid transitions are rejected, never silently taken
//! - Liveness: every path ends in Complete or Error
//! - Boundedness: the retrieval loop is counted by the driver, not here

use crate::errors::{RagError, Result};
use serde::{Deserialize, Serialize};

/// Orchestration states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Request accepted, nothing run yet
    Start,

    /// Query is being rewritten for retrieval
    Rewrite,

    /// Deciding whether retrieval is needed
    JudgeNeed,

    /// One retrieval call of the bounded loop
    RetrieveTurn,

    /// Folding the turn's documents into context
    ContextBuild,

    /// Deciding whether to run another retrieval turn
    ContinueDecision,

    /// Generator is producing the answer
    Generate,

    /// Run finished successfully (terminal)
    Complete,

    /// Run aborted (terminal)
    Error,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// Agent mode run started
    Begin,

    /// Simple mode run started (single retrieval pass)
    BeginSimple,

    /// Rewritten query available
    Rewritten,

    /// Judge asked for retrieval
    RetrievalNeeded,

    /// Judge declined retrieval
    RetrievalSkipped,

    /// Retrieval call returned (possibly degraded)
    Retrieved,

    /// Agent mode context assembled
    ContextBuilt,

    /// Simple mode context assembled
    SinglePassDone,

    /// Loop continues with a deeper query
    NextTurn,

    /// Loop finished
    LoopExhausted,

    /// Answer generated
    Generated,

    /// Unrecoverable failure
    Failure,
}

impl AgentState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Complete | AgentState::Error)
    }

    /// Attempt state transition with validation
    ///
    /// Valid transitions:
    /// 1.  Start            → Rewrite          (on: Begin)
    /// 2.  Start            → RetrieveTurn     (on: BeginSimple)
    /// 3.  Rewrite          → JudgeNeed        (on: Rewritten)
    /// 4.  JudgeNeed        → RetrieveTurn     (on: RetrievalNeeded)
    /// 5.  JudgeNeed        → Generate         (on: RetrievalSkipped)
    /// 6.  RetrieveTurn     → ContextBuild     (on: Retrieved)
    /// 7.  ContextBuild     → ContinueDecision (on: ContextBuilt)
    /// 8.  ContextBuild     → Generate         (on: SinglePassDone)
    /// 9.  ContinueDecision → RetrieveTurn     (on: NextTurn)
    /// 10. ContinueDecision → Generate         (on: LoopExhausted)
    /// 11. Generate         → Complete         (on: Generated)
    /// 12. non-terminal     → Error            (on: Failure)
    /// 13. terminal states are self-loops
    pub fn transition(&self, event: StateEvent) -> Result<AgentState> {
        use AgentState::*;
        use StateEvent::*;

        let next_state = match (self, event) {
            (Complete, _) => Complete,
            (Error, _) => Error,

            (_, Failure) => Error,

            (Start, Begin) => Rewrite,
            (Start, BeginSimple) => RetrieveTurn,

            (Rewrite, Rewritten) => JudgeNeed,

            (JudgeNeed, RetrievalNeeded) => RetrieveTurn,
            (JudgeNeed, RetrievalSkipped) => Generate,

            (RetrieveTurn, Retrieved) => ContextBuild,

            (ContextBuild, ContextBuilt) => ContinueDecision,
            (ContextBuild, SinglePassDone) => Generate,

            (ContinueDecision, NextTurn) => RetrieveTurn,
            (ContinueDecision, LoopExhausted) => Generate,

            (Generate, Generated) => Complete,

            (from, event) => {
                return Err(RagError::InvalidTransition {
                    from: format!("{:?}", from),
                    event: format!("{:?}", event),
                });
            }
        };

        Ok(next_state)
    }

    /// Get all valid events from this state
    pub fn valid_events(&self) -> Vec<StateEvent> {
        use AgentState::*;
        use StateEvent::*;

        match self {
            Start => vec![Begin, BeginSimple, Failure],
            Rewrite => vec![Rewritten, Failure],
            JudgeNeed => vec![RetrievalNeeded, RetrievalSkipped, Failure],
            RetrieveTurn => vec![Retrieved, Failure],
            ContextBuild => vec![ContextBuilt, SinglePassDone, Failure],
            ContinueDecision => vec![NextTurn, LoopExhausted, Failure],
            Generate => vec![Generated, Failure],
            Complete | Error => vec![],
        }
    }

    /// Human-readable state name
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentState::Start => "Starting",
            AgentState::Rewrite => "Rewriting Query",
            AgentState::JudgeNeed => "Judging Retrieval Need",
            AgentState::RetrieveTurn => "Retrieving",
            AgentState::ContextBuild => "Building Context",
            AgentState::ContinueDecision => "Deciding Next Turn",
            AgentState::Generate => "Generating",
            AgentState::Complete => "Completed",
            AgentState::Error => "Error",
        }
    }
}
