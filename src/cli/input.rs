//! Input handler for the chat REPL using rustyline

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// One line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Query(String),
    History,
    Clear,
    Exit,
    Empty,
    Unknown(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ChatInput::Empty;
        }
        match trimmed {
            "/history" => ChatInput::History,
            "/clear" => ChatInput::Clear,
            "/exit" | "/quit" => ChatInput::Exit,
            cmd if cmd.starts_with('/') => ChatInput::Unknown(cmd.to_string()),
            query => ChatInput::Query(query.to_string()),
        }
    }
}

/// Input handler managing readline interface and command history
pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
    prompt: String,
}

impl InputHandler {
    /// Create input handler with persistent history
    ///
    /// History file: ~/.ragbuddy/history
    pub fn new() -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        let history_path = dirs::home_dir().map(|home| home.join(".ragbuddy").join("history"));

        if let Some(path) = &history_path {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }

        Ok(Self {
            editor,
            history_path,
            prompt: ">ragbuddy: ".to_string(),
        })
    }

    /// Read one line of input
    ///
    /// Returns `None` on EOF (Ctrl-D) or interrupt (Ctrl-C)
    pub fn read_line(&mut self) -> Result<Option<ChatInput>> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let input = ChatInput::parse(&line);
                if input != ChatInput::Empty {
                    let _ = self.editor.add_history_entry(line.trim());
                }
                Ok(Some(input))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    /// Save history to disk
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}
