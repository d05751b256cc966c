use log::debug;

use super::{Command, CommandContext, CommandResult};
use crate::error::EngineResult;

/// Manages the history of executed commands for undo/redo functionality
#[derive(Debug, Default)]
pub struct CommandHistory {
    /// Stack of commands that can be undone
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone
    redo_stack: Vec<Command>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a command and add it to the history if successful
    pub fn execute(&mut self, command: Command, ctx: &mut CommandContext<'_>) -> CommandResult {
        command.execute(ctx)?;
        debug!("executed {}", command.name());
        self.undo_stack.push(command);
        // A new edit invalidates everything that was undone
        self.redo_stack.clear();
        Ok(())
    }

    /// Undo the last executed command. Returns false when there is nothing
    /// to undo. A failed inverse leaves the command on the undo stack.
    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> EngineResult<bool> {
        let Some(command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.inverse().execute(ctx) {
            self.undo_stack.push(command);
            return Err(e);
        }
        debug!("undid {}", command.name());
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Redo the last undone command
    pub fn redo(&mut self, ctx: &mut CommandContext<'_>) -> EngineResult<bool> {
        let Some(command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.execute(ctx) {
            self.redo_stack.push(command);
            return Err(e);
        }
        debug!("redid {}", command.name());
        self.undo_stack.push(command);
        Ok(true)
    }

    /// Returns true if there are commands that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are commands that can be redone
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear the command history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
