//! # Command Layer
//!
//! Every user-visible mutation is an undoable [`Command`]. The
//! [`CommandHistory`] owns the undo/redo stacks; [`CompoundCommand`] groups
//! children under one description and executes them atomically.

use crate::error::GraphError;
use crate::events::Signal;
use crate::graph::Graph;

/// An undoable unit of mutation.
///
/// `execute` must be replayable: after an `undo`, running `execute` again
/// (redo) must restore the exact post-execute state, ids included. Built-in
/// commands achieve this by snapshotting created entities on first run and
/// re-inserting them through the graph's direct paths afterwards.
pub trait Command {
    fn description(&self) -> &str;
    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError>;
    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError>;
}

/// Undo/redo stacks over boxed commands.
///
/// Executing through the history pushes onto undo and clears redo; undo and
/// redo shuttle commands between the two stacks. Every change raises
/// `history_changed`.
pub struct CommandHistory {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_depth: usize,
    pub history_changed: Signal<()>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(50)
    }
}

impl CommandHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
            history_changed: Signal::new(),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the command undo would revert, if any.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Runs a command and records it. A failing command is not recorded and
    /// must leave the graph unchanged (built-in commands do).
    pub fn execute(
        &mut self,
        graph: &mut Graph,
        mut command: Box<dyn Command>,
    ) -> Result<(), GraphError> {
        command.execute(graph)?;
        if self.undo_stack.len() >= self.max_depth {
            self.undo_stack.remove(0); // drop oldest
        }
        self.undo_stack.push(command);
        self.redo_stack.clear();
        self.history_changed.emit(&());
        Ok(())
    }

    /// Reverts the most recent command. `Ok(false)` when there is nothing
    /// to undo. On failure the command is pushed back so the stacks stay
    /// consistent with the graph.
    pub fn undo(&mut self, graph: &mut Graph) -> Result<bool, GraphError> {
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(error) = command.undo(graph) {
            self.undo_stack.push(command);
            return Err(error);
        }
        self.redo_stack.push(command);
        self.history_changed.emit(&());
        Ok(true)
    }

    /// Re-applies the most recently undone command. Mirror of [`Self::undo`].
    pub fn redo(&mut self, graph: &mut Graph) -> Result<bool, GraphError> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(error) = command.execute(graph) {
            self.redo_stack.push(command);
            return Err(error);
        }
        self.undo_stack.push(command);
        self.history_changed.emit(&());
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.history_changed.emit(&());
    }
}

/// Groups child commands under a single description.
///
/// Execution is atomic: when a child fails, every already-executed child is
/// rolled back in reverse before the failure surfaces. Undo replays the
/// children in reverse.
pub struct CompoundCommand {
    description: String,
    children: Vec<Box<dyn Command>>,
}

impl CompoundCommand {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.children.push(command);
    }

    pub fn with(mut self, command: Box<dyn Command>) -> Self {
        self.children.push(command);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for CompoundCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        for index in 0..self.children.len() {
            if let Err(error) = self.children[index].execute(graph) {
                // Roll back what already ran, newest first.
                for executed in self.children[..index].iter_mut().rev() {
                    if let Err(rollback_error) = executed.undo(graph) {
                        tracing::warn!(
                            command = self.description,
                            error = %rollback_error,
                            "rollback of compound child failed"
                        );
                    }
                }
                return Err(error);
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        for child in self.children.iter_mut().rev() {
            child.undo(graph)?;
        }
        Ok(())
    }
}
