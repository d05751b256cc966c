use log::warn;

use super::{CommandContext, CommandResult};
use crate::artifact::{Artifact, ArtifactId};
use crate::event::SessionEvent;
use crate::geometry::Polygon;

/// Fully computed store changes. Each command carries both sides of the
/// change, so its inverse needs no lookups and redo reproduces the same ids
/// and colours.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddArtifact(Artifact),

    DeleteArtifact(Artifact),

    ModifyGeometry {
        id: ArtifactId,
        old: Polygon,
        new: Polygon,
    },

    /// Erase results: `removed` leave the store, `added` take their place
    ReplaceArtifacts {
        removed: Vec<Artifact>,
        added: Vec<Artifact>,
    },

    /// `None` means the key is absent
    ModifyAttribute {
        id: ArtifactId,
        key: String,
        old: Option<String>,
        new: Option<String>,
    },

    /// Several commands applied, and undone, as one step
    Batch(Vec<Command>),
}

impl Command {
    /// Execute the command with the given context
    pub fn execute(&self, ctx: &mut CommandContext<'_>) -> CommandResult {
        match self {
            Command::AddArtifact(artifact) => {
                ctx.store.insert_artifact(artifact.clone())?;
                ctx.event_bus.emit(SessionEvent::ArtifactAdded(artifact.id()));
                Ok(())
            }

            Command::DeleteArtifact(artifact) => {
                ctx.store.remove(artifact.id())?;
                ctx.event_bus.emit(SessionEvent::ArtifactRemoved(artifact.id()));
                Ok(())
            }

            Command::ModifyGeometry { id, new, .. } => {
                ctx.store.replace(*id, new.clone())?;
                ctx.event_bus.emit(SessionEvent::ArtifactReplaced(*id));
                Ok(())
            }

            Command::ReplaceArtifacts { removed, added } => {
                let steps = removed
                    .iter()
                    .cloned()
                    .map(Command::DeleteArtifact)
                    .chain(added.iter().cloned().map(Command::AddArtifact))
                    .collect();
                Command::Batch(steps).execute(ctx)
            }

            Command::ModifyAttribute { id, key, new, .. } => {
                match new {
                    Some(value) => ctx.store.set_attribute(*id, key.clone(), value.clone())?,
                    None => ctx.store.remove_attribute(*id, key)?,
                };
                ctx.event_bus.emit(SessionEvent::AttributesChanged(*id));
                Ok(())
            }

            Command::Batch(commands) => {
                for (done, command) in commands.iter().enumerate() {
                    if let Err(e) = command.execute(ctx) {
                        // Roll back what already ran so the batch stays atomic
                        for executed in commands[..done].iter().rev() {
                            if let Err(rollback) = executed.inverse().execute(ctx) {
                                warn!("rollback of {} failed: {}", executed.name(), rollback);
                            }
                        }
                        return Err(e);
                    }
                }
                Ok(())
            }
        }
    }

    /// Create the inverse command for undo operations
    pub fn inverse(&self) -> Command {
        match self {
            Command::AddArtifact(artifact) => Command::DeleteArtifact(artifact.clone()),

            Command::DeleteArtifact(artifact) => Command::AddArtifact(artifact.clone()),

            Command::ModifyGeometry { id, old, new } => Command::ModifyGeometry {
                id: *id,
                old: new.clone(),
                new: old.clone(),
            },

            Command::ReplaceArtifacts { removed, added } => Command::ReplaceArtifacts {
                removed: added.clone(),
                added: removed.clone(),
            },

            Command::ModifyAttribute { id, key, old, new } => Command::ModifyAttribute {
                id: *id,
                key: key.clone(),
                old: new.clone(),
                new: old.clone(),
            },

            Command::Batch(commands) => Command::Batch(commands.iter().rev().map(Command::inverse).collect()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::AddArtifact(_) => "AddArtifact",
            Command::DeleteArtifact(_) => "DeleteArtifact",
            Command::ModifyGeometry { .. } => "ModifyGeometry",
            Command::ReplaceArtifacts { .. } => "ReplaceArtifacts",
            Command::ModifyAttribute { .. } => "ModifyAttribute",
            Command::Batch(_) => "Batch",
        }
    }
}
