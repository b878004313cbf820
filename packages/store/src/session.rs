//! Scoped edit transactions.

use std::ops::{Deref, DerefMut};

use crate::{OutputWorkspace, StoreError};

/// An open edit on an [`OutputWorkspace`].
///
/// The edit ends with [`EditSession::commit`] or [`EditSession::rollback`].
/// A session dropped without either (an early `?` return, a panic) rolls
/// the edit back, so a failed phase never leaves the workspace editing.
///
/// The session dereferences to the workspace so writes go through it while
/// it is open.
pub struct EditSession<'a, W: OutputWorkspace> {
    workspace: &'a mut W,
    finished: bool,
}

impl<'a, W: OutputWorkspace> EditSession<'a, W> {
    /// Starts an edit on `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EditInProgress`] if the workspace is already
    /// editing.
    pub fn begin(workspace: &'a mut W) -> Result<Self, StoreError> {
        workspace.begin_edit()?;
        log::debug!("Edit session started");
        Ok(Self {
            workspace,
            finished: false,
        })
    }

    /// Commits the edit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails. The workspace makes a
    /// best-effort rollback in that case.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.finished = true;
        match self.workspace.commit_edit() {
            Ok(()) => {
                log::debug!("Edit session committed");
                Ok(())
            }
            Err(e) => {
                if self.workspace.is_editing() {
                    if let Err(rollback) = self.workspace.rollback_edit() {
                        log::error!("Rollback after failed commit also failed: {rollback}");
                    }
                }
                Err(e)
            }
        }
    }

    /// Discards the edit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rollback fails.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.workspace.rollback_edit()?;
        log::debug!("Edit session rolled back");
        Ok(())
    }
}

impl<W: OutputWorkspace> Deref for EditSession<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.workspace
    }
}

impl<W: OutputWorkspace> DerefMut for EditSession<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.workspace
    }
}

impl<W: OutputWorkspace> Drop for EditSession<'_, W> {
    fn drop(&mut self) {
        if self.finished || !self.workspace.is_editing() {
            return;
        }

        log::warn!("Edit session dropped without commit, rolling back");
        if let Err(e) = self.workspace.rollback_edit() {
            log::error!("Failed to roll back edit session: {e}");
        }
    }
}
