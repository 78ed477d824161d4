use std::time::Duration;

/// History settings, passed to [`crate::History::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of undo events (0 = unlimited)
    pub depth: usize,

    /// Changes further apart than this start a new event
    pub new_group_delay: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            depth: 100,
            new_group_delay: Duration::from_millis(500),
        }
    }
}

/// How a recorded change relates to the undo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryMeta {
    /// Whether the change can be undone. Untracked changes only shift the
    /// stored steps.
    pub add_to_history: bool,

    /// Start a new event even when the change would otherwise be grouped
    /// with the previous one.
    pub new_group: bool,

    /// The change came from another collaborator.
    pub remote: bool,
}

impl HistoryMeta {
    /// A user edit.
    pub fn local() -> Self {
        Self {
            add_to_history: true,
            new_group: false,
            remote: false,
        }
    }

    /// A change received from a collaborator.
    pub fn remote() -> Self {
        Self {
            add_to_history: false,
            new_group: false,
            remote: true,
        }
    }

    /// A local change that should not be undoable.
    pub fn untracked() -> Self {
        Self {
            add_to_history: false,
            ..Self::local()
        }
    }

    /// Force this change into its own event.
    pub fn separate(mut self) -> Self {
        self.new_group = true;
        self
    }

    pub(crate) fn tracked(&self) -> bool {
        self.add_to_history && !self.remote
    }
}

impl Default for HistoryMeta {
    fn default() -> Self {
        Self::local()
    }
}
