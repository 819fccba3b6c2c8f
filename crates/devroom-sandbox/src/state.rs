//! Run lifecycle states
//!
//! `run()` may restart the pipeline from any state and `kill()` may stop
//! it from any state, so every state admits `Mounting` and `Stopped`; the
//! rest of the table is the forward pipeline order.

/// State of the current (or last) sandbox run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// No run attempted yet
    Idle,
    /// Mounting the file tree into the sandbox
    Mounting,
    /// Install command spawned, awaiting its exit code
    Installing,
    /// Server command spawned, awaiting the readiness signal
    Starting,
    /// Server ready, preview reachable at the URL
    Running(String),
    /// Killed or torn down
    Stopped,
    /// Pipeline aborted, reason captured for display
    Failed(String),
}

impl RunState {
    /// Whether a process tree may be alive in this state
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Mounting | Self::Installing | Self::Starting | Self::Running(_)
        )
    }

    /// Preview URL when running
    #[inline]
    #[must_use]
    pub fn preview_url(&self) -> Option<&str> {
        match self {
            Self::Running(url) => Some(url),
            _ => None,
        }
    }

    /// Captured failure reason
    #[inline]
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Mounting => write!(f, "mounting"),
            Self::Installing => write!(f, "installing"),
            Self::Starting => write!(f, "starting"),
            Self::Running(url) => write!(f, "running at {url}"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Illegal lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The transition is not in the table
    #[error("illegal run state transition: {from} -> {to}")]
    IllegalTransition {
        /// Source state
        from: String,
        /// Target state
        to: String,
    },
}

/// Validate a lifecycle transition.
pub fn validate_transition(from: &RunState, to: &RunState) -> Result<(), StateError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn allowed(from: &RunState, to: &RunState) -> bool {
    use RunState::*;
    // Restart and kill are legal everywhere.
    if matches!(to, Mounting | Stopped) {
        return true;
    }
    match from {
        Mounting => matches!(to, Installing | Starting | Failed(_)),
        Installing => matches!(to, Starting | Failed(_)),
        Starting => matches!(to, Running(_) | Failed(_)),
        Running(_) => matches!(to, Failed(_)),
        Idle | Stopped | Failed(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_pipeline_is_legal() {
        let url = RunState::Running("http://localhost:3000".to_owned());
        validate_transition(&RunState::Idle, &RunState::Mounting).unwrap();
        validate_transition(&RunState::Mounting, &RunState::Installing).unwrap();
        validate_transition(&RunState::Installing, &RunState::Starting).unwrap();
        validate_transition(&RunState::Starting, &url).unwrap();
    }

    #[test]
    fn install_may_be_skipped() {
        // No package.json: mount goes straight to starting.
        validate_transition(&RunState::Mounting, &RunState::Starting).unwrap();
    }

    #[test]
    fn restart_and_kill_from_anywhere() {
        let states = [
            RunState::Idle,
            RunState::Mounting,
            RunState::Installing,
            RunState::Starting,
            RunState::Running("u".to_owned()),
            RunState::Stopped,
            RunState::Failed("r".to_owned()),
        ];
        for state in &states {
            validate_transition(state, &RunState::Mounting).unwrap();
            validate_transition(state, &RunState::Stopped).unwrap();
        }
    }

    #[test]
    fn terminal_states_do_not_progress() {
        assert!(validate_transition(&RunState::Stopped, &RunState::Installing).is_err());
        assert!(
            validate_transition(&RunState::Failed("r".to_owned()), &RunState::Starting).is_err()
        );
        assert!(validate_transition(
            &RunState::Idle,
            &RunState::Running("u".to_owned())
        )
        .is_err());
    }

    #[test]
    fn accessors() {
        assert!(RunState::Running("u".to_owned()).is_live());
        assert!(!RunState::Stopped.is_live());
        assert_eq!(
            RunState::Running("u".to_owned()).preview_url(),
            Some("u")
        );
        assert_eq!(
            RunState::Failed("install failed".to_owned()).failure(),
            Some("install failed")
        );
    }
}
