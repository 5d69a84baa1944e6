use std::fmt;

use crate::host::HostError;

/// Failure of a render pass. The work-in-progress tree is discarded and the
/// committed tree is left untouched, except for host failures during the
/// commit which may leave the host partially mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Host(HostError),
    ComponentPanicked {
        component: &'static str,
        message: String,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Host(err) => write!(f, "host mutation failed: {err}"),
            RenderError::ComponentPanicked { component, message } => {
                write!(f, "component {component} panicked: {message}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Host(err) => Some(err),
            RenderError::ComponentPanicked { .. } => None,
        }
    }
}

impl From<HostError> for RenderError {
    fn from(err: HostError) -> Self {
        RenderError::Host(err)
    }
}
