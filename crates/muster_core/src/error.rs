//! Error types for the simulation core.

use thiserror::Error;

use crate::ecs::EntityId;
use crate::math::Vec2Fixed;
use crate::navigation::PathStatus;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for the simulation core.
///
/// Configuration errors (unbound components, install ordering) are
/// programming mistakes surfaced at setup time. `PathUnavailable` is the only
/// error expected during normal play.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A component type was requested that was never bound to the world.
    #[error("Component type `{component}` is not bound{}", requested_by(.system))]
    UnboundComponent {
        /// Type name of the missing component.
        component: &'static str,
        /// System that requested it, if the request came from install.
        system: Option<&'static str>,
    },

    /// The world was already installed.
    #[error("World is already installed; {0}")]
    AlreadyInstalled(&'static str),

    /// A phase was ticked before the install step.
    #[error("World must be installed before running the {0} phase")]
    NotInstalled(&'static str),

    /// A system declared no phases.
    #[error("System `{0}` declares no phases")]
    NoPhases(&'static str),

    /// Entity id is not alive.
    #[error("Entity not alive: {0}")]
    EntityNotAlive(EntityId),

    /// The entity has no transform to move.
    #[error("Entity {0} has no transform")]
    MissingTransform(EntityId),

    /// The entity has no move agent.
    #[error("Entity {0} has no move agent")]
    UnknownAgent(EntityId),

    /// The path oracle could not produce a complete path.
    #[error("No complete path to {destination:?} (status {status:?})")]
    PathUnavailable {
        /// Requested destination.
        destination: Vec2Fixed,
        /// Status reported by the oracle.
        status: PathStatus,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}

fn requested_by(system: &Option<&'static str>) -> String {
    match system {
        Some(name) => format!(" (required by system `{name}`)"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_component_message_names_system() {
        let err = CoreError::UnboundComponent {
            component: "Transform",
            system: Some("MovementSystem"),
        };
        assert_eq!(
            err.to_string(),
            "Component type `Transform` is not bound (required by system `MovementSystem`)"
        );
    }

    #[test]
    fn test_unbound_component_message_without_system() {
        let err = CoreError::UnboundComponent {
            component: "Transform",
            system: None,
        };
        assert_eq!(err.to_string(), "Component type `Transform` is not bound");
    }
}
