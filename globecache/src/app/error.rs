//! Application error types.

use std::fmt;

use crate::orchestrator::OrchestratorError;
use crate::provider::ProviderError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create the HTTP client.
    HttpClient(ProviderError),

    /// A configured layer could not be turned into a provider.
    Layer { name: String, source: ProviderError },

    /// The configuration declares no image layer.
    NoImageLayers,

    /// The orchestrator rejected its configuration or a block request.
    Orchestrator(OrchestratorError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            AppError::Layer { name, source } => {
                write!(f, "Failed to create layer '{}': {}", name, source)
            }
            AppError::NoImageLayers => write!(f, "No image layers configured"),
            AppError::Orchestrator(e) => write!(f, "Tile orchestrator error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::HttpClient(e) => Some(e),
            AppError::Layer { source, .. } => Some(source),
            AppError::NoImageLayers => None,
            AppError::Orchestrator(e) => Some(e),
        }
    }
}

impl From<OrchestratorError> for AppError {
    fn from(e: OrchestratorError) -> Self {
        AppError::Orchestrator(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Layer {
            name: "osm".to_string(),
            source: ProviderError::ProviderSpecific("no servers".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to create layer 'osm': Provider error: no servers"
        );
        assert_eq!(AppError::NoImageLayers.to_string(), "No image layers configured");
    }

    #[test]
    fn test_app_error_from_orchestrator_error() {
        let app_err: AppError = OrchestratorError::NotReady.into();
        assert!(matches!(app_err, AppError::Orchestrator(_)));
        assert!(std::error::Error::source(&app_err).is_some());
    }
}
