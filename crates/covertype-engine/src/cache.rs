//! Process-wide engine, built on first use.

use std::error::Error;
use std::sync::OnceLock;

use tracing::info;

use crate::EngineError;
use crate::artifact::{ArtifactPaths, ClassifierArtifact};
use crate::engine::InferenceEngine;

static SHARED: OnceLock<Result<InferenceEngine, String>> = OnceLock::new();

/// The shared engine, loaded or synthesized from `paths` on the first call.
///
/// Concurrent first callers block until a single initialization finishes.
/// Later calls ignore `paths`. A failed initialization is remembered and
/// every call reports it.
///
/// # Errors
///
/// [`EngineError::Unavailable`] carrying the rendered initialization error.
pub fn shared(paths: &ArtifactPaths) -> Result<&'static InferenceEngine, EngineError> {
    SHARED
        .get_or_init(|| {
            info!(model = %paths.model.display(), "initializing shared classifier");
            ClassifierArtifact::load_or_synthesize(paths)
                .map(InferenceEngine::new)
                .map_err(|e| render_chain(&e))
        })
        .as_ref()
        .map_err(|message| EngineError::Unavailable {
            message: message.clone(),
        })
}

fn render_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn chain_includes_sources() {
        let err = EngineError::ReadFile {
            path: PathBuf::from("forest_scaler.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(render_chain(&err), "failed to read forest_scaler.json: gone");
    }
}
