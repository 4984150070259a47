/// Errors raised while setting up the viewer or loading its assets.
///
/// Nothing inside the frame loop returns these; per-frame conditions such as
/// "model not loaded yet" are handled as no-ops instead.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Failed to parse glTF model: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Missing position data for mesh: {0}")]
    MissingPositions(String),

    #[error("Model '{0}' contains no drawable geometry")]
    EmptyModel(String),

    #[error("Fetching '{0}' failed")]
    Fetch(String),

    #[error("GPU init failed: {0}")]
    Gpu(String),
}
