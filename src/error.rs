use thiserror::Error;

pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("invalid plotting area size: width={width}, height={height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unknown scale `{0}`")]
    UnknownScale(String),

    #[error("plugin with id `{0}` is already registered")]
    DuplicatePlugin(String),

    #[error("bus persistence failed: {0}")]
    Persistence(String),
}
