#[derive(Debug, Clone, thiserror::Error)]
pub enum TransformError {
    #[error("unsupported family pair: {src} -> {dst}")]
    UnsupportedPair { src: &'static str, dst: &'static str },
    #[error("malformed {family} body: {message}")]
    Malformed { family: &'static str, message: String },
}

pub type TransformResult<T> = Result<T, TransformError>;
