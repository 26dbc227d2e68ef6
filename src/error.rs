use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("image dimensions {width}x{height} exceed the GIF limit of 65535")]
    DimensionTooLarge { width: usize, height: usize },

    #[error("the GIF stream has already been terminated")]
    StreamFinished,

    #[error("output sink failed: {0}")]
    Sink(#[from] std::io::Error),
}
