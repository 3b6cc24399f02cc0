#[derive(Debug, Clone, PartialEq)]
pub enum FastError {
    InvalidImageSize { width: usize, height: usize },
    InvalidImageData { expected_len: usize, actual_len: usize },
    InvalidThreshold(u8),
    InvalidPatchSize(usize),
    InvalidOctaves(usize),
    InvalidScaleFactor(f32),
    InvalidNmsRadius(f32),
    ImageTooSmall { width: usize, height: usize, min_size: usize },
}

impl std::fmt::Display for FastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FastError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            FastError::InvalidImageData { expected_len, actual_len } => {
                write!(f, "Image data length mismatch: expected {}, got {}", expected_len, actual_len)
            }
            FastError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be 1-127)", t)
            }
            FastError::InvalidPatchSize(p) => {
                write!(f, "Invalid patch size: {} (must be odd, 3-63)", p)
            }
            FastError::InvalidOctaves(n) => {
                write!(f, "Invalid octave count: {} (must be 1-16)", n)
            }
            FastError::InvalidScaleFactor(s) => {
                write!(f, "Invalid scale factor: {} (must be > 1.0)", s)
            }
            FastError::InvalidNmsRadius(r) => {
                write!(f, "Invalid NMS radius: {} (must be finite and >= 0)", r)
            }
            FastError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
        }
    }
}

impl std::error::Error for FastError {}

pub type FastResult<T> = Result<T, FastError>;
