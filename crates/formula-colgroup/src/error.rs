pub type MapResult<T> = Result<T, MapError>;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("code {code} exceeds the upper bound {upper_bound} of the map")]
    InvalidCode { code: u32, upper_bound: u32 },

    #[error("replace({from}, {to}) is not supported by a 1-bit map")]
    InvalidReplace { from: u32, to: u32 },

    #[error("row position {pos} out of bounds for map of size {size}")]
    OutOfBounds { pos: usize, size: usize },

    #[error("map size mismatch: expected {expected} rows, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("map of {size} rows exceeds the row limit of the binary format")]
    TooLarge { size: usize },

    #[error("{unique} distinct codes exceed the code limit of the binary format")]
    TooManyCodes { unique: u32 },

    #[error("unknown map type tag {0}")]
    UnknownMapType(u8),

    #[error("corrupt map encoding: {0}")]
    Corrupt(String),

    #[error("invalid offsets: {0}")]
    InvalidOffsets(String),

    #[error("invalid matrix block: {0}")]
    InvalidBlock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
