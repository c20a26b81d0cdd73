use thiserror::Error;

/// Error kinds a caller may need to tell apart. Everything else in the
/// crate travels as a plain `anyhow::Error` or `std::io::Error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LobError {
    #[error("malformed lob id: {0}")]
    MalformedId(&'static str),

    #[error("block {0} not found")]
    BlockNotFound(u64),
}
