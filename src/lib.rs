//! # Huffpack
//!
//! Static Huffman compression of byte buffers.  The coder produces two artifacts,
//! the packed bit stream and a textual code table that is needed to expand it.
//!
//! * `huffman` has the main `compress` and `expand` functions
//! * `code_table` has the persisted table format
//! * `obfuscate` has the optional fixed offset transform
//! * `metadata` has the sender/receiver header used by the command line
//!
//! Everything works on in-memory buffers, file handling is left to the caller.

mod tools;
pub mod huffman;
pub mod code_table;
pub mod obfuscate;
pub mod metadata;

pub use tools::fnv::checksum;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// offset used when obfuscation is requested without a value
pub const DEFAULT_OFFSET: u8 = 0x55;

/// Codec Errors
#[derive(thiserror::Error,Debug,PartialEq)]
pub enum Error {
    #[error("extract from empty queue")]
    EmptyQueue,
    #[error("malformed code table: {0}")]
    MalformedTable(String),
    #[error("stream truncated, needed {needed} bytes, produced {produced}")]
    TruncatedStream { needed: u64, produced: u64 },
    #[error("could not allocate buffer")]
    AllocationFailure,
    #[error("degenerate input")]
    DegenerateInput,
    #[error("checksum mismatch, expected {expected:#018x}, got {actual:#018x}")]
    IntegrityMismatch { expected: u64, actual: u64 },
    #[error("invalid code at bit {0}")]
    InvalidCode(usize),
    #[error("bad metadata: {0}")]
    BadMetadata(String),
    #[error("receiver does not match")]
    ReceiverMismatch
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_e: std::collections::TryReserveError) -> Self {
        Error::AllocationFailure
    }
}

/// Options controlling compression
#[derive(Clone,Debug)]
pub struct Options {
    /// byte offset added before coding and removed after decoding
    pub obfuscation: Option<u8>,
    /// whether to write the packed stream checksum into the table
    pub checksum: bool
}

pub const STD_OPTIONS: Options = Options {
    obfuscation: None,
    checksum: true
};
