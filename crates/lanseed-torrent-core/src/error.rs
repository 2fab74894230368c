//! Error types for the torrent model.
//!
//! # Design
//! - Keep error messages constant while carrying context fields for debugging.
//! - Engine-reported failures are plain values; they travel inside alerts and
//!   are never raised by the model itself.

use thiserror::Error;

/// Failure decoding a [`ContentHash`](crate::ContentHash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HashError {
    /// Input was not valid hex.
    #[error("invalid hex content hash")]
    InvalidHex,
    /// Input was not valid base32.
    #[error("invalid base32 content hash")]
    InvalidBase32,
    /// Decoded hash had the wrong number of bytes or characters.
    #[error("invalid content hash length")]
    InvalidLength {
        /// Observed length.
        length: usize,
    },
}

/// Failure parsing a magnet URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MagnetError {
    /// The input was not a URI at all.
    #[error("magnet link is not a valid uri")]
    InvalidUri {
        /// Parser diagnostic.
        detail: String,
    },
    /// The URI scheme was not `magnet`.
    #[error("uri is not a magnet link")]
    NotMagnet {
        /// Scheme that was found instead.
        scheme: String,
    },
    /// No `xt=urn:btih:` parameter was present.
    #[error("magnet link has no info hash")]
    MissingInfoHash,
    /// The `xt` hash could not be decoded.
    #[error("magnet link info hash is malformed")]
    InvalidInfoHash {
        /// Underlying hash error.
        #[source]
        source: HashError,
    },
}

/// Failure decoding a `.torrent` metainfo file.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The payload was not valid bencode or lacked required keys.
    #[error("torrent file is not valid bencode")]
    Decode {
        /// Underlying bencode error.
        #[source]
        source: serde_bencode::Error,
    },
    /// The `info` dictionary could not be re-encoded for hashing.
    #[error("torrent info dictionary could not be encoded")]
    Encode {
        /// Underlying bencode error.
        #[source]
        source: serde_bencode::Error,
    },
    /// The `info` dictionary carried no usable name.
    #[error("torrent info dictionary has no name")]
    MissingName,
}

/// Failure reported by the external engine for a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine error {code}: {message}")]
pub struct EngineError {
    /// Engine-specific error code.
    pub code: i32,
    /// Human-readable diagnostic.
    pub message: String,
}

impl EngineError {
    /// Construct an engine error value.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Primary error type for torrent operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// A magnet URI was rejected before any record was created.
    #[error("invalid magnet link")]
    InvalidMagnet {
        /// Underlying parse error.
        #[source]
        source: MagnetError,
    },
    /// A torrent file was rejected before any record was created.
    #[error("invalid torrent file")]
    InvalidMetainfo {
        /// Underlying decode error.
        #[source]
        source: MetainfoError,
    },
    /// The engine reported a failure for an operation.
    #[error("torrent engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Engine diagnostic.
        #[source]
        source: EngineError,
    },
}

impl From<MagnetError> for TorrentError {
    fn from(source: MagnetError) -> Self {
        Self::InvalidMagnet { source }
    }
}

impl From<MetainfoError> for TorrentError {
    fn from(source: MetainfoError) -> Self {
        Self::InvalidMetainfo { source }
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
