//! Torrent metadata and `.torrent` file decoding.

use serde::{Deserialize, Serialize};
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

use crate::error::MetainfoError;
use crate::hash::ContentHash;

/// Descriptive metadata of a torrent, available once the info dictionary is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TorrentMetadata {
    /// Display name from the info dictionary.
    pub name: String,
    /// Free-form comment left by the creator.
    pub comment: Option<String>,
    /// Program that created the torrent.
    pub creator: Option<String>,
}

impl TorrentMetadata {
    /// Metadata carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct RawMetainfo {
    info: Value,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default, rename = "created by")]
    created_by: Option<String>,
}

/// A decoded `.torrent` file ready to be handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentMetainfo {
    info_hash: ContentHash,
    metadata: TorrentMetadata,
    bytes: Vec<u8>,
}

impl TorrentMetainfo {
    /// Decode a bencoded metainfo file and compute its v1 info-hash.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is not bencode, has no `info`
    /// dictionary, or the dictionary has no name.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, MetainfoError> {
        let bytes = bytes.into();
        let raw: RawMetainfo = serde_bencode::from_bytes(&bytes)
            .map_err(|source| MetainfoError::Decode { source })?;

        let encoded_info =
            serde_bencode::to_bytes(&raw.info).map_err(|source| MetainfoError::Encode { source })?;
        let digest: [u8; 20] = Sha1::digest(&encoded_info).into();

        let name = match &raw.info {
            Value::Dict(entries) => match entries.get(b"name".as_slice()) {
                Some(Value::Bytes(name)) => String::from_utf8_lossy(name).into_owned(),
                _ => return Err(MetainfoError::MissingName),
            },
            _ => return Err(MetainfoError::MissingName),
        };

        Ok(Self {
            info_hash: ContentHash::from_bytes(digest),
            metadata: TorrentMetadata {
                name,
                comment: raw.comment.filter(|value| !value.is_empty()),
                creator: raw.created_by.filter(|value| !value.is_empty()),
            },
            bytes,
        })
    }

    /// Build a metainfo value from already-known parts.
    #[must_use]
    pub const fn from_parts(
        info_hash: ContentHash,
        metadata: TorrentMetadata,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            info_hash,
            metadata,
            bytes,
        }
    }

    /// SHA-1 of the bencoded info dictionary.
    #[must_use]
    pub const fn info_hash(&self) -> ContentHash {
        self.info_hash
    }

    /// Descriptive metadata extracted from the file.
    #[must_use]
    pub const fn metadata(&self) -> &TorrentMetadata {
        &self.metadata
    }

    /// Original file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &[u8] = b"d6:lengthi12e4:name8:demo.txt12:piece lengthi16384e6:pieces20:aaaaaaaaaaaaaaaaaaaae";

    fn sample_file() -> Vec<u8> {
        let mut file = b"d7:comment5:hello10:created by7:lanseed4:info".to_vec();
        file.extend_from_slice(INFO);
        file.push(b'e');
        file
    }

    #[test]
    fn decodes_name_comment_and_creator() {
        let metainfo = TorrentMetainfo::from_bytes(sample_file()).expect("valid torrent");
        assert_eq!(metainfo.metadata().name, "demo.txt");
        assert_eq!(metainfo.metadata().comment.as_deref(), Some("hello"));
        assert_eq!(metainfo.metadata().creator.as_deref(), Some("lanseed"));
        assert_eq!(metainfo.bytes(), sample_file().as_slice());
    }

    #[test]
    fn info_hash_is_sha1_of_info_dictionary() {
        let metainfo = TorrentMetainfo::from_bytes(sample_file()).expect("valid torrent");
        let expected: [u8; 20] = Sha1::digest(INFO).into();
        assert_eq!(metainfo.info_hash(), ContentHash::from_bytes(expected));
    }

    #[test]
    fn rejects_garbage_and_nameless_info() {
        assert!(matches!(
            TorrentMetainfo::from_bytes(b"not bencode".to_vec()),
            Err(MetainfoError::Decode { .. })
        ));
        assert!(matches!(
            TorrentMetainfo::from_bytes(b"d4:infod6:lengthi1eee".to_vec()),
            Err(MetainfoError::MissingName)
        ));
    }
}
