//! Magnet URI parsing.
//!
//! Only v1 `urn:btih:` exact topics are understood; the hash may be hex (40
//! characters) or base32 (32 characters).

use std::str::FromStr;

use url::Url;

use crate::error::MagnetError;
use crate::hash::ContentHash;

const BTIH_PREFIX: &str = "urn:btih:";

/// A parsed magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    info_hash: ContentHash,
    display_name: Option<String>,
    trackers: Vec<String>,
    uri: String,
}

impl MagnetLink {
    /// Provisional content hash named by the link.
    #[must_use]
    pub const fn info_hash(&self) -> ContentHash {
        self.info_hash
    }

    /// `dn` parameter, if present.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// `tr` parameters in order of appearance.
    #[must_use]
    pub fn trackers(&self) -> &[String] {
        &self.trackers
    }

    /// The URI as supplied by the caller.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl FromStr for MagnetLink {
    type Err = MagnetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_magnet(value)
    }
}

/// Parse a magnet URI.
///
/// # Errors
///
/// Returns an error when the input is not a `magnet:` URI or carries no
/// decodable `urn:btih:` hash.
pub fn parse_magnet(uri: &str) -> Result<MagnetLink, MagnetError> {
    let trimmed = uri.trim();
    let url = Url::parse(trimmed).map_err(|err| MagnetError::InvalidUri {
        detail: err.to_string(),
    })?;
    if url.scheme() != "magnet" {
        return Err(MagnetError::NotMagnet {
            scheme: url.scheme().to_string(),
        });
    }

    let mut info_hash = None;
    let mut display_name = None;
    let mut trackers = Vec::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "xt" if info_hash.is_none() => {
                if let Some(encoded) = strip_prefix_ignore_case(&value, BTIH_PREFIX) {
                    let hash = encoded
                        .parse::<ContentHash>()
                        .map_err(|source| MagnetError::InvalidInfoHash { source })?;
                    info_hash = Some(hash);
                }
            }
            "dn" if !value.is_empty() => display_name = Some(value.into_owned()),
            "tr" if !value.is_empty() => trackers.push(value.into_owned()),
            _ => {}
        }
    }

    let info_hash = info_hash.ok_or(MagnetError::MissingInfoHash)?;
    Ok(MagnetLink {
        info_hash,
        display_name,
        trackers,
        uri: trimmed.to_string(),
    })
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}
