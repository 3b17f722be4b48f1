//! Storage notification event shapes and key decoding.
//!
//! Only the fields the dispatcher reads are modelled; everything else in a
//! notification record is ignored.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::str::Utf8Error;

use crate::types::SourceObject;

/// A batch of storage notification records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageEventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    /// Key as transported: percent-encoded, `+` for space
    pub key: String,

    #[serde(rename = "eTag", default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

impl StorageEventRecord {
    /// The object this record points at, with its key decoded.
    pub fn source_object(&self) -> Result<SourceObject, Utf8Error> {
        Ok(SourceObject {
            bucket: self.s3.bucket.name.clone(),
            key: decode_key(&self.s3.object.key)?,
            etag: self.s3.object.e_tag.clone(),
        })
    }
}

/// Reverse the notification key encoding: `+` becomes a space, then
/// percent-escapes are decoded.
///
/// The `+` substitution runs first, so a literal plus (sent as `%2B`) survives.
/// Escapes that decode to invalid UTF-8 are an error.
pub fn decode_key(raw: &str) -> Result<String, Utf8Error> {
    let spaced = raw.replace('+', " ");
    let decoded = percent_decode_str(&spaced).decode_utf8()?;
    Ok(decoded.into_owned())
}
