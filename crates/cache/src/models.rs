use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub(crate) value: Vec<u8>,
    pub(crate) mime_type: Option<String>,
    pub(crate) meta: Option<String>,
    pub(crate) expires_at: Option<i64>,
}
impl RecordRow {
    pub(crate) fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UsageRow {
    entries: i64,
    bytes: i64,
}

/// Full content of an object as cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedValue {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}
impl From<RecordRow> for CachedValue {
    fn from(row: RecordRow) -> Self {
        Self { data: row.value, mime_type: row.mime_type }
    }
}

/// Live shape of an object that a preview must agree with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewShape {
    pub total_size: u64,
    pub total_chunks: u64,
}

/// A chunk-aligned prefix of an object plus the shape it was taken from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    /// Number of whole chunks in `data`.
    pub chunks: u64,
    pub total_chunks: u64,
    pub total_size: u64,
    pub chunk_size: u64,
}
impl Preview {
    #[must_use]
    pub fn shape(&self) -> PreviewShape {
        PreviewShape { total_size: self.total_size, total_chunks: self.total_chunks }
    }

    /// Whether this preview can be trusted for an object of `shape`.
    ///
    /// The recorded shape must equal the live one, and the prefix must be
    /// exactly `chunks` chunks long (the last chunk of a complete object may
    /// be short).
    #[must_use]
    pub fn matches(&self, shape: &PreviewShape) -> bool {
        let expected_len = self.chunks.saturating_mul(self.chunk_size).min(self.total_size);
        self.shape() == *shape
            && self.chunk_size > 0
            && self.chunks > 0
            && self.chunks <= self.total_chunks
            && self.data.len() as u64 == expected_len
    }

    /// The prefix covers the whole object.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.chunks >= self.total_chunks
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct PreviewMeta {
    chunks: u64,
    total_chunks: u64,
    total_size: u64,
    chunk_size: u64,
}
impl From<&Preview> for PreviewMeta {
    fn from(preview: &Preview) -> Self {
        Self {
            chunks: preview.chunks,
            total_chunks: preview.total_chunks,
            total_size: preview.total_size,
            chunk_size: preview.chunk_size,
        }
    }
}
impl TryFrom<RecordRow> for Preview {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let meta = row.meta.as_deref().unwrap_or_default();
        let meta: PreviewMeta = serde_json::from_str(meta).or_raise(|| ErrorKind::InvalidData("preview metadata"))?;
        Ok(Self {
            data: row.value,
            mime_type: row.mime_type,
            chunks: meta.chunks,
            total_chunks: meta.total_chunks,
            total_size: meta.total_size,
            chunk_size: meta.chunk_size,
        })
    }
}

/// A small derived image of an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ThumbnailMeta {
    width: u32,
    height: u32,
}
impl From<&Thumbnail> for ThumbnailMeta {
    fn from(thumbnail: &Thumbnail) -> Self {
        Self { width: thumbnail.width, height: thumbnail.height }
    }
}
impl TryFrom<RecordRow> for Thumbnail {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let meta = row.meta.as_deref().unwrap_or_default();
        let meta: ThumbnailMeta =
            serde_json::from_str(meta).or_raise(|| ErrorKind::InvalidData("thumbnail metadata"))?;
        Ok(Self { data: row.value, mime_type: row.mime_type, width: meta.width, height: meta.height })
    }
}

/// Number of records and total bytes held by a tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TierUsage {
    pub entries: u64,
    pub bytes: u64,
}
impl TryFrom<UsageRow> for TierUsage {
    type Error = Error;
    fn try_from(row: UsageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            entries: u64::try_from(row.entries).or_raise(|| ErrorKind::InvalidData("entry count"))?,
            bytes: u64::try_from(row.bytes).or_raise(|| ErrorKind::InvalidData("byte total"))?,
        })
    }
}
