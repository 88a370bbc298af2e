use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Tag carried by images that have no repository tag.
pub const UNTAGGED: &str = "<none>:<none>";

/// One node in the image ancestry forest, in the runtime's remote API shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "Id")]
    pub id: String,
    /// Empty for roots.
    #[serde(default, rename = "ParentId")]
    pub parent_id: String,
    #[serde(default, rename = "RepoTags", deserialize_with = "null_as_empty")]
    pub repo_tags: Vec<String>,
    #[serde(default, rename = "Size")]
    pub size: i64,
    #[serde(default, rename = "VirtualSize")]
    pub virtual_size: i64,
    #[serde(default, rename = "Created")]
    pub created: i64,
    // Only present on records built from layer history
    #[serde(default, rename = "OriginId", skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    #[serde(default, rename = "CreatedBy", skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl ImageRecord {
    /// Whether the record carries at least one real repository tag.
    ///
    /// An empty tag list counts as untagged, so callers never have to index into it.
    pub fn is_tagged(&self) -> bool {
        self.repo_tags.first().is_some_and(|tag| tag != UNTAGGED)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin_id.is_some()
    }
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a JSON array of image records.
///
/// Missing or empty `RepoTags` are normalized to the [`UNTAGGED`] sentinel.
pub fn decode_images(raw: &[u8]) -> Result<Vec<ImageRecord>> {
    let mut images: Vec<ImageRecord> = serde_json::from_slice(raw)?;
    for image in &mut images {
        if image.repo_tags.is_empty() {
            image.repo_tags.push(UNTAGGED.to_string());
        }
    }
    log::debug!("Decoded {} image records", images.len());
    Ok(images)
}
