//! Rebuilds image ancestry from per-layer build history.
//!
//! Image stores that no longer report parent ids still expose each image's ordered
//! layer history. [`HistorySynthesizer`] folds those histories into a forest of
//! synthetic records: every layer becomes a node whose id is a SHA-256 digest over
//! its ancestor's id and the layer's own metadata. Two images built from the same
//! leading layers therefore share the same ancestor nodes, whatever order the
//! images are processed in.

use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::image::{null_as_empty, ImageRecord, UNTAGGED};
use crate::sources::Source;

/// Prefix of every synthesized image id.
pub const SYNTH_PREFIX: &str = "synth:";

/// One build step of an image, as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(default, rename = "CreatedBy")]
    pub created_by: String,
    #[serde(default, rename = "Created")]
    pub created: i64,
    #[serde(default, rename = "Size")]
    pub size: i64,
    #[serde(default, rename = "Tags", deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// Compute the synthetic id of a layer stacked on top of `previous`.
pub fn synthetic_id(previous: &str, layer: &HistoryEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update([0]);
    hasher.update(layer.created_by.as_bytes());
    hasher.update([0]);
    hasher.update(layer.created.to_le_bytes());
    hasher.update(layer.size.to_le_bytes());
    format!("{}{}", SYNTH_PREFIX, hex::encode(hasher.finalize()))
}

/// Accumulates layer histories into deduplicated synthetic records.
#[derive(Debug, Default)]
pub struct HistorySynthesizer {
    // Keyed by synthetic id, in first-seen order
    roster: IndexMap<String, ImageRecord>,
}

impl HistorySynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one image's history, oldest layer first, into the forest.
    ///
    /// Returns the synthetic id of the newest layer, or `None` for an empty history.
    pub fn add_history(&mut self, history: &[HistoryEntry]) -> Option<String> {
        let mut previous = String::new();
        let mut virtual_size = 0i64;

        for layer in history {
            virtual_size += layer.size;
            let id = synthetic_id(&previous, layer);

            match self.roster.get_mut(&id) {
                Some(existing) => {
                    trace!("Layer {} already known as {}", layer.id, id);
                    for tag in &layer.tags {
                        if !existing.repo_tags.contains(tag) {
                            existing.repo_tags.push(tag.clone());
                        }
                    }
                }
                None => {
                    trace!("New synthetic layer {} for {}", id, layer.id);
                    let record = ImageRecord {
                        id: id.clone(),
                        parent_id: previous.clone(),
                        repo_tags: layer.tags.clone(),
                        size: layer.size,
                        virtual_size,
                        created: layer.created,
                        origin_id: Some(layer.id.clone()),
                        created_by: Some(layer.created_by.clone()),
                    };
                    self.roster.insert(id.clone(), record);
                }
            }

            previous = id;
        }

        if previous.is_empty() {
            None
        } else {
            Some(previous)
        }
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Finish synthesis: untagged records get the sentinel, the rest are deduplicated.
    pub fn finish(self) -> Vec<ImageRecord> {
        self.roster
            .into_values()
            .map(|mut record| {
                if record.repo_tags.is_empty() {
                    record.repo_tags.push(UNTAGGED.to_string());
                } else {
                    let mut seen = Vec::with_capacity(record.repo_tags.len());
                    for tag in record.repo_tags.drain(..) {
                        if !seen.contains(&tag) {
                            seen.push(tag);
                        }
                    }
                    record.repo_tags = seen;
                }
                record
            })
            .collect()
    }
}

/// Whether the image list lacks usable ancestry and must be rebuilt from history.
pub fn needs_synthesis(images: &[ImageRecord]) -> bool {
    !images.is_empty() && images.iter().all(|image| image.parent_id.is_empty())
}

/// Fetch every image's history from `source` and synthesize the ancestry forest.
pub fn synthesize_from_source<S: Source + ?Sized>(
    source: &S,
    images: &[ImageRecord],
) -> Result<Vec<ImageRecord>> {
    let mut synthesizer = HistorySynthesizer::new();

    for image in images {
        debug!("Fetching history for {}", image.id);
        let history = source.image_history(image)?;
        synthesizer.add_history(&history);
    }

    debug!(
        "Synthesized {} records from {} images",
        synthesizer.len(),
        images.len()
    );
    Ok(synthesizer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(id: &str, cmd: &str, created: i64, size: i64, tags: &[&str]) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            created_by: cmd.to_string(),
            created,
            size,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_synthetic_id_is_prefixed_digest() {
        let id = synthetic_id("", &layer("<missing>", "ADD file:abc in /", 100, 5, &[]));
        assert!(id.starts_with(SYNTH_PREFIX));
        assert_eq!(id.len(), SYNTH_PREFIX.len() + 64);
    }

    #[test]
    fn test_synthetic_id_depends_on_ancestor() {
        let step = layer("<missing>", "RUN make", 100, 5, &[]);
        assert_ne!(synthetic_id("", &step), synthetic_id("synth:parent", &step));
    }

    #[test]
    fn test_synthetic_id_separates_fields() {
        let a = layer("<missing>", "x1", 0, 5, &[]);
        let b = layer("<missing>", "x", 10, 5, &[]);
        assert_ne!(synthetic_id("", &a), synthetic_id("", &b));

        let mut synthesizer = HistorySynthesizer::new();
        synthesizer.add_history(&[layer("sha256:a", "x1", 0, 5, &["a:1"])]);
        synthesizer.add_history(&[layer("sha256:b", "x", 10, 5, &["b:1"])]);
        let records = synthesizer.finish();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].repo_tags, vec!["a:1".to_string()]);
        assert_eq!(records[1].repo_tags, vec!["b:1".to_string()]);
    }

    #[test]
    fn test_chain_links_and_sizes() {
        let mut synthesizer = HistorySynthesizer::new();
        let newest = synthesizer.add_history(&[
            layer("<missing>", "ADD rootfs", 1, 100, &[]),
            layer("<missing>", "RUN apt-get update", 2, 50, &[]),
            layer("sha256:top", "CMD [\"bash\"]", 3, 0, &["app:latest"]),
        ]);

        let records = synthesizer.finish();
        assert_eq!(records.len(), 3);
        assert_eq!(newest.as_deref(), Some(records[2].id.as_str()));

        assert!(records[0].is_root());
        assert_eq!(records[1].parent_id, records[0].id);
        assert_eq!(records[2].parent_id, records[1].id);

        assert_eq!(records[0].virtual_size, 100);
        assert_eq!(records[1].virtual_size, 150);
        assert_eq!(records[2].virtual_size, 150);
        assert_eq!(records[1].size, 50);

        assert_eq!(records[0].repo_tags, vec![UNTAGGED.to_string()]);
        assert_eq!(records[2].repo_tags, vec!["app:latest".to_string()]);
        assert_eq!(records[2].origin_id.as_deref(), Some("sha256:top"));
        assert_eq!(records[1].created_by.as_deref(), Some("RUN apt-get update"));
    }

    #[test]
    fn test_shared_layers_merge_tags() {
        let mut synthesizer = HistorySynthesizer::new();
        let base = layer("<missing>", "ADD rootfs", 1, 100, &[]);
        synthesizer.add_history(&[base.clone(), layer("sha256:a", "CMD a", 2, 0, &["a:1"])]);
        synthesizer.add_history(&[base.clone(), layer("sha256:a", "CMD a", 2, 0, &["a:2", "a:1"])]);

        let records = synthesizer.finish();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].repo_tags, vec!["a:1".to_string(), "a:2".to_string()]);
    }

    #[test]
    fn test_empty_history() {
        let mut synthesizer = HistorySynthesizer::new();
        assert_eq!(synthesizer.add_history(&[]), None);
        assert!(synthesizer.is_empty());
        assert!(synthesizer.finish().is_empty());
    }

    #[test]
    fn test_needs_synthesis() {
        let raw = br#"[{"Id": "a"}, {"Id": "b"}]"#;
        let images = crate::image::decode_images(raw).unwrap();
        assert!(needs_synthesis(&images));

        let raw = br#"[{"Id": "a"}, {"Id": "b", "ParentId": "a"}]"#;
        let images = crate::image::decode_images(raw).unwrap();
        assert!(!needs_synthesis(&images));

        assert!(!needs_synthesis(&[]));
    }

    #[test]
    fn test_decode_history_entry() {
        let raw = r#"{"Id": "<missing>", "CreatedBy": "/bin/sh -c #(nop) CMD [\"sh\"]", "Created": 10, "Size": 0, "Tags": null, "Comment": ""}"#;
        let entry: HistoryEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.id, "<missing>");
        assert!(entry.tags.is_empty());
    }
}
