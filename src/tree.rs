//! Parent/child indexing, label filtering and start-node lookup over image records.

use std::collections::HashMap;

use log::{debug, trace};

use crate::error::{Result, VizError};
use crate::image::ImageRecord;

/// Children of each parent id, in input order. Roots are not indexed.
pub type ChildIndex<'a> = HashMap<&'a str, Vec<&'a ImageRecord>>;

pub fn collect_children(images: &[ImageRecord]) -> ChildIndex<'_> {
    let mut children: ChildIndex<'_> = HashMap::new();
    for image in images.iter().filter(|image| !image.is_root()) {
        children
            .entry(image.parent_id.as_str())
            .or_default()
            .push(image);
    }
    children
}

pub fn collect_roots(images: &[ImageRecord]) -> Vec<&ImageRecord> {
    images.iter().filter(|image| image.is_root()).collect()
}

/// Drop untagged, non-root, non-branching records and splice their children onto
/// their own parent.
///
/// Records are walked in list order. Visibility is judged against `children` (the
/// index of the unfiltered list) and each record's parent id as rewritten so far.
/// When a record is dropped, both the records already emitted and the records still
/// to come are re-pointed past it, so a run of dropped records collapses onto the
/// nearest visible ancestor no matter how the run is ordered in the list.
///
/// The input is left untouched; rebuild the index from the result with
/// [`collect_children`].
pub fn filter_images(images: &[ImageRecord], children: &ChildIndex<'_>) -> Vec<ImageRecord> {
    let mut pending: Vec<ImageRecord> = images.to_vec();
    let mut filtered: Vec<ImageRecord> = Vec::new();

    for i in 0..pending.len() {
        let image = &pending[i];
        let branching = children
            .get(image.id.as_str())
            .is_some_and(|kids| kids.len() > 1);

        if image.is_tagged() || image.is_root() || branching {
            filtered.push(image.clone());
            continue;
        }

        let hidden_id = image.id.clone();
        let new_parent = image.parent_id.clone();
        trace!("Hiding {} (children move to {:?})", hidden_id, new_parent);

        for kept in filtered.iter_mut().filter(|r| r.parent_id == hidden_id) {
            kept.parent_id = new_parent.clone();
        }
        for later in pending.iter_mut().filter(|r| r.parent_id == hidden_id) {
            later.parent_id = new_parent.clone();
        }
    }

    debug!(
        "Label filter kept {} of {} images",
        filtered.len(),
        images.len()
    );
    filtered
}

/// Resolve an id prefix or `repo[:tag]` to a record.
///
/// Id prefixes win over tags, with or without the id's `<algorithm>:` prefix. A token
/// without `:` is looked up as `token:latest`.
pub fn find_start_image<'a>(token: &str, images: &'a [ImageRecord]) -> Result<&'a ImageRecord> {
    let by_id = images.iter().find(|image| {
        image.id.starts_with(token)
            || image
                .id
                .rsplit_once(':')
                .is_some_and(|(_, digest)| digest.starts_with(token))
    });
    if let Some(image) = by_id {
        return Ok(image);
    }

    let repo_tag = if token.contains(':') {
        token.to_string()
    } else {
        format!("{}:latest", token)
    };

    images
        .iter()
        .find(|image| image.repo_tags.iter().any(|tag| *tag == repo_tag))
        .ok_or_else(|| VizError::NotFound {
            token: token.to_string(),
            repo_tag,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::UNTAGGED;

    fn record(id: &str, parent: &str, tags: &[&str]) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            parent_id: parent.to_string(),
            repo_tags: if tags.is_empty() {
                vec![UNTAGGED.to_string()]
            } else {
                tags.iter().map(|t| t.to_string()).collect()
            },
            size: 0,
            virtual_size: 0,
            created: 0,
            origin_id: None,
            created_by: None,
        }
    }

    fn parent_of<'a>(images: &'a [ImageRecord], id: &str) -> &'a str {
        images
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.parent_id.as_str())
            .unwrap()
    }

    #[test]
    fn test_collect_roots_and_children_partition() {
        let images = vec![
            record("c", "b", &["c:latest"]),
            record("a", "", &[]),
            record("b", "a", &[]),
            record("d", "a", &[]),
            record("z", "", &["z:1"]),
        ];

        let roots = collect_roots(&images);
        let children = collect_children(&images);

        let root_ids: Vec<&str> = roots.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(root_ids, vec!["a", "z"]);

        let child_count: usize = children.values().map(Vec::len).sum();
        assert_eq!(child_count + roots.len(), images.len());

        let under_a: Vec<&str> = children["a"].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(under_a, vec!["b", "d"]);
        assert!(!children.contains_key(""));
    }

    #[test]
    fn test_filter_keeps_tagged_roots_and_branches() {
        let images = vec![
            record("root", "", &[]),
            record("fork", "root", &[]),
            record("left", "fork", &["left:latest"]),
            record("right", "fork", &["right:latest"]),
        ];
        let children = collect_children(&images);
        let filtered = filter_images(&images, &children);
        assert_eq!(filtered, images);
    }

    #[test]
    fn test_filter_splices_single_hidden_node() {
        let images = vec![
            record("root", "", &[]),
            record("mid", "root", &[]),
            record("leaf", "mid", &["leaf:latest"]),
        ];
        let children = collect_children(&images);
        let filtered = filter_images(&images, &children);

        let ids: Vec<&str> = filtered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "leaf"]);
        assert_eq!(parent_of(&filtered, "leaf"), "root");
        // input untouched
        assert_eq!(parent_of(&images, "leaf"), "mid");
    }

    #[test]
    fn test_filter_collapses_hidden_chain_in_parent_first_order() {
        let images = vec![
            record("root", "", &[]),
            record("h1", "root", &[]),
            record("h2", "h1", &[]),
            record("h3", "h2", &[]),
            record("leaf", "h3", &["leaf:latest"]),
        ];
        let children = collect_children(&images);
        let filtered = filter_images(&images, &children);

        let ids: Vec<&str> = filtered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "leaf"]);
        assert_eq!(parent_of(&filtered, "leaf"), "root");
    }

    #[test]
    fn test_filter_collapses_hidden_chain_in_child_first_order() {
        let images = vec![
            record("leaf", "h3", &["leaf:latest"]),
            record("h3", "h2", &[]),
            record("h1", "root", &[]),
            record("h2", "h1", &[]),
            record("root", "", &[]),
        ];
        let children = collect_children(&images);
        let filtered = filter_images(&images, &children);

        let ids: Vec<&str> = filtered.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["leaf", "root"]);
        assert_eq!(parent_of(&filtered, "leaf"), "root");
    }

    #[test]
    fn test_filter_is_idempotent() {
        let images = vec![
            record("root", "", &[]),
            record("h1", "root", &[]),
            record("fork", "h1", &[]),
            record("a", "fork", &["a:1"]),
            record("h2", "fork", &[]),
            record("b", "h2", &["b:1"]),
        ];
        let children = collect_children(&images);
        let once = filter_images(&images, &children);

        let once_children = collect_children(&once);
        let twice = filter_images(&once, &once_children);
        assert_eq!(once, twice);
        assert_eq!(parent_of(&once, "fork"), "root");
        assert_eq!(parent_of(&once, "b"), "fork");
    }

    #[test]
    fn test_filter_treats_empty_tag_list_as_untagged() {
        let mut images = vec![
            record("root", "", &[]),
            record("mid", "root", &[]),
            record("leaf", "mid", &["leaf:1"]),
        ];
        images[1].repo_tags.clear();
        let children = collect_children(&images);
        let filtered = filter_images(&images, &children);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_find_start_image_by_id_prefix() {
        let images = vec![
            record("sha256:4c1208b690c6", "", &[]),
            record("626147582d2a", "4c1208b690c6", &["base:latest"]),
        ];
        assert_eq!(find_start_image("6261", &images).unwrap().id, "626147582d2a");
        assert_eq!(
            find_start_image("4c12", &images).unwrap().id,
            "sha256:4c1208b690c6"
        );
        assert_eq!(
            find_start_image("sha256:4c", &images).unwrap().id,
            "sha256:4c1208b690c6"
        );

        let synthetic = vec![record("synth:abcdef0011", "", &[])];
        assert_eq!(
            find_start_image("abcdef", &synthetic).unwrap().id,
            "synth:abcdef0011"
        );
    }

    #[test]
    fn test_find_start_image_by_tag() {
        let images = vec![
            record("aaa", "", &["base:1.0"]),
            record("bbb", "aaa", &["base:latest"]),
        ];
        assert_eq!(find_start_image("base", &images).unwrap().id, "bbb");
        assert_eq!(find_start_image("base:1.0", &images).unwrap().id, "aaa");
    }

    #[test]
    fn test_find_start_image_prefers_id_over_tag() {
        let images = vec![
            record("zzz", "", &["abc:latest"]),
            record("abc123", "zzz", &[]),
        ];
        assert_eq!(find_start_image("abc", &images).unwrap().id, "abc123");
    }

    #[test]
    fn test_find_start_image_not_found() {
        let images = vec![record("aaa", "", &["base:1.0"])];
        match find_start_image("nope", &images) {
            Err(VizError::NotFound { token, repo_tag }) => {
                assert_eq!(token, "nope");
                assert_eq!(repo_tag, "nope:latest");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
