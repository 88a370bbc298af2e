use indexmap::IndexMap;
use log::debug;

use crate::image::{ImageRecord, UNTAGGED};

/// One `repo: tag, tag` line per repository, in the order repositories and tags
/// are first seen.
pub fn images_to_short(images: &[ImageRecord]) -> String {
    let mut by_repo: IndexMap<&str, Vec<&str>> = IndexMap::new();

    for repo_tag in images.iter().flat_map(|image| image.repo_tags.iter()) {
        if repo_tag == UNTAGGED {
            continue;
        }
        let Some((repo, tag)) = repo_tag.rsplit_once(':') else {
            debug!("Skipping tag without a repository separator: {}", repo_tag);
            continue;
        };
        let tags = by_repo.entry(repo).or_default();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let mut buffer = String::new();
    for (repo, tags) in &by_repo {
        buffer.push_str(&format!("{}: {}\n", repo, tags.join(", ")));
    }
    buffer
}
