use std::collections::HashSet;

use log::warn;

use super::format::{human_size, truncate_id};
use crate::image::ImageRecord;
use crate::tree::ChildIndex;

const BRANCH: &str = "├─";
const CORNER: &str = "└─";
const BRANCH_INDENT: &str = "│ ";
const CORNER_INDENT: &str = "  ";

/// Display switches for the text tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Show full ids instead of the 12 character form.
    pub no_trunc: bool,
    /// Show each image's own size rather than its cumulative virtual size.
    pub incremental: bool,
    /// Format sizes as `662.6 MB` rather than a raw byte count.
    pub human: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            no_trunc: false,
            incremental: false,
            human: true,
        }
    }
}

pub fn images_to_tree(
    roots: &[&ImageRecord],
    children: &ChildIndex<'_>,
    options: &TreeOptions,
) -> String {
    let mut buffer = String::new();
    let mut visited = HashSet::new();
    write_level(&mut buffer, roots, children, options, "", &mut visited);
    buffer
}

fn write_level<'a>(
    buffer: &mut String,
    images: &[&'a ImageRecord],
    children: &ChildIndex<'a>,
    options: &TreeOptions,
    prefix: &str,
    visited: &mut HashSet<&'a str>,
) {
    let pending: Vec<&'a ImageRecord> = images
        .iter()
        .copied()
        .filter(|image| {
            let seen = visited.contains(image.id.as_str());
            if seen {
                warn!("Image {} reached twice, skipping", image.id);
            }
            !seen
        })
        .collect();

    let last = pending.len().saturating_sub(1);
    for (index, image) in pending.into_iter().enumerate() {
        if !visited.insert(image.id.as_str()) {
            warn!("Image {} reached twice, skipping", image.id);
            continue;
        }

        let (connector, indent) = if index == last {
            (CORNER, CORNER_INDENT)
        } else {
            (BRANCH, BRANCH_INDENT)
        };
        write_node(buffer, image, options, prefix, connector);

        if let Some(kids) = children.get(image.id.as_str()) {
            let child_prefix = format!("{}{}", prefix, indent);
            write_level(buffer, kids, children, options, &child_prefix, visited);
        }
    }
}

fn write_node(
    buffer: &mut String,
    image: &ImageRecord,
    options: &TreeOptions,
    prefix: &str,
    connector: &str,
) {
    let (label, size) = if options.incremental {
        ("Size", image.size)
    } else {
        ("Virtual Size", image.virtual_size)
    };
    let size = if options.human {
        human_size(size)
    } else {
        size.to_string()
    };

    buffer.push_str(&format!(
        "{}{}{} {}: {}",
        prefix,
        connector,
        truncate_id(&image.id, options.no_trunc),
        label,
        size
    ));
    if image.is_tagged() {
        buffer.push_str(&format!(" Tags: {}", image.repo_tags.join(", ")));
    }
    buffer.push('\n');
}
