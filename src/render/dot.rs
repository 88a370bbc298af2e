use std::collections::HashSet;

use log::warn;

use super::format::{human_size, sanitize_command, truncate_id};
use crate::image::ImageRecord;
use crate::tree::ChildIndex;

/// Width of the build command shown for untagged synthesized layers.
pub const COMMAND_WIDTH: usize = 30;

/// Render the forest as a Graphviz `digraph`.
///
/// Roots hang off an invisible `base` node so that separate trees line up.
pub fn images_to_dot(roots: &[&ImageRecord], children: &ChildIndex<'_>) -> String {
    let mut buffer = String::from("digraph docker {\n");
    let mut visited = HashSet::new();
    write_images(&mut buffer, roots, children, &mut visited);
    buffer.push_str(" base [style=invisible]\n}\n");
    buffer
}

fn write_images<'a>(
    buffer: &mut String,
    images: &[&'a ImageRecord],
    children: &ChildIndex<'a>,
    visited: &mut HashSet<&'a str>,
) {
    for image in images {
        if !visited.insert(image.id.as_str()) {
            warn!("Image {} reached twice, skipping", image.id);
            continue;
        }

        let id = truncate_id(&image.id, false);
        if image.is_root() {
            buffer.push_str(&format!(" base -> \"{}\" [style=invis]\n", id));
        } else {
            buffer.push_str(&format!(
                " \"{}\" -> \"{}\"\n",
                truncate_id(&image.parent_id, false),
                id
            ));
        }

        if image.is_tagged() {
            buffer.push_str(&format!(
                " \"{}\" [label=\"{}\\n{}\",shape=box,fillcolor=\"paleturquoise\",style=\"filled,rounded\"];\n",
                id,
                id,
                image.repo_tags.join("\\n")
            ));
        } else if image.is_synthetic() {
            let command = sanitize_command(
                image.created_by.as_deref().unwrap_or_default(),
                COMMAND_WIDTH,
            );
            buffer.push_str(&format!(
                " \"{}\" [label=\"{}\\n{}\"]\n",
                id,
                command,
                human_size(image.size)
            ));
        }

        if let Some(kids) = children.get(image.id.as_str()) {
            write_images(buffer, kids, children, visited);
        }
    }
}
