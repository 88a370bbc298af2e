//! One rendering pass over a decoded image list.
//!
//! [`render_images`] applies, in order: the label filter, the optional re-root at a
//! start image, and the selected renderer.

use log::{debug, info};

use crate::error::Result;
use crate::image::ImageRecord;
use crate::render::{images_to_dot, images_to_short, images_to_tree, TreeOptions};
use crate::tree::{collect_children, collect_roots, filter_images, find_start_image};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    Tree,
    Short,
}

#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// Id prefix or `repo[:tag]` to root the output at.
    pub start: Option<String>,
    /// Hide untagged, non-branching intermediate images.
    pub only_labelled: bool,
    pub tree: TreeOptions,
}

pub fn render_images(
    images: &[ImageRecord],
    format: OutputFormat,
    options: &ViewOptions,
) -> Result<String> {
    if format == OutputFormat::Short {
        return Ok(images_to_short(images));
    }

    let filtered;
    let images = if options.only_labelled {
        filtered = filter_images(images, &collect_children(images));
        filtered.as_slice()
    } else {
        images
    };
    let children = collect_children(images);

    let start = match &options.start {
        Some(token) => {
            let mut start = find_start_image(token, images)?.clone();
            info!("Rendering from start image {}", start.id);
            start.parent_id.clear();
            Some(start)
        }
        None => None,
    };
    let roots = match &start {
        Some(start) => vec![start],
        None => collect_roots(images),
    };
    debug!("Rendering {} roots as {:?}", roots.len(), format);

    Ok(match format {
        OutputFormat::Dot => images_to_dot(&roots, &children),
        _ => images_to_tree(&roots, &children, &options.tree),
    })
}
