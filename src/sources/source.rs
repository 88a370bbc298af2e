use crate::container::Container;
use crate::error::Result;
use crate::history::HistoryEntry;
use crate::image::ImageRecord;

/// A container runtime that can be queried for its image and container inventory.
pub trait Source {
    /// Returns the name of the source for identification purposes
    fn name(&self) -> &str;

    /// All images, intermediate ones included.
    fn list_images(&self) -> Result<Vec<ImageRecord>>;

    /// Build history of `image`, oldest layer first.
    ///
    /// The newest entry carries the image's own repository tags.
    fn image_history(&self, image: &ImageRecord) -> Result<Vec<HistoryEntry>>;

    /// All containers, stopped ones included.
    fn list_containers(&self) -> Result<Vec<Container>>;
}
