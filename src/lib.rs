pub mod config;
pub mod container;
pub mod error;
pub mod history;
pub mod image;
pub mod render;
pub mod sources;
pub mod tree;
pub mod view;

// Re-exports for easy access
pub use config::{ConnectionConfig, ConnectionOverrides};
pub use container::{containers_to_dot, decode_containers, Container, Port};
pub use error::{Result, VizError};
pub use history::{HistoryEntry, HistorySynthesizer};
pub use image::{decode_images, ImageRecord, UNTAGGED};
pub use sources::{read_input, DockerSource, Source};
pub use tree::{collect_children, collect_roots, filter_images, find_start_image, ChildIndex};
pub use view::{render_images, OutputFormat, ViewOptions};
