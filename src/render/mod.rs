//! Output strategies for an image forest.
//!
//! Each renderer consumes the roots to start from and the [`ChildIndex`] built by
//! [`crate::tree::collect_children`], and returns the whole document as a `String`.
//!
//! [`ChildIndex`]: crate::tree::ChildIndex

pub mod dot;
pub mod format;
pub mod short;
pub mod tree;

pub use dot::images_to_dot;
pub use format::{human_size, sanitize_command, truncate_id};
pub use short::images_to_short;
pub use tree::{images_to_tree, TreeOptions};
