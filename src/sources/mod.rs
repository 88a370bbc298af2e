pub mod docker;
pub mod input;
pub mod source;

pub use docker::DockerSource;
pub use input::read_input;
pub use source::Source;
