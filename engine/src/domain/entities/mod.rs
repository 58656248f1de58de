pub mod project;

pub use project::{Project, ProjectBuilder};
