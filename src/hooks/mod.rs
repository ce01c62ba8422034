//! Dioxus hooks for infinite providers

mod container;
mod infinite;

pub use container::{ListContent, use_list_container, use_list_content};
pub use infinite::{UseInfiniteProvider, use_infinite_provider};
