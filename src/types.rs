//! Common types and aliases used throughout dioxus-infinite-provider

/// Common trait bounds for accumulated page items
pub trait ItemBounds: Clone + Send + Sync + 'static {}
impl<T> ItemBounds for T where T: Clone + Send + Sync + 'static {}

/// Common trait bounds for items exposed after a `select` transform
pub trait DataBounds: Clone + PartialEq + Send + Sync + 'static {}
impl<T> DataBounds for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Common trait bounds for page provider error types
pub trait ProviderErrorBounds: Clone + PartialEq + Send + Sync + 'static {}
impl<T> ProviderErrorBounds for T where T: Clone + PartialEq + Send + Sync + 'static {}
