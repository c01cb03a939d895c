//! Helm chart rendering.

mod renderer;

pub use renderer::{HelmRenderer, Renderer};
