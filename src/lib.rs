// Library exports for plotme

pub mod extract;
pub mod heatmap;
pub mod palette;
pub mod reader;
pub mod regress;
pub mod render;
pub mod scatter;
pub mod tokens;
