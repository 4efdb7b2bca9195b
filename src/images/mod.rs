pub mod loader;
pub mod palette;

pub use loader::{ImageLoader, LoadedImage};
pub use palette::{extract_palette, Color, ImagePalette};
