// Contract documents: PDF text extraction and rendering, upload parsing, and the
// text normalization used when comparing contract versions.

pub mod extract;
pub mod handlers;
pub mod normalize;
pub mod render;
pub mod upload;
