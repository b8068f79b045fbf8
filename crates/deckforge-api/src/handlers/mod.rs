pub mod presentations;
pub mod root;
