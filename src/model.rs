pub mod geometry;
pub mod tree;
