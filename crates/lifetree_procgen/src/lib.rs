pub mod params;
pub mod seed;
pub mod tree;
pub mod foliage;
pub mod mesh;

pub use params::*;
pub use seed::{RandomSource, SeededRandom, TreeSeed};
pub use tree::*;
pub use foliage::*;
pub use mesh::*;
