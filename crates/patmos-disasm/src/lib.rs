pub mod analyze;
pub mod model;

pub use analyze::{explore, Block, BlockOut, Edge, EdgeKind, Exploration, Report};
pub use model::{load_raw_bin, parse_u32};
