pub mod predict;

pub use predict::{predict, predict_file};
