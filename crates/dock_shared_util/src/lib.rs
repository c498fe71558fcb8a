pub mod wrappers;

pub use wrappers::*;
