pub mod model;

pub use model::{from_listing, load_listing, read_u32, read_u8, Image, Segment};
