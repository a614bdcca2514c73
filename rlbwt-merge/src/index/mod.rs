pub mod bwt;
pub mod occ;
pub mod rle;
pub mod rlbwt;
pub mod run;
pub mod sa;

pub use occ::{AlphaCount, DEFAULT_SAMPLE_RATE};
pub use rlbwt::{IndexMeta, IndexStats, RlBwt};
pub use run::{RunUnit, RUN_CAPACITY};
