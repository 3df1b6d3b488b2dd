//! GiftGuide text processing
//!
//! Query normalization shared by the retrieval pipeline

mod normalize;

pub use normalize::{is_meaningful, normalize, ALPHABET_LETTERS};
