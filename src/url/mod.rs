//! URL handling: normalization of discovered links

mod normalize;

pub use normalize::normalize;
