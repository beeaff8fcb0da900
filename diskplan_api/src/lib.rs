pub mod config;
pub mod constants;
pub mod devicegraph;
pub mod error;
pub mod primitives;
pub mod product;
pub mod wire;

/// Returns true when the value equals its type's default.
pub(crate) fn is_default<T: Default + PartialEq>(t: &T) -> bool {
    t == &T::default()
}
