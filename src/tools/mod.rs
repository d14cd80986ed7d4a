pub mod fetch;
pub mod normalize;
