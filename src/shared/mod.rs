pub mod interpolator;
pub mod test_helpers;
pub mod types;
pub mod validation;
