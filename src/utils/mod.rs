pub mod scaler;
pub mod sparse;
