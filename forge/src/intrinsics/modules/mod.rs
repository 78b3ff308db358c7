pub mod json;
pub mod math;
pub mod time;
