pub mod chart;
pub mod series;

pub use chart::*;
pub use series::*;
