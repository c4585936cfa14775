mod catalog;
pub use catalog::*;
mod series;
pub use series::*;
