mod design;
pub use design::*;
mod ema;
pub use ema::*;
mod fir;
pub use fir::*;
mod pipeline;
pub use pipeline::*;
mod spectral;
pub use spectral::*;
