pub mod preprocessing;
pub mod thresholding;
pub mod morphology;
pub mod components;
pub mod quantify;
pub mod localize;

pub use preprocessing::*;
pub use thresholding::*;
pub use morphology::*;
pub use components::*;
pub use quantify::*;
pub use localize::*;
