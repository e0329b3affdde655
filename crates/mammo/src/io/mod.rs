pub mod loader;
pub mod report;
pub mod inputs;

pub use loader::{is_supported, load_image, SUPPORTED_EXTENSIONS};
pub use report::{render_report, write_report};
pub use inputs::{list_images, select_image, Selection};
