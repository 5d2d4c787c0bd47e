/// Assignment of output files to nodes.
pub mod layout;
/// Relative hyperlinks between output files.
pub mod paths;

pub use layout::{Layout, LayoutError};
pub use paths::{PathError, relative_path};
