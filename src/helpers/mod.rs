//! Small helpers shared by the renderer, the templates and the server

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
