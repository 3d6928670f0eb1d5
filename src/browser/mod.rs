pub mod cdp;
pub mod chromium;
pub mod renderer;

pub use renderer::{ChromiumRenderer, PageRenderer};
