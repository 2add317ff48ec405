pub mod cancel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod overlap;
pub mod routing;

#[cfg(feature = "cli")]
pub use cli::run;
pub use engine::{LayoutEngine, LayoutHandle, LayoutResult};
pub use error::{GraphError, LayoutError};
