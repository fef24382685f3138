//! Command implementations for the wortblick CLI

mod lookup;
mod misc;
mod page;
mod settings;

pub use lookup::*;
pub use misc::*;
pub use page::*;
pub use settings::*;
