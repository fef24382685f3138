pub mod analysis;
pub mod blocks;
pub mod cli;
pub mod config;
pub mod diff;
pub mod dom;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod gloss;
pub mod interaction;
pub mod llm;
pub mod lookup;
pub mod matcher;
pub mod normalize;
pub mod reader;
pub mod rewrite;
pub mod session;
pub mod translate;

pub use error::{Result, WortblickError};
