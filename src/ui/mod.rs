mod cli;

pub use cli::*;
