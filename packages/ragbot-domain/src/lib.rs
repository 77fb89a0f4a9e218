pub mod conversation;
pub mod exit;
pub mod knowledge;
pub mod prompt;
pub mod similarity;

mod error;

pub use error::{Error, Result};
