pub mod backend;
pub mod cli;
pub mod config;
pub mod date;
pub mod error;
pub mod label;
pub mod macros;
pub mod runner;
pub mod stamp;

pub use backend::{Backend, BackendChoice, CommitTime, HeadInfo};
pub use error::StampError;
pub use macros::Stamp;
pub use stamp::Generator;
