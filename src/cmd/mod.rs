pub mod extract;
pub mod manifest;
pub mod output;
pub mod resolve;
