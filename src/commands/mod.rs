pub mod export;
pub mod extract;
pub mod grid;
pub mod info;
pub mod retry;
pub mod upload;
pub mod validate;
