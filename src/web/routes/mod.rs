// Route handler modules

pub mod cleanup;
pub mod download;
pub mod health;
pub mod index;
pub mod result;
pub mod static_files;
pub mod upload;
