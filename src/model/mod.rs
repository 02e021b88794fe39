pub mod config;
pub mod file_browser;
pub mod form;
pub mod input;
pub mod mode;
