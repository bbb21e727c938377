pub mod handler_utils;
pub mod process_image;
pub mod server;
