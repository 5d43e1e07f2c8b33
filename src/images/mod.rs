pub mod services;

pub use services::{import_photo, photo_filename, read_photo_bytes};
