pub mod batch;
pub mod common;
pub mod from_webcil;
pub mod info;
pub mod to_webcil;
