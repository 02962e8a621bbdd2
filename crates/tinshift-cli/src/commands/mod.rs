pub mod info;
pub mod transform;
