pub mod encoder;
pub mod workspace;
