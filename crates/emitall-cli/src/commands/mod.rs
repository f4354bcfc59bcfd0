pub mod emit;
pub mod version;
