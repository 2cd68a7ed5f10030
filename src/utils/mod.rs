pub mod files;
pub mod json;
pub mod text;
