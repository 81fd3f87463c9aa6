pub mod check;
pub mod files;
