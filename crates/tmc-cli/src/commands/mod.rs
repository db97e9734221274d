pub mod decide;
pub mod validate;
