pub mod window;
pub mod overlay;
