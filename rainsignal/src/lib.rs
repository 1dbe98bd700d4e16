pub mod app;
pub mod backend;
pub mod weather;
