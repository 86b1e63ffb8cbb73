pub mod app;
pub mod audio;
pub mod catalog;
pub mod coordinator;
pub mod model;
pub mod surface;
pub mod ui;
