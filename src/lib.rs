pub mod cache;
pub mod config;
pub mod dashboard;
pub mod histogram;
pub mod hittest;
pub mod model;
pub mod poll;
pub mod selection;
pub mod service;
pub mod terrain;
pub mod ui;
pub mod viewer;
pub mod viewport;

pub use config::ViewerConfig;
pub use service::HttpWorldService;
pub use viewer::ViewerState;
pub use viewport::Viewport;
