pub mod builder;
pub mod handler;
pub mod listener;
pub mod response;

pub use builder::ServerBuilder;
pub use handler::{RequestHandler, Route, LATEST_PATH};
pub use response::{format_timespan, render_report};
