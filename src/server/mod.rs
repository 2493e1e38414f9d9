pub mod builder;
pub mod handler;
pub mod response;

pub use builder::{Listening, ServerBuilder};
pub use handler::{AppState, RequestHandler, REQUEST_ID_HEADER};
pub use response::{json_response, HttpError};
