// Request and response payloads shared by the three services

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
