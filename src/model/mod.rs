//! Request and response value types shared by every pipeline stage.

pub mod request;
pub mod response;

pub use request::{
    HeaderValue, Headers, Method, Params, RequestBody, RequestSpec, RequestSpecInput,
};
pub use response::ResponseEnvelope;
