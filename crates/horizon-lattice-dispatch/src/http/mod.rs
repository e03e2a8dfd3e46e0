//! HTTP value types shared by the pipeline and adapters.
//!
//! The dispatcher never touches the network itself; it hands a finalized
//! [`RequestConfig`](crate::config::RequestConfig) to an adapter and receives
//! a [`Response`]. This module holds the types on both sides of that
//! boundary, plus the URL helpers adapters use to build the request target.

mod request;
mod response;
pub mod url;

pub use request::{Authentication, Body, Method};
pub use response::{Response, ResponseType, TransferProgress};
pub use self::url::{FormParamsSerializer, ParamsSerializer};
