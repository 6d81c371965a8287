mod gate;
mod https;
mod request_id;

pub(crate) use gate::found;
pub use gate::{APP_REQUEST_HEADER, GateDecision, RequestClass, classify, gate_middleware};
pub use https::https_redirect_middleware;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
