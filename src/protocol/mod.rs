//! Invocation/response frames and the outer wire framing.

mod frames;
mod framing;

pub use frames::{CallKind, Invocation, Response, ResultKind};
pub use framing::{
    read_frame, read_invocation, read_response, write_invocation, write_response,
    LENGTH_PREFIX_SIZE,
};
