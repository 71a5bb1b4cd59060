//! JSON hub protocol: envelopes, message kinds, framing, handshake.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `envelope` | [`Envelope`] and [`MessageKind`] |
//! | `frame` | terminator-delimited text encoding |
//! | `handshake` | request/response exchanged once per connection |

pub mod envelope;
pub mod frame;
pub mod handshake;

pub use envelope::{Envelope, MessageKind};
pub use frame::{RECORD_SEPARATOR, decode_frame, encode_frame, split_frames, strip_terminator};
pub use handshake::{HandshakeRequest, HandshakeResponse};
