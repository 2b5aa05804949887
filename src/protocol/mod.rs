//! Protocol module - wire format, line decoding and response grouping.
//!
//! Incoming bytes flow through two stages:
//! - [`LineDecoder`] turns arbitrary chunks into text lines and binary segments
//! - [`ResponseGrouper`] turns those tokens into greeting, success and failure units

mod grouper;
mod line_decoder;
mod wire_format;

pub use grouper::{Response, ResponseGrouper, ResponseUnit};
pub use line_decoder::{LineDecoder, Token, DEFAULT_MAX_BINARY_SIZE};
pub use wire_format::{
    encode_batch, encode_line, parse_ack, parse_binary_length, parse_changed, parse_greeting,
    Version, ACK_PREFIX, BINARY_PREFIX, CHANGED_PREFIX, COMMAND_LIST_END, COMMAND_LIST_OK_BEGIN,
    IDLE, LIST_OK, NOIDLE, OK,
};
