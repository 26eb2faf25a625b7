//! Relay protocol message decoders.

use crate::common::error::CodecError;
use crate::protocol::codec::{get_str_max, get_u32};

use super::types::{Email, FieldCaps, Request};
use super::{
    MSG_AUTH_LOGIN, MSG_AUTH_LOGOUT, MSG_AUTH_REGISTER, MSG_BYE, MSG_EMAIL_SEND, MSG_INBOX_LIST,
    MSG_INBOX_READ, MSG_STATS,
};

// RFC 5321 caps a full address path at 254 octets; date strings are short.
const MAX_ADDR_BYTES: usize = 254;
const MAX_DATE_BYTES: usize = 128;

/// Decode a request frame into its `Request` variant.
///
/// `tag` is the frame's tag byte, `payload` the rest of the frame. Tags
/// outside the request set yield `CodecError::UnknownTag`.
pub fn decode_request(tag: u8, payload: &[u8], caps: &FieldCaps) -> Result<Request, CodecError> {
    match tag {
        MSG_AUTH_REGISTER => {
            let (username, password) = decode_credentials(payload, caps)?;
            Ok(Request::Register { username, password })
        }
        MSG_AUTH_LOGIN => {
            let (username, password) = decode_credentials(payload, caps)?;
            Ok(Request::Login { username, password })
        }
        MSG_AUTH_LOGOUT => Ok(Request::Logout),
        MSG_INBOX_LIST => Ok(Request::InboxList),
        MSG_INBOX_READ => {
            let mut p = payload;
            let index = get_u32(&mut p)?;
            Ok(Request::InboxRead { index })
        }
        MSG_EMAIL_SEND => Ok(Request::Send(decode_email(payload, caps)?)),
        MSG_STATS => Ok(Request::Stats),
        MSG_BYE => {
            let mut p = payload;
            let username = get_str_max(&mut p, caps.max_name_bytes)?;
            Ok(Request::Bye { username })
        }
        other => Err(CodecError::UnknownTag(other)),
    }
}

/// Decode a username/password payload.
fn decode_credentials(payload: &[u8], caps: &FieldCaps) -> Result<(String, String), CodecError> {
    let mut p = payload;

    let username = get_str_max(&mut p, caps.max_name_bytes)?;
    let password = get_str_max(&mut p, caps.max_name_bytes)?;

    Ok((username, password))
}

/// Decode an EMAIL_SEND payload.
fn decode_email(payload: &[u8], caps: &FieldCaps) -> Result<Email, CodecError> {
    let mut p = payload;

    let sender = get_str_max(&mut p, MAX_ADDR_BYTES)?;
    let destination = get_str_max(&mut p, MAX_ADDR_BYTES)?;
    let subject = get_str_max(&mut p, caps.max_subject_bytes)?;
    let date = get_str_max(&mut p, MAX_DATE_BYTES)?;
    let body = get_str_max(&mut p, caps.max_body_bytes)?;

    Ok(Email {
        sender,
        destination,
        subject,
        date,
        body,
    })
}
