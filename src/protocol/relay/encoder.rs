//! Relay protocol message encoders.
//!
//! Response encoders are used by the server; request encoders are the client
//! side of the same wire format and are exercised by the integration tests.

use bytes::{BufMut, BytesMut};

use super::{
    Email, MailSummary, MSG_AUTH_LOGIN, MSG_AUTH_LOGOUT, MSG_AUTH_REGISTER, MSG_BYE,
    MSG_EMAIL_SEND, MSG_FAIL, MSG_INBOX_LIST, MSG_INBOX_LIST_OK, MSG_INBOX_READ,
    MSG_INBOX_READ_OK, MSG_OK, MSG_STATS, MSG_STATS_OK,
};
use crate::protocol::codec::{frame, put_str};

/// Encode an OK response.
pub fn encode_ok() -> BytesMut {
    frame(MSG_OK, &[])
}

/// Encode a FAIL response.
pub fn encode_fail(code: u32, msg: &str) -> BytesMut {
    let mut p = BytesMut::with_capacity(4 + 4 + msg.len());
    p.put_u32_le(code);
    put_str(&mut p, msg);
    frame(MSG_FAIL, &p)
}

/// Encode an INBOX_LIST_OK response.
pub fn encode_inbox_list_ok(items: &[MailSummary]) -> BytesMut {
    let mut p = BytesMut::new();
    p.put_u32_le(items.len() as u32);

    for it in items {
        p.put_u32_le(it.index);
        put_str(&mut p, &it.sender);
        put_str(&mut p, &it.subject);
        put_str(&mut p, &it.date);
    }

    frame(MSG_INBOX_LIST_OK, &p)
}

/// Encode an INBOX_READ_OK response carrying a full email.
pub fn encode_inbox_read_ok(email: &Email) -> BytesMut {
    let mut p = BytesMut::new();
    put_email_fields(&mut p, email);
    frame(MSG_INBOX_READ_OK, &p)
}

/// Encode a STATS_OK response.
pub fn encode_stats_ok(email_count: u32, total_bytes: u64) -> BytesMut {
    let mut p = BytesMut::with_capacity(4 + 8);
    p.put_u32_le(email_count);
    p.put_u64_le(total_bytes);
    frame(MSG_STATS_OK, &p)
}

/// Encode an AUTH_REGISTER request.
pub fn encode_auth_register(username: &str, password: &str) -> BytesMut {
    encode_credentials(MSG_AUTH_REGISTER, username, password)
}

/// Encode an AUTH_LOGIN request.
pub fn encode_auth_login(username: &str, password: &str) -> BytesMut {
    encode_credentials(MSG_AUTH_LOGIN, username, password)
}

/// Encode an AUTH_LOGOUT request.
pub fn encode_auth_logout() -> BytesMut {
    frame(MSG_AUTH_LOGOUT, &[])
}

/// Encode an INBOX_LIST request.
pub fn encode_inbox_list() -> BytesMut {
    frame(MSG_INBOX_LIST, &[])
}

/// Encode an INBOX_READ request for a 1-based index.
pub fn encode_inbox_read(index: u32) -> BytesMut {
    let mut p = BytesMut::with_capacity(4);
    p.put_u32_le(index);
    frame(MSG_INBOX_READ, &p)
}

/// Encode an EMAIL_SEND request.
pub fn encode_email_send(email: &Email) -> BytesMut {
    let mut p = BytesMut::new();
    put_email_fields(&mut p, email);
    frame(MSG_EMAIL_SEND, &p)
}

/// Encode a STATS request.
pub fn encode_stats() -> BytesMut {
    frame(MSG_STATS, &[])
}

/// Encode a BYE notice. The server sends no response to this.
pub fn encode_bye(username: &str) -> BytesMut {
    let mut p = BytesMut::new();
    put_str(&mut p, username);
    frame(MSG_BYE, &p)
}

fn encode_credentials(tag: u8, username: &str, password: &str) -> BytesMut {
    let mut p = BytesMut::new();
    put_str(&mut p, username);
    put_str(&mut p, password);
    frame(tag, &p)
}

fn put_email_fields(p: &mut BytesMut, email: &Email) {
    put_str(p, &email.sender);
    put_str(p, &email.destination);
    put_str(p, &email.subject);
    put_str(p, &email.date);
    put_str(p, &email.body);
}
