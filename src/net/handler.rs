//! Per-connection request/response loop and dispatch.
//!
//! Exactly one frame is read and fully handled per iteration; handlers run
//! to completion without awaiting anything, so requests on one connection
//! are processed strictly in arrival order and no two handlers ever overlap.

use std::io;
use std::rc::Rc;

use bytes::BytesMut;
use chrono::Utc;
use log::*;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::error::{CodecError, RelayError};
use crate::config::Config;
use crate::protocol::relay::{
    decode_request, encode_fail, encode_inbox_list_ok, encode_inbox_read_ok, encode_ok,
    encode_stats_ok, Email, FieldCaps, Request, ERR_PROTOCOL,
};
use crate::store::{Delivery, Storage};

use super::frame::{read_frame, write_frame};
use super::session::{ConnId, SessionRegistry};

/// Drive one client connection until it disconnects or misbehaves.
///
/// Returns `Ok(())` on clean closure (peer EOF or BYE) and an error on
/// framing violations; either way the caller removes the connection and its
/// session.
pub async fn handle_client<S: AsyncRead + AsyncWrite + Unpin>(
    mut stream: S,
    conn_id: ConnId,
    cfg: Rc<Config>,
    storage: Rc<Storage>,
    sessions: SessionRegistry,
) -> io::Result<()> {
    let caps = FieldCaps::from(&cfg.limits);

    loop {
        let frame = match read_frame(&mut stream, cfg.limits.max_frame_bytes).await {
            Ok(v) => v,
            // peer closed between frames: clean disconnect
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => {
                debug!("connection {}: framing error: {}", conn_id, e);
                return Err(e);
            }
        };

        let tag = frame[0];
        let payload = &frame[1..];
        debug!(
            "connection {}: request tag=0x{:02x}, payload_size={}",
            conn_id,
            tag,
            payload.len()
        );

        let request = match decode_request(tag, payload, &caps) {
            Ok(r) => r,
            Err(CodecError::UnknownTag(t)) => {
                warn!("connection {}: unknown request tag 0x{:02x}", conn_id, t);
                let msg = format!("{}: unknown request", cfg.server.server_name);
                write_frame(&mut stream, &encode_fail(ERR_PROTOCOL, &msg)).await?;
                continue;
            }
            Err(e) => {
                warn!("connection {}: bad request payload: {}", conn_id, e);
                let msg = format!("{}: invalid request data", cfg.server.server_name);
                write_frame(&mut stream, &encode_fail(ERR_PROTOCOL, &msg)).await?;
                continue;
            }
        };

        // BYE is a notice, not a request: no response, connection closes.
        if let Request::Bye { username } = &request {
            debug!("connection {}: bye from {:?}", conn_id, username);
            sessions.unbind(conn_id);
            return Ok(());
        }

        let response = dispatch(request, conn_id, &cfg, &storage, &sessions);
        write_frame(&mut stream, &response).await?;
    }
}

/// Route one decoded request to its handler and encode the outcome.
///
/// Handler faults come back as `RelayError` values and are converted to FAIL
/// frames here; nothing a handler does can take down the reactor or touch
/// another connection.
fn dispatch(
    request: Request,
    conn_id: ConnId,
    cfg: &Config,
    storage: &Storage,
    sessions: &SessionRegistry,
) -> BytesMut {
    let result = match request {
        Request::Register { username, password } => {
            handle_register(conn_id, storage, sessions, &username, &password)
        }
        Request::Login { username, password } => {
            handle_login(conn_id, storage, sessions, &username, &password)
        }
        Request::Logout => handle_logout(conn_id, sessions),
        Request::InboxList => handle_inbox_list(conn_id, storage, sessions),
        Request::InboxRead { index } => handle_inbox_read(conn_id, storage, sessions, index),
        Request::Send(email) => handle_email_send(conn_id, cfg, storage, sessions, email),
        Request::Stats => handle_stats(conn_id, storage, sessions),
        // filtered out by the caller
        Request::Bye { .. } => Ok(encode_ok()),
    };

    match result {
        Ok(buf) => buf,
        Err(e) => {
            match &e {
                RelayError::Storage(cause) => {
                    error!("connection {}: storage fault: {}", conn_id, cause)
                }
                other => debug!("connection {}: refused: {}", conn_id, other),
            }
            encode_fail(e.code(), &format!("{}: {}", cfg.server.server_name, e))
        }
    }
}

/// The username bound to this connection, or a session-required refusal.
fn require_session(conn_id: ConnId, sessions: &SessionRegistry) -> Result<String, RelayError> {
    sessions
        .identity_of(conn_id)
        .ok_or(RelayError::SessionRequired)
}

fn handle_register(
    conn_id: ConnId,
    storage: &Storage,
    sessions: &SessionRegistry,
    username: &str,
    password: &str,
) -> Result<BytesMut, RelayError> {
    storage.accounts.register(username, password)?;
    // a fresh account starts its session immediately
    sessions.bind(conn_id, username);
    Ok(encode_ok())
}

fn handle_login(
    conn_id: ConnId,
    storage: &Storage,
    sessions: &SessionRegistry,
    username: &str,
    password: &str,
) -> Result<BytesMut, RelayError> {
    storage.accounts.authenticate(username, password)?;
    sessions.bind(conn_id, username);
    debug!("connection {}: authenticated as {}", conn_id, username);
    Ok(encode_ok())
}

fn handle_logout(conn_id: ConnId, sessions: &SessionRegistry) -> Result<BytesMut, RelayError> {
    // back to anonymous; the connection stays open. Idempotent.
    if let Some(user) = sessions.unbind(conn_id) {
        debug!("connection {}: {} logged out", conn_id, user);
    }
    Ok(encode_ok())
}

fn handle_inbox_list(
    conn_id: ConnId,
    storage: &Storage,
    sessions: &SessionRegistry,
) -> Result<BytesMut, RelayError> {
    let user = require_session(conn_id, sessions)?;
    let items = storage.mailbox.list(&user)?;
    Ok(encode_inbox_list_ok(&items))
}

fn handle_inbox_read(
    conn_id: ConnId,
    storage: &Storage,
    sessions: &SessionRegistry,
    index: u32,
) -> Result<BytesMut, RelayError> {
    let user = require_session(conn_id, sessions)?;
    let email = storage.mailbox.read(&user, index)?;
    Ok(encode_inbox_read_ok(&email))
}

fn handle_email_send(
    conn_id: ConnId,
    cfg: &Config,
    storage: &Storage,
    sessions: &SessionRegistry,
    mut email: Email,
) -> Result<BytesMut, RelayError> {
    require_session(conn_id, sessions)?;

    if email.date.is_empty() {
        email.date = Utc::now().to_rfc2822();
    }

    match storage.mailbox.deliver(&email, &cfg.server.domain)? {
        Delivery::Delivered => Ok(encode_ok()),
        Delivery::DeadLettered => Err(RelayError::Delivery(format!(
            "no account for {}; message dead-lettered",
            email.destination
        ))),
        Delivery::Rejected => Err(RelayError::Delivery(format!(
            "cannot relay outside {}",
            cfg.server.domain
        ))),
    }
}

fn handle_stats(
    conn_id: ConnId,
    storage: &Storage,
    sessions: &SessionRegistry,
) -> Result<BytesMut, RelayError> {
    let user = require_session(conn_id, sessions)?;
    let (email_count, total_bytes) = storage.mailbox.stats(&user)?;
    Ok(encode_stats_ok(email_count, total_bytes))
}
