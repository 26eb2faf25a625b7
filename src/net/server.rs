//! TCP listener and connection lifecycle.
//!
//! One `Relay` owns the listening socket, the stores, and the session
//! registry. The whole server runs on a current-thread runtime inside a
//! `LocalSet`: the accept loop and every connection task share one thread,
//! multiplexed by the runtime's readiness polling. That is what makes the
//! lock-free stores sound — no two request handlers ever run at once.

use std::cell::Cell;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use log::*;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::store::Storage;

use super::handler::handle_client;
use super::session::{ConnId, SessionRegistry};

pub struct Relay {
    listener: TcpListener,
    cfg: Rc<Config>,
    storage: Rc<Storage>,
    sessions: SessionRegistry,
    active_conns: Rc<Cell<usize>>,
}

impl Relay {
    /// Bind the listening socket. Port 0 works; `local_addr` reports what
    /// the OS picked.
    pub async fn bind(cfg: Rc<Config>, storage: Storage) -> io::Result<Self> {
        let listener = TcpListener::bind(&cfg.server.bind_addr).await?;
        info!(
            "{} listening on {}",
            cfg.server.server_name,
            listener.local_addr()?
        );

        Ok(Self {
            listener,
            cfg,
            storage: Rc::new(storage),
            sessions: SessionRegistry::new(),
            active_conns: Rc::new(Cell::new(0)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle onto the session registry (for observation; the reactor owns
    /// the lifecycle).
    pub fn sessions(&self) -> SessionRegistry {
        self.sessions.clone()
    }

    /// Accept loop. Must run inside a `LocalSet` on a current-thread
    /// runtime; each connection becomes a local task.
    pub async fn run(self) {
        let mut next_conn_id: ConnId = 1;

        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(v) => v,
                Err(e) => {
                    error!("accept: {}", e);
                    continue;
                }
            };

            if self.active_conns.get() >= self.cfg.limits.max_active_conns {
                debug!("refusing connection from {}; too many", peer);
                drop(socket);
                continue;
            }

            let conn_id = next_conn_id;
            next_conn_id += 1;
            self.active_conns.set(self.active_conns.get() + 1);

            let cfg = self.cfg.clone();
            let storage = self.storage.clone();
            let sessions = self.sessions.clone();
            let active_conns = self.active_conns.clone();

            tokio::task::spawn_local(async move {
                debug!("connection {} from {}", conn_id, peer);

                let res = handle_client(socket, conn_id, cfg, storage, sessions.clone()).await;

                // every removal path unbinds: a session never outlives its
                // connection
                sessions.unbind(conn_id);
                active_conns.set(active_conns.get() - 1);

                match res {
                    Ok(()) => debug!("connection {} closed cleanly", conn_id),
                    Err(e) => debug!("connection {} ended: {}", conn_id, e),
                }
            });
        }
    }
}
