use std::sync::atomic::{AtomicBool, Ordering};

use dock_shared_util::BusPath;
use futures::future::BoxFuture;
use zbus::zvariant::Structure;

use crate::{args_to_structure, names, structure_to_args, Result, TransportError, WireValue};

/// A method call on one of the dock's objects.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub path: BusPath,
    pub interface: &'static str,
    pub member: &'static str,
    pub args: Vec<WireValue>,
}

impl MethodCall {
    pub fn new(path: BusPath, interface: &'static str, member: &'static str, args: Vec<WireValue>) -> Self {
        MethodCall { path, interface, member, args }
    }

    /// A call on the dock object itself.
    pub fn dock(member: &'static str) -> Self {
        MethodCall::new(BusPath::from(names::DOCK_ROOT_PATH), names::DOCK_INTERFACE, member, Vec::new())
    }
}

/// Sends calls to the dock and waits for their reply.
///
/// Implemented over the session bus by [`ZbusTransport`]. Tests swap in an in-memory dock.
pub trait DockTransport: Send + Sync {
    fn call(&self, call: MethodCall) -> BoxFuture<'_, Result<Vec<WireValue>>>;

    /// Refuse every later call with [`TransportError::Closed`].
    fn close(&self);

    fn is_closed(&self) -> bool;
}

pub struct ZbusTransport {
    con: zbus::Connection,
    closed: AtomicBool,
}

impl std::fmt::Debug for ZbusTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZbusTransport").field("closed", &self.closed).finish()
    }
}

impl ZbusTransport {
    pub fn new(con: zbus::Connection) -> Self {
        ZbusTransport { con, closed: AtomicBool::new(false) }
    }

    pub fn connection(&self) -> &zbus::Connection {
        &self.con
    }

    async fn send(&self, call: MethodCall) -> Result<Vec<WireValue>> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        log::trace!("-> {} {}.{}({:?})", call.path, call.interface, call.member, call.args);

        let path = call.path.as_str();
        let reply = match args_to_structure(&call.args) {
            Some(body) => {
                self.con.call_method(Some(names::DOCK_BUS), path, Some(call.interface), call.member, &body).await?
            }
            None => self.con.call_method(Some(names::DOCK_BUS), path, Some(call.interface), call.member, &()).await?,
        };

        let has_body = reply.header().signature().map_or(false, |sig| !sig.as_str().is_empty());
        if !has_body {
            return Ok(Vec::new());
        }
        let body = reply.body();
        let structure: Structure<'_> = body.deserialize().map_err(|e| TransportError::decode(call.member, e))?;
        structure_to_args(structure).map_err(|e| TransportError::decode(call.member, e))
    }
}

impl DockTransport for ZbusTransport {
    fn call(&self, call: MethodCall) -> BoxFuture<'_, Result<Vec<WireValue>>> {
        Box::pin(self.send(call))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
