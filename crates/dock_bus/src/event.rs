use dock_shared_util::BusPath;
use futures::{Stream, StreamExt};
use zbus::{zvariant::Structure, MatchRule, MessageStream};

use crate::{names, structure_to_args, Result, TransportError, WireValue};

/// Which of the two dock interfaces a signal was emitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventInterface {
    /// Signals about the applet's main icon.
    Applet,
    /// Signals about one of its sub-icons. The sub-icon id is the last argument.
    SubApplet,
}

impl EventInterface {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            names::APPLET_INTERFACE => Some(EventInterface::Applet),
            names::SUB_APPLET_INTERFACE => Some(EventInterface::SubApplet),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventInterface::Applet => names::APPLET_INTERFACE,
            EventInterface::SubApplet => names::SUB_APPLET_INTERFACE,
        }
    }
}

/// A signal sent by the dock to one applet.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDescriptor {
    pub path: BusPath,
    pub interface: EventInterface,
    pub member: String,
    pub args: Vec<WireValue>,
}

impl EventDescriptor {
    pub fn new(path: impl Into<BusPath>, interface: EventInterface, member: &str, args: Vec<WireValue>) -> Self {
        EventDescriptor { path: path.into(), interface, member: member.to_owned(), args }
    }

    /// Read a dock signal. Returns `Ok(None)` for messages that are not applet signals.
    pub fn from_message(msg: &zbus::Message) -> Result<Option<Self>> {
        if msg.message_type() != zbus::message::Type::Signal {
            return Ok(None);
        }
        let header = msg.header();
        let Some(interface) = header.interface().and_then(|i| EventInterface::from_name(i.as_str())) else {
            return Ok(None);
        };
        let (Some(path), Some(member)) = (header.path(), header.member()) else {
            return Ok(None);
        };
        let member = member.as_str().to_owned();

        let has_body = header.signature().map_or(false, |sig| !sig.as_str().is_empty());
        let args = if has_body {
            let body = msg.body();
            let structure: Structure<'_> = body.deserialize().map_err(|e| TransportError::decode(&member, e))?;
            structure_to_args(structure).map_err(|e| TransportError::decode(&member, e))?
        } else {
            Vec::new()
        };

        Ok(Some(EventDescriptor { path: BusPath(path.as_str().to_owned()), interface, member, args }))
    }
}

/// Subscribe to every applet signal the dock emits below its root path.
///
/// Undecodable signals are logged and skipped. The stream ends when the connection closes.
pub async fn dock_events(con: &zbus::Connection) -> Result<impl Stream<Item = EventDescriptor>> {
    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .path_namespace(names::DOCK_ROOT_PATH)?
        .build();
    let stream = MessageStream::for_match_rule(rule, con, Some(256)).await?;

    Ok(stream.filter_map(|msg| async move {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Error while reading dock signals: {}", e);
                return None;
            }
        };
        match EventDescriptor::from_message(&msg) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping dock signal: {}", e);
                None
            }
        }
    }))
}
