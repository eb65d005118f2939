//! Length-delimited JSON framing for the command/event wire.
//!
//! The transport only ever carries [`Command`] frames in and [`Event`]
//! frames out, so both halves are typed concretely; the connection task
//! splits the socket and wraps each half here.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_serde::{formats::SymmetricalJson, Framed, SymmetricallyFramed};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::event::client::Command;
use crate::event::server::Event;

/// The inbound half of a connection: one frame per client command.
pub type Read = Framed<
    FramedRead<OwnedReadHalf, LengthDelimitedCodec>,
    Command,
    Command,
    SymmetricalJson<Command>,
>;

/// The outbound half of a connection: one frame per server event.
pub type Write = Framed<
    FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>,
    Event,
    Event,
    SymmetricalJson<Event>,
>;

pub fn commands(half: OwnedReadHalf) -> Read {
    let framed = FramedRead::new(half, LengthDelimitedCodec::new());
    SymmetricallyFramed::new(framed, SymmetricalJson::default())
}

pub fn events(half: OwnedWriteHalf) -> Write {
    let framed = FramedWrite::new(half, LengthDelimitedCodec::new());
    SymmetricallyFramed::new(framed, SymmetricalJson::default())
}
