//! One task per TCP client: decode commands in, stream events out.

use common::stream;
use futures::SinkExt;
use server::Server;
use tokio::net::TcpStream;
use tokio::select;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{error, info};

pub(crate) fn spawn(core: Server, socket: TcpStream) {
    let id = uuid::Uuid::new_v4();

    let (read_half, write_half) = socket.into_split();
    let mut read = stream::commands(read_half);
    let mut write = stream::events(write_half);

    let outbound = core.register_client(id);
    let mut outbound = Box::pin(ReceiverStream::new(outbound));

    tokio::spawn(async move {
        loop {
            select! {
                Some(event) = outbound.next() => {
                    if write.send(event).await.is_err() {
                        break;
                    }
                }
                res = read.next() => {
                    match res {
                        Some(Ok(command)) => core.handle(id, command).await,
                        Some(Err(e)) => {
                            error!("error in client ({id}): `{e}`");
                            break;
                        }
                        // client disconnected
                        None => break,
                    }
                }
                else => break,
            }
        }

        core.disconnect(id).await;
        info!("client {id} disconnected");
    });
}
