mod cli;
mod connection;
mod log;

use std::net::{IpAddr, Ipv4Addr};

use server::Server;
use tokio::{net::TcpListener, select, task};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

async fn start_server(port: Option<u16>) -> anyhow::Result<()> {
    let token = CancellationToken::new();

    let server_task = {
        let token = token.child_token();

        task::spawn(async move {
            let core = Server::from_config();
            if let Err(e) = serve(core, port, token).await {
                error!("server error: {e}");
            }
        })
    };

    tokio::pin!(server_task);

    let ctrl_c = tokio::signal::ctrl_c();

    select! {
        Ok(_) = ctrl_c => {
            info!("shutdown signal received");
            token.cancel();
            if let Err(e) = server_task.await {
                error!("server task error: {e}");
            }
        }
        res = &mut server_task => {
            if let Err(e) = res {
                error!("server task error: {e}");
            }
        }
        else => {}
    }

    Ok(())
}

async fn serve(core: Server, port: Option<u16>, token: CancellationToken) -> anyhow::Result<()> {
    let port = port.unwrap_or(core.config().server_port);
    let listener = TcpListener::bind((IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).await?;

    info!("listening on {:?}", listener.local_addr().ok());

    loop {
        select! {
            Ok((socket, addr)) = listener.accept() => {
                info!("new connection from {addr}");
                connection::spawn(core.clone(), socket);
            }
            _ = token.cancelled() => {
                info!("listener stopping");
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log::init()?;

    let args = cli::parse_args()?;
    start_server(args.port).await?;

    Ok(())
}
