//! Per-connection request loop: read a RESP request, dispatch it against
//! the registry, write back a reply. One task per accepted socket, mirroring
//! the teacher's one-task-per-worker pattern in `server::pool::worker`.

use std::sync::Arc;

use dispenser_core::Registry;
use dispenser_proto::{command::merge_config, reply, resp, Command, Frame, ProtoError};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;

/// Runs the read-dispatch-write loop for one accepted connection until the
/// peer disconnects or a framing error makes the stream unrecoverable.
pub async fn handle_connection(socket: TcpStream, registry: Arc<Registry>) {
    let peer = socket.peer_addr().ok();
    let (reader, writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    loop {
        let request = match resp::read_request(&mut reader).await {
            Ok(Some(args)) => args,
            Ok(None) => break,
            Err(err) => {
                let _ = resp::write_frame(&mut writer, &Frame::from(err)).await;
                break;
            }
        };

        let frame = match Command::parse(&request) {
            Ok(command) => dispatch(&registry, command),
            Err(err) => Frame::from(err),
        };

        if resp::write_frame(&mut writer, &frame).await.is_err() {
            break;
        }
    }

    let _ = writer.shutdown().await;
    tracing::debug!(?peer, "connection closed");
}

fn dispatch(registry: &Registry, command: Command) -> Frame {
    match command {
        Command::Ping => reply::ping_reply(),
        Command::Get { name } => match registry.next(&name) {
            Ok(identifier) => reply::get_reply(identifier),
            Err(err) => Frame::from(ProtoError::from(err)),
        },
        Command::Info { name } => match registry.snapshot(&name) {
            Ok(snapshot) => reply::info_reply(&name, &snapshot),
            Err(err) => Frame::from(ProtoError::from(err)),
        },
        Command::Del { name } => reply::del_reply(registry.delete(&name)),
        Command::HSet { name, fields } => hset(registry, &name, &fields),
    }
}

fn hset(registry: &Registry, name: &str, fields: &[(String, String)]) -> Frame {
    let existing = registry.config(name);
    let base = existing.clone().unwrap_or_default();
    let config = match merge_config(&base, fields, existing.is_none()) {
        Ok(config) => config,
        Err(err) => return Frame::from(err),
    };

    match registry.create_or_reconfigure(name, config) {
        Ok(outcome) => reply::hset_reply(fields.len(), outcome),
        Err(err) => Frame::from(ProtoError::from(err)),
    }
}
