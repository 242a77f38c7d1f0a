//! Per-transfer streaming task.

use crate::state::Engine;
use crate::transfer::{Transfer, TransferState};
use fennec_proto::Response;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{info, warn};

/// Drive one transfer to completion: wait for the receiver, stream the
/// file, half-close the socket. The listener is closed as soon as the
/// receiver connects, so the transfer owns exactly one socket at a time.
pub(super) async fn run(
    engine: Arc<Engine>,
    transfer: Arc<Transfer>,
    listener: TcpListener,
    mut file: File,
) {
    let accept_timeout = Duration::from_secs(engine.transfer_config.accept_timeout);
    let mut stream = match timeout(accept_timeout, listener.accept()).await {
        Ok(Ok((stream, peer))) => {
            info!(transfer = transfer.id, %peer, "Receiver connected");
            stream
        }
        Ok(Err(e)) => {
            warn!(transfer = transfer.id, error = %e, "Accept failed");
            fail(&engine, &transfer, "accept failed");
            return;
        }
        Err(_) => {
            info!(transfer = transfer.id, "Offer expired unclaimed");
            fail(&engine, &transfer, "offer not accepted in time");
            return;
        }
    };
    drop(listener);
    transfer.set_state(TransferState::Accepted);

    transfer.set_state(TransferState::Streaming);
    let mut buf = vec![0u8; engine.transfer_config.chunk_size];
    loop {
        if transfer.abort_requested() {
            info!(
                transfer = transfer.id,
                sent = transfer.bytes_sent(),
                "Transfer aborted"
            );
            // The data socket is half-closed before it drops, on every exit.
            let _ = stream.shutdown().await;
            fail(&engine, &transfer, "aborted");
            return;
        }
        let n = match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(transfer = transfer.id, error = %e, "Read failed");
                let _ = stream.shutdown().await;
                fail(&engine, &transfer, "read failed");
                return;
            }
        };
        if let Err(e) = stream.write_all(&buf[..n]).await {
            warn!(transfer = transfer.id, error = %e, "Receiver went away");
            let _ = stream.shutdown().await;
            fail(&engine, &transfer, "receiver disconnected");
            return;
        }
        transfer.add_sent(n as u64);
    }

    // Half-close signals end of file to the receiver.
    let _ = stream.shutdown().await;
    transfer.set_state(TransferState::Closed);
    info!(
        transfer = transfer.id,
        sent = transfer.bytes_sent(),
        "Transfer complete"
    );
}

/// Close the transfer and tell the initiator why it did not finish.
fn fail(engine: &Arc<Engine>, transfer: &Transfer, reason: &str) {
    transfer.set_state(TransferState::Closed);
    let notice = Response::notice(
        &transfer.sender_nick,
        format!("DCC SEND {} failed: {}", transfer.filename, reason),
    );
    engine.send_to(transfer.sender_conn, notice);
}
