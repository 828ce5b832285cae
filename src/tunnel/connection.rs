//! Per-connection handling for one accepted Tunnel socket peer: reads
//! inbound frames (user input, prompt replies), writes outbound frames
//! pushed onto this connection's channel.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::sync::mpsc;

use crate::framing::{read_frame, write_frame, FrameOutcome};
use crate::input::InputRouter;

use super::protocol::TunnelInbound;
use super::state::TunnelState;

pub(super) async fn handle_connection(
    stream: UnixStream,
    state: Arc<TunnelState>,
    input_router: Arc<InputRouter>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.set_outbound(tx);
    input_router.register_tunnel().await;

    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if write_frame(&mut write_half, &event).await.is_err() {
                break;
            }
        }
    });

    loop {
        match read_frame::<_, TunnelInbound>(&mut reader).await {
            Ok(Some(FrameOutcome::Parsed(TunnelInbound::UserInput { content }))) => {
                let _ = input_router.send_follow_up(content).await;
            }
            Ok(Some(FrameOutcome::Parsed(TunnelInbound::PromptResponse { request_id, detail }))) => {
                state.resolve_pending(&request_id, detail);
            }
            Ok(Some(FrameOutcome::Malformed)) => continue,
            Ok(None) => break,
            Err(e) => {
                log::warn!("tunnel: connection read error: {e}");
                break;
            }
        }
    }

    state.clear_outbound();
    writer_task.abort();
}
