//! Push mode: one WebSocket carrying server messages in and commands out.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use mdsync_core::{encode, ChannelEvent, Outbound, PagePort, Session};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::ChannelError;
use crate::input::{apply_input, Input};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type FrameSink = SplitSink<Socket, Message>;
type FrameStream = SplitStream<Socket>;

/// Run a push session until the input channel closes, then hand the session back.
///
/// The connection is attempted once, alongside input handling, so keys
/// pressed during the handshake are dispatched while the channel is still
/// connecting. When it fails or drops the session stays alive for local
/// key handling.
pub async fn run_push<P: PagePort>(
    config: &ClientConfig,
    mut session: Session<P>,
    mut inputs: mpsc::Receiver<Input>,
) -> Session<P> {
    let connecting = connect(config);
    tokio::pin!(connecting);
    let mut handshake_pending = true;
    let mut sink: Option<FrameSink> = None;
    let mut stream: Option<FrameStream> = None;

    loop {
        tokio::select! {
            result = &mut connecting, if handshake_pending => {
                handshake_pending = false;
                match result {
                    Ok(socket) => {
                        session.on_channel(ChannelEvent::Opened);
                        let (socket_sink, socket_stream) = socket.split();
                        sink = Some(socket_sink);
                        stream = Some(socket_stream);
                    }
                    Err(err) => {
                        error!("ws_connect_error: {err}");
                        session.on_channel(ChannelEvent::Failed);
                    }
                }
            }
            frame = next_frame(&mut stream) => {
                let lost = match frame {
                    Some(Ok(Message::Text(text))) => {
                        if session.handle_frame(&text).is_err() {
                            debug!("ws_frame_dropped");
                        }
                        None
                    }
                    Some(Ok(Message::Close(_))) => Some(ChannelError::Closed),
                    Some(Ok(_)) => None,
                    Some(Err(err)) => Some(ChannelError::WebSocket(err)),
                    None => Some(ChannelError::Closed),
                };
                if let Some(err) = lost {
                    error!("ws_connection_lost: {err}");
                    session.on_channel(ChannelEvent::Lost);
                    stream = None;
                    sink = None;
                }
            }
            input = inputs.recv() => {
                let Some(input) = input else {
                    break;
                };
                for outbound in apply_input(&mut session, input) {
                    if let Err(err) = send(&mut sink, outbound).await {
                        error!("ws_send_error: {err}");
                        session.on_channel(ChannelEvent::Lost);
                        stream = None;
                        sink = None;
                    }
                }
            }
        }
    }

    if handshake_pending {
        debug!("ws_connect_abandoned");
    }
    if let Some(mut sink) = sink {
        let _ = sink.close().await;
    }
    session
}

async fn connect(config: &ClientConfig) -> Result<Socket, ChannelError> {
    let url = config.push_url()?;
    info!("ws_connect: {url}");
    let (socket, _) = timeout(config.connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| ChannelError::Timeout(config.connect_timeout))??;
    info!("ws_connected");
    Ok(socket)
}

async fn next_frame(
    stream: &mut Option<FrameStream>,
) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn send(sink: &mut Option<FrameSink>, outbound: Outbound) -> Result<(), ChannelError> {
    let Some(sink) = sink else {
        return Err(ChannelError::Closed);
    };
    match outbound {
        Outbound::Command(command) => {
            debug!("ws_send: {}", command.tag());
            sink.send(Message::Text(encode(&command))).await?;
        }
        other => warn!("ws_send_skipped: {other:?} has no push form"),
    }
    Ok(())
}
