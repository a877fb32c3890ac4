// JDWP socket multiplexer
//
// One background task owns the socket: it writes queued commands, routes replies back
// to their callers by packet id and forwards parsed event sets to a channel.

use crate::events::{parse_event_packet, EventSet};
use crate::protocol::{CommandPacket, JdwpError, JdwpResult, ReplyPacket, HEADER_SIZE, REPLY_FLAG};
use bytes::BytesMut;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Maximum allowed JDWP packet size (10MB)
const MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// Events are buffered so a slow operator never stalls reply routing
const EVENT_BUFFER: usize = 256;

/// Request to send a command and get reply
pub struct CommandRequest {
    pub packet: CommandPacket,
    pub reply_tx: oneshot::Sender<JdwpResult<ReplyPacket>>,
}

/// Handle to the event loop for sending commands and receiving events
#[derive(Clone, Debug)]
pub struct EventLoopHandle {
    command_tx: mpsc::Sender<CommandRequest>,
    event_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<EventSet>>>,
}

impl EventLoopHandle {
    /// Send a command and wait for reply
    pub async fn send_command(&self, packet: CommandPacket) -> JdwpResult<ReplyPacket> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(CommandRequest { packet, reply_tx })
            .await
            .map_err(|_| JdwpError::ConnectionClosed)?;

        reply_rx.await.map_err(|_| JdwpError::ConnectionClosed)?
    }

    /// Wait for the next event set; `None` once the socket is gone
    pub async fn recv_event(&self) -> Option<EventSet> {
        let mut rx = self.event_rx.lock().await;
        rx.recv().await
    }
}

/// Packet as read off the wire, header included
struct RawPacket {
    is_reply: bool,
    id: u32,
    bytes: Vec<u8>,
}

/// Start the event loop task
pub fn spawn_event_loop<R, W>(reader: R, writer: W) -> EventLoopHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(event_loop_task(reader, writer, command_rx, event_tx));

    EventLoopHandle {
        command_tx,
        event_rx: Arc::new(tokio::sync::Mutex::new(event_rx)),
    }
}

async fn event_loop_task<R, W>(
    mut reader: R,
    mut writer: W,
    mut command_rx: mpsc::Receiver<CommandRequest>,
    event_tx: mpsc::Sender<EventSet>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Event loop started");

    let mut pending_replies: HashMap<u32, oneshot::Sender<JdwpResult<ReplyPacket>>> =
        HashMap::new();

    loop {
        tokio::select! {
            Some(cmd) = command_rx.recv() => {
                let packet_id = cmd.packet.id;
                debug!("Sending command id={} set={} cmd={}",
                       packet_id, cmd.packet.command_set, cmd.packet.command);

                let encoded = cmd.packet.encode();
                let written = match writer.write_all(&encoded).await {
                    Ok(()) => writer.flush().await,
                    Err(e) => Err(e),
                };

                if let Err(e) = written {
                    error!("Failed to write command id={}: {}", packet_id, e);
                    cmd.reply_tx.send(Err(JdwpError::Io(e))).ok();
                    continue;
                }

                pending_replies.insert(packet_id, cmd.reply_tx);
            }

            result = read_packet(&mut reader) => {
                match result {
                    Ok(packet) if packet.is_reply => {
                        debug!("Received reply id={}", packet.id);

                        match pending_replies.remove(&packet.id) {
                            Some(tx) => {
                                tx.send(ReplyPacket::decode(&packet.bytes)).ok();
                            }
                            None => warn!("Received reply for unknown command id={}", packet.id),
                        }
                    }
                    Ok(packet) => {
                        // Event.Composite: payload follows the 11-byte command header
                        match parse_event_packet(&packet.bytes[HEADER_SIZE..]) {
                            Ok(event_set) => {
                                debug!("Parsed event set: {} events, suspend_policy={}",
                                       event_set.events.len(), event_set.suspend_policy);

                                // Awaiting here applies back-pressure instead of dropping halts
                                if event_tx.send(event_set).await.is_err() {
                                    warn!("Event receiver dropped, discarding event set");
                                }
                            }
                            Err(e) => warn!("Failed to parse event: {}", e),
                        }
                    }
                    Err(e) => {
                        if matches!(&e, JdwpError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof) {
                            info!("Target closed the JDWP connection");
                        } else {
                            error!("Failed to read packet: {}", e);
                        }
                        break;
                    }
                }
            }
        }
    }

    for (id, tx) in pending_replies.drain() {
        debug!("Failing pending command id={}", id);
        tx.send(Err(JdwpError::ConnectionClosed)).ok();
    }

    // Dropping event_tx closes the event channel, which is how consumers see the disconnect
    info!("Event loop shutting down");
}

/// Read one packet and classify it as reply or command (event)
async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> JdwpResult<RawPacket> {
    let mut header = BytesMut::zeroed(HEADER_SIZE);
    reader.read_exact(&mut header).await?;

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let id = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let flags = header[8];

    if length < HEADER_SIZE {
        return Err(JdwpError::Protocol(format!("Invalid packet length: {}", length)));
    }

    if length > MAX_PACKET_SIZE {
        return Err(JdwpError::Protocol(format!(
            "Packet too large: {} bytes (max: {} bytes)",
            length, MAX_PACKET_SIZE
        )));
    }

    let mut bytes = header.to_vec();
    bytes.resize(length, 0);
    reader.read_exact(&mut bytes[HEADER_SIZE..]).await?;

    Ok(RawPacket {
        is_reply: flags == REPLY_FLAG,
        id,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::event_kinds;
    use bytes::BufMut;
    use tokio::io::duplex;

    fn reply_bytes(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u32((HEADER_SIZE + payload.len()) as u32);
        buf.put_u32(id);
        buf.put_u8(REPLY_FLAG);
        buf.put_u16(0);
        buf.put_slice(payload);
        buf
    }

    fn vm_death_event_bytes() -> Vec<u8> {
        let mut body = Vec::new();
        body.put_u8(0);
        body.put_i32(1);
        body.put_u8(event_kinds::VM_DEATH);
        body.put_i32(0);

        let mut buf = Vec::new();
        buf.put_u32((HEADER_SIZE + body.len()) as u32);
        buf.put_u32(1);
        buf.put_u8(0);
        buf.put_u8(64);
        buf.put_u8(100);
        buf.put_slice(&body);
        buf
    }

    #[tokio::test]
    async fn test_reply_routed_to_caller() {
        let (client, mut vm) = duplex(1024);
        let (reader, writer) = tokio::io::split(client);
        let handle = spawn_event_loop(reader, writer);

        let pending = tokio::spawn({
            let handle = handle.clone();
            async move { handle.send_command(CommandPacket::new(42, 1, 9)).await }
        });

        let mut request = [0u8; HEADER_SIZE];
        vm.read_exact(&mut request).await.unwrap();
        assert_eq!(&request[4..8], &[0, 0, 0, 42]);

        vm.write_all(&reply_bytes(42, &[1, 2])).await.unwrap();

        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply.id, 42);
        assert_eq!(reply.data(), &[1, 2]);
    }

    #[tokio::test]
    async fn test_events_forwarded_then_channel_closes() {
        let (client, mut vm) = duplex(1024);
        let (reader, writer) = tokio::io::split(client);
        let handle = spawn_event_loop(reader, writer);

        vm.write_all(&vm_death_event_bytes()).await.unwrap();
        let set = handle.recv_event().await.unwrap();
        assert_eq!(set.events.len(), 1);

        drop(vm);
        assert!(handle.recv_event().await.is_none());
        assert!(matches!(
            handle.send_command(CommandPacket::new(1, 1, 1)).await,
            Err(JdwpError::ConnectionClosed) | Err(JdwpError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_packet_stops_loop() {
        let (client, mut vm) = duplex(64);
        let (reader, writer) = tokio::io::split(client);
        let handle = spawn_event_loop(reader, writer);

        let mut header = Vec::new();
        header.put_u32((MAX_PACKET_SIZE + 1) as u32);
        header.put_u32(1);
        header.put_u8(REPLY_FLAG);
        header.put_u16(0);
        vm.write_all(&header).await.unwrap();

        assert!(handle.recv_event().await.is_none());
    }
}
