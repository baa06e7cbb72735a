//! Connection session state machine.
//!
//! Owns the WebSocket for its whole lifecycle: `Connecting → Open →
//! Closing → Closed`, with `Closed` cycling back to `Connecting` after a
//! fixed short delay. The link retries forever -- this client runs
//! unattended and a retry prompt would help nobody.
//!
//! Everything session-scoped (caches, pending correlation tokens, the
//! send queue) is wiped on every disconnect; the bridge may restart with
//! different internal state and stale values would lie.

use std::sync::{Arc, PoisonError, RwLock};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use groundlink_proto::{DataFrame, Envelope, ProtoError, conbus, decode_frames, encode};

use crate::config::BridgeConfig;
use crate::correlator::Correlator;
use crate::model::DeviceLifecycle;
use crate::queue::SendQueue;
use crate::router::TopicRouter;
use crate::store::SessionCache;

/// Node whose `Operating` report gates the register sweep.
pub(crate) const CAN_NODE: &str = "autonav_serial_can";

/// Transport lifecycle, observable through [`crate::Bridge::link_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// User-facing connection notices. `Disconnected` fires once per
/// disconnect -- on the first close after a successful open, never on
/// repeated close or error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Connected,
    UpdatingData,
    Disconnected,
}

/// One inbound `data` frame, re-broadcast to subscribers after the
/// built-in handlers have run (and after echo suppression).
#[derive(Debug, Clone)]
pub struct TopicUpdate {
    pub topic: String,
    pub frame: DataFrame,
}

/// State shared between the [`crate::Bridge`] handle and the session task.
pub(crate) struct Shared {
    pub(crate) config: BridgeConfig,
    pub(crate) cache: Arc<SessionCache>,
    pub(crate) correlator: Arc<Correlator>,
    pub(crate) queue: Arc<SendQueue>,
    pub(crate) link_state: watch::Sender<LinkState>,
    pub(crate) notices: broadcast::Sender<Notice>,
    pub(crate) updates: broadcast::Sender<Arc<TopicUpdate>>,
    pub(crate) cancel: CancellationToken,
}

enum CloseReason {
    Shutdown,
    Closed,
    TransportError,
}

// ── Main loop ────────────────────────────────────────────────────────

/// Connect → run → tear down → fixed backoff → reconnect, forever.
pub(crate) async fn session_loop(shared: Arc<Shared>, router: Arc<RwLock<TopicRouter>>) {
    let mut notified_disconnect = false;

    while !shared.cancel.is_cancelled() {
        let _ = shared.link_state.send(LinkState::Connecting);

        // A fresh client id per attempt keeps bridge-side sessions
        // distinguishable after our own reconnects.
        let client_id = Uuid::new_v4();
        let url = match shared.config.url(client_id) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "bad bridge address, giving up");
                break;
            }
        };

        tracing::info!(url = %url, "connecting to bridge");
        let connect = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
        };

        match connect {
            Ok((ws, _response)) => {
                tracing::info!("bridge link open");
                let _ = shared.link_state.send(LinkState::Open);
                notified_disconnect = false;
                let _ = shared.notices.send(Notice::Connected);
                let _ = shared.notices.send(Notice::UpdatingData);

                // Handshake burst rides the queue like any other command.
                shared.queue.enqueue(Envelope::Broadcast);
                shared.queue.enqueue(Envelope::GetNodes);
                shared.queue.enqueue(Envelope::GetPresets);

                // Delayed follow-ups live on a child token so a dead
                // session can never fire a stale step.
                let session_token = shared.cancel.child_token();
                let refresh = tokio::spawn(preset_refresh(shared.clone(), session_token.clone()));
                let sweep = tokio::spawn(conbus_sweep(shared.clone(), session_token.clone()));

                let reason = run_open(&shared, &router, ws).await;

                session_token.cancel();
                let _ = refresh.await;
                let _ = sweep.await;

                shared.cache.clear_all();
                shared.correlator.clear();
                shared.queue.clear();

                match reason {
                    CloseReason::Shutdown => {
                        let _ = shared.link_state.send(LinkState::Closing);
                        break;
                    }
                    CloseReason::Closed | CloseReason::TransportError => {
                        let _ = shared.link_state.send(LinkState::Closed);
                        if !notified_disconnect {
                            notified_disconnect = true;
                            let _ = shared.notices.send(Notice::Disconnected);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "bridge connection failed");
                let _ = shared.link_state.send(LinkState::Closed);
            }
        }

        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            _ = tokio::time::sleep(shared.config.reconnect_delay) => {}
        }
    }

    let _ = shared.link_state.send(LinkState::Closed);
    tracing::debug!("session loop exiting");
}

// ── One open connection ──────────────────────────────────────────────

async fn run_open(
    shared: &Shared,
    router: &RwLock<TopicRouter>,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> CloseReason {
    let (mut sink, mut stream) = ws.split();

    let mut drain = tokio::time::interval(shared.config.drain_interval);
    drain.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shared.cancel.cancelled() => {
                let _ = sink.close().await;
                return CloseReason::Shutdown;
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_message(shared, router, &text);
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        tracing::trace!("bridge ping");
                    }
                    Some(Ok(Message::Close(close))) => {
                        tracing::info!(frame = ?close, "bridge sent close");
                        return CloseReason::Closed;
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, Frame -- nothing for us
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "transport error");
                        return CloseReason::TransportError;
                    }
                    None => {
                        tracing::info!("bridge stream ended");
                        return CloseReason::Closed;
                    }
                }
            }

            _ = drain.tick() => {
                // The sink is idle whenever this branch runs, so the
                // backpressure gate is already satisfied.
                if let Some(envelope) = shared.queue.pop_ready(true, false) {
                    match encode(&envelope) {
                        Ok(line) => {
                            if let Err(e) = sink.send(Message::Text(line.into())).await {
                                tracing::warn!(error = %e, "send failed");
                                return CloseReason::TransportError;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "dropping unencodable envelope");
                        }
                    }
                }
            }
        }
    }
}

// ── Inbound handling ─────────────────────────────────────────────────

/// Split a transport message into frames and process each; segments are
/// independent, so one bad frame never takes down its neighbors.
fn handle_message(shared: &Shared, router: &RwLock<TopicRouter>, raw: &str) {
    for result in decode_frames(raw) {
        match result {
            Ok(envelope) => process_envelope(shared, router, envelope),
            Err(ProtoError::UnknownOp { op }) => {
                tracing::trace!(op = %op, "ignoring unknown op");
            }
            Err(e) => {
                tracing::debug!(error = %e, "malformed frame");
            }
        }
    }
}

pub(crate) fn process_envelope(
    shared: &Shared,
    router: &RwLock<TopicRouter>,
    envelope: Envelope,
) {
    if let Envelope::Data(frame) = &envelope {
        if shared.correlator.should_suppress(frame.iterator) {
            tracing::trace!(topic = %frame.topic, "consumed self-echo");
            return;
        }
    }

    {
        let router = router.read().unwrap_or_else(PoisonError::into_inner);
        router.dispatch(&envelope, &shared.cache);
    }

    if let Envelope::Data(frame) = envelope {
        let _ = shared.updates.send(Arc::new(TopicUpdate {
            topic: frame.topic.clone(),
            frame,
        }));
    }
}

// ── Delayed handshake steps ──────────────────────────────────────────

/// The bridge may not have its preset service up when we connect; ask
/// again once after a fixed delay.
async fn preset_refresh(shared: Arc<Shared>, token: CancellationToken) {
    tokio::select! {
        biased;
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(shared.config.preset_refresh_delay) => {}
    }

    if *shared.link_state.borrow() == LinkState::Open {
        shared.queue.enqueue(Envelope::GetPresets);
    }
}

/// Wait for the CAN bridge node to come up, then ask every known device
/// to dump its registers, staggered so the bus is not slammed.
async fn conbus_sweep(shared: Arc<Shared>, token: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(shared.config.conbus_poll_interval) => {}
        }
        if shared.cache.device_state(CAN_NODE) == Some(DeviceLifecycle::Operating) {
            break;
        }
    }

    let devices: Vec<u8> = shared.config.descriptors.device_ids().collect();
    for device in devices {
        let frame =
            conbus::read_instruction(device, conbus::READ_ALL, Some(shared.correlator.tag()));
        shared.queue.enqueue(Envelope::Conbus(frame));

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(shared.config.conbus_stagger) => {}
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
