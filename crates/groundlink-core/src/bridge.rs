// ── Bridge handle ──
//
// The main entry point for consumers. Cheaply cloneable; owns the
// session task and exposes the command surface, the session cache, and
// the observation channels.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use groundlink_proto::{
    ConfigFrame, Envelope, RegisterValue, SystemReport, conbus,
};

use crate::config::BridgeConfig;
use crate::correlator::Correlator;
use crate::handlers::register_builtin;
use crate::model::SystemStatus;
use crate::queue::SendQueue;
use crate::router::TopicRouter;
use crate::session::{self, LinkState, Notice, Shared, TopicUpdate};
use crate::store::SessionCache;

const NOTICE_CHANNEL_CAPACITY: usize = 64;
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Handle to a bridge link.
///
/// Created disconnected; call [`connect`](Self::connect) to spawn the
/// session loop. All command methods only enqueue -- frames leave on the
/// session's drain ticks, in order, once the transport is writable.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    shared: Arc<Shared>,
    router: Arc<RwLock<TopicRouter>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let cache = Arc::new(SessionCache::new());
        let correlator = Arc::new(Correlator::new());
        let queue = Arc::new(SendQueue::new());
        let (link_state, _) = watch::channel(LinkState::Closed);
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        let mut router = TopicRouter::new();
        register_builtin(
            &mut router,
            queue.clone(),
            correlator.clone(),
            config.descriptors.clone(),
        );

        let shared = Arc::new(Shared {
            config,
            cache,
            correlator,
            queue,
            link_state,
            notices,
            updates,
            cancel: CancellationToken::new(),
        });

        Self {
            inner: Arc::new(BridgeInner {
                shared,
                router: Arc::new(RwLock::new(router)),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.shared.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the session loop. Idempotent -- a second call is a no-op.
    pub fn connect(&self) {
        let mut task = self.lock_task();
        if task.is_some() {
            return;
        }
        let shared = self.inner.shared.clone();
        let router = self.inner.router.clone();
        *task = Some(tokio::spawn(session::session_loop(shared, router)));
    }

    /// Cancel the session and wait for the task to finish.
    pub async fn shutdown(&self) {
        self.inner.shared.cancel.cancel();
        let task = self.lock_task().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        tracing::debug!("bridge shut down");
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.inner.shared.cache
    }

    pub fn link_state(&self) -> watch::Receiver<LinkState> {
        self.inner.shared.link_state.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.shared.notices.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<Arc<TopicUpdate>> {
        self.inner.shared.updates.subscribe()
    }

    /// Register an extra handler for a topic. Runs after the built-in
    /// handler for the same topic, in registration order.
    pub fn on_topic(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(&str, &groundlink_proto::DataFrame, &SessionCache) + Send + Sync + 'static,
    ) {
        self.inner
            .router
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .on_topic(topic, handler);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enqueue a raw envelope.
    pub fn send(&self, envelope: Envelope) {
        self.inner.shared.queue.enqueue(envelope);
    }

    /// Frames still waiting in the send queue.
    pub fn pending_sends(&self) -> usize {
        self.inner.shared.queue.len()
    }

    pub fn request_nodes(&self) {
        self.send(Envelope::GetNodes);
    }

    pub fn request_presets(&self) {
        self.send(Envelope::GetPresets);
    }

    pub fn set_system_state(&self, status: SystemStatus) {
        self.send(Envelope::SetSystemState(SystemReport::from(status)));
    }

    /// Preset mutations are always chased with a refresh so the cache
    /// converges on what the bridge actually did.
    pub fn set_active_preset(&self, preset: impl Into<String>) {
        self.send(Envelope::SetActivePreset {
            preset: preset.into(),
        });
        self.request_presets();
    }

    pub fn save_preset_mode(&self) {
        self.send(Envelope::SavePresetMode);
        self.request_presets();
    }

    pub fn save_preset_as(&self, preset: impl Into<String>) {
        self.send(Envelope::SavePresetAs {
            preset: preset.into(),
        });
        self.request_presets();
    }

    pub fn delete_preset(&self, preset: impl Into<String>) {
        self.send(Envelope::DeletePreset {
            preset: preset.into(),
        });
        self.request_presets();
    }

    /// Push an edited config blob. Tagged so the bridge's reflection of
    /// our own edit is consumed instead of re-applied.
    pub fn update_config(&self, device: impl Into<String>, json: Value) {
        self.send(Envelope::Configuration(ConfigFrame {
            device: device.into(),
            opcode: None,
            json: Some(json),
            iterator: Some(self.inner.shared.correlator.tag()),
        }));
    }

    pub fn conbus_read(&self, device: u8, address: u8) {
        let token = self.inner.shared.correlator.tag();
        self.send(Envelope::Conbus(conbus::read_instruction(
            device,
            address,
            Some(token),
        )));
    }

    pub fn conbus_write(&self, device: u8, address: u8, value: RegisterValue) {
        let token = self.inner.shared.correlator.tag();
        self.send(Envelope::Conbus(conbus::write_instruction(
            device,
            address,
            &value.to_bytes(),
            Some(token),
        )));
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{SystemMode, SystemState};

    #[test]
    fn commands_enqueue_in_order() {
        let bridge = Bridge::new(BridgeConfig::default());
        bridge.request_nodes();
        bridge.request_presets();

        let queue = &bridge.inner.shared.queue;
        assert_eq!(queue.pop_ready(true, false).unwrap(), Envelope::GetNodes);
        assert_eq!(queue.pop_ready(true, false).unwrap(), Envelope::GetPresets);
    }

    #[test]
    fn preset_mutations_chase_with_refresh() {
        let bridge = Bridge::new(BridgeConfig::default());
        bridge.set_active_preset("comp");

        let queue = &bridge.inner.shared.queue;
        assert!(matches!(
            queue.pop_ready(true, false).unwrap(),
            Envelope::SetActivePreset { .. }
        ));
        assert_eq!(queue.pop_ready(true, false).unwrap(), Envelope::GetPresets);
    }

    #[test]
    fn mutating_commands_are_correlation_tagged() {
        let bridge = Bridge::new(BridgeConfig::default());
        bridge.update_config("autonav_nav_astar", serde_json::json!({"a": 1}));
        bridge.conbus_read(24, 0xFF);
        bridge.conbus_write(24, 3, RegisterValue::Bool(true));

        assert_eq!(bridge.inner.shared.correlator.pending(), 3);

        let queue = &bridge.inner.shared.queue;
        let Envelope::Configuration(frame) = queue.pop_ready(true, false).unwrap() else {
            panic!("expected configuration frame");
        };
        assert!(frame.iterator.is_some());
    }

    #[test]
    fn set_system_state_carries_wire_codes() {
        let bridge = Bridge::new(BridgeConfig::default());
        bridge.set_system_state(SystemStatus {
            state: SystemState::Manual,
            mode: SystemMode::Practice,
            mobility: true,
        });

        let queue = &bridge.inner.shared.queue;
        let Envelope::SetSystemState(report) = queue.pop_ready(true, false).unwrap() else {
            panic!("expected set_system_state frame");
        };
        assert_eq!(report.state, 2);
        assert_eq!(report.mode, 2);
        assert!(report.mobility);
    }
}
