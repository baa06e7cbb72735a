// ── Session cache ──
//
// Process-wide state reconstructed from the topic stream: device
// lifecycles, per-device config blobs, register-bus values, presets,
// system status, and the log ring. Owned by the session, passed by
// reference into topic handlers, and cleared wholesale on disconnect --
// the bridge may restart with different internal state, so nothing here
// outlives a connection.
//
// A miss is "never reported", not an error: readers get `None`/empty.

use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;

use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::watch;

use groundlink_proto::PresetReport;

use crate::model::{DeviceLifecycle, LogEntry, SystemStatus};

/// Log ring capacity; older entries fall off the front.
const LOG_CAPACITY: usize = 30;

pub struct SessionCache {
    /// Device name -> lifecycle, in first-report order.
    device_states: RwLock<IndexMap<String, DeviceLifecycle>>,

    /// Device name -> config blob.
    configs: DashMap<String, Value>,

    /// Register bus: device id -> register address -> raw bytes.
    conbus: DashMap<u8, BTreeMap<u8, Vec<u8>>>,

    presets: RwLock<Option<PresetReport>>,
    system: RwLock<Option<SystemStatus>>,
    logs: RwLock<VecDeque<LogEntry>>,

    /// Bumped on every mutation so consumers can re-render.
    version: watch::Sender<u64>,
}

impl SessionCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            device_states: RwLock::new(IndexMap::new()),
            configs: DashMap::new(),
            conbus: DashMap::new(),
            presets: RwLock::new(None),
            system: RwLock::new(None),
            logs: RwLock::new(VecDeque::with_capacity(LOG_CAPACITY)),
            version,
        }
    }

    // ── Device states ────────────────────────────────────────────────

    pub fn set_device_state(&self, device: &str, state: DeviceLifecycle) {
        self.write(&self.device_states)
            .insert(device.to_owned(), state);
        self.bump();
    }

    pub fn device_state(&self, device: &str) -> Option<DeviceLifecycle> {
        self.read(&self.device_states).get(device).copied()
    }

    /// All reported devices, in first-report order.
    pub fn device_states(&self) -> Vec<(String, DeviceLifecycle)> {
        self.read(&self.device_states)
            .iter()
            .map(|(name, state)| (name.clone(), *state))
            .collect()
    }

    // ── Configs ──────────────────────────────────────────────────────

    pub fn set_config(&self, device: &str, config: Value) {
        self.configs.insert(device.to_owned(), config);
        self.bump();
    }

    pub fn config(&self, device: &str) -> Option<Value> {
        self.configs.get(device).map(|r| r.value().clone())
    }

    pub fn config_devices(&self) -> Vec<String> {
        self.configs.iter().map(|r| r.key().clone()).collect()
    }

    // ── Register bus ─────────────────────────────────────────────────

    pub fn set_conbus_register(&self, device: u8, address: u8, data: Vec<u8>) {
        self.conbus.entry(device).or_default().insert(address, data);
        self.bump();
    }

    pub fn conbus_register(&self, device: u8, address: u8) -> Option<Vec<u8>> {
        self.conbus.get(&device)?.get(&address).cloned()
    }

    pub fn conbus_device(&self, device: u8) -> Option<BTreeMap<u8, Vec<u8>>> {
        self.conbus.get(&device).map(|r| r.value().clone())
    }

    pub fn conbus_len(&self) -> usize {
        self.conbus.iter().map(|r| r.value().len()).sum()
    }

    // ── Presets ──────────────────────────────────────────────────────

    pub fn set_presets(&self, report: PresetReport) {
        *self.write(&self.presets) = Some(report);
        self.bump();
    }

    pub fn presets(&self) -> Option<PresetReport> {
        self.read(&self.presets).clone()
    }

    // ── System status ────────────────────────────────────────────────

    pub fn set_system(&self, status: SystemStatus) {
        *self.write(&self.system) = Some(status);
        self.bump();
    }

    pub fn system(&self) -> Option<SystemStatus> {
        *self.read(&self.system)
    }

    // ── Log ring ─────────────────────────────────────────────────────

    pub fn push_log(&self, node: &str, message: &str) {
        let mut logs = self.write(&self.logs);
        if logs.len() == LOG_CAPACITY {
            logs.pop_front();
        }
        logs.push_back(LogEntry {
            node: node.to_owned(),
            message: message.to_owned(),
            received_at: Utc::now(),
        });
        drop(logs);
        self.bump();
    }

    /// Newest last.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.read(&self.logs).iter().cloned().collect()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Wipe every cache. Only the session calls this, on disconnect.
    pub fn clear_all(&self) {
        self.write(&self.device_states).clear();
        self.configs.clear();
        self.conbus.clear();
        *self.write(&self.presets) = None;
        *self.write(&self.system) = None;
        self.write(&self.logs).clear();
        self.bump();
    }

    pub fn is_empty(&self) -> bool {
        self.read(&self.device_states).is_empty()
            && self.configs.is_empty()
            && self.conbus.is_empty()
            && self.read(&self.presets).is_none()
            && self.read(&self.system).is_none()
            && self.read(&self.logs).is_empty()
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> std::sync::RwLockReadGuard<'a, T> {
        lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write<'a, T>(&self, lock: &'a RwLock<T>) -> std::sync::RwLockWriteGuard<'a, T> {
        lock.write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn device_states_keep_first_report_order() {
        let cache = SessionCache::new();
        cache.set_device_state("autonav_serial_can", DeviceLifecycle::Standby);
        cache.set_device_state("autonav_nav_astar", DeviceLifecycle::Off);
        cache.set_device_state("autonav_serial_can", DeviceLifecycle::Operating);

        let states = cache.device_states();
        assert_eq!(states[0].0, "autonav_serial_can");
        assert_eq!(states[0].1, DeviceLifecycle::Operating);
        assert_eq!(states[1].0, "autonav_nav_astar");
    }

    #[test]
    fn miss_reads_as_never_reported() {
        let cache = SessionCache::new();
        assert_eq!(cache.device_state("ghost"), None);
        assert_eq!(cache.config("ghost"), None);
        assert_eq!(cache.conbus_register(9, 0), None);
        assert_eq!(cache.presets(), None);
        assert_eq!(cache.system(), None);
    }

    #[test]
    fn log_ring_caps_at_thirty() {
        let cache = SessionCache::new();
        for i in 0..40 {
            cache.push_log("autonav_nav_astar", &format!("line {i}"));
        }

        let logs = cache.logs();
        assert_eq!(logs.len(), 30);
        assert_eq!(logs[0].message, "line 10");
        assert_eq!(logs[29].message, "line 39");
    }

    #[test]
    fn clear_all_empties_every_cache() {
        let cache = SessionCache::new();
        cache.set_device_state("autonav_serial_can", DeviceLifecycle::Ready);
        cache.set_config("autonav_nav_astar", serde_json::json!({"a": 1}));
        cache.set_conbus_register(24, 0, vec![1, 2, 3, 4]);
        cache.set_presets(PresetReport {
            presets: vec!["default".into()],
            active_preset: "default".into(),
        });
        cache.set_system(SystemStatus::from(groundlink_proto::SystemReport {
            state: 1,
            mode: 0,
            mobility: true,
        }));
        cache.push_log("autonav_nav_astar", "hello");
        assert!(!cache.is_empty());

        cache.clear_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn mutations_notify_subscribers() {
        let cache = SessionCache::new();
        let rx = cache.subscribe();
        let before = *rx.borrow();

        cache.set_device_state("autonav_serial_can", DeviceLifecycle::Ready);
        assert!(*rx.borrow() > before);
    }
}
