// ── Built-in topic and callback handlers ──
//
// These keep the session cache in sync with the stream. Registered once
// at bridge construction; user handlers registered later run after them
// for the same topic.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use groundlink_proto::{
    ConfigFrame, Envelope, SystemReport, conbus, topics,
};

use crate::correlator::Correlator;
use crate::model::{DescriptorTable, DeviceLifecycle, SystemStatus};
use crate::queue::SendQueue;
use crate::router::TopicRouter;

/// Infrastructure nodes the bridge reports but the dashboard never
/// tracks as devices.
const INTERNAL_NODES: &[&str] = &[
    "rosbridge_websocket",
    "rosapi",
    "rosapi_params",
    "scr_core",
];

/// Config request opcode understood by the bridge.
const OPCODE_GET_CONFIG: u8 = 4;

#[derive(Deserialize)]
struct DeviceStatePayload {
    device: String,
    state: u8,
}

#[derive(Deserialize)]
struct ConfigPayload {
    device: String,
    json: Value,
}

#[derive(Deserialize)]
struct LogPayload {
    node: String,
    data: String,
}

#[derive(Deserialize)]
struct ConbusPayload {
    id: u16,
    data: Vec<u8>,
}

/// A config blob may arrive as a JSON value or as a JSON-encoded
/// string (the bridge double-encodes pushes). Normalize to a value.
fn normalize_config(json: Value) -> Option<Value> {
    match json {
        Value::String(raw) => serde_json::from_str(&raw).ok(),
        other => Some(other),
    }
}

/// Register the built-in handlers on a fresh router.
pub(crate) fn register_builtin(
    router: &mut TopicRouter,
    queue: Arc<SendQueue>,
    correlator: Arc<Correlator>,
    descriptors: DescriptorTable,
) {
    router.on_topic(topics::SYSTEM_STATE, |_, frame, cache| {
        match frame.parse::<SystemReport>() {
            Ok(report) => cache.set_system(SystemStatus::from(report)),
            Err(e) => tracing::debug!(error = %e, "bad system-state payload"),
        }
    });

    router.on_topic(topics::DEVICE_STATE, |_, frame, cache| {
        match frame.parse::<DeviceStatePayload>() {
            Ok(payload) => match DeviceLifecycle::from_code(payload.state) {
                Some(state) => cache.set_device_state(&payload.device, state),
                None => tracing::debug!(
                    device = %payload.device,
                    code = payload.state,
                    "unknown device lifecycle code"
                ),
            },
            Err(e) => tracing::debug!(error = %e, "bad device-state payload"),
        }
    });

    router.on_topic(topics::CONFIGURATION, |_, frame, cache| {
        match frame.parse::<ConfigPayload>() {
            Ok(payload) => {
                if let Some(config) = normalize_config(payload.json) {
                    cache.set_config(&payload.device, config);
                } else {
                    tracing::debug!(device = %payload.device, "unparseable config blob");
                }
            }
            Err(e) => tracing::debug!(error = %e, "bad configuration payload"),
        }
    });

    router.on_topic(topics::LOGGING, |_, frame, cache| {
        match frame.parse::<LogPayload>() {
            Ok(payload) => cache.push_log(&payload.node, &payload.data),
            Err(e) => tracing::debug!(error = %e, "bad log payload"),
        }
    });

    router.on_topic(topics::CONBUS, move |_, frame, cache| {
        let payload = match frame.parse::<ConbusPayload>() {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "bad conbus payload");
                return;
            }
        };

        // Ids outside the response ranges are not addressed to us.
        let Some(response) = conbus::parse_response(payload.id, &payload.data) else {
            return;
        };

        // Responses from devices missing in the descriptor table are
        // dropped -- nothing could render them.
        if !descriptors.contains(response.device()) {
            return;
        }

        cache.set_conbus_register(
            response.device(),
            response.address(),
            response.data().to_vec(),
        );
    });

    router.on_presets_callback(|report, cache| {
        cache.set_presets(report.clone());
    });

    router.on_nodes_callback(move |report, cache| {
        for node in &report.nodes {
            // Every node gets a config request, including internal ones.
            queue.enqueue(Envelope::Configuration(ConfigFrame {
                device: node.clone(),
                opcode: Some(OPCODE_GET_CONFIG),
                json: None,
                iterator: Some(correlator.tag()),
            }));

            if INTERNAL_NODES.contains(&node.as_str()) {
                continue;
            }
            if let Some(&code) = report.states.get(node) {
                if let Some(state) = DeviceLifecycle::from_code(code) {
                    cache.set_device_state(node, state);
                }
            }
        }

        for (device, blob) in &report.configs {
            if let Some(config) = normalize_config(blob.clone()) {
                cache.set_config(device, config);
            }
        }

        cache.set_system(SystemStatus::from(report.system));
    });
}
