// ── Register bus device descriptors ──
//
// Static metadata describing each register-bus device: which ids exist,
// what their registers are called, and how register payloads decode.
// The table is the single authority on a register's displayed type --
// payload shape is never consulted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use groundlink_proto::RegisterType;

/// Metadata for one register on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDescriptor {
    pub title: String,
    #[serde(rename = "type")]
    pub ty: RegisterType,
    #[serde(default)]
    pub readonly: bool,
}

/// Metadata for one register-bus device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub title: String,
    #[serde(default)]
    pub registers: BTreeMap<u8, RegisterDescriptor>,
}

/// The full device table. Responses from devices absent here are
/// dropped by the conbus handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorTable {
    devices: BTreeMap<u8, DeviceDescriptor>,
}

impl DescriptorTable {
    pub fn new(devices: BTreeMap<u8, DeviceDescriptor>) -> Self {
        Self { devices }
    }

    /// The stock table for the robot this client ships against.
    pub fn builtin() -> Self {
        let mut devices = BTreeMap::new();

        devices.insert(
            1,
            DeviceDescriptor {
                title: "Safety Lights".into(),
                registers: BTreeMap::from([
                    (
                        0,
                        RegisterDescriptor {
                            title: "Mode".into(),
                            ty: RegisterType::Uint,
                            readonly: false,
                        },
                    ),
                    (
                        1,
                        RegisterDescriptor {
                            title: "Brightness".into(),
                            ty: RegisterType::Uint,
                            readonly: false,
                        },
                    ),
                    (
                        2,
                        RegisterDescriptor {
                            title: "Blink Period".into(),
                            ty: RegisterType::Float,
                            readonly: false,
                        },
                    ),
                ]),
            },
        );

        devices.insert(
            24,
            DeviceDescriptor {
                title: "Motor Controller".into(),
                registers: BTreeMap::from([
                    (
                        0,
                        RegisterDescriptor {
                            title: "Update Rate".into(),
                            ty: RegisterType::Float,
                            readonly: true,
                        },
                    ),
                    (
                        1,
                        RegisterDescriptor {
                            title: "Pulses Per Radian".into(),
                            ty: RegisterType::Float,
                            readonly: false,
                        },
                    ),
                    (
                        2,
                        RegisterDescriptor {
                            title: "Wheel Radius".into(),
                            ty: RegisterType::Float,
                            readonly: false,
                        },
                    ),
                    (
                        3,
                        RegisterDescriptor {
                            title: "Invert Motors".into(),
                            ty: RegisterType::Bool,
                            readonly: false,
                        },
                    ),
                ]),
            },
        );

        Self { devices }
    }

    pub fn device(&self, id: u8) -> Option<&DeviceDescriptor> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.devices.contains_key(&id)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.devices.keys().copied()
    }

    pub fn register(&self, device: u8, address: u8) -> Option<&RegisterDescriptor> {
        self.devices.get(&device)?.registers.get(&address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_lookups() {
        let table = DescriptorTable::builtin();
        assert!(table.contains(1));
        assert!(table.contains(24));
        assert!(!table.contains(99));

        let register = table.register(24, 3).unwrap();
        assert_eq!(register.title, "Invert Motors");
        assert_eq!(register.ty, RegisterType::Bool);
    }

    #[test]
    fn descriptor_type_is_authoritative() {
        // The table says float; a one-byte payload is a width error, not
        // a re-typed bool.
        let table = DescriptorTable::builtin();
        let ty = table.register(24, 0).unwrap().ty;
        assert!(groundlink_proto::RegisterValue::decode(ty, &[0x01]).is_err());
    }

    #[test]
    fn deserializes_from_toml_style_keys() {
        let json = serde_json::json!({
            "5": {
                "title": "Estop Relay",
                "registers": {
                    "0": {"title": "Engaged", "type": "bool", "readonly": true}
                }
            }
        });
        let table: DescriptorTable = serde_json::from_value(json).unwrap();
        assert_eq!(table.register(5, 0).unwrap().title, "Engaged");
        assert!(table.register(5, 0).unwrap().readonly);
    }
}
