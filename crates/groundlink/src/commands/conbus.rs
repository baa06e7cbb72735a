//! Register bus command handlers.

use tabled::{Table, Tabled, settings::Style};

use groundlink_config::Preferences;
use groundlink_core::{Bridge, DescriptorTable, RegisterDescriptor};
use groundlink_proto::{RegisterType, RegisterValue, conbus};

use crate::cli::{ConbusArgs, ConbusCommand, GlobalOpts};
use crate::error::CliError;

use super::{connect, drain, wait_until};

#[derive(Tabled)]
struct RegisterRow {
    #[tabled(rename = "Addr")]
    address: String,
    #[tabled(rename = "Register")]
    title: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Access")]
    access: &'static str,
}

pub async fn handle(
    args: ConbusArgs,
    prefs: &Preferences,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let bridge = connect(prefs, global).await?;
    let result = run(&bridge, args).await;
    bridge.shutdown().await;
    result
}

async fn run(bridge: &Bridge, args: ConbusArgs) -> Result<(), CliError> {
    let descriptors = bridge.config().descriptors.clone();
    let cache = bridge.cache().clone();

    match args.command {
        ConbusCommand::Read { device, address } => {
            let descriptor = descriptors.device(device).ok_or(CliError::NotFound {
                what: format!("register-bus device {device}"),
            })?;

            bridge.conbus_read(device, address);

            if address == conbus::READ_ALL {
                wait_until("register dump", || {
                    cache
                        .conbus_device(device)
                        .is_some_and(|registers| !registers.is_empty())
                })
                .await?;
            } else {
                wait_until("register value", || {
                    cache.conbus_register(device, address).is_some()
                })
                .await?;
            }

            println!("{}", descriptor.title);
            print_registers(&descriptors, device, &cache)?;
            Ok(())
        }

        ConbusCommand::Write {
            device,
            address,
            value,
        } => {
            let register =
                descriptors
                    .register(device, address)
                    .ok_or(CliError::NotFound {
                        what: format!("register {address} on device {device}"),
                    })?;

            if register.readonly {
                return Err(CliError::Validation {
                    field: "address".into(),
                    reason: format!("register '{}' is read-only", register.title),
                });
            }

            let parsed = parse_value(register, &value)?;
            bridge.conbus_write(device, address, parsed);
            drain(bridge).await?;
            println!("wrote {parsed} to '{}'", register.title);
            Ok(())
        }
    }
}

/// Parse a CLI string per the descriptor-declared register type.
fn parse_value(register: &RegisterDescriptor, raw: &str) -> Result<RegisterValue, CliError> {
    let invalid = |reason: String| CliError::Validation {
        field: "value".into(),
        reason,
    };

    match register.ty {
        RegisterType::Bool => match raw {
            "true" | "1" => Ok(RegisterValue::Bool(true)),
            "false" | "0" => Ok(RegisterValue::Bool(false)),
            other => Err(invalid(format!("expected true/false, got '{other}'"))),
        },
        RegisterType::Int => raw
            .parse()
            .map(RegisterValue::Int)
            .map_err(|e| invalid(format!("expected an integer: {e}"))),
        RegisterType::Uint => raw
            .parse()
            .map(RegisterValue::Uint)
            .map_err(|e| invalid(format!("expected an unsigned integer: {e}"))),
        RegisterType::Float => raw
            .parse()
            .map(RegisterValue::Float)
            .map_err(|e| invalid(format!("expected a number: {e}"))),
    }
}

fn print_registers(
    descriptors: &DescriptorTable,
    device: u8,
    cache: &groundlink_core::SessionCache,
) -> Result<(), CliError> {
    let registers = cache.conbus_device(device).unwrap_or_default();

    let rows: Vec<RegisterRow> = registers
        .iter()
        .map(|(address, bytes)| {
            let descriptor = descriptors.register(device, *address);
            let title = descriptor.map_or_else(
                || format!("(unknown address {address})"),
                |r| r.title.clone(),
            );
            // The descriptor table alone decides the display type; a
            // payload that does not fit it is shown raw.
            let value = match descriptor {
                Some(r) => RegisterValue::decode(r.ty, bytes)
                    .map_or_else(|_| format!("{bytes:02x?}"), |v| v.to_string()),
                None => format!("{bytes:02x?}"),
            };
            RegisterRow {
                address: address.to_string(),
                title,
                value,
                access: match descriptor {
                    Some(r) if r.readonly => "ro",
                    _ => "rw",
                },
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(ty: RegisterType) -> RegisterDescriptor {
        RegisterDescriptor {
            title: "Test".into(),
            ty,
            readonly: false,
        }
    }

    #[test]
    fn parses_values_per_descriptor_type() {
        assert_eq!(
            parse_value(&register(RegisterType::Bool), "true").ok(),
            Some(RegisterValue::Bool(true))
        );
        assert_eq!(
            parse_value(&register(RegisterType::Int), "-17").ok(),
            Some(RegisterValue::Int(-17))
        );
        assert_eq!(
            parse_value(&register(RegisterType::Float), "0.5").ok(),
            Some(RegisterValue::Float(0.5))
        );
    }

    #[test]
    fn rejects_values_that_do_not_fit_the_type() {
        assert!(parse_value(&register(RegisterType::Uint), "-1").is_err());
        assert!(parse_value(&register(RegisterType::Bool), "maybe").is_err());
    }
}
