// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hdds-msg-inspect - Inspect ROS 2 message types
//!
//! Lists the built-in types, prints their layout, and converts between
//! `field=value` assignments and wire bytes (hex).

use clap::{Parser, Subcommand};
use colored::*;
use hdds_introspect::{
    catalog, Cardinality, FieldDescriptor, FieldKind, IntrospectConfig, Introspector,
    MessageDescriptor, MessageMut, MessageRef, TypeRegistry, Value,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Inspect ROS 2 message types
#[derive(Parser, Debug)]
#[command(name = "hdds-msg-inspect")]
#[command(version)]
#[command(about = "Inspect, encode and decode ROS 2 messages")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file (limits, log level)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List built-in message types
    List,
    /// Print the field layout of a type
    Describe {
        /// Type name, e.g. bluerov2_msgs/msg/SetDepth
        type_name: String,
    },
    /// Encode field assignments to hex
    Encode {
        /// Type name
        type_name: String,

        /// Assignments: field=value, nested.field=value, seq=1,2,3
        assignments: Vec<String>,
    },
    /// Decode hex bytes and print the message
    Decode {
        /// Type name
        type_name: String,

        /// Encoded message as hex (whitespace ignored)
        hex: String,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => IntrospectConfig::from_file(path)?.with_env(),
        None => IntrospectConfig::from_env(),
    };
    config.validate()?;
    init_logging(&config);

    let registry = TypeRegistry::new();
    let engine = Introspector::with_config(&config);

    match &args.command {
        Command::List => list(&registry),
        Command::Describe { type_name } => {
            let desc = catalog::resolve_ros2(&registry, type_name)?;
            describe(&desc);
            Ok(())
        }
        Command::Encode {
            type_name,
            assignments,
        } => {
            let desc = catalog::resolve_ros2(&registry, type_name)?;
            let bytes = encode(&engine, &desc, assignments)?;
            println!("{}", to_hex(&bytes));
            Ok(())
        }
        Command::Decode { type_name, hex } => {
            let desc = catalog::resolve_ros2(&registry, type_name)?;
            let bytes = from_hex(hex)?;
            let buffer = engine.decode(&bytes, &desc)?;
            let value = engine.to_value(&MessageRef::new(&buffer, &desc)?)?;
            println!("{}", desc.type_name().bold());
            print_value(&value, 1);
            Ok(())
        }
    }
}

fn init_logging(config: &IntrospectConfig) {
    let filter = config.log_filter().unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp_millis()
        .parse_default_env()
        .init();
}

fn list(registry: &TypeRegistry) -> Result<(), Box<dyn std::error::Error>> {
    catalog::register_builtin(registry)?;
    println!("{:<40} {:>6} {:>6}", "TYPE".bold(), "FIELDS".bold(), "SIZE".bold());
    for (name, _) in catalog::BUILTIN_TYPES {
        let desc = catalog::resolve_ros2(registry, name)?;
        println!("{:<40} {:>6} {:>6}", name.cyan(), desc.field_count(), desc.total_size());
    }
    log::debug!("[inspect] {} types registered", registry.len());
    Ok(())
}

fn describe(desc: &MessageDescriptor) {
    println!(
        "{} ({} bytes, align {})",
        desc.type_name().bold(),
        desc.total_size(),
        desc.alignment()
    );
    for field in desc.fields() {
        let default = field
            .default
            .as_ref()
            .map(|v| format!(" = {}", v))
            .unwrap_or_default();
        println!(
            "  {:>4}  {:<24} {}{}{}",
            field.offset,
            field.name.cyan(),
            field.kind.to_string().yellow(),
            field.cardinality,
            default.dimmed()
        );
    }
}

fn encode(
    engine: &Introspector,
    desc: &Arc<MessageDescriptor>,
    assignments: &[String],
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut buffer = engine.create(desc)?;
    {
        let mut msg = MessageMut::new(&mut buffer, desc)?;
        for assignment in assignments {
            let (path, text) = assignment
                .split_once('=')
                .ok_or_else(|| format!("expected field=value, got '{}'", assignment))?;
            assign(engine, &mut msg, path.trim(), text.trim())?;
        }
    }
    Ok(engine.serialize(&MessageRef::new(&buffer, desc)?)?)
}

/// Assign `text` to the field at dotted `path` (nested inline messages).
fn assign(
    engine: &Introspector,
    msg: &mut MessageMut<'_>,
    path: &str,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some((head, rest)) = path.split_once('.') {
        let mut nested = engine.message_mut(msg, head)?;
        return assign(engine, &mut nested, rest, text);
    }
    let desc = Arc::clone(msg.descriptor());
    let field = desc.get_field(path)?;
    let value = parse_field(field, text)?;
    log::debug!("[inspect] {}.{} = {}", desc.name(), path, value);
    engine.set(msg, path, value)?;
    Ok(())
}

fn parse_field(field: &FieldDescriptor, text: &str) -> Result<Value, String> {
    if field.cardinality == Cardinality::Single {
        return parse_scalar(&field.name, &field.kind, text);
    }
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']').trim();
    if inner.is_empty() {
        return Ok(Value::Sequence(Vec::new()));
    }
    inner
        .split(',')
        .map(|item| parse_scalar(&field.name, &field.kind, item.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Sequence)
}

fn parse_scalar(name: &str, kind: &FieldKind, text: &str) -> Result<Value, String> {
    fn num<T: std::str::FromStr>(name: &str, text: &str) -> Result<T, String> {
        text.parse()
            .map_err(|_| format!("invalid value '{}' for field '{}'", text, name))
    }

    Ok(match kind {
        FieldKind::Bool => match text {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(format!("invalid boolean '{}' for field '{}'", text, name)),
        },
        FieldKind::I8 => Value::I8(num(name, text)?),
        FieldKind::U8 => Value::U8(num(name, text)?),
        FieldKind::I16 => Value::I16(num(name, text)?),
        FieldKind::U16 => Value::U16(num(name, text)?),
        FieldKind::I32 => Value::I32(num(name, text)?),
        FieldKind::U32 => Value::U32(num(name, text)?),
        FieldKind::I64 => Value::I64(num(name, text)?),
        FieldKind::U64 => Value::U64(num(name, text)?),
        FieldKind::F32 => Value::F32(num(name, text)?),
        FieldKind::F64 => Value::F64(num(name, text)?),
        FieldKind::String { .. } => Value::String(text.to_string()),
        FieldKind::Message(key) => {
            return Err(format!(
                "field '{}' is a {} message; assign its fields as {}.<field>=value",
                name, key, name
            ))
        }
    })
}

fn print_value(value: &Value, indent: usize) {
    let Value::Message(fields) = value else {
        println!("{:width$}{}", "", value, width = indent * 2);
        return;
    };
    for (name, field) in fields {
        match field {
            Value::Message(_) => {
                println!("{:width$}{}:", "", name.cyan(), width = indent * 2);
                print_value(field, indent + 1);
            }
            Value::Sequence(items) if items.iter().any(|i| matches!(i, Value::Message(_))) => {
                println!("{:width$}{}: [{}]", "", name.cyan(), items.len(), width = indent * 2);
                for item in items {
                    print_value(item, indent + 1);
                }
            }
            other => println!("{:width$}{}: {}", "", name.cyan(), other, width = indent * 2),
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn from_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    if digits.len() % 2 != 0 {
        return Err("hex input has an odd number of digits".to_string());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex at position {}", i))
        })
        .collect()
}
