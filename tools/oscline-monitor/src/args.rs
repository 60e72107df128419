//! Typed argument literals for `send`, and JSON rendering for `listen --json`

use std::str::FromStr;

use anyhow::Result;
use oscline_core::{MessageValues, OscWriter, TypeTag};
use serde_json::{json, Value};

/// One command-line argument such as `f:0.5` or `T`
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Char(char),
    True,
    False,
    Nil,
    Infinitum,
}

impl Literal {
    fn tag(&self) -> char {
        match self {
            Literal::Int(_) => 'i',
            Literal::Int64(_) => 'h',
            Literal::Float(_) => 'f',
            Literal::Double(_) => 'd',
            Literal::Str(_) => 's',
            Literal::Char(_) => 'c',
            Literal::True => 'T',
            Literal::False => 'F',
            Literal::Nil => 'N',
            Literal::Infinitum => 'I',
        }
    }

    fn write_payload(&self, writer: &mut OscWriter) -> oscline_core::Result<()> {
        match self {
            Literal::Int(v) => writer.write_int(*v),
            Literal::Int64(v) => writer.write_int64(*v),
            Literal::Float(v) => writer.write_float(*v),
            Literal::Double(v) => writer.write_float64(*v),
            Literal::Str(v) => writer.write_string(v),
            Literal::Char(v) => writer.write_char(*v),
            Literal::True | Literal::False | Literal::Nil | Literal::Infinitum => Ok(()),
        }
    }
}

impl FromStr for Literal {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "T" => return Ok(Literal::True),
            "F" => return Ok(Literal::False),
            "N" => return Ok(Literal::Nil),
            "I" => return Ok(Literal::Infinitum),
            _ => {}
        }

        let (kind, text) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <type>:<value> or T/F/N/I, got {:?}", s))?;
        let bad = |e: &dyn std::fmt::Display| format!("invalid {} literal {:?}: {}", kind, text, e);

        match kind {
            "i" => text.parse().map(Literal::Int).map_err(|e| bad(&e)),
            "h" => text.parse().map(Literal::Int64).map_err(|e| bad(&e)),
            "f" => text.parse().map(Literal::Float).map_err(|e| bad(&e)),
            "d" => text.parse().map(Literal::Double).map_err(|e| bad(&e)),
            "s" => Ok(Literal::Str(text.to_string())),
            "c" => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Ok(Literal::Char(c)),
                    _ => Err(bad(&"expected one ASCII character")),
                }
            }
            _ => Err(format!("unknown type prefix {:?}", kind)),
        }
    }
}

/// Encode a message with any number of literal arguments
pub fn encode_message(address: &str, args: &[Literal]) -> Result<Vec<u8>> {
    let tags: String = args.iter().map(Literal::tag).collect();

    let mut writer = OscWriter::new();
    writer.write_address(address)?;
    writer.write_tags(&tags)?;
    for arg in args {
        arg.write_payload(&mut writer)?;
    }
    Ok(writer.as_bytes().to_vec())
}

/// Render one message as a JSON object
pub fn message_json(address: &str, values: &MessageValues<'_>) -> Value {
    let tags: String = values.tags().map(char::from).collect();
    let args: Vec<Value> = (0..values.element_count())
        .map(|index| element_json(values, index))
        .collect();
    json!({ "address": address, "tags": tags, "args": args })
}

fn element_json(values: &MessageValues<'_>, index: usize) -> Value {
    let value = match values.tag(index) {
        Some(TypeTag::Int32) => values.read_int(index).map(Value::from),
        Some(TypeTag::Int64) => values.read_int64(index).map(Value::from),
        Some(TypeTag::Float32) => values.read_float(index).map(Value::from),
        Some(TypeTag::Float64) => values.read_float64(index).map(Value::from),
        Some(TypeTag::String) | Some(TypeTag::AltString) => {
            values.read_string(index).map(Value::from)
        }
        Some(TypeTag::AsciiChar) => values.read_ascii_char(index).map(|c| Value::from(c.to_string())),
        Some(TypeTag::Blob) => values.blob_slice(index).map(|bytes| Value::from(bytes.to_vec())),
        Some(TypeTag::Color32) => values.read_color(index).map(|c| json!([c.r, c.g, c.b, c.a])),
        Some(TypeTag::Midi) => values
            .read_midi(index)
            .map(|m| json!([m.port_id, m.status, m.data1, m.data2])),
        Some(TypeTag::TimeTag) => values
            .read_timestamp(index)
            .map(|t| json!({ "seconds": t.seconds, "fractions": t.fractions })),
        Some(TypeTag::True) => Ok(Value::Bool(true)),
        Some(TypeTag::False) => Ok(Value::Bool(false)),
        Some(TypeTag::Infinitum) => Ok(Value::from("inf")),
        Some(TypeTag::Nil) | Some(TypeTag::ArrayStart) | Some(TypeTag::ArrayEnd) | None => {
            Ok(Value::Null)
        }
    };
    value.unwrap_or(Value::Null)
}
