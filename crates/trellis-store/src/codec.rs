// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! Row codec: a tuple of dynamic values against an ordered schema.
//!
//! Layout is positional: bool = 1 byte, int/vid = 8 bytes LE, float =
//! 4 bytes LE, double = 8 bytes LE, string = u32 LE length prefix plus
//! bytes. There is no per-row header; the schema the row was written
//! with is required to read it back.

use trellis_common::core::schema::{PropType, Schema};
use trellis_common::core::value::Value;
use trellis_common::{Result, TrellisError};

/// Encode one row. `values` must match the schema positionally; integers
/// satisfy vid and timestamp fields, and either numeric kind satisfies
/// float and double fields.
pub fn encode(values: &[Value], schema: &Schema) -> Result<Vec<u8>> {
    if values.len() != schema.len() {
        return Err(TrellisError::Data {
            message: format!(
                "row has {} values but schema has {} fields",
                values.len(),
                schema.len()
            ),
        });
    }

    let mut out = Vec::with_capacity(schema.len() * 8);
    for (value, field) in values.iter().zip(schema.fields()) {
        match field.prop_type {
            PropType::Bool => out.push(u8::from(value.as_bool()?)),
            PropType::Int | PropType::Vid => out.extend_from_slice(&value.as_int()?.to_le_bytes()),
            PropType::Float => {
                out.extend_from_slice(&(value.as_float()? as f32).to_le_bytes());
            }
            PropType::Double => out.extend_from_slice(&value.as_float()?.to_le_bytes()),
            PropType::String => {
                let s = value.as_str()?;
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            other => {
                return Err(TrellisError::Unimplemented {
                    feature: format!("encoding {} field `{}'", other, field.name),
                });
            }
        }
    }
    Ok(out)
}

/// Decode a full row back into values, in schema order.
pub fn decode(bytes: &[u8], schema: &Schema) -> Result<Vec<Value>> {
    let mut offset = 0;
    let mut values = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        values.push(decode_field(bytes, &mut offset, field.prop_type, &field.name)?);
    }
    Ok(values)
}

/// Decode a single named property out of an encoded row.
pub fn read_prop(bytes: &[u8], schema: &Schema, name: &str) -> Result<Value> {
    let index = schema.field_index(name).ok_or_else(|| TrellisError::Data {
        message: format!("no field `{}' in schema", name),
    })?;

    let mut offset = 0;
    for field in &schema.fields()[..index] {
        skip_field(bytes, &mut offset, field.prop_type, &field.name)?;
    }
    let field = &schema.fields()[index];
    decode_field(bytes, &mut offset, field.prop_type, &field.name)
}

/// The typed zero a schema supplies for an absent property.
pub fn default_value(prop_type: PropType) -> Result<Value> {
    match prop_type {
        PropType::Bool => Ok(Value::Bool(false)),
        PropType::Int | PropType::Vid => Ok(Value::Int(0)),
        PropType::Float | PropType::Double => Ok(Value::Float(0.0)),
        PropType::String => Ok(Value::Str(String::new())),
        other => Err(TrellisError::Unimplemented {
            feature: format!("default for {} field", other),
        }),
    }
}

/// Default for a named field; the field must exist in the schema.
pub fn default_prop(schema: &Schema, name: &str) -> Result<Value> {
    let prop_type = schema.field_type(name).ok_or_else(|| TrellisError::Data {
        message: format!("no field `{}' in schema", name),
    })?;
    default_value(prop_type)
}

fn take<'a>(bytes: &'a [u8], offset: &mut usize, len: usize, field: &str) -> Result<&'a [u8]> {
    let end = *offset + len;
    if end > bytes.len() {
        return Err(TrellisError::Data {
            message: format!("row truncated at field `{}'", field),
        });
    }
    let slice = &bytes[*offset..end];
    *offset = end;
    Ok(slice)
}

fn decode_field(bytes: &[u8], offset: &mut usize, ty: PropType, field: &str) -> Result<Value> {
    match ty {
        PropType::Bool => Ok(Value::Bool(take(bytes, offset, 1, field)?[0] != 0)),
        PropType::Int | PropType::Vid => {
            let raw = take(bytes, offset, 8, field)?;
            Ok(Value::Int(i64::from_le_bytes(raw.try_into().unwrap())))
        }
        PropType::Float => {
            let raw = take(bytes, offset, 4, field)?;
            Ok(Value::Float(
                f32::from_le_bytes(raw.try_into().unwrap()) as f64
            ))
        }
        PropType::Double => {
            let raw = take(bytes, offset, 8, field)?;
            Ok(Value::Float(f64::from_le_bytes(raw.try_into().unwrap())))
        }
        PropType::String => {
            let len = u32::from_le_bytes(take(bytes, offset, 4, field)?.try_into().unwrap());
            let raw = take(bytes, offset, len as usize, field)?;
            let s = std::str::from_utf8(raw).map_err(|_| TrellisError::Data {
                message: format!("field `{}' is not valid utf-8", field),
            })?;
            Ok(Value::Str(s.to_string()))
        }
        other => Err(TrellisError::Unimplemented {
            feature: format!("decoding {} field `{}'", other, field),
        }),
    }
}

fn skip_field(bytes: &[u8], offset: &mut usize, ty: PropType, field: &str) -> Result<()> {
    match ty {
        PropType::Bool => take(bytes, offset, 1, field).map(|_| ()),
        PropType::Int | PropType::Vid | PropType::Double => {
            take(bytes, offset, 8, field).map(|_| ())
        }
        PropType::Float => take(bytes, offset, 4, field).map(|_| ()),
        PropType::String => {
            let len = u32::from_le_bytes(take(bytes, offset, 4, field)?.try_into().unwrap());
            take(bytes, offset, len as usize, field).map(|_| ())
        }
        other => Err(TrellisError::Unimplemented {
            feature: format!("decoding {} field `{}'", other, field),
        }),
    }
}
