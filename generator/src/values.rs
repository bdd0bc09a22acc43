use log::warn;
use thrift_cr_ast::{BaseType, ConstValue, Program, Type};

use crate::error::{GenError, Result};
use crate::naming::cr_underscore;
use crate::types::render_type;

/// Double-quoted Crystal string literal.
pub fn crystal_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"'  => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '#' if chars.peek() == Some(&'{') => out.push_str("\\#"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn malformed(ty: &Type, expected: &'static str, value: &ConstValue) -> GenError {
    GenError::MalformedConstant {
        ty:       render_type(ty, false, false),
        expected,
        found:    value.kind_name(),
    }
}

fn integer_literal(base: BaseType, i: i64) -> String {
    match base {
        BaseType::I8  => format!("{}_i8", i),
        BaseType::I16 => format!("{}_i16", i),
        BaseType::I64 => format!("{}_i64", i),
        _ => i.to_string(),
    }
}

fn double_literal(d: f64) -> String {
    if d.is_nan() {
        "Float64::NAN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "Float64::INFINITY" } else { "-Float64::INFINITY" }.to_string()
    } else {
        // Debug formatting always keeps a fraction or exponent.
        format!("{:?}", d)
    }
}

fn render_elements(program: &Program, elem: &Type, values: &[ConstValue]) -> Result<String> {
    let rendered = values
        .iter()
        .map(|v| render_value(program, elem, v))
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

/// Renders a constant as a Crystal expression of type `ty`.
pub fn render_value(program: &Program, ty: &Type, value: &ConstValue) -> Result<String> {
    match ty.true_type() {
        Type::Base(BaseType::Void) => Err(GenError::UnrenderableType("void".to_string())),

        Type::Base(BaseType::String) => match value {
            ConstValue::String(s) => Ok(crystal_string(s)),
            _ => Err(malformed(ty, "string", value)),
        },
        Type::Base(BaseType::Binary) => match value {
            ConstValue::String(s) => Ok(format!("{}.to_slice", crystal_string(s))),
            _ => Err(malformed(ty, "string", value)),
        },
        Type::Base(BaseType::Uuid) => match value {
            ConstValue::String(s) => Ok(format!("UUID.new({})", crystal_string(s))),
            _ => Err(malformed(ty, "string", value)),
        },
        Type::Base(BaseType::Bool) => match value.as_integer() {
            Some(i) => Ok(if i != 0 { "true" } else { "false" }.to_string()),
            None => Err(malformed(ty, "bool", value)),
        },
        Type::Base(base @ (BaseType::I8 | BaseType::I16 | BaseType::I32 | BaseType::I64)) => {
            match value {
                ConstValue::Integer(i) => Ok(integer_literal(*base, *i)),
                _ => Err(malformed(ty, "integer", value)),
            }
        }
        Type::Base(BaseType::Double) => match value {
            ConstValue::Integer(i) => Ok(format!("{}.0", i)),
            ConstValue::Double(d) => Ok(double_literal(*d)),
            _ => Err(malformed(ty, "double", value)),
        },

        // The constant model keeps only the member's integer value.
        Type::Enum(r) => match value {
            ConstValue::Integer(i) => {
                let known = program
                    .find_enum(r)
                    .map_or(true, |def| def.values.iter().any(|v| i64::from(v.value) == *i));
                if !known {
                    warn!("constant value {} is not a member of enum {}", i, r.name);
                }
                Ok(format!("{}.new({})", render_type(ty, false, false), i))
            }
            _ => Err(malformed(ty, "integer", value)),
        },

        Type::Struct(r) => {
            let def = program
                .find_struct(r)
                .ok_or_else(|| GenError::UnresolvedType(r.name.clone()))?;
            let pairs = match value {
                ConstValue::Map(pairs) => pairs,
                _ => return Err(malformed(ty, "field map", value)),
            };
            let type_path = render_type(ty, false, false);
            if pairs.is_empty() {
                return Ok(format!("{}.new", type_path));
            }
            let mut args = Vec::with_capacity(pairs.len());
            for (key, v) in pairs {
                let name = key
                    .as_str()
                    .ok_or_else(|| malformed(ty, "string field name", key))?;
                let field = def.field(name).ok_or_else(|| GenError::UnknownField {
                    ty:    def.name.clone(),
                    field: name.to_string(),
                })?;
                args.push(format!(
                    "{}: {}",
                    cr_underscore(&field.name),
                    render_value(program, &field.ty, v)?
                ));
            }
            Ok(format!("{}.new({})", type_path, args.join(", ")))
        }

        Type::Map(key_ty, val_ty) => {
            let pairs = match value {
                ConstValue::Map(pairs) => pairs,
                _ => return Err(malformed(ty, "map", value)),
            };
            let type_expr = render_type(ty, false, false);
            if pairs.is_empty() {
                return Ok(format!("{}.new", type_expr));
            }
            let entries = pairs
                .iter()
                .map(|(k, v)| {
                    Ok(format!(
                        "{} => {}",
                        render_value(program, key_ty, k)?,
                        render_value(program, val_ty, v)?
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{}{{{}}}", type_expr, entries.join(", ")))
        }

        Type::List(elem) | Type::Set(elem) => {
            let values = match value {
                ConstValue::List(values) => values,
                _ => return Err(malformed(ty, "list", value)),
            };
            let type_expr = render_type(ty, false, false);
            if values.is_empty() {
                return Ok(format!("{}.new", type_expr));
            }
            Ok(format!("{}{{{}}}", type_expr, render_elements(program, elem, values)?))
        }

        Type::Typedef(_) => unreachable!("true_type never yields a typedef"),
    }
}
