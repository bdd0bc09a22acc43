//! Declarations for typedefs, enums, constants, structs, unions and
//! exceptions. Wire methods for the structured types come from
//! [`crate::codec`].

use log::debug;
use thrift_cr_ast::{ConstDef, EnumDef, Field, Program, StructDef, StructKind, Type, Typedef};

use crate::codec;
use crate::error::Result;
use crate::naming::{cr_underscore, enum_member_name};
use crate::types::{render_type, type_name};
use crate::values::{crystal_string, render_value};
use crate::writer::CodeWriter;

pub fn emit_typedef(w: &mut CodeWriter, typedef: &Typedef) -> Result<()> {
    debug!("typedef {}", typedef.name);
    w.doc(typedef.doc.as_deref());
    w.line(format!(
        "alias {} = {}",
        type_name(&typedef.name),
        render_type(&typedef.target, false, false)
    ));
    w.blank();
    Ok(())
}

pub fn emit_enum(w: &mut CodeWriter, def: &EnumDef) -> Result<()> {
    debug!("enum {}", def.name);
    w.doc(def.doc.as_deref());
    w.block(format!("enum {}", type_name(&def.name)), |w| {
        for member in &def.values {
            w.doc(member.doc.as_deref());
            w.line(format!("{} = {}", enum_member_name(&member.name), member.value));
        }
        w.blank();
        w.block("def self.valid_value?(value : Int32) : Bool", |w| {
            if def.values.is_empty() {
                w.line("false");
            } else {
                let values: Vec<String> = def.values.iter().map(|v| v.value.to_string()).collect();
                w.line(format!("{{{}}}.includes?(value)", values.join(", ")));
            }
            Ok(())
        })
    })?;
    w.blank();
    Ok(())
}

pub fn emit_const(w: &mut CodeWriter, program: &Program, def: &ConstDef) -> Result<()> {
    debug!("const {}", def.name);
    w.doc(def.doc.as_deref());
    w.line(format!(
        "{} = {}",
        def.name.to_uppercase(),
        render_value(program, &def.ty, &def.value)?
    ));
    w.blank();
    Ok(())
}

/// Emits a struct, union or exception.
pub fn emit_struct(w: &mut CodeWriter, program: &Program, def: &StructDef) -> Result<()> {
    debug!("{:?} {}", def.kind, def.name);
    match def.kind {
        StructKind::Union => emit_union(w, def),
        StructKind::Struct | StructKind::Exception => emit_plain_struct(w, program, def),
    }
}

/// Annotation arguments recording the wire contract of one field.
pub fn property_annotation(field: &Field) -> String {
    let mut args = format!("fid: {}, requirement: {}", field.key, field.req.symbol());
    if field.ty.is_binary() {
        args.push_str(", binary: true");
    }
    let cr_name = cr_underscore(&field.name);
    if cr_name != field.name {
        args.push_str(&format!(", transmit_name: {}", crystal_string(&field.name)));
    }
    args
}

/// Constructor parameter order: required fields without a default, then
/// every field carrying a default, then the remaining optional fields. Each
/// group keeps declaration order.
pub fn constructor_order(fields: &[Field]) -> Vec<&Field> {
    let required_bare = fields.iter().filter(|f| f.is_required() && f.default.is_none());
    let defaulted = fields.iter().filter(|f| f.default.is_some());
    let optional_bare = fields.iter().filter(|f| !f.is_required() && f.default.is_none());
    required_bare.chain(defaulted).chain(optional_bare).collect()
}

fn constructor_param(program: &Program, field: &Field) -> Result<String> {
    let name = cr_underscore(&field.name);
    let ty = render_type(&field.ty, false, !field.is_required());
    Ok(match &field.default {
        Some(value) => format!("@{} : {} = {}", name, ty, render_value(program, &field.ty, value)?),
        None if field.is_required() => format!("@{} : {}", name, ty),
        None => format!("@{} : {} = nil", name, ty),
    })
}

fn emit_plain_struct(w: &mut CodeWriter, program: &Program, def: &StructDef) -> Result<()> {
    let header = match def.kind {
        StructKind::Exception => format!("class {} < Exception", type_name(&def.name)),
        _ => format!("class {}", type_name(&def.name)),
    };
    w.doc(def.doc.as_deref());
    w.block(header, |w| {
        w.line("include ::Thrift::Struct");
        w.blank();

        for field in &def.fields {
            w.doc(field.doc.as_deref());
            w.line(format!("@[::Thrift::Struct::Property({})]", property_annotation(field)));
            let name = cr_underscore(&field.name);
            if field.is_required() {
                w.line(format!("property! {} : {}", name, render_type(&field.ty, false, false)));
            } else {
                w.line(format!("property {} : {}", name, render_type(&field.ty, false, true)));
            }
        }
        if !def.fields.is_empty() {
            w.blank();
        }

        let params = constructor_order(&def.fields)
            .into_iter()
            .map(|f| constructor_param(program, f))
            .collect::<Result<Vec<_>>>()?;
        if params.is_empty() {
            w.line("def initialize");
        } else {
            w.line(format!("def initialize({})", params.join(", ")));
        }
        w.line("end");
        w.blank();

        if !def.fields.is_empty() {
            let ivars: Vec<String> = def.fields.iter().map(|f| format!("@{}", cr_underscore(&f.name))).collect();
            w.line(format!("def_equals_and_hash {}", ivars.join(", ")));
            w.blank();
        }

        codec::emit_struct_validate(w, def)?;
        w.blank();
        codec::emit_struct_write(w, def)?;
        w.blank();
        codec::emit_struct_read(w, def)
    })?;
    w.blank();
    Ok(())
}

/// Distinct Crystal types a union may hold, in declaration order.
fn union_value_type(fields: &[Field]) -> String {
    let mut types: Vec<String> = Vec::new();
    for field in fields {
        let ty = render_type(&field.ty, false, false);
        if !types.contains(&ty) {
            types.push(ty);
        }
    }
    types.push("Nil".to_string());
    types.join(" | ")
}

fn emit_union(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    w.doc(def.doc.as_deref());
    w.block(format!("class {}", type_name(&def.name)), |w| {
        w.line("include ::Thrift::Union");
        w.blank();
        w.line("@set_field : Symbol? = nil");
        w.line(format!("@value : {} = nil", union_value_type(&def.fields)));
        w.blank();
        w.line("def initialize");
        w.line("end");
        w.blank();
        w.line("def_equals_and_hash @set_field, @value");
        w.blank();

        for field in &def.fields {
            emit_union_accessors(w, field)?;
        }

        w.block("def get_set_field : Symbol?", |w| {
            w.line("@set_field");
            Ok(())
        })?;
        w.blank();
        w.block("def get_value", |w| {
            w.line("@value");
            Ok(())
        })?;
        w.blank();
        w.block("def union_set? : Bool", |w| {
            w.line("!@set_field.nil?");
            Ok(())
        })?;
        w.blank();

        codec::emit_union_validate(w, def)?;
        w.blank();
        codec::emit_union_write(w, def)?;
        w.blank();
        codec::emit_union_read(w, def)
    })?;
    w.blank();
    Ok(())
}

/// Factory, getters and setter for one union slot. Setting a slot replaces
/// whichever slot was set before.
fn emit_union_accessors(w: &mut CodeWriter, field: &Field) -> Result<()> {
    let name = cr_underscore(&field.name);
    let ty = render_type(&field.ty, false, false);

    w.doc(field.doc.as_deref());
    w.line(format!("@[::Thrift::Union::Property({})]", union_annotation(field)));
    w.block(format!("def self.{}(value : {}) : self", name, ty), |w| {
        w.line("union = new");
        w.line(format!("union.{} = value", name));
        w.line("union");
        Ok(())
    })?;
    w.blank();
    w.block(format!("def {}? : {}?", name, ty), |w| {
        w.line(format!("@value.as({}) if @set_field == :{}", ty, name));
        Ok(())
    })?;
    w.blank();
    w.block(format!("def {} : {}", name, ty), |w| {
        w.block(format!("unless @set_field == :{}", name), |w| {
            w.line(format!(
                "raise ::Thrift::ProtocolException.new(::Thrift::ProtocolException::UNKNOWN, \"Union field {} is not set\")",
                name
            ));
            Ok(())
        })?;
        w.line(format!("@value.as({})", ty));
        Ok(())
    })?;
    w.blank();
    w.block(format!("def {}=(value : {}) : {}", name, ty, ty), |w| {
        w.line(format!("@set_field = :{}", name));
        w.line("@value = value");
        Ok(())
    })?;
    w.blank();
    Ok(())
}

fn union_annotation(field: &Field) -> String {
    let mut args = format!("fid: {}", field.key);
    if field.ty.is_binary() {
        args.push_str(", binary: true");
    }
    if cr_underscore(&field.name) != field.name {
        args.push_str(&format!(", transmit_name: {}", crystal_string(&field.name)));
    }
    args
}

/// Synthetic result struct of a service function: `success` (id 0) unless
/// the function returns void, then one optional slot per declared exception.
pub fn function_result_struct(name: &str, returns: &Type, throws: &[Field]) -> StructDef {
    let mut fields = Vec::with_capacity(throws.len() + 1);
    if !returns.is_void() {
        fields.push(Field::new(0, "success", returns.clone()).optional());
    }
    for ex in throws {
        fields.push(ex.clone().optional());
    }
    StructDef::new(name, StructKind::Struct, fields)
}
