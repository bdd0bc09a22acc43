//! `validate`, `write` and `read` for structured types, emitted as explicit
//! calls against the runtime protocol.
//!
//! Write: required-field check, struct begin, one field frame per present
//! field in declaration order, field stop, struct end. Read mirrors it,
//! skipping unknown `(id, type)` pairs and checking required presence after
//! the stop marker. Unions write their single active slot and reject a second
//! known field frame on read.

use thrift_cr_ast::{BaseType, Field, StructDef, Type};

use crate::error::{GenError, Result};
use crate::naming::cr_underscore;
use crate::types::{protocol_suffix, render_type, type_name, wire_type};
use crate::values::crystal_string;
use crate::writer::CodeWriter;

const PROTOCOL: &str = "::Thrift::BaseProtocol";

fn protocol_error(kind: &str, message: &str) -> String {
    format!(
        "raise ::Thrift::ProtocolException.new(::Thrift::ProtocolException::{}, {})",
        kind, message
    )
}

/// `missing` collection and raise for required fields, checking `subject`
/// for each field (`@name` on write, `f_name` locals on read).
fn emit_required_check<F>(w: &mut CodeWriter, fields: &[Field], subject: F) -> Result<()>
where
    F: Fn(&Field) -> String,
{
    let required: Vec<&Field> = fields.iter().filter(|f| f.is_required()).collect();
    if required.is_empty() {
        return Ok(());
    }
    w.line("missing = [] of String");
    for field in required {
        w.line(format!("missing << {} if {}.nil?", crystal_string(&field.name), subject(field)));
    }
    w.block("unless missing.empty?", |w| {
        w.line(protocol_error(
            "MISSING_REQUIRED_FIELD",
            "\"Required fields are not set: \" + missing.join(\", \")",
        ));
        Ok(())
    })
}

fn invalid_enum(field: &Field) -> String {
    protocol_error(
        "INVALID_DATA",
        &crystal_string(&format!("Invalid value of field {}!", field.name)),
    )
}

pub fn emit_struct_validate(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    w.block("def validate : Nil", |w| {
        emit_required_check(w, &def.fields, |f| format!("@{}", cr_underscore(&f.name)))?;
        for field in def.fields.iter().filter(|f| f.ty.is_enum()) {
            let name = cr_underscore(&field.name);
            let enum_path = render_type(field.ty.true_type(), false, false);
            w.block(format!("@{}.try do |value|", name), |w| {
                w.line(format!("{} unless {}.valid_value?(value.value)", invalid_enum(field), enum_path));
                Ok(())
            })?;
        }
        Ok(())
    })
}

fn emit_field_frame(w: &mut CodeWriter, field: &Field, expr: &str) -> Result<()> {
    w.line(format!(
        "oprot.write_field_begin({}, {}, {}_i16)",
        crystal_string(&field.name),
        wire_type(&field.ty)?,
        field.key
    ));
    emit_write_value(w, &field.ty, expr)?;
    w.line("oprot.write_field_end");
    Ok(())
}

pub fn emit_struct_write(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    w.block(format!("def write(oprot : {}) : Nil", PROTOCOL), |w| {
        w.line("validate");
        w.line(format!("oprot.write_struct_begin({})", crystal_string(&def.name)));
        for field in &def.fields {
            let value = w.temp("value");
            w.block(format!("@{}.try do |{}|", cr_underscore(&field.name), value), |w| {
                emit_field_frame(w, field, &value)
            })?;
        }
        w.line("oprot.write_field_stop");
        w.line("oprot.write_struct_end");
        Ok(())
    })
}

fn read_header(w: &mut CodeWriter) {
    w.line("_fname, ftype, fid = iprot.read_field_begin");
    w.line("break if ftype == ::Thrift::Types::Stop");
    w.line("next if ftype == ::Thrift::Types::Void");
}

fn case_arm(field: &Field) -> Result<String> {
    Ok(format!("when {{{}, {}}}", field.key, wire_type(&field.ty)?))
}

pub fn emit_struct_read(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    let local = |f: &Field| format!("f_{}", cr_underscore(&f.name));
    w.block(format!("def self.read(iprot : {}) : self", PROTOCOL), |w| {
        for field in &def.fields {
            w.line(format!("{} : {} = nil", local(field), render_type(&field.ty, false, true)));
        }
        w.line("iprot.read_struct_begin");
        w.block("loop do", |w| {
            read_header(w);
            w.line("case {fid, ftype}");
            for field in &def.fields {
                w.line(case_arm(field)?);
                w.indented(|w| emit_read_value(w, &field.ty, &local(field)))?;
            }
            w.line("else");
            w.indented(|w| {
                w.line("iprot.skip(ftype)");
                Ok(())
            })?;
            w.line("end");
            w.line("iprot.read_field_end");
            Ok(())
        })?;
        w.line("iprot.read_struct_end");

        emit_required_check(w, &def.fields, local)?;

        let required: Vec<String> = def
            .fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| format!("{}: {}.not_nil!", cr_underscore(&f.name), local(f)))
            .collect();
        if required.is_empty() {
            w.line("obj = new");
        } else {
            w.line(format!("obj = new({})", required.join(", ")));
        }
        for field in def.fields.iter().filter(|f| !f.is_required()) {
            w.line(format!(
                "obj.{} = {} unless {}.nil?",
                cr_underscore(&field.name),
                local(field),
                local(field)
            ));
        }
        w.line("obj.validate");
        w.line("obj");
        Ok(())
    })
}

pub fn emit_union_validate(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    w.block("def validate : Nil", |w| {
        w.line(format!(
            "{} unless union_set?",
            protocol_error("MISSING_REQUIRED_FIELD", "\"Union fields are not set.\"")
        ));
        for field in def.fields.iter().filter(|f| f.ty.is_enum()) {
            let name = cr_underscore(&field.name);
            let enum_path = render_type(field.ty.true_type(), false, false);
            w.block(format!("if @set_field == :{}", name), |w| {
                w.line(format!(
                    "{} unless {}.valid_value?(@value.as({}).value)",
                    invalid_enum(field),
                    enum_path,
                    render_type(&field.ty, false, false)
                ));
                Ok(())
            })?;
        }
        Ok(())
    })
}

pub fn emit_union_write(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    w.block(format!("def write(oprot : {}) : Nil", PROTOCOL), |w| {
        w.line("validate");
        w.line(format!("oprot.write_struct_begin({})", crystal_string(&def.name)));
        if !def.fields.is_empty() {
            w.line("case @set_field");
            for field in &def.fields {
                let value = w.temp("value");
                w.line(format!("when :{}", cr_underscore(&field.name)));
                w.indented(|w| {
                    w.line(format!("{} = @value.as({})", value, render_type(&field.ty, false, false)));
                    emit_field_frame(w, field, &value)
                })?;
            }
            w.line("end");
        }
        w.line("oprot.write_field_stop");
        w.line("oprot.write_struct_end");
        Ok(())
    })
}

/// Raised when a second known field frame arrives. Names the offending
/// field with the base form of its type.
fn too_many_fields(def: &StructDef, field: &Field) -> String {
    protocol_error(
        "INVALID_DATA",
        &crystal_string(&format!(
            "Too many fields for union {}: {} ({})",
            type_name(&def.name),
            field.name,
            render_type(&field.ty, true, false)
        )),
    )
}

pub fn emit_union_read(w: &mut CodeWriter, def: &StructDef) -> Result<()> {
    w.block(format!("def self.read(iprot : {}) : self", PROTOCOL), |w| {
        w.line("union = new");
        w.line("iprot.read_struct_begin");
        w.block("loop do", |w| {
            read_header(w);
            w.line("case {fid, ftype}");
            for field in &def.fields {
                let value = w.temp("value");
                w.line(case_arm(field)?);
                w.indented(|w| {
                    w.line(format!("{} if union.union_set?", too_many_fields(def, field)));
                    emit_read_value(w, &field.ty, &value)?;
                    w.line(format!("union.{} = {}", cr_underscore(&field.name), value));
                    Ok(())
                })?;
            }
            w.line("else");
            w.indented(|w| {
                w.line("iprot.skip(ftype)");
                Ok(())
            })?;
            w.line("end");
            w.line("iprot.read_field_end");
            Ok(())
        })?;
        w.line("iprot.read_struct_end");
        w.line("union.validate");
        w.line("union");
        Ok(())
    })
}

/// Statements serializing `expr`, a non-nil value of type `ty`.
pub fn emit_write_value(w: &mut CodeWriter, ty: &Type, expr: &str) -> Result<()> {
    match ty.true_type() {
        Type::Base(base) => {
            w.line(format!("oprot.write_{}({})", protocol_suffix(*base)?, expr));
        }
        Type::Enum(_) => w.line(format!("oprot.write_i32({}.value)", expr)),
        Type::Struct(_) => w.line(format!("{}.write(oprot)", expr)),
        Type::List(elem) | Type::Set(elem) => {
            let kind = if matches!(ty.true_type(), Type::List(_)) { "list" } else { "set" };
            let item = w.temp("elem");
            w.line(format!("oprot.write_{}_begin({}, {}.size)", kind, wire_type(elem)?, expr));
            w.block(format!("{}.each do |{}|", expr, item), |w| emit_write_value(w, elem, &item))?;
            w.line(format!("oprot.write_{}_end", kind));
        }
        Type::Map(key, value) => {
            let k = w.temp("key");
            let v = w.temp("val");
            w.line(format!(
                "oprot.write_map_begin({}, {}, {}.size)",
                wire_type(key)?,
                wire_type(value)?,
                expr
            ));
            w.block(format!("{}.each do |{}, {}|", expr, k, v), |w| {
                emit_write_value(w, key, &k)?;
                emit_write_value(w, value, &v)
            })?;
            w.line("oprot.write_map_end");
        }
        Type::Typedef(def) => return Err(GenError::UnresolvedType(def.name.clone())),
    }
    Ok(())
}

/// Statements deserializing one value of type `ty` and assigning it to
/// `target`.
pub fn emit_read_value(w: &mut CodeWriter, ty: &Type, target: &str) -> Result<()> {
    let true_ty = ty.true_type();
    match true_ty {
        Type::Base(BaseType::Void) => {
            return Err(GenError::UnrenderableType("void".to_string()));
        }
        Type::Base(base) => {
            w.line(format!("{} = iprot.read_{}", target, protocol_suffix(*base)?));
        }
        Type::Enum(_) => w.line(format!(
            "{} = {}.new(iprot.read_i32)",
            target,
            render_type(true_ty, false, false)
        )),
        Type::Struct(_) => w.line(format!(
            "{} = {}.read(iprot)",
            target,
            render_type(true_ty, false, false)
        )),
        Type::List(elem) | Type::Set(elem) => {
            let kind = if matches!(true_ty, Type::List(_)) { "list" } else { "set" };
            let size = w.temp("size");
            let container = w.temp(kind);
            let item = w.temp("elem");
            w.line(format!("_etype, {} = iprot.read_{}_begin", size, kind));
            w.line(format!(
                "{} = {}.new({})",
                container,
                render_type(true_ty, false, false),
                size
            ));
            w.block(format!("{}.times do", size), |w| {
                emit_read_value(w, elem, &item)?;
                w.line(format!("{} << {}", container, item));
                Ok(())
            })?;
            w.line(format!("iprot.read_{}_end", kind));
            w.line(format!("{} = {}", target, container));
        }
        Type::Map(key, value) => {
            let size = w.temp("size");
            let container = w.temp("map");
            let k = w.temp("key");
            let v = w.temp("val");
            w.line(format!("_ktype, _vtype, {} = iprot.read_map_begin", size));
            w.line(format!(
                "{} = {}.new(initial_capacity: {})",
                container,
                render_type(true_ty, false, false),
                size
            ));
            w.block(format!("{}.times do", size), |w| {
                emit_read_value(w, key, &k)?;
                emit_read_value(w, value, &v)?;
                w.line(format!("{}[{}] = {}", container, k, v));
                Ok(())
            })?;
            w.line("iprot.read_map_end");
            w.line(format!("{} = {}", target, container));
        }
        Type::Typedef(def) => return Err(GenError::UnresolvedType(def.name.clone())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrift_cr_ast::{Program, StructKind};

    fn i32_t() -> Type {
        Type::base(BaseType::I32)
    }

    #[test]
    fn write_value_for_nested_containers() {
        let mut w = CodeWriter::new();
        let ty = Type::map(Type::base(BaseType::String), Type::list(i32_t()));
        emit_write_value(&mut w, &ty, "scores").unwrap();
        assert_eq!(
            w.finish(),
            "oprot.write_map_begin(::Thrift::Types::String, ::Thrift::Types::List, scores.size)\n\
             scores.each do |key_1, val_2|\n\
             \x20 oprot.write_string(key_1)\n\
             \x20 oprot.write_list_begin(::Thrift::Types::I32, val_2.size)\n\
             \x20 val_2.each do |elem_3|\n\
             \x20   oprot.write_i32(elem_3)\n\
             \x20 end\n\
             \x20 oprot.write_list_end\n\
             end\n\
             oprot.write_map_end\n"
        );
    }

    #[test]
    fn read_value_for_set_of_enums() {
        let program = Program::new("t", "t");
        let mut w = CodeWriter::new();
        let ty = Type::set(program.enum_type("Color"));
        emit_read_value(&mut w, &ty, "f_colors").unwrap();
        assert_eq!(
            w.finish(),
            "_etype, size_1 = iprot.read_set_begin\n\
             set_2 = Set(::T::Color).new(size_1)\n\
             size_1.times do\n\
             \x20 elem_3 = ::T::Color.new(iprot.read_i32)\n\
             \x20 set_2 << elem_3\n\
             end\n\
             iprot.read_set_end\n\
             f_colors = set_2\n"
        );
    }

    #[test]
    fn struct_write_skips_absent_fields() {
        let def = StructDef::new(
            "Work",
            StructKind::Struct,
            vec![
                Field::new(1, "num1", i32_t()).required(),
                Field::new(4, "comment", Type::base(BaseType::String)).optional(),
            ],
        );
        let mut w = CodeWriter::new();
        emit_struct_write(&mut w, &def).unwrap();
        let out = w.finish();
        assert!(out.starts_with("def write(oprot : ::Thrift::BaseProtocol) : Nil\n  validate\n"));
        assert!(out.contains(
            "  @comment.try do |value_2|\n    oprot.write_field_begin(\"comment\", ::Thrift::Types::String, 4_i16)\n    oprot.write_string(value_2)\n    oprot.write_field_end\n  end\n"
        ));
        assert!(out.ends_with("  oprot.write_field_stop\n  oprot.write_struct_end\nend\n"));
    }

    #[test]
    fn struct_validate_names_missing_required_fields() {
        let def = StructDef::new(
            "Pair",
            StructKind::Struct,
            vec![
                Field::new(1, "left", i32_t()).required(),
                Field::new(2, "right", i32_t()).required(),
                Field::new(3, "note", Type::base(BaseType::String)),
            ],
        );
        let mut w = CodeWriter::new();
        emit_struct_validate(&mut w, &def).unwrap();
        let out = w.finish();
        assert!(out.contains("missing << \"left\" if @left.nil?\n"));
        assert!(out.contains("missing << \"right\" if @right.nil?\n"));
        assert!(!out.contains("\"note\""));
        assert!(out.contains("::Thrift::ProtocolException::MISSING_REQUIRED_FIELD"));
    }

    #[test]
    fn struct_without_required_fields_has_no_presence_check() {
        let def = StructDef::new("Loose", StructKind::Struct, vec![Field::new(1, "x", i32_t())]);
        let mut w = CodeWriter::new();
        emit_struct_validate(&mut w, &def).unwrap();
        assert_eq!(w.finish(), "def validate : Nil\nend\n");
    }

    #[test]
    fn struct_read_skips_unknown_fields_and_checks_required() {
        let def = StructDef::new(
            "User",
            StructKind::Struct,
            vec![
                Field::new(1, "id", i32_t()).required(),
                Field::new(2, "name", Type::base(BaseType::String)).optional(),
            ],
        );
        let mut w = CodeWriter::new();
        emit_struct_read(&mut w, &def).unwrap();
        assert_eq!(
            w.finish(),
            "def self.read(iprot : ::Thrift::BaseProtocol) : self\n\
             \x20 f_id : Int32? = nil\n\
             \x20 f_name : String? = nil\n\
             \x20 iprot.read_struct_begin\n\
             \x20 loop do\n\
             \x20   _fname, ftype, fid = iprot.read_field_begin\n\
             \x20   break if ftype == ::Thrift::Types::Stop\n\
             \x20   next if ftype == ::Thrift::Types::Void\n\
             \x20   case {fid, ftype}\n\
             \x20   when {1, ::Thrift::Types::I32}\n\
             \x20     f_id = iprot.read_i32\n\
             \x20   when {2, ::Thrift::Types::String}\n\
             \x20     f_name = iprot.read_string\n\
             \x20   else\n\
             \x20     iprot.skip(ftype)\n\
             \x20   end\n\
             \x20   iprot.read_field_end\n\
             \x20 end\n\
             \x20 iprot.read_struct_end\n\
             \x20 missing = [] of String\n\
             \x20 missing << \"id\" if f_id.nil?\n\
             \x20 unless missing.empty?\n\
             \x20   raise ::Thrift::ProtocolException.new(::Thrift::ProtocolException::MISSING_REQUIRED_FIELD, \
             \"Required fields are not set: \" + missing.join(\", \"))\n\
             \x20 end\n\
             \x20 obj = new(id: f_id.not_nil!)\n\
             \x20 obj.name = f_name unless f_name.nil?\n\
             \x20 obj.validate\n\
             \x20 obj\n\
             end\n"
        );
    }

    #[test]
    fn union_write_dispatches_on_the_set_field() {
        let def = StructDef::new(
            "Operand",
            StructKind::Union,
            vec![
                Field::new(1, "number", i32_t()),
                Field::new(2, "label", Type::base(BaseType::String)),
            ],
        );
        let mut w = CodeWriter::new();
        emit_union_write(&mut w, &def).unwrap();
        assert_eq!(
            w.finish(),
            "def write(oprot : ::Thrift::BaseProtocol) : Nil\n\
             \x20 validate\n\
             \x20 oprot.write_struct_begin(\"Operand\")\n\
             \x20 case @set_field\n\
             \x20 when :number\n\
             \x20   value_1 = @value.as(Int32)\n\
             \x20   oprot.write_field_begin(\"number\", ::Thrift::Types::I32, 1_i16)\n\
             \x20   oprot.write_i32(value_1)\n\
             \x20   oprot.write_field_end\n\
             \x20 when :label\n\
             \x20   value_2 = @value.as(String)\n\
             \x20   oprot.write_field_begin(\"label\", ::Thrift::Types::String, 2_i16)\n\
             \x20   oprot.write_string(value_2)\n\
             \x20   oprot.write_field_end\n\
             \x20 end\n\
             \x20 oprot.write_field_stop\n\
             \x20 oprot.write_struct_end\n\
             end\n"
        );
    }

    #[test]
    fn field_names_never_shadow_generated_locals() {
        let def = StructDef::new("Frame", StructKind::Struct, vec![Field::new(1, "oprot", i32_t())]);
        let mut w = CodeWriter::new();
        emit_struct_write(&mut w, &def).unwrap();
        let out = w.finish();
        assert!(out.contains("  @oprot.try do |value_1|\n"));
        assert!(out.contains("    oprot.write_i32(value_1)\n"));
        assert!(!out.contains("|oprot|"));

        let def = StructDef::new(
            "Wrapper",
            StructKind::Union,
            vec![Field::new(1, "iprot", i32_t()), Field::new(2, "union", i32_t())],
        );
        let mut w = CodeWriter::new();
        emit_union_read(&mut w, &def).unwrap();
        let out = w.finish();
        assert!(out.contains("      value_1 = iprot.read_i32\n      union.iprot = value_1\n"));
        assert!(out.contains("      value_2 = iprot.read_i32\n      union.union = value_2\n"));
        assert!(!out.contains("union = iprot"));
    }

    #[test]
    fn second_union_field_is_rejected_with_its_type() {
        let def = StructDef::new(
            "Tags",
            StructKind::Union,
            vec![Field::new(1, "names", Type::list(Type::base(BaseType::String)))],
        );
        let mut w = CodeWriter::new();
        emit_union_read(&mut w, &def).unwrap();
        let out = w.finish();
        assert!(out.contains("\"Too many fields for union Tags: names (Array)\") if union.union_set?\n"));
        assert!(out.contains("    else\n      iprot.skip(ftype)\n"));
        assert!(out.ends_with("  union.validate\n  union\nend\n"));
    }

    #[test]
    fn void_fields_are_rejected() {
        let mut w = CodeWriter::new();
        let err = emit_read_value(&mut w, &Type::base(BaseType::Void), "x").unwrap_err();
        assert!(matches!(err, GenError::UnrenderableType(_)));
    }
}
