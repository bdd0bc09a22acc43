use thrift_cr_ast::{BaseType, Type};

use crate::error::{GenError, Result};
use crate::naming::{capitalize, full_type_name};

/// Crystal name of a declared struct, union, exception, enum or typedef.
pub fn type_name(name: &str) -> String {
    capitalize(name)
}

fn base_type_name(base: BaseType) -> &'static str {
    match base {
        BaseType::Void   => "Nil",
        BaseType::Bool   => "Bool",
        BaseType::I8     => "Int8",
        BaseType::I16    => "Int16",
        BaseType::I32    => "Int32",
        BaseType::I64    => "Int64",
        BaseType::Double => "Float64",
        BaseType::String => "String",
        BaseType::Binary => "Bytes",
        BaseType::Uuid   => "UUID",
    }
}

/// Renders a type expression.
///
/// - `base` keeps only the outer container name (`Hash` rather than
///   `Hash(String, Int32)`).
/// - `optional` appends the nilable marker.
///
/// Typedefs render as their alias.
pub fn render_type(ty: &Type, base: bool, optional: bool) -> String {
    let mut rendered = match ty {
        Type::Base(b) => base_type_name(*b).to_string(),
        Type::Enum(r) | Type::Struct(r) => full_type_name(&r.namespace, &type_name(&r.name)),
        Type::Typedef(def) => full_type_name(&def.namespace, &type_name(&def.name)),
        Type::List(_) if base => "Array".to_string(),
        Type::List(elem) => format!("Array({})", render_type(elem, false, false)),
        Type::Set(_) if base => "Set".to_string(),
        Type::Set(elem) => format!("Set({})", render_type(elem, false, false)),
        Type::Map(..) if base => "Hash".to_string(),
        Type::Map(key, value) => format!(
            "Hash({}, {})",
            render_type(key, false, false),
            render_type(value, false, false)
        ),
    };
    if optional && !ty.is_void() {
        rendered.push('?');
    }
    rendered
}

/// The runtime's wire type constant for a type. `void` has none.
pub fn wire_type(ty: &Type) -> Result<&'static str> {
    Ok(match ty.true_type() {
        Type::Base(BaseType::Void) => {
            return Err(GenError::UnrenderableType("void".to_string()));
        }
        Type::Base(BaseType::Bool)   => "::Thrift::Types::Bool",
        Type::Base(BaseType::I8)     => "::Thrift::Types::Byte",
        Type::Base(BaseType::I16)    => "::Thrift::Types::I16",
        Type::Base(BaseType::I32)    => "::Thrift::Types::I32",
        Type::Base(BaseType::I64)    => "::Thrift::Types::I64",
        Type::Base(BaseType::Double) => "::Thrift::Types::Double",
        Type::Base(BaseType::String) | Type::Base(BaseType::Binary) => "::Thrift::Types::String",
        Type::Base(BaseType::Uuid)   => "::Thrift::Types::Uuid",
        Type::Enum(_)                => "::Thrift::Types::I32",
        Type::Struct(_)              => "::Thrift::Types::Struct",
        Type::Map(..)                => "::Thrift::Types::Map",
        Type::Set(_)                 => "::Thrift::Types::Set",
        Type::List(_)                => "::Thrift::Types::List",
        Type::Typedef(_)             => unreachable!("true_type never yields a typedef"),
    })
}

/// Protocol method suffix (`read_<suffix>` / `write_<suffix>`) for primitive
/// types.
pub fn protocol_suffix(base: BaseType) -> Result<&'static str> {
    Ok(match base {
        BaseType::Void   => return Err(GenError::UnrenderableType("void".to_string())),
        BaseType::Bool   => "bool",
        BaseType::I8     => "byte",
        BaseType::I16    => "i16",
        BaseType::I32    => "i32",
        BaseType::I64    => "i64",
        BaseType::Double => "double",
        BaseType::String => "string",
        BaseType::Binary => "binary",
        BaseType::Uuid   => "uuid",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrift_cr_ast::Typedef;

    fn i32_t() -> Type {
        Type::base(BaseType::I32)
    }

    #[test]
    fn primitives() {
        assert_eq!(render_type(&i32_t(), false, false), "Int32");
        assert_eq!(render_type(&Type::base(BaseType::Binary), false, false), "Bytes");
        assert_eq!(render_type(&Type::base(BaseType::String), false, true), "String?");
        assert_eq!(render_type(&Type::base(BaseType::Void), false, true), "Nil");
        assert_eq!(render_type(&Type::base(BaseType::Uuid), false, false), "UUID");
    }

    #[test]
    fn containers_and_base_form() {
        let map = Type::map(Type::base(BaseType::String), Type::list(i32_t()));
        assert_eq!(render_type(&map, false, false), "Hash(String, Array(Int32))");
        assert_eq!(render_type(&map, true, false), "Hash");
        assert_eq!(render_type(&Type::set(i32_t()), false, true), "Set(Int32)?");
    }

    #[test]
    fn references_are_fully_qualified() {
        let work = Type::struct_ref("work", "tutorial", "tutorial.math");
        assert_eq!(render_type(&work, false, false), "::Tutorial::Math::Work");
        let color = Type::enum_ref("Color", "shared", "");
        assert_eq!(render_type(&color, false, true), "::Color?");
    }

    #[test]
    fn typedefs_display_alias_but_wire_as_target() {
        let id = Type::typedef(Typedef {
            name:      "UserIds".into(),
            program:   "shared".into(),
            namespace: "shared".into(),
            target:    Type::list(Type::base(BaseType::I64)),
            doc:       None,
        });
        assert_eq!(render_type(&id, false, false), "::Shared::UserIds");
        assert_eq!(wire_type(&id).unwrap(), "::Thrift::Types::List");
    }

    #[test]
    fn void_has_no_wire_type() {
        let err = wire_type(&Type::base(BaseType::Void)).unwrap_err();
        assert!(matches!(err, GenError::UnrenderableType(_)));
    }
}
