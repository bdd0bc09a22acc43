use serde::{Deserialize, Serialize};

/// Primitive types of the schema language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Uuid,
}

/// A reference to a named declaration (struct, union, exception or enum) that
/// may live in another program pulled in through an include.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name:      String,
    /// Name of the program that declares the referenced type.
    pub program:   String,
    /// Crystal namespace of that program, dot separated. Empty when unset.
    #[serde(default)]
    pub namespace: String,
}

impl TypeRef {
    pub fn new(name: &str, program: &str, namespace: &str) -> TypeRef {
        TypeRef {
            name:      name.to_owned(),
            program:   program.to_owned(),
            namespace: namespace.to_owned(),
        }
    }
}

/// A named alias of another type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Typedef {
    pub name:      String,
    pub program:   String,
    #[serde(default)]
    pub namespace: String,
    pub target:    Type,
    #[serde(default)]
    pub doc:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Base(BaseType),
    Enum(TypeRef),
    /// Structs, unions and exceptions.
    Struct(TypeRef),
    Typedef(Box<Typedef>),
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>, Box<Type>),
}

impl Type {
    pub fn base(base: BaseType) -> Type {
        Type::Base(base)
    }

    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn set(elem: Type) -> Type {
        Type::Set(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn struct_ref(name: &str, program: &str, namespace: &str) -> Type {
        Type::Struct(TypeRef::new(name, program, namespace))
    }

    pub fn enum_ref(name: &str, program: &str, namespace: &str) -> Type {
        Type::Enum(TypeRef::new(name, program, namespace))
    }

    pub fn typedef(typedef: Typedef) -> Type {
        Type::Typedef(Box::new(typedef))
    }

    /// Follows typedef layers down to the first non-typedef type.
    pub fn true_type(&self) -> &Type {
        let mut ty = self;
        while let Type::Typedef(def) = ty {
            ty = &def.target;
        }
        ty
    }

    pub fn is_void(&self) -> bool {
        matches!(self.true_type(), Type::Base(BaseType::Void))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.true_type(), Type::Base(BaseType::Binary))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.true_type(), Type::Enum(_))
    }
}
