use serde::{Deserialize, Serialize};

use crate::types::{Type, TypeRef, Typedef};
use crate::value::ConstValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requiredness {
    Required,
    Optional,
    /// Accepted when absent on input, always written when present on output.
    #[default]
    OptInReqOut,
}

impl Requiredness {
    /// Symbol used in generated property annotations.
    pub fn symbol(&self) -> &'static str {
        match self {
            Requiredness::Required    => ":required",
            Requiredness::Optional    => ":optional",
            Requiredness::OptInReqOut => ":opt_in_req_out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name:    String,
    pub key:     i32,
    #[serde(rename = "type")]
    pub ty:      Type,
    #[serde(default)]
    pub req:     Requiredness,
    #[serde(default)]
    pub default: Option<ConstValue>,
    #[serde(default)]
    pub doc:     Option<String>,
}

impl Field {
    pub fn new(key: i32, name: &str, ty: Type) -> Field {
        Field {
            name:    name.to_owned(),
            key,
            ty,
            req:     Requiredness::default(),
            default: None,
            doc:     None,
        }
    }

    pub fn required(mut self) -> Field {
        self.req = Requiredness::Required;
        self
    }

    pub fn optional(mut self) -> Field {
        self.req = Requiredness::Optional;
        self
    }

    pub fn with_default(mut self, value: ConstValue) -> Field {
        self.default = Some(value);
        self
    }

    pub fn is_required(&self) -> bool {
        self.req == Requiredness::Required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    Struct,
    Union,
    Exception,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name:   String,
    pub kind:   StructKind,
    /// Declaration order is wire declaration order.
    pub fields: Vec<Field>,
    #[serde(default)]
    pub doc:    Option<String>,
}

impl StructDef {
    pub fn new(name: &str, kind: StructKind, fields: Vec<Field>) -> StructDef {
        StructDef {
            name: name.to_owned(),
            kind,
            fields,
            doc: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_union(&self) -> bool {
        self.kind == StructKind::Union
    }

    pub fn is_exception(&self) -> bool {
        self.kind == StructKind::Exception
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name:  String,
    pub value: i32,
    #[serde(default)]
    pub doc:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name:   String,
    pub values: Vec<EnumValue>,
    #[serde(default)]
    pub doc:    Option<String>,
}

impl EnumDef {
    pub fn new(name: &str, values: &[(&str, i32)]) -> EnumDef {
        EnumDef {
            name:   name.to_owned(),
            values: values
                .iter()
                .map(|(name, value)| EnumValue {
                    name:  (*name).to_owned(),
                    value: *value,
                    doc:   None,
                })
                .collect(),
            doc:    None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDef {
    pub name:  String,
    #[serde(rename = "type")]
    pub ty:    Type,
    pub value: ConstValue,
    #[serde(default)]
    pub doc:   Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name:    String,
    pub returns: Type,
    #[serde(default)]
    pub args:    Vec<Field>,
    #[serde(default)]
    pub throws:  Vec<Field>,
    #[serde(default)]
    pub oneway:  bool,
    #[serde(default)]
    pub doc:     Option<String>,
}

impl Function {
    pub fn new(name: &str, returns: Type, args: Vec<Field>) -> Function {
        Function {
            name: name.to_owned(),
            returns,
            args,
            throws: Vec::new(),
            oneway: false,
            doc: None,
        }
    }

    pub fn throws(mut self, throws: Vec<Field>) -> Function {
        self.throws = throws;
        self
    }

    pub fn oneway(mut self) -> Function {
        self.oneway = true;
        self
    }
}

/// Parent of an extending service. The parent may be declared in an included
/// program, so it is referenced the same way types are.
pub type ServiceRef = TypeRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name:      String,
    #[serde(default)]
    pub extends:   Option<ServiceRef>,
    pub functions: Vec<Function>,
    #[serde(default)]
    pub doc:       Option<String>,
}

/// One schema file, fully resolved and validated upstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub name:      String,
    /// Crystal namespace, dot separated. Empty when the schema declares none.
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub includes:  Vec<Program>,
    #[serde(default)]
    pub typedefs:  Vec<Typedef>,
    #[serde(default)]
    pub enums:     Vec<EnumDef>,
    #[serde(default)]
    pub consts:    Vec<ConstDef>,
    #[serde(default)]
    pub structs:   Vec<StructDef>,
    #[serde(default)]
    pub services:  Vec<Service>,
}

impl Program {
    pub fn new(name: &str, namespace: &str) -> Program {
        Program {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            ..Program::default()
        }
    }

    /// Builds a reference to a struct declared in this program.
    pub fn struct_type(&self, name: &str) -> Type {
        Type::struct_ref(name, &self.name, &self.namespace)
    }

    pub fn enum_type(&self, name: &str) -> Type {
        Type::enum_ref(name, &self.name, &self.namespace)
    }

    pub fn service_ref(&self, name: &str) -> ServiceRef {
        TypeRef::new(name, &self.name, &self.namespace)
    }

    /// Finds the program called `name`, searching this program and then its
    /// includes depth first.
    pub fn find_program(&self, name: &str) -> Option<&Program> {
        if self.name == name {
            return Some(self);
        }
        self.includes.iter().find_map(|p| p.find_program(name))
    }

    pub fn find_struct(&self, r: &TypeRef) -> Option<&StructDef> {
        self.find_program(&r.program)?
            .structs
            .iter()
            .find(|s| s.name == r.name)
    }

    pub fn find_enum(&self, r: &TypeRef) -> Option<&EnumDef> {
        self.find_program(&r.program)?
            .enums
            .iter()
            .find(|e| e.name == r.name)
    }
}
