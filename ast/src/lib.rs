//! The schema tree handed to the Crystal back end by the upstream Thrift
//! compiler. Everything here is already parsed, resolved and validated: field
//! keys are unique, every type reference points at a real declaration, and
//! every constant matches its declared type.
//!
//! ```
//! use thrift_cr_ast::*;
//!
//! let mut program = Program::new("tutorial", "tutorial");
//! program.structs.push(StructDef::new("Work", StructKind::Struct, vec![
//!     Field::new(1, "num1", Type::base(BaseType::I32)).required(),
//!     Field::new(2, "comment", Type::base(BaseType::String)).optional(),
//! ]));
//!
//! let work = program.struct_type("Work");
//! if let Type::Struct(r) = &work {
//!     assert_eq!(program.find_struct(r).unwrap().fields.len(), 2);
//! }
//! ```

pub mod program;
pub mod types;
pub mod value;

pub use program::*;
pub use types::*;
pub use value::*;
