//! thrift-cr-generator
//!
//! Renders a validated Thrift program into Crystal source:
//!  1) type and constant rendering (`types`, `values`),
//!  2) declarations for typedefs, enums, constants, structs, unions and exceptions,
//!  3) binary wire `read`/`write`/`validate` methods (`codec`),
//!  4) service clients, processors and server skeletons (`service`),
//!  5) the per-program driver (`generate_program`) and file output (`write_files`).

pub mod error;
pub mod naming;
pub mod writer;
pub mod types;
pub mod values;
pub mod declarations;
pub mod codec;
pub mod service;
pub mod options;
pub mod output;
pub mod generator;

pub use error::{GenError, Result};
pub use generator::generate_program;
pub use options::GeneratorOptions;
pub use output::{write_files, GeneratedFile};
