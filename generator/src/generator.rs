//! Walks one program and renders its output files in memory.

use std::path::PathBuf;

use log::{debug, info};
use thrift_cr_ast::{BaseType, Program, Service, Type};

use crate::declarations::{emit_const, emit_enum, emit_struct, emit_typedef};
use crate::error::Result;
use crate::naming::{crystal_modules, namespace_path_prefix, relative_require, underscore};
use crate::options::GeneratorOptions;
use crate::output::GeneratedFile;
use crate::service::{emit_service, render_skeleton};
use crate::values::crystal_string;
use crate::writer::CodeWriter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn banner(w: &mut CodeWriter) {
    w.line("#");
    w.line(format!("# Autogenerated by Thrift Compiler ({})", VERSION));
    w.line("#");
    w.line("# DO NOT EDIT UNLESS YOU ARE SURE THAT YOU KNOW WHAT YOU ARE DOING");
    w.line("#");
    w.blank();
}

fn require(w: &mut CodeWriter, path: &str) {
    w.line(format!("require {}", crystal_string(path)));
}

fn mentions_uuid(ty: &Type) -> bool {
    match ty {
        Type::Base(base) => *base == BaseType::Uuid,
        Type::Typedef(def) => mentions_uuid(&def.target),
        Type::List(elem) | Type::Set(elem) => mentions_uuid(elem),
        Type::Map(key, value) => mentions_uuid(key) || mentions_uuid(value),
        Type::Enum(_) | Type::Struct(_) => false,
    }
}

fn program_uses_uuid(program: &Program) -> bool {
    program.typedefs.iter().any(|t| mentions_uuid(&t.target))
        || program.consts.iter().any(|c| mentions_uuid(&c.ty))
        || program
            .structs
            .iter()
            .flat_map(|s| &s.fields)
            .any(|f| mentions_uuid(&f.ty))
        || program.services.iter().flat_map(|s| &s.functions).any(|f| {
            mentions_uuid(&f.returns)
                || f.args.iter().chain(&f.throws).any(|a| mentions_uuid(&a.ty))
        })
}

/// Output placement for one program.
struct Layout {
    namespaced: bool,
}

impl Layout {
    /// Directory prefix (`""` or `a/b/`) of a program's files.
    fn dir(&self, namespace: &str) -> String {
        if self.namespaced {
            namespace_path_prefix(namespace)
        } else {
            String::new()
        }
    }
}

pub fn types_file_name(program: &Program) -> String {
    format!("{}_types", underscore(&program.name))
}

pub fn constants_file_name(program: &Program) -> String {
    format!("{}_constants", underscore(&program.name))
}

pub fn skeleton_file_name(service: &Service) -> String {
    format!("{}_server.skeleton.cr", service.name.to_lowercase())
}

fn render_types(program: &Program, layout: &Layout) -> Result<String> {
    let dir = layout.dir(&program.namespace);
    let mut w = CodeWriter::new();
    banner(&mut w);
    require(&mut w, "thrift");
    if program_uses_uuid(program) {
        require(&mut w, "uuid");
    }
    for include in &program.includes {
        let path = relative_require(&dir, &layout.dir(&include.namespace), &types_file_name(include));
        require(&mut w, &path);
    }
    w.blank();
    w.in_modules(&crystal_modules(&program.namespace), |w| {
        for typedef in &program.typedefs {
            emit_typedef(w, typedef)?;
        }
        for def in &program.enums {
            emit_enum(w, def)?;
        }
        for def in &program.structs {
            emit_struct(w, program, def)?;
        }
        Ok(())
    })?;
    Ok(w.finish())
}

fn render_constants(program: &Program, layout: &Layout) -> Result<String> {
    let dir = layout.dir(&program.namespace);
    let mut w = CodeWriter::new();
    banner(&mut w);
    require(&mut w, "thrift");
    require(&mut w, &relative_require(&dir, &dir, &types_file_name(program)));
    w.blank();
    w.in_modules(&crystal_modules(&program.namespace), |w| {
        for def in &program.consts {
            emit_const(w, program, def)?;
        }
        Ok(())
    })?;
    Ok(w.finish())
}

fn render_service(program: &Program, service: &Service, layout: &Layout) -> Result<String> {
    let dir = layout.dir(&program.namespace);
    let mut w = CodeWriter::new();
    banner(&mut w);
    require(&mut w, "thrift");
    if let Some(parent) = &service.extends {
        let path = relative_require(&dir, &layout.dir(&parent.namespace), &underscore(&parent.name));
        require(&mut w, &path);
    }
    require(&mut w, &relative_require(&dir, &dir, &types_file_name(program)));
    w.blank();
    w.in_modules(&crystal_modules(&program.namespace), |w| {
        emit_service(w, program, service)
    })?;
    Ok(w.finish())
}

/// Renders every file for `program`: types, constants, one file per service
/// and, unless disabled, one server skeleton per service.
pub fn generate_program(program: &Program, options: &GeneratorOptions) -> Result<Vec<GeneratedFile>> {
    info!("generating Crystal for program {}", program.name);
    let layout = Layout { namespaced: options.namespaced };
    let dir = layout.dir(&program.namespace);
    let path = |name: &str| PathBuf::from(format!("{}{}.cr", dir, name));

    let mut files = vec![
        GeneratedFile::new(path(&types_file_name(program)), render_types(program, &layout)?),
        GeneratedFile::new(path(&constants_file_name(program)), render_constants(program, &layout)?),
    ];
    for service in &program.services {
        let service_file = underscore(&service.name);
        files.push(GeneratedFile::new(path(&service_file), render_service(program, service, &layout)?));
        if options.skeleton {
            let require_path = relative_require("", &dir, &service_file);
            files.push(GeneratedFile::new(
                skeleton_file_name(service),
                render_skeleton(program, service, &require_path)?,
            ));
        }
    }
    for file in &files {
        debug!("rendered {} ({} bytes)", file.path.display(), file.contents.len());
    }
    Ok(files)
}
