//! RPC services: client stub, handler-generic processor, per-function
//! argument and result structs, and the illustrative server skeleton.

use log::debug;
use thrift_cr_ast::{Field, Function, Program, Requiredness, Service, ServiceRef, StructDef, StructKind};

use crate::declarations::{emit_struct, function_result_struct};
use crate::error::{GenError, Result};
use crate::naming::{capitalize, cr_underscore, full_type_name};
use crate::types::render_type;
use crate::values::crystal_string;
use crate::writer::CodeWriter;

const PROTOCOL: &str = "::Thrift::BaseProtocol";

pub fn args_struct_name(function: &Function) -> String {
    capitalize(&format!("{}_args", function.name))
}

pub fn result_struct_name(function: &Function) -> String {
    capitalize(&format!("{}_result", function.name))
}

/// `::Ns::Service`, the module a generated service lives in.
pub fn service_path(namespace: &str, name: &str) -> String {
    full_type_name(namespace, &capitalize(name))
}

fn parent_path(parent: &ServiceRef) -> String {
    service_path(&parent.namespace, &parent.name)
}

fn application_error(kind: &str, message: &str) -> String {
    format!(
        "raise ::Thrift::ApplicationException.new(::Thrift::ApplicationException::{}, {})",
        kind,
        crystal_string(message)
    )
}

fn return_annotation(function: &Function) -> String {
    if function.returns.is_void() {
        "Nil".to_string()
    } else {
        render_type(&function.returns, false, false)
    }
}

/// Only `optional` arguments may reach the handler as `nil`.
fn param_list(args: &[Field]) -> String {
    args.iter()
        .map(|a| {
            let nilable = a.req == Requiredness::Optional;
            format!("{} : {}", cr_underscore(&a.name), render_type(&a.ty, false, nilable))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn call_list(args: &[Field]) -> String {
    args.iter().map(|a| cr_underscore(&a.name)).collect::<Vec<_>>().join(", ")
}

/// `def name(a : A, b : B) : R`
fn signature(prefix: &str, function: &Function, returns: &str) -> String {
    let name = format!("{}{}", prefix, cr_underscore(&function.name));
    if function.args.is_empty() {
        format!("def {} : {}", name, returns)
    } else {
        format!("def {}({}) : {}", name, param_list(&function.args), returns)
    }
}

/// The body of `module <Service>`: client, processor and helper structs.
pub fn emit_service(w: &mut CodeWriter, program: &Program, service: &Service) -> Result<()> {
    debug!("service {}", service.name);
    w.doc(service.doc.as_deref());
    w.block(format!("module {}", capitalize(&service.name)), |w| {
        emit_client(w, service)?;
        w.blank();
        emit_processor(w, service)?;
        w.blank();
        emit_helpers(w, program, service)
    })
}

fn emit_client(w: &mut CodeWriter, service: &Service) -> Result<()> {
    let header = match &service.extends {
        Some(parent) => format!("class Client < {}::Client", parent_path(parent)),
        None => "class Client".to_string(),
    };
    w.block(header, |w| {
        if service.extends.is_none() {
            w.line("include ::Thrift::Client");
            w.blank();
        }
        for function in &service.functions {
            emit_client_call(w, function)?;
            emit_client_send(w, function)?;
            if !function.oneway {
                emit_client_recv(w, function)?;
            }
        }
        Ok(())
    })
}

fn emit_client_call(w: &mut CodeWriter, function: &Function) -> Result<()> {
    let name = cr_underscore(&function.name);
    let args = call_list(&function.args);
    w.doc(function.doc.as_deref());
    w.block(signature("", function, &return_annotation(function)), |w| {
        w.line(format!("send_{}({})", name, args));
        if !function.oneway {
            w.line(format!("return recv_{}()", name));
        }
        Ok(())
    })?;
    w.blank();
    Ok(())
}

fn emit_client_send(w: &mut CodeWriter, function: &Function) -> Result<()> {
    let method = if function.oneway { "send_oneway_message" } else { "send_message" };
    let mut call = format!("{}({}, {}", method, crystal_string(&function.name), args_struct_name(function));
    for arg in &function.args {
        let name = cr_underscore(&arg.name);
        call.push_str(&format!(", {}: {}", name, name));
    }
    call.push(')');
    w.block(signature("send_", function, "Nil"), |w| {
        w.line(call);
        Ok(())
    })?;
    w.blank();
    Ok(())
}

fn emit_client_recv(w: &mut CodeWriter, function: &Function) -> Result<()> {
    let name = cr_underscore(&function.name);
    let header = format!("def recv_{} : {}", name, return_annotation(function));
    w.block(header, |w| {
        w.line("_fname, mtype, rseqid = receive_message_begin()");
        w.line("handle_exception(mtype)");
        w.block("unless reply_seqid(rseqid)", |w| {
            w.line(application_error(
                "BAD_SEQUENCE_ID",
                &format!("{} failed: out of sequence response", function.name),
            ));
            Ok(())
        })?;
        w.line(format!("result = receive_message({})", result_struct_name(function)));
        for ex in &function.throws {
            let local = format!("ex_{}", cr_underscore(&ex.name));
            w.block(format!("if {} = result.{}", local, cr_underscore(&ex.name)), |w| {
                w.line(format!("raise {}", local));
                Ok(())
            })?;
        }
        if function.returns.is_void() {
            w.line("return");
        } else {
            w.line("success = result.success");
            w.line("return success unless success.nil?");
            w.line(application_error(
                "MISSING_RESULT",
                &format!("{} failed: unknown result", function.name),
            ));
        }
        Ok(())
    })?;
    w.blank();
    Ok(())
}

fn emit_processor(w: &mut CodeWriter, service: &Service) -> Result<()> {
    let header = match &service.extends {
        Some(parent) => format!("class Processor(T) < {}::Processor(T)", parent_path(parent)),
        None => "class Processor(T)".to_string(),
    };
    w.block(header, |w| {
        if service.extends.is_none() {
            w.line("include ::Thrift::Processor");
            w.blank();
            w.line("@handler : T");
            w.blank();
            w.line("def initialize(@handler : T)");
            w.line("end");
            w.blank();
        }
        emit_dispatch(w, service)?;
        for function in &service.functions {
            emit_process_function(w, function)?;
        }
        Ok(())
    })
}

/// Routes a message name to its `process_` method. Names this service does
/// not declare fall through to the parent processor, or report `false`.
fn emit_dispatch(w: &mut CodeWriter, service: &Service) -> Result<()> {
    let fallback = if service.extends.is_some() { "super" } else { "false" };
    let header = format!(
        "def dispatch(name : String, seqid : Int32, iprot : {}, oprot : {}) : Bool",
        PROTOCOL, PROTOCOL
    );
    w.block(header, |w| {
        if service.functions.is_empty() {
            w.line(fallback);
            return Ok(());
        }
        w.line("case name");
        for function in &service.functions {
            w.line(format!("when {}", crystal_string(&function.name)));
            w.indented(|w| {
                w.line(format!("process_{}(seqid, iprot, oprot)", cr_underscore(&function.name)));
                Ok(())
            })?;
        }
        w.line("else");
        w.indented(|w| {
            w.line(format!("return {}", fallback));
            Ok(())
        })?;
        w.line("end");
        w.line("true");
        Ok(())
    })?;
    w.blank();
    Ok(())
}

/// Handler argument expressions. Arguments that are neither required nor
/// optional are stored nilable on the args struct, so they are bound to a
/// local and checked before the call.
fn emit_handler_args(w: &mut CodeWriter, function: &Function) -> Vec<String> {
    let mut exprs = Vec::with_capacity(function.args.len());
    for arg in &function.args {
        let name = cr_underscore(&arg.name);
        match arg.req {
            Requiredness::Required | Requiredness::Optional => exprs.push(format!("args.{}", name)),
            Requiredness::OptInReqOut => {
                let local = format!("arg_{}", name);
                w.line(format!("{} = args.{}", local, name));
                w.line(format!(
                    "raise ::Thrift::ProtocolException.new(::Thrift::ProtocolException::MISSING_REQUIRED_FIELD, {}) if {}.nil?",
                    crystal_string(&format!("Argument {} of {} is not set", arg.name, function.name)),
                    local
                ));
                exprs.push(local);
            }
        }
    }
    exprs
}

fn emit_process_function(w: &mut CodeWriter, function: &Function) -> Result<()> {
    let name = cr_underscore(&function.name);
    let header = format!(
        "def process_{}(seqid : Int32, iprot : {}, oprot : {}) : Nil",
        name, PROTOCOL, PROTOCOL
    );

    w.block(header, |w| {
        w.line(format!("args = read_args(iprot, {})", args_struct_name(function)));
        let handler_args = emit_handler_args(w, function);
        let mut call = format!("@handler.{}({})", name, handler_args.join(", "));
        if function.oneway {
            w.line(call);
            w.line("return");
            return Ok(());
        }
        if !function.returns.is_void() {
            call = format!("result.success = {}", call);
        }
        w.line(format!("result = {}.new", result_struct_name(function)));
        if function.throws.is_empty() {
            w.line(call);
        } else {
            w.line("begin");
            w.indented(|w| {
                w.line(call);
                Ok(())
            })?;
            for ex in &function.throws {
                let ex_name = cr_underscore(&ex.name);
                let local = format!("ex_{}", ex_name);
                w.line(format!("rescue {} : {}", local, render_type(&ex.ty, false, false)));
                w.indented(|w| {
                    w.line(format!("result.{} = {}", ex_name, local));
                    Ok(())
                })?;
            }
            w.line("end");
        }
        w.line(format!(
            "write_result(result, oprot, {}, seqid)",
            crystal_string(&function.name)
        ));
        Ok(())
    })?;
    w.blank();
    Ok(())
}

fn emit_helpers(w: &mut CodeWriter, program: &Program, service: &Service) -> Result<()> {
    w.line("# HELPER FUNCTIONS AND STRUCTURES");
    w.blank();
    for function in &service.functions {
        let args = StructDef::new(&args_struct_name(function), StructKind::Struct, function.args.clone());
        emit_struct(w, program, &args)?;
        if !function.oneway {
            let result = function_result_struct(
                &result_struct_name(function),
                &function.returns,
                &function.throws,
            );
            emit_struct(w, program, &result)?;
        }
    }
    Ok(())
}

/// Every function a handler for `service` must answer: inherited ones first,
/// root service outward, then the service's own.
fn handler_functions<'a>(program: &'a Program, service: &'a Service) -> Result<Vec<&'a Function>> {
    let mut chain = vec![service];
    let mut current = service;
    while let Some(parent) = &current.extends {
        current = program
            .find_program(&parent.program)
            .and_then(|p| p.services.iter().find(|s| s.name == parent.name))
            .ok_or_else(|| GenError::UnresolvedType(parent.name.clone()))?;
        chain.push(current);
    }
    Ok(chain.into_iter().rev().flat_map(|s| s.functions.iter()).collect())
}

/// A runnable example server for `service`. `service_require` is the
/// require path of the service file relative to the skeleton.
pub fn render_skeleton(program: &Program, service: &Service, service_require: &str) -> Result<String> {
    let handler = format!("{}Handler", capitalize(&service.name));
    let functions = handler_functions(program, service)?;
    let mut w = CodeWriter::new();
    w.line("# This autogenerated skeleton file illustrates how to build a server.");
    w.line("# You should copy it to another filename to avoid overwriting it.");
    w.blank();
    w.line("require \"thrift\"");
    w.line(format!("require {}", crystal_string(service_require)));
    w.blank();
    w.block(format!("class {}", handler), |w| {
        w.block("def initialize", |w| {
            w.line("# Your initialization goes here");
            Ok(())
        })?;
        for function in &functions {
            w.blank();
            w.block(signature("", function, &return_annotation(function)), |w| {
                w.line("# Your implementation goes here");
                w.line(application_error("UNKNOWN", &format!("{} is not implemented", function.name)));
                Ok(())
            })?;
        }
        Ok(())
    })?;
    w.blank();
    w.line("port = 9090");
    w.line(format!("handler = {}.new", handler));
    w.line(format!(
        "processor = {}::Processor.new(handler)",
        service_path(&program.namespace, &service.name)
    ));
    w.line("server_transport = ::Thrift::ServerSocketTransport.new(port)");
    w.line("transport_factory = ::Thrift::BufferedTransportFactory.new");
    w.line("protocol_factory = ::Thrift::BinaryProtocolFactory.new");
    w.blank();
    w.line("server = ::Thrift::SimpleServer.new(processor, server_transport, transport_factory, protocol_factory)");
    w.line("server.serve");
    Ok(w.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thrift_cr_ast::{BaseType, Type};

    fn i32_t() -> Type {
        Type::base(BaseType::I32)
    }

    fn shared() -> Program {
        let mut shared = Program::new("shared", "shared");
        shared.services.push(Service {
            name:      "SharedService".into(),
            extends:   None,
            functions: vec![Function::new(
                "getStruct",
                shared.struct_type("SharedStruct"),
                vec![Field::new(1, "key", i32_t())],
            )],
            doc:       None,
        });
        shared
    }

    fn calculator() -> (Program, Service) {
        let mut program = Program::new("tutorial", "tutorial");
        program.includes.push(shared());
        let ouch = Field::new(1, "ouch", program.struct_type("InvalidOperation"));
        let service = Service {
            name:      "Calculator".into(),
            extends:   Some(ServiceRef::new("SharedService", "shared", "shared")),
            functions: vec![
                Function::new("ping", Type::base(BaseType::Void), vec![]),
                Function::new(
                    "add",
                    i32_t(),
                    vec![Field::new(1, "num1", i32_t()), Field::new(2, "num2", i32_t())],
                ),
                Function::new(
                    "calculate",
                    i32_t(),
                    vec![
                        Field::new(1, "logid", i32_t()),
                        Field::new(2, "w", program.struct_type("Work")),
                    ],
                )
                .throws(vec![ouch]),
                Function::new("zip", Type::base(BaseType::Void), vec![]).oneway(),
            ],
            doc:       None,
        };
        (program, service)
    }

    fn rendered() -> String {
        let (program, service) = calculator();
        let mut w = CodeWriter::new();
        emit_service(&mut w, &program, &service).unwrap();
        w.finish()
    }

    #[test]
    fn helper_struct_names() {
        let f = Function::new("getStruct", i32_t(), vec![]);
        assert_eq!(args_struct_name(&f), "GetStruct_args");
        assert_eq!(result_struct_name(&f), "GetStruct_result");
    }

    #[test]
    fn client_extends_parent_client() {
        let out = rendered();
        assert!(out.contains("  class Client < ::Shared::SharedService::Client\n"));
        assert!(!out.contains("include ::Thrift::Client"));
        assert!(out.contains(
            "    def add(num1 : Int32, num2 : Int32) : Int32\n      send_add(num1, num2)\n      return recv_add()\n    end\n"
        ));
        assert!(out.contains("      send_message(\"add\", Add_args, num1: num1, num2: num2)\n"));
    }

    #[test]
    fn receive_checks_exceptions_before_success() {
        let out = rendered();
        let raise_at = out.find("      if ex_ouch = result.ouch\n        raise ex_ouch\n").unwrap();
        let success_at = out.find("      return success unless success.nil?").unwrap();
        assert!(raise_at < success_at);
        assert!(out.contains("MISSING_RESULT, \"calculate failed: unknown result\")"));
        assert!(out.contains("BAD_SEQUENCE_ID, \"calculate failed: out of sequence response\")"));
    }

    #[test]
    fn oneway_functions_send_without_receiving() {
        let out = rendered();
        assert!(out.contains("    def zip : Nil\n      send_zip()\n    end\n"));
        assert!(out.contains("send_oneway_message(\"zip\", Zip_args)"));
        assert!(!out.contains("def recv_zip"));
        assert!(!out.contains("Zip_result"));
        assert!(out.contains(
            "    def process_zip(seqid : Int32, iprot : ::Thrift::BaseProtocol, oprot : ::Thrift::BaseProtocol) : Nil\n\
             \x20     args = read_args(iprot, Zip_args)\n\
             \x20     @handler.zip()\n\
             \x20     return\n"
        ));
    }

    #[test]
    fn processor_dispatches_and_falls_back_to_parent() {
        let out = rendered();
        assert!(out.contains("  class Processor(T) < ::Shared::SharedService::Processor(T)\n"));
        assert!(!out.contains("@handler : T"));
        assert!(out.contains("      when \"calculate\"\n        process_calculate(seqid, iprot, oprot)\n"));
        assert!(out.contains("      else\n        return super\n      end\n      true\n"));
    }

    #[test]
    fn processor_rescues_declared_exceptions() {
        let out = rendered();
        assert!(out.contains(
            "      begin\n\
             \x20       result.success = @handler.calculate(arg_logid, arg_w)\n\
             \x20     rescue ex_ouch : ::Tutorial::InvalidOperation\n\
             \x20       result.ouch = ex_ouch\n\
             \x20     end\n\
             \x20     write_result(result, oprot, \"calculate\", seqid)\n"
        ));
        assert!(out.contains("      @handler.ping()\n      write_result(result, oprot, \"ping\", seqid)\n"));
    }

    #[test]
    fn root_service_owns_handler() {
        let (program, mut service) = calculator();
        service.extends = None;
        service.functions.truncate(1);
        let mut w = CodeWriter::new();
        emit_service(&mut w, &program, &service).unwrap();
        let out = w.finish();
        assert!(out.contains("  class Client\n    include ::Thrift::Client\n"));
        assert!(out.contains("    include ::Thrift::Processor\n\n    @handler : T\n"));
        assert!(out.contains("      else\n        return false\n"));
    }

    #[test]
    fn helpers_follow_the_processor() {
        let out = rendered();
        let helpers = out.find("# HELPER FUNCTIONS AND STRUCTURES").unwrap();
        assert!(out.find("class Processor(T)").unwrap() < helpers);
        assert!(out[helpers..].contains("class Calculate_args\n"));
        assert!(out[helpers..].contains("class Calculate_result\n"));
        assert!(out[helpers..].contains("class Ping_result\n"));
    }

    #[test]
    fn skeleton_stubs_every_function() {
        let (program, service) = calculator();
        let out = render_skeleton(&program, &service, "./tutorial/calculator").unwrap();
        assert!(out.starts_with("# This autogenerated skeleton file"));
        assert!(out.contains("require \"./tutorial/calculator\"\n"));
        assert!(out.contains("class CalculatorHandler\n"));
        assert!(out.contains("  def ping : Nil\n"));
        assert!(out.contains("\"calculate is not implemented\""));
        assert!(out.contains("processor = ::Tutorial::Calculator::Processor.new(handler)\n"));
        assert!(out.ends_with("server.serve\n"));
    }

    #[test]
    fn skeleton_stubs_inherited_functions_first() {
        let (program, service) = calculator();
        let out = render_skeleton(&program, &service, "./tutorial/calculator").unwrap();
        let inherited = out.find("  def get_struct(key : Int32) : ::Shared::SharedStruct
").unwrap();
        assert!(inherited < out.find("  def ping : Nil
").unwrap());
        assert!(out.contains("\"getStruct is not implemented\""));
    }

    #[test]
    fn skeleton_reports_an_unknown_parent_service() {
        let (mut program, service) = calculator();
        program.includes.clear();
        let err = render_skeleton(&program, &service, "./tutorial/calculator").unwrap_err();
        assert_eq!(err.to_string(), "Unresolved type reference \"SharedService\"");
    }

    #[test]
    fn handler_receives_checked_arguments() {
        let out = rendered();
        assert!(out.contains(
            "      args = read_args(iprot, Add_args)\n\
             \x20     arg_num1 = args.num1\n\
             \x20     raise ::Thrift::ProtocolException.new(::Thrift::ProtocolException::MISSING_REQUIRED_FIELD, \"Argument num1 of add is not set\") if arg_num1.nil?\n\
             \x20     arg_num2 = args.num2\n\
             \x20     raise ::Thrift::ProtocolException.new(::Thrift::ProtocolException::MISSING_REQUIRED_FIELD, \"Argument num2 of add is not set\") if arg_num2.nil?\n\
             \x20     result = Add_result.new\n\
             \x20     result.success = @handler.add(arg_num1, arg_num2)\n"
        ));
    }

    #[test]
    fn optional_arguments_stay_nilable() {
        let (program, mut service) = calculator();
        service.functions = vec![Function::new(
            "log",
            Type::base(BaseType::Void),
            vec![
                Field::new(1, "id", i32_t()).required(),
                Field::new(2, "note", Type::base(BaseType::String)).optional(),
            ],
        )];
        let mut w = CodeWriter::new();
        emit_service(&mut w, &program, &service).unwrap();
        let out = w.finish();
        assert!(out.contains("    def log(id : Int32, note : String?) : Nil\n"));
        assert!(out.contains("    def send_log(id : Int32, note : String?) : Nil\n"));
        assert!(out.contains("      @handler.log(args.id, args.note)\n"));
        assert!(!out.contains("arg_id"));

        let skeleton = render_skeleton(&program, &service, "./tutorial/calculator").unwrap();
        assert!(skeleton.contains("  def log(id : Int32, note : String?) : Nil\n"));
    }

    #[test]
    fn exception_names_never_shadow_generated_locals() {
        let (program, mut service) = calculator();
        let result = Field::new(1, "result", program.struct_type("InvalidOperation"));
        service.functions = vec![Function::new("check", i32_t(), vec![]).throws(vec![result])];
        let mut w = CodeWriter::new();
        emit_service(&mut w, &program, &service).unwrap();
        let out = w.finish();
        assert!(out.contains("      if ex_result = result.result\n        raise ex_result\n"));
        assert!(out.contains(
            "      rescue ex_result : ::Tutorial::InvalidOperation\n        result.result = ex_result\n"
        ));
    }
}
