//! The `protolang` command-line driver, grounded in
//! `original_source/src/compiler.cpp`/`main.cpp`: read source → lex → parse
//! → validate → codegen → emit object → link, reporting diagnostics and an
//! exit code (§6.4). Argument reading is a hand-rolled `env::args()` walk,
//! matching the teacher CLI's own style rather than pulling in an
//! argument-parsing crate.

use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, fs};

use protolang::Compilation;

struct Args {
    input: PathBuf,
    output_stem: PathBuf,
    dump_ast: bool,
    emit_llvm: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut dump_ast = false;
    let mut emit_llvm = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--dump-ast" => dump_ast = true,
            "--emit-llvm" => emit_llvm = true,
            _ => positional.push(arg),
        }
    }

    let Some(input) = positional.first().cloned() else {
        return Err("usage: protolang <input.protolang> [output-stem] [--dump-ast] [--emit-llvm]".to_owned());
    };
    let input = PathBuf::from(input);
    let output_stem = match positional.get(1) {
        Some(s) => PathBuf::from(s),
        None => input.with_extension(""),
    };
    Ok(Args { input, output_stem, dump_ast, emit_llvm })
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let source = match read_file(&args.input) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

fn read_file(path: &std::path::Path) -> Result<String, String> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_file() => return Err(format!("{} is not a file", path.display())),
        Err(err) => return Err(format!("reading {}: {err}", path.display())),
        Ok(_) => {}
    }
    fs::read_to_string(path).map_err(|err| format!("reading {}: {err}", path.display()))
}

fn run(args: &Args, source: &str) -> Result<(), ()> {
    let mut compilation = Compilation::new().expect("fresh compilation session");

    if let Err(err) = compilation.parse(source) {
        eprintln!("error: {err}");
        return Err(());
    }

    if args.dump_ast {
        for decl_id in &compilation.ast.program {
            eprintln!("{:#?}", compilation.ast.decl(*decl_id));
        }
    }

    if !compilation.validate() {
        let _ = compilation.render_diagnostics(std::io::stderr(), source);
        return Err(());
    }

    codegen_and_link(args, source, &mut compilation)
}

#[cfg(feature = "llvm-backend")]
fn codegen_and_link(args: &Args, source: &str, compilation: &mut Compilation) -> Result<(), ()> {
    use protolang::linker::{Linker, SystemLinker};
    use protolang::llvm_backend::LlvmBackend;

    let module_name = args.input.file_name().map_or_else(|| "module".to_owned(), |n| n.to_string_lossy().into_owned());
    let context = inkwell::context::Context::create();
    let mut backend = LlvmBackend::new(&context, &module_name);

    if let Err(err) = compilation.codegen(&mut backend) {
        eprintln!("error: {err}");
        let _ = compilation.render_diagnostics(std::io::stderr(), source);
        return Err(());
    }

    if args.emit_llvm {
        eprintln!("{}", backend.print_module());
    }

    let obj_path = args.output_stem.with_extension("o");
    if let Err(err) = backend.emit_object(&obj_path) {
        eprintln!("error: could not emit object file: {err}");
        return Err(());
    }

    let linker = SystemLinker::new();
    match linker.link(&[obj_path], &args.output_stem) {
        Ok(exe) => {
            println!("{}", exe.display());
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {err}");
            Err(())
        }
    }
}

#[cfg(not(feature = "llvm-backend"))]
fn codegen_and_link(_args: &Args, _source: &str, _compilation: &mut Compilation) -> Result<(), ()> {
    eprintln!("error: built without the `llvm-backend` feature; cannot emit an object file");
    Err(())
}
