//! The WCL expression compiler CLI.
//!
//! Provides the `wclc` command:
//!
//! - `wclc expr --type BOOL 'client.ip ~ purgers'` - compile one expression
//!   against a demanded type and print the generated C buffers
//! - `wclc stmt 'mod.log("hello");'` - compile a bare call statement
//!
//! A small built-in symbol vocabulary (the common request/response
//! variables) is installed so expressions can be exercised standalone; in
//! the full compiler the surrounding phases populate the table instead.

use std::process;

use clap::{Parser, Subcommand};

use wcl_compile::symbols::{Symbol, METHODS_ALL};
use wcl_compile::{render_diagnostic, Compiler, Type};

#[derive(Parser)]
#[command(name = "wclc", version, about = "The WCL expression compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one expression against a demanded type
    Expr {
        /// The expression source text
        source: String,

        /// Demanded result type (e.g. BOOL, INT, STRING, DURATION)
        #[arg(long = "type", default_value = "BOOL")]
        ty: String,

        /// Starting indentation of the emitted code, in columns
        #[arg(long, default_value = "0")]
        indent: usize,
    },

    /// Compile a bare call statement (`name(args...);`)
    Stmt {
        /// The statement source text
        source: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Expr { source, ty, indent } => compile_expr(&source, &ty, indent),
        Commands::Stmt { source } => compile_stmt(&source),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn compile_expr(source: &str, ty: &str, indent: usize) -> Result<(), String> {
    let Some(demand) = Type::from_name(ty) else {
        return Err(format!("unknown type '{ty}'"));
    };
    if demand == Type::Void || demand == Type::Strings {
        return Err(format!("'{ty}' is not a valid expression demand"));
    }

    let mut c = new_compiler(source);
    c.indent = indent;
    c.expr(demand);
    finish(c, source)
}

fn compile_stmt(source: &str) -> Result<(), String> {
    let mut c = new_compiler(source);
    c.call_stmt();
    finish(c, source)
}

/// Set up a compiler with the builtins and the standalone vocabulary.
fn new_compiler(source: &str) -> Compiler<'_> {
    let mut c = Compiler::new(source);
    c.install_builtins();
    for (name, ty, rname) in [
        ("client.ip", Type::Ip, "WRT_client_ip(ctx)"),
        ("server.ip", Type::Ip, "WRT_server_ip(ctx)"),
        ("req.url", Type::String, "WRT_req_url(ctx)"),
        ("req.method", Type::String, "WRT_req_method(ctx)"),
        ("req.http.host", Type::Header, "&wgc_hdr_req_host"),
        ("req.http.user-agent", Type::Header, "&wgc_hdr_req_user_agent"),
        ("resp.status", Type::Int, "WRT_resp_status(ctx)"),
        ("obj.hits", Type::Int, "WRT_obj_hits(ctx)"),
        ("obj.ttl", Type::Duration, "WRT_obj_ttl(ctx)"),
        ("now", Type::Time, "WRT_now(ctx)"),
    ] {
        c.symbols.define(Symbol::var(name, ty, rname, METHODS_ALL));
    }
    c
}

/// Print the output buffers, or render diagnostics and fail.
fn finish(mut c: Compiler<'_>, source: &str) -> Result<(), String> {
    if c.err {
        for diag in &c.diagnostics {
            eprint!("{}", render_diagnostic(diag, source, true));
        }
        return Err("compilation failed".to_string());
    }

    let out = c.take_output();
    if !out.header.is_empty() {
        println!("/* header */");
        print!("{}", out.header);
    }
    for (name, pattern) in &out.regexes {
        println!("/* regex {name} = {pattern:?} */");
    }
    if !out.prologue.is_empty() {
        println!("/* prologue */");
        print!("{}", out.prologue);
    }
    println!("/* body */");
    print!("{}", out.body);
    if !out.finalizers.is_empty() {
        println!("/* finalizers */");
        for fin in &out.finalizers {
            println!("{fin}");
        }
    }
    Ok(())
}
