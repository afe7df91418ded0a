//! End-to-end tests for the expression compiler: parse one expression
//! against a demanded type and check the emitted C, the fragment metadata,
//! and the diagnostics.

use wcl_compile::args::decode_signature;
use wcl_compile::fragment::Constancy;
use wcl_compile::symbols::{SymKind, Symbol, METHODS_ALL};
use wcl_compile::{Compiler, ErrorKind, Type};

/// A compiler over `source` with the builtin intrinsics and a small test
/// vocabulary installed.
fn compiler(source: &str) -> Compiler<'_> {
    let mut c = Compiler::new(source);
    c.install_builtins();
    c.symbols.define(Symbol::var(
        "req.http.host",
        Type::Header,
        "&wgc_hdr_req_host",
        METHODS_ALL,
    ));
    c.symbols.define(Symbol::var(
        "req.url",
        Type::String,
        "WRT_req_url(ctx)",
        METHODS_ALL,
    ));
    c.symbols.define(Symbol::var(
        "client.ip",
        Type::Ip,
        "WRT_client_ip(ctx)",
        METHODS_ALL,
    ));
    c.symbols.define(Symbol::var(
        "obj.ttl",
        Type::Duration,
        "WRT_obj_ttl(ctx)",
        METHODS_ALL,
    ));
    c.symbols.define(Symbol::var(
        "obj.hits",
        Type::Int,
        "WRT_obj_hits(ctx)",
        METHODS_ALL,
    ));
    c.symbols
        .define(Symbol::var("now", Type::Time, "WRT_now(ctx)", METHODS_ALL));
    c.symbols.define(Symbol::handle(
        "be1",
        SymKind::Backend,
        Type::Backend,
        "wgc_backend_be1",
    ));
    c.symbols.define(Symbol::func(
        "mod.f",
        "mod",
        decode_signature(b"INT\0mod_f\0INT\0INT\0\x02name\0").unwrap(),
    ));
    c.symbols.define(Symbol::func(
        "mod.log",
        "mod",
        decode_signature(b"VOID\0mod_log\0STRING_LIST\0").unwrap(),
    ));
    c.symbols.define(Symbol::func(
        "mod.algo",
        "mod",
        decode_signature(b"STRING\0mod_algo\0ENUM\0\x01crc32\0sha256\0\x01\0\x02alg\0\x03crc32\0PRIV_CALL\0")
            .unwrap(),
    ));
    c
}

/// Parse with a demand, expecting success, and return (rendered, fragment).
fn compile(source: &str, demand: Type) -> (String, wcl_compile::fragment::Fragment) {
    let mut c = compiler(source);
    let e = c
        .parse_expr(demand)
        .unwrap_or_else(|| panic!("unexpected failure: {:?}", c.diagnostics));
    assert!(!c.err);
    assert!(c.diagnostics.is_empty());
    (e.render(0), e)
}

/// Parse with a demand, expecting failure, and return the compiler.
fn compile_err(source: &str, demand: Type) -> Compiler<'_> {
    let mut c = compiler(source);
    let e = c.parse_expr(demand);
    assert!(e.is_none(), "expected failure, got {:?}", e.map(|e| e.render(0)));
    assert!(c.err);
    assert_eq!(c.diagnostics.len(), 1, "exactly one diagnostic per entry");
    c
}

// ── Scenario coverage ──────────────────────────────────────────────────

#[test]
fn integer_addition() {
    let (rendered, e) = compile("1 + 2", Type::Int);
    assert_eq!(rendered, "(1 + 2)");
    assert_eq!(e.ty, Type::Int);
    assert!(!rendered.contains("WRT_"), "no runtime calls expected");
}

#[test]
fn constant_string_concatenation_collects() {
    let (rendered, e) = compile("\"a\" + \"b\"", Type::String);
    assert_eq!(
        rendered,
        "\nWRT_collect_strings(ctx,\n  \"a\"\n  \"b\",\n  wrt_strings_end)\n"
    );
    assert_eq!(e.ty, Type::String);
    // Both inputs were literals: full constancy survives the catenation.
    assert_eq!(e.constancy, Constancy::StrConst);
}

#[test]
fn header_regex_match() {
    let (rendered, e) = compile("req.http.host ~ \"^www\\.\"", Type::Bool);
    assert_eq!(
        rendered,
        "WRT_re_match(ctx, WRT_header_get(ctx, &wgc_hdr_req_host), wgc_re_0)"
    );
    assert_eq!(e.ty, Type::Bool);
}

#[test]
fn negated_regex_match() {
    let (rendered, _) = compile("req.url !~ \"[.]jpg$\"", Type::Bool);
    assert_eq!(rendered, "!WRT_re_match(ctx, WRT_req_url(ctx), wgc_re_0)");
}

#[test]
fn acl_match_creates_forward_reference() {
    let mut c = compiler("client.ip ~ purgers");
    let e = c.parse_expr(Type::Bool).expect("acl match should compile");
    assert_eq!(
        e.render(0),
        "WRT_acl_match(ctx, wgc_acl_purgers, WRT_client_ip(ctx))"
    );
    assert_eq!(c.symbols.forward_refs(), ["purgers".to_string()]);
}

#[test]
fn negated_acl_match() {
    let (rendered, _) = compile("client.ip !~ purgers", Type::Bool);
    assert_eq!(
        rendered,
        "!WRT_acl_match(ctx, wgc_acl_purgers, WRT_client_ip(ctx))"
    );
}

#[test]
fn regsub_emits_runtime_call() {
    let (rendered, e) = compile("regsub(\"x\", \"a(.)\", \"\\1\")", Type::String);
    assert_eq!(
        rendered,
        "WRT_regsub(ctx, 0,\n  \"x\",\n  wgc_re_0,\n  \"\\\\1\")"
    );
    assert_eq!(e.ty, Type::String);
}

#[test]
fn regsuball_sets_the_all_flag() {
    let (rendered, _) = compile("regsuball(req.url, \"a\", \"b\")", Type::String);
    assert!(rendered.starts_with("WRT_regsub(ctx, 1,"));
}

#[test]
fn call_with_positional_and_named_arguments() {
    let (rendered, e) = compile("mod.f(1, name=2)", Type::Int);
    assert_eq!(rendered, "mod_f(ctx,\n  1,\n  2\n  )");
    assert_eq!(e.ty, Type::Int);
}

#[test]
fn positional_after_named_is_rejected() {
    let c = compile_err("mod.f(name=2, 1)", Type::Int);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Argument);
}

// ── Literals ───────────────────────────────────────────────────────────

#[test]
fn duration_literals_scale_by_unit() {
    let (rendered, e) = compile("obj.ttl + 10m", Type::Duration);
    assert_eq!(rendered, "(WRT_obj_ttl(ctx) + 600.0)");
    assert_eq!(e.ty, Type::Duration);
}

#[test]
fn negative_duration_literal() {
    let (rendered, _) = compile("-90s", Type::Duration);
    assert_eq!(rendered, "-90.0");
}

#[test]
fn bytes_literals_use_units() {
    let (rendered, e) = compile("100KB", Type::Bytes);
    assert_eq!(rendered, "102400.0");
    assert_eq!(e.ty, Type::Bytes);
    assert_eq!(e.constancy, Constancy::Const);
}

#[test]
fn fractional_literal_is_real() {
    let (rendered, e) = compile("1.5", Type::Real);
    assert_eq!(rendered, "1.5");
    assert_eq!(e.ty, Type::Real);
}

#[test]
fn integer_literal_promotes_on_real_demand() {
    let (rendered, e) = compile("2", Type::Real);
    assert_eq!(rendered, "2.0");
    assert_eq!(e.ty, Type::Real);
}

#[test]
fn ip_literal_resolves_through_address_service() {
    let mut c = compiler("client.ip == \"192.0.2.1\"");
    let e = c.parse_expr(Type::Bool).expect("should compile");
    assert_eq!(
        e.render(0),
        "!WRT_ip_cmp(WRT_client_ip(ctx), &wgc_ip_0)"
    );
    assert!(c.header.contains("WRT_IP_INIT(\"192.0.2.1\")"));
}

#[test]
fn slash_prefixed_address_is_rejected() {
    let c = compile_err("client.ip == \"/tmp/sock\"", Type::Bool);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Constraint);
}

// ── Operators and coercions ────────────────────────────────────────────

#[test]
fn multiplication_follows_the_partner_type() {
    let (rendered, e) = compile("obj.ttl * 2", Type::Duration);
    assert_eq!(rendered, "(WRT_obj_ttl(ctx)*2.0)");
    assert_eq!(e.ty, Type::Duration);
}

#[test]
fn multiplication_of_strings_is_rejected() {
    let c = compile_err("req.url * 2", Type::String);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Type);
    assert!(c.diagnostics[0].message.contains("not possible on type STRING"));
}

#[test]
fn int_real_addition_widens() {
    // The left operand types the right-hand demand, but the result row
    // keys on the right operand's actual type.
    let (rendered, e) = compile("obj.hits + 2.5", Type::Real);
    assert_eq!(rendered, "(WRT_obj_hits(ctx) + 2.5)");
    assert_eq!(e.ty, Type::Real);
}

#[test]
fn time_difference_is_a_duration() {
    let (rendered, e) = compile("now - now", Type::Duration);
    assert_eq!(rendered, "(WRT_now(ctx) - WRT_now(ctx))");
    assert_eq!(e.ty, Type::Duration);
}

#[test]
fn mixed_concatenation_counts_strands() {
    let (rendered, e) = compile("\"id=\" + req.url", Type::String);
    assert_eq!(
        rendered,
        "\nWRT_collect_strings(ctx,\n  \"id=\",\n  WRT_req_url(ctx),\n  wrt_strings_end)\n"
    );
    // A runtime piece clears constancy.
    assert_eq!(e.constancy, Constancy::Var);
}

#[test]
fn int_plus_string_is_rejected() {
    let c = compile_err("1 + \"x\"", Type::Int);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Type);
    assert!(c.diagnostics[0].message.contains("INT + STRING not possible"));
}

#[test]
fn string_equality_is_a_pairwise_compare() {
    let (rendered, _) = compile("req.url == \"x\"", Type::Bool);
    assert_eq!(rendered, "(0 == WRT_strcmp(WRT_req_url(ctx), \"x\"))");
}

#[test]
fn multi_piece_string_comparison_uses_strands() {
    let (rendered, _) = compile("req.url + \"a\" == \"x\"", Type::Bool);
    assert!(rendered.contains("WRT_strands_compare("));
    assert!(rendered.contains("WRT_bundle_strands(2, &strs_0_a, strs_0_s,"));
    // The right side is a single strand but still bundles, with its own
    // fresh auxiliary names.
    assert!(rendered.contains("WRT_bundle_strands(1, &strs_1_a, strs_1_s,"));
}

#[test]
fn comparison_of_different_types_is_rejected() {
    let c = compile_err("obj.hits == obj.ttl", Type::Bool);
    assert!(c.diagnostics[0]
        .message
        .contains("comparison of different types: INT '==' DURATION"));
}

#[test]
fn relational_on_backend_is_limited_to_identity() {
    let (rendered, _) = compile("be1 == be1", Type::Bool);
    assert_eq!(rendered, "(wgc_backend_be1 == wgc_backend_be1)");
    let c = compile_err("be1 < be1", Type::Bool);
    assert!(c.diagnostics[0].message.contains("not possible on BACKEND"));
}

#[test]
fn handle_renders_as_its_name_in_string_context() {
    let (rendered, e) = compile("be1", Type::String);
    assert_eq!(rendered, "\"be1\"");
    assert_eq!(e.constancy, Constancy::StrConst);
}

#[test]
fn bool_coercions() {
    let (rendered, _) = compile("obj.hits", Type::Bool);
    assert_eq!(rendered, "(WRT_obj_hits(ctx) != 0)");
    let (rendered, _) = compile("obj.ttl", Type::Bool);
    assert_eq!(rendered, "(WRT_obj_ttl(ctx) > 0)");
    let (rendered, _) = compile("req.url", Type::Bool);
    assert_eq!(rendered, "(WRT_req_url(ctx) != 0)");
}

#[test]
fn logical_composition_breaks_one_operand_per_line() {
    let (rendered, e) = compile("true && !false", Type::Bool);
    assert_eq!(rendered, "(\n  (0==0)\n&&\n  !((0==1))\n)");
    assert_eq!(e.ty, Type::Bool);

    let (rendered, _) = compile("true || false", Type::Bool);
    assert_eq!(rendered, "(\n  (0==0)\n||\n  (0==1)\n)");
}

#[test]
fn not_coerces_string_operands() {
    // The comparison layer coerces the operand before `!` sees it.
    let (rendered, _) = compile("!req.url", Type::Bool);
    assert_eq!(rendered, "!((WRT_req_url(ctx) != 0))");
}

#[test]
fn time_has_no_boolean_rendition() {
    let c = compile_err("!now", Type::Bool);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Internal);
    assert!(c.diagnostics[0].message.contains("TIME"));
}

#[test]
fn parenthesised_expression_keeps_its_type() {
    let (rendered, e) = compile("(1 + 2) * 3", Type::Int);
    assert_eq!(rendered, "(((1 + 2))*3)");
    assert_eq!(e.ty, Type::Int);
}

#[test]
fn strings_are_not_parenthesised() {
    // A parenthesised catenation splices transparently: the output is
    // byte-identical to the unparenthesised form.
    let (with_parens, _) = compile("(\"a\" + \"b\")", Type::String);
    let (without, _) = compile("\"a\" + \"b\"", Type::String);
    assert_eq!(with_parens, without);
}

// ── String-family lowerings ────────────────────────────────────────────

#[test]
fn string_list_demand_appends_the_terminator() {
    let (rendered, e) = compile("\"a\" + req.url", Type::StringList);
    assert_eq!(
        rendered,
        "\n  \"a\",\n  WRT_req_url(ctx),\n  wrt_strings_end"
    );
    assert_eq!(e.ty, Type::StringList);
}

#[test]
fn strands_demand_bundles() {
    let mut c = compiler("\"a\" + req.url");
    let e = c.parse_expr(Type::Strands).expect("should compile");
    assert_eq!(
        e.render(0),
        "\n  WRT_bundle_strands(2, &strs_0_a, strs_0_s,\n    \"a\",\n    WRT_req_url(ctx),\n    wrt_strings_end)"
    );
    assert_eq!(
        c.prologue,
        "  struct wrt_strands strs_0_a;\n  const char *strs_0_s[2];\n"
    );
}

#[test]
fn non_string_coerces_on_string_demand() {
    let (rendered, e) = compile("obj.hits", Type::String);
    assert_eq!(rendered, "WRT_int_string(ctx, WRT_obj_hits(ctx))");
    assert_eq!(e.ty, Type::String);
}

#[test]
fn acl_has_no_string_rendition() {
    // An ACL reaches string context through the concatenation fallback.
    let mut c = compiler("obj.hits + locals");
    c.symbols
        .define(Symbol::handle("locals", SymKind::Acl, Type::Acl, "wgc_acl_locals"));
    assert!(c.parse_expr(Type::String).is_none());
    assert!(c.diagnostics[0].message.contains("cannot convert ACL to STRING"));
}

#[test]
fn blob_in_string_context_gets_a_dedicated_message() {
    let mut c = compiler("req.hash + \"x\"");
    c.symbols.define(Symbol::var(
        "req.hash",
        Type::Blob,
        "WRT_req_hash(ctx)",
        METHODS_ALL,
    ));
    assert!(c.parse_expr(Type::String).is_none());
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Constraint);
    assert!(c.diagnostics[0].message.contains("BLOB"));
}

// ── Calls ──────────────────────────────────────────────────────────────

#[test]
fn enum_argument_with_private_slot() {
    let mut c = compiler("mod.algo(alg=sha256)");
    let e = c.parse_expr(Type::String).expect("should compile");
    assert_eq!(
        e.render(0),
        "mod_algo(ctx,\n  *enum_mod_sha256,\n  &wgc_priv_0\n  )"
    );
    assert!(c.header.contains("static struct wrt_priv wgc_priv_0;"));
    assert_eq!(c.finalizers, ["WRT_priv_fini(&wgc_priv_0);".to_string()]);
}

#[test]
fn enum_default_is_synthesised() {
    let (rendered, _) = compile("mod.algo()", Type::String);
    assert!(rendered.contains("*enum_mod_crc32"));
}

#[test]
fn wrong_enum_value_lists_the_choices() {
    let c = compile_err("mod.algo(alg=md5)", Type::String);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::Argument);
    assert!(c.diagnostics[0].message.contains("crc32, sha256"));
    // The call-private slot was registered before the argument failed and
    // is not rolled back; the aborted compile discards it wholesale.
    assert_eq!(c.finalizers.len(), 1);
}

#[test]
fn unknown_named_argument() {
    let c = compile_err("mod.f(1, bogus=2)", Type::Int);
    assert!(c.diagnostics[0].message.contains("unknown argument 'bogus'"));
}

#[test]
fn duplicate_argument_binding() {
    let c = compile_err("mod.f(1, 2, name=3)", Type::Int);
    assert!(c.diagnostics[0].message.contains("already used"));
}

#[test]
fn missing_required_argument() {
    let c = compile_err("mod.f()", Type::Int);
    assert!(c.diagnostics[0].message.contains("argument 1 missing"));
}

#[test]
fn void_function_is_not_a_value() {
    let c = compile_err("mod.log(\"x\")", Type::Int);
    assert!(c.diagnostics[0].message.contains("function returns VOID"));
}

#[test]
fn call_statement_emits_with_semicolon() {
    let mut c = compiler("mod.log(\"hi\" + req.url);");
    c.call_stmt();
    assert!(!c.err, "diagnostics: {:?}", c.diagnostics);
    let out = c.take_output();
    assert!(out.body.starts_with("mod_log(ctx,"));
    assert!(out.body.contains("wrt_strings_end"));
    assert!(out.body.ends_with(";\n"));
}

#[test]
fn emitted_statement_respects_indentation() {
    let mut c = compiler("1 + 2");
    c.indent = 4;
    c.expr(Type::Int);
    assert_eq!(c.body, "    (1 + 2)\n");
}

// ── Symbols and diagnostics ────────────────────────────────────────────

#[test]
fn unknown_symbol() {
    let c = compile_err("nonesuch", Type::Int);
    assert_eq!(c.diagnostics[0].kind, ErrorKind::UnknownSymbol);
}

#[test]
fn unusable_symbol_kind_points_at_definition() {
    use wcl_common::span::Span;
    let mut c = compiler("cleanup");
    c.symbols.define(Symbol::other("cleanup", SymKind::Sub, Some(Span::new(0, 7))));
    assert!(c.parse_expr(Type::Int).is_none());
    assert!(c.diagnostics[0]
        .message
        .contains("symbol kind (subroutine) can not be used"));
    assert_eq!(c.diagnostics[0].notes.len(), 1);
}

#[test]
fn default_maps_to_typed_builtins() {
    let (rendered, e) = compile("default", Type::Backend);
    assert_eq!(rendered, "*(WGC_conf.default_backend)");
    assert_eq!(e.ty, Type::Backend);

    let (rendered, e) = compile("default", Type::Probe);
    assert_eq!(rendered, "wgc_default_probe");
    assert_eq!(e.ty, Type::Probe);
}

#[test]
fn type_backstop_reports_expected_and_found() {
    let c = compile_err("client.ip", Type::Int);
    assert!(c.diagnostics[0]
        .message
        .contains("expression has type IP, expected INT"));
}

// ── Invariants ─────────────────────────────────────────────────────────

#[test]
fn rendering_is_idempotent_and_balanced() {
    for (source, demand) in [
        ("1 + 2", Type::Int),
        ("\"a\" + \"b\" + req.url", Type::String),
        ("req.url + \"a\" == \"x\"", Type::Bool),
        ("true && !false || false", Type::Bool),
        ("\"a\" + req.url", Type::StringList),
        ("mod.f(1, name=2)", Type::Int),
    ] {
        let mut c = compiler(source);
        let e = c
            .parse_expr(demand)
            .unwrap_or_else(|| panic!("{source}: {:?}", c.diagnostics));
        assert_eq!(e.render(2), e.render(2), "{source}: render not idempotent");
        assert_eq!(e.indent_delta(), 0, "{source}: unbalanced indentation");
        assert!(e.nstr >= 1, "{source}: nstr must stay positive");
        assert!(
            e.span.start <= e.span.end,
            "{source}: fragment span inverted"
        );
    }
}

#[test]
fn fragment_spans_cover_the_whole_expression() {
    let source = "obj.ttl + 10m";
    let mut c = compiler(source);
    let e = c.parse_expr(Type::Duration).unwrap();
    assert_eq!(e.span.start, 0);
    assert_eq!(e.span.end as usize, source.len());
}

#[test]
fn strand_auxiliary_names_never_repeat() {
    let source = "req.url + \"a\" == req.url + \"b\" && req.url + \"c\" == req.url + \"d\"";
    let (rendered, _) = compile(source, Type::Bool);
    let mut seen = std::collections::HashSet::new();
    for part in rendered.split("&strs_") {
        if let Some(idx) = part.find("_a") {
            assert!(seen.insert(part[..idx].to_string()), "duplicate strand name");
        }
    }
    assert!(seen.len() >= 4, "expected four distinct bundles, got {seen:?}");
}

#[test]
fn valid_parse_emits_no_diagnostics() {
    let mut c = compiler("1 + 2");
    assert!(c.parse_expr(Type::Int).is_some());
    assert!(c.diagnostics.is_empty());
    assert!(!c.err);
}
