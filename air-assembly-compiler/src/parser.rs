// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Parser: tokens -> S-expression tree -> [`SchemaBuilder`].
//!
//! Sections of a module are gathered by their head symbol
//! and interpreted in dependency order (field, constants,
//! functions, static registers, transition, evaluation).
//! Each section entry, register declaration and statement
//! is an independent unit: its errors are recorded and
//! parsing moves on to the next unit.

use crate::error::{CompileError, Error, Position};
use crate::expr::{BinaryOp, Dimensions, ExprId, LiteralValue, LoadSource, UnaryOp};
use crate::lexer::{Tok, Token};
use crate::procedure::{Body, BodyBuilder, FunctionDef, Procedure, ProcedureKind};
use crate::registers::{CycleSource, StaticRegisterSet, StaticRegisterSetBuilder};
use crate::schema::{FieldDescriptor, SchemaBuilder};

const MAX_PARSE_DEPTH: usize = 1_024;

const SECTIONS: [&str; 6] = [
    "field",
    "const",
    "function",
    "static",
    "transition",
    "evaluation",
];

#[derive(Clone, Debug, PartialEq, Eq)]
enum Sexp {
    Int(u128, Position),
    Hex(Vec<u8>, Position),
    Sym(String, Position),
    List(Vec<Sexp>, Position),
}

impl Sexp {
    fn pos(&self) -> Position {
        match self {
            Sexp::Int(_, p) | Sexp::Hex(_, p) | Sexp::Sym(_, p) | Sexp::List(_, p) => *p,
        }
    }

    fn items(&self) -> &[Sexp] {
        match self {
            Sexp::List(items, _) => items,
            _ => &[],
        }
    }

    fn as_sym(&self) -> Option<&str> {
        match self {
            Sexp::Sym(s, _) => Some(s),
            _ => None,
        }
    }

    fn head(&self) -> Option<&str> {
        self.items().first().and_then(Sexp::as_sym)
    }

    fn is_int(&self) -> bool {
        matches!(self, Sexp::Int(..))
    }
}

struct Reader<'a> {
    tokens: &'a [Token],
    at: usize,
}

impl Reader<'_> {
    fn peek(&self) -> (Tok, Position) {
        match self.tokens.get(self.at) {
            Some(t) => (t.tok.clone(), t.pos),
            None => (
                Tok::Eof,
                self.tokens.last().map(|t| t.pos).unwrap_or_default(),
            ),
        }
    }

    fn read_all(mut self) -> Result<Vec<Sexp>, Error> {
        let mut out = Vec::new();
        while self.peek().0 != Tok::Eof {
            out.push(self.read(0)?);
        }

        Ok(out)
    }

    fn read(&mut self, depth: usize) -> Result<Sexp, Error> {
        if depth > MAX_PARSE_DEPTH {
            return Err(Error::LimitExceeded("parse depth exceeded".into()));
        }

        let (tok, pos) = self.peek();
        self.at += 1;

        match tok {
            Tok::LParen => {
                let mut items = Vec::new();
                loop {
                    match self.peek() {
                        (Tok::RParen, _) => {
                            self.at += 1;
                            break;
                        }
                        (Tok::Eof, eof) => return Err(Error::parse("')'", eof)),
                        _ => items.push(self.read(depth + 1)?),
                    }
                }

                Ok(Sexp::List(items, pos))
            }
            Tok::RParen => Err(Error::parse("form before ')'", pos)),
            Tok::Int(v) => Ok(Sexp::Int(v, pos)),
            Tok::Hex(b) => Ok(Sexp::Hex(b, pos)),
            Tok::Sym(s) => Ok(Sexp::Sym(s, pos)),
            Tok::Eof => Err(Error::parse("form", pos)),
        }
    }
}

fn int(s: &Sexp, expected: &str) -> Result<u128, Error> {
    match s {
        Sexp::Int(v, _) => Ok(*v),
        other => Err(Error::parse(expected, other.pos())),
    }
}

fn index(s: &Sexp) -> Result<usize, Error> {
    usize::try_from(int(s, "index")?).map_err(|_| Error::parse("index", s.pos()))
}

fn element(s: &Sexp, modulus: u128) -> Result<u128, Error> {
    let v = int(s, "field element")?;
    if v >= modulus {
        return Err(Error::parse(
            format!("field element below {modulus} (got {v})"),
            s.pos(),
        ));
    }

    Ok(v)
}

fn arity(form: &str, operands: &str, pos: Position) -> Error {
    Error::parse(format!("({form} {operands})"), pos)
}

/// `scalar` | `vector n` | `matrix r c`
fn parse_type(items: &[Sexp], pos: Position) -> Result<Dimensions, Error> {
    let positive = |s: &Sexp| match index(s)? {
        0 => Err(Error::parse("non-zero length", s.pos())),
        n => Ok(n),
    };

    match items {
        [s] if s.as_sym() == Some("scalar") => Ok(Dimensions::scalar()),
        [s, n] if s.as_sym() == Some("vector") => Ok(Dimensions::vector(positive(n)?)),
        [s, r, c] if s.as_sym() == Some("matrix") => {
            Ok(Dimensions::matrix(positive(r)?, positive(c)?))
        }
        _ => Err(Error::parse("type (scalar | vector n | matrix r c)", pos)),
    }
}

fn parse_literal(items: &[Sexp], modulus: u128, pos: Position) -> Result<LiteralValue, Error> {
    let elements = |xs: &[Sexp]| -> Result<Vec<u128>, Error> {
        xs.iter().map(|x| element(x, modulus)).collect()
    };

    let value = match items.split_first() {
        Some((k, [v])) if k.as_sym() == Some("scalar") => {
            LiteralValue::Scalar(element(v, modulus)?)
        }
        Some((k, vs)) if k.as_sym() == Some("vector") && !vs.is_empty() => {
            LiteralValue::Vector(elements(vs)?)
        }
        Some((k, rows)) if k.as_sym() == Some("matrix") && !rows.is_empty() => {
            let mut out = Vec::with_capacity(rows.len());
            for r in rows {
                if !matches!(r, Sexp::List(..)) {
                    return Err(Error::parse("matrix row (v+)", r.pos()));
                }

                out.push(elements(r.items())?);
            }

            LiteralValue::Matrix(out)
        }
        _ => return Err(Error::parse("literal (scalar | vector | matrix)", pos)),
    };

    let dims = value.dimensions();
    let ragged = match &value {
        LiteralValue::Matrix(m) => m.iter().any(|r| r.len() != dims.cols) || dims.cols == 0,
        _ => false,
    };

    if ragged {
        let err = Error::DimensionMismatch("matrix rows must have equal length".into());
        return Err(err.located(pos));
    }

    Ok(value)
}

#[derive(Clone, Copy, Debug)]
enum Scope<'a> {
    Function {
        params: &'a [Dimensions],
    },
    Procedure {
        span: usize,
        trace_width: usize,
        statics: Option<usize>,
    },
}

/// Read-only context for parsing expressions of one body.
struct Ctx<'a> {
    modulus: u128,
    constants: &'a [LiteralValue],
    functions: &'a [FunctionDef],
    scope: Scope<'a>,
}

impl Ctx<'_> {
    fn body(&self, items: &[Sexp], pos: Position) -> Result<Body, Vec<Error>> {
        let Some((result, stmts)) = items.split_last() else {
            return Err(vec![Error::parse("result expression", pos)]);
        };

        let mut b = BodyBuilder::new();
        let mut errors = Vec::new();
        for st in stmts {
            match st.head() {
                Some("local") => match parse_type(&st.items()[1..], st.pos()) {
                    Ok(d) => {
                        b.declare_local(d);
                    }
                    Err(e) => errors.push(e),
                },
                Some("store.local") => {
                    if let Err(e) = self.store(&mut b, st) {
                        errors.push(e);
                        if let Some(Ok(i)) = st.items().get(1).map(index) {
                            b.assume_stored(i);
                        }
                    }
                }
                _ => errors.push(Error::parse("(local ..) or (store.local ..)", st.pos())),
            }
        }

        match self.expr(&mut b, result) {
            Ok(r) if errors.is_empty() => Ok(b.finish(r)),
            Ok(_) => Err(errors),
            Err(e) => {
                errors.push(e);
                Err(errors)
            }
        }
    }

    fn store(&self, b: &mut BodyBuilder, st: &Sexp) -> Result<(), Error> {
        let [_, i, value] = st.items() else {
            return Err(arity("store.local", "i expr", st.pos()));
        };

        let local = index(i)?;
        let value = self.expr(b, value)?;
        b.store(local, value).map_err(|e| e.located(st.pos()))
    }

    fn expr(&self, b: &mut BodyBuilder, s: &Sexp) -> Result<ExprId, Error> {
        let pos = s.pos();
        let at = |e: Error| e.located(pos);

        if let Sexp::Int(..) = s {
            let v = element(s, self.modulus)?;
            return b.arena_mut().literal(LiteralValue::Scalar(v));
        }

        let Some(head) = s.head() else {
            return Err(Error::parse("expression", pos));
        };

        let args = &s.items()[1..];

        if let Some(op) = BinaryOp::from_keyword(head) {
            let [l, r] = args else {
                return Err(arity(head, "a b", pos));
            };

            let l = self.expr(b, l)?;
            let r = self.expr(b, r)?;
            return b.arena_mut().binary(op, l, r).map_err(at);
        }

        if let Some(op) = UnaryOp::from_keyword(head) {
            let [x] = args else {
                return Err(arity(head, "a", pos));
            };

            let x = self.expr(b, x)?;
            return Ok(b.arena_mut().unary(op, x));
        }

        match head {
            "scalar" | "vector" | "matrix" if is_literal(head, args) => {
                let v = parse_literal(s.items(), self.modulus, pos)?;
                b.arena_mut().literal(v).map_err(at)
            }
            "vector" => {
                let mut elements = Vec::with_capacity(args.len());
                for a in args {
                    elements.push(self.expr(b, a)?);
                }

                b.arena_mut().make_vector(elements).map_err(at)
            }
            "matrix" => {
                let mut rows = Vec::with_capacity(args.len());
                for r in args {
                    if !matches!(r, Sexp::List(..)) {
                        return Err(Error::parse("matrix row (expr+)", r.pos()));
                    }

                    let mut row = Vec::with_capacity(r.items().len());
                    for e in r.items() {
                        row.push(self.expr(b, e)?);
                    }

                    rows.push(row);
                }

                b.arena_mut().make_matrix(rows).map_err(at)
            }
            "get" => {
                let [src, i] = args else {
                    return Err(arity(head, "expr i", pos));
                };

                let src = self.expr(b, src)?;
                b.arena_mut().get_element(src, index(i)?).map_err(at)
            }
            "slice" => {
                let [src, start, end] = args else {
                    return Err(arity(head, "expr start end", pos));
                };

                let src = self.expr(b, src)?;
                b.arena_mut()
                    .slice(src, index(start)?, index(end)?)
                    .map_err(at)
            }
            "call" => {
                let Some((f, rest)) = args.split_first() else {
                    return Err(arity(head, "f expr*", pos));
                };

                let f = index(f)?;
                let Some(def) = self.functions.get(f) else {
                    return Err(Error::UndefinedReference(format!("function {f}")).located(pos));
                };

                let mut call_args = Vec::with_capacity(rest.len());
                for a in rest {
                    call_args.push(self.expr(b, a)?);
                }

                b.arena_mut()
                    .call(f, &def.signature(), call_args)
                    .map_err(at)
            }
            _ => match load_source(head) {
                Some(source) => {
                    let [i] = args else {
                        return Err(arity(head, "i", pos));
                    };

                    self.load(b, source, index(i)?).map_err(at)
                }
                None => Err(Error::parse("expression", pos)),
            },
        }
    }

    fn load(&self, b: &mut BodyBuilder, source: LoadSource, index: usize) -> Result<ExprId, Error> {
        let undefined = |m: String| Error::UndefinedReference(m);

        let dims = match (source, self.scope) {
            (LoadSource::Const, _) => self
                .constants
                .get(index)
                .map(LiteralValue::dimensions)
                .ok_or_else(|| undefined(format!("constant {index}")))?,
            (LoadSource::Local, _) => b.readable_local(index)?,
            (LoadSource::Trace, Scope::Procedure { span, trace_width, .. }) => {
                if index >= span {
                    return Err(undefined(format!(
                        "trace row {index} outside of span {span}"
                    )));
                }

                Dimensions::vector(trace_width)
            }
            (LoadSource::Static, Scope::Procedure { statics, .. }) => match statics {
                Some(n) if index == 0 => Dimensions::vector(n),
                Some(_) => return Err(undefined(format!("static row {index}"))),
                None => return Err(undefined("module declares no static registers".into())),
            },
            (LoadSource::Param, Scope::Function { params }) => *params
                .get(index)
                .ok_or_else(|| undefined(format!("parameter {index}")))?,
            (LoadSource::Param, Scope::Procedure { .. }) => {
                return Err(undefined("load.param outside of a function".into()));
            }
            (LoadSource::Trace | LoadSource::Static, Scope::Function { .. }) => {
                return Err(undefined(format!(
                    "{} inside a function",
                    source.keyword()
                )));
            }
        };

        Ok(b.arena_mut().load(source, index, dims))
    }
}

fn load_source(head: &str) -> Option<LoadSource> {
    Some(match head {
        "load.const" => LoadSource::Const,
        "load.trace" => LoadSource::Trace,
        "load.static" => LoadSource::Static,
        "load.local" => LoadSource::Local,
        "load.param" => LoadSource::Param,
        _ => return None,
    })
}

/// Literal forms contain bare integers only.
fn is_literal(head: &str, args: &[Sexp]) -> bool {
    match head {
        "scalar" => true,
        "vector" => !args.is_empty() && args.iter().all(Sexp::is_int),
        "matrix" => {
            !args.is_empty()
                && args
                    .iter()
                    .all(|r| matches!(r, Sexp::List(..)) && r.items().iter().all(Sexp::is_int))
        }
        _ => false,
    }
}

fn parse_field(s: &Sexp) -> Result<u128, Error> {
    match s.items() {
        [_, kind, m] if kind.as_sym() == Some("prime") => {
            let m = int(m, "modulus")?;
            if m < 3 {
                return Err(Error::parse("prime modulus of at least 3", s.pos()));
            }

            Ok(m)
        }
        _ => Err(arity("field", "prime <modulus>", s.pos())),
    }
}

fn parse_function(
    s: &Sexp,
    modulus: u128,
    constants: &[LiteralValue],
    functions: &[FunctionDef],
) -> Result<FunctionDef, Vec<Error>> {
    let items = &s.items()[1..];
    let Some((result, rest)) = items.split_first().filter(|(r, _)| r.head() == Some("result"))
    else {
        return Err(vec![Error::parse("(result <type>)", s.pos())]);
    };

    let result = parse_type(&result.items()[1..], result.pos()).map_err(|e| vec![e])?;

    let n_params = rest.iter().take_while(|p| p.head() == Some("param")).count();
    let params = rest[..n_params]
        .iter()
        .map(|p| parse_type(&p.items()[1..], p.pos()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| vec![e])?;

    let ctx = Ctx {
        modulus,
        constants,
        functions,
        scope: Scope::Function { params: &params },
    };

    let body = ctx.body(&rest[n_params..], s.pos())?;
    FunctionDef::new(params, result, body).map_err(|e| vec![e.located(s.pos())])
}

/// `(transition (span 1) (result vector n) ...)` header;
/// returns the result width.
fn procedure_header(kind: ProcedureKind, s: &Sexp) -> Result<usize, Error> {
    let items = s.items();
    let span = items
        .get(1)
        .filter(|i| i.head() == Some("span"))
        .and_then(|i| i.items().get(1))
        .map(|v| int(v, "span"));

    if span != Some(Ok(kind.span() as u128)) {
        return Err(Error::parse(format!("(span {})", kind.span()), s.pos()));
    }

    match items.get(2) {
        Some(r) if r.head() == Some("result") => {
            let dims = parse_type(&r.items()[1..], r.pos())?;
            if !dims.is_vector() {
                return Err(Error::parse("(result vector <n>)", r.pos()));
            }

            Ok(dims.rows)
        }
        _ => Err(Error::parse("(result vector <n>)", s.pos())),
    }
}

fn parse_register(
    rb: &mut StaticRegisterSetBuilder,
    s: &Sexp,
    modulus: u128,
) -> Result<usize, Error> {
    let pos = s.pos();
    let args = s.items().get(1..).unwrap_or_default();

    match s.head() {
        Some("input") => {
            let (visibility, mut rest) = args
                .split_first()
                .ok_or_else(|| arity("input", "public|secret ..", pos))?;

            let secret = match visibility.as_sym() {
                Some("public") => false,
                Some("secret") => true,
                _ => return Err(Error::parse("public | secret", visibility.pos())),
            };

            let binary = rest.first().and_then(Sexp::as_sym) == Some("binary");
            if binary {
                rest = &rest[1..];
            }

            let [binding, pattern] = rest else {
                return Err(arity("input", "visibility binding pattern", pos));
            };

            let (scalar, parent) = match binding {
                Sexp::Sym(b, _) if b == "vector" => (false, None),
                Sexp::Sym(b, _) if b == "scalar" => (true, None),
                Sexp::List(items, _) if binding.head() == Some("parent") && items.len() == 2 => {
                    (false, Some(index(&items[1])?))
                }
                _ => return Err(Error::parse("vector | scalar | (parent i)", binding.pos())),
            };

            let steps = match pattern {
                Sexp::Sym(p, _) if p == "filled" => None,
                Sexp::Int(..) => Some(int(pattern, "steps")?),
                Sexp::List(items, _) if pattern.head() == Some("steps") && items.len() == 2 => {
                    Some(int(&items[1], "steps")?)
                }
                _ => return Err(Error::parse("filled | <steps> | (steps n)", pattern.pos())),
            };

            let steps = steps
                .map(|n| u64::try_from(n).map_err(|_| Error::parse("steps", pattern.pos())))
                .transpose()?;

            rb.add_input(secret, binary, scalar, parent, steps)
                .map_err(|e| e.located(pos))
        }
        Some("cycle") => {
            let source = match args {
                [g] if g.head() == Some("prng") => match g.items() {
                    [_, algo, Sexp::Hex(seed, _), count] if algo.as_sym() == Some("blake3") => {
                        CycleSource::Prng {
                            seed: seed.clone(),
                            count: index(count)?,
                        }
                    }
                    _ => return Err(arity("prng", "blake3 0x<seed> <count>", g.pos())),
                },
                [g] if g.head() == Some("power") => match g.items() {
                    [_, base, count] => CycleSource::Power {
                        base: int(base, "power base")?,
                        count: index(count)?,
                    },
                    _ => return Err(arity("power", "<base> <count>", g.pos())),
                },
                [] => return Err(arity("cycle", "v+", pos)),
                values => CycleSource::Values(
                    values
                        .iter()
                        .map(|v| int(v, "cycle value"))
                        .collect::<Result<_, _>>()?,
                ),
            };

            rb.add_cyclic(source).map_err(|e| e.located(pos))
        }
        Some("mask") => {
            let [source, value] = args else {
                return Err(arity("mask", "<source> <value>", pos));
            };

            rb.add_mask(index(source)?, element(value, modulus)?)
                .map_err(|e| e.located(pos))
        }
        _ => Err(Error::parse("register declaration (input | cycle | mask)", pos)),
    }
}

fn parse_static(s: &Sexp, modulus: u128) -> Result<StaticRegisterSet, Vec<Error>> {
    let mut rb = StaticRegisterSetBuilder::new(modulus);
    let mut errors = Vec::new();
    for r in &s.items()[1..] {
        if let Err(e) = parse_register(&mut rb, r, modulus) {
            errors.push(e);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    rb.build()
}

/// The single section of a kind; missing or
/// duplicate sections are recorded as errors.
fn single<'a>(
    found: &[&'a Sexp],
    name: &str,
    required: bool,
    module: Position,
    errors: &mut Vec<Error>,
) -> Option<&'a Sexp> {
    for dup in found.iter().skip(1) {
        errors.push(Error::parse(format!("a single ({name} ..) section"), dup.pos()));
    }

    if required && found.is_empty() {
        errors.push(Error::parse(format!("({name} ..) section"), module));
    }

    found.first().copied()
}

/// Parse a token stream into a schema builder.
pub fn parse(tokens: &[Token]) -> Result<SchemaBuilder, CompileError> {
    let forms = Reader { tokens, at: 0 }.read_all()?;

    let module = match forms.as_slice() {
        [m] if m.head() == Some("module") => m,
        [] => return Err(Error::parse("(module ..)", Position::new(1, 1)).into()),
        [first, ..] => {
            return Err(Error::parse("a single (module ..) form", first.pos()).into());
        }
    };

    let mut errors = Vec::new();
    let mut sections: [Vec<&Sexp>; 6] = Default::default();
    for s in &module.items()[1..] {
        match s.head().and_then(|h| SECTIONS.iter().position(|&k| k == h)) {
            Some(k) => sections[k].push(s),
            None => errors.push(Error::parse(
                "module section (field | const | function | static | transition | evaluation)",
                s.pos(),
            )),
        }
    }

    let [fields, consts, functions, statics, transitions, evaluations] = sections;
    let mpos = module.pos();

    let modulus = match single(&fields, "field", true, mpos, &mut errors).map(parse_field) {
        Some(Ok(m)) => m,
        Some(Err(e)) => {
            errors.push(e);
            u128::MAX
        }
        None => u128::MAX,
    };

    let mut builder = SchemaBuilder::new(FieldDescriptor { modulus });

    for c in consts {
        match parse_literal(&c.items()[1..], modulus, c.pos()) {
            Ok(v) => {
                builder.add_constant(v);
            }
            Err(e) => errors.push(e),
        }
    }

    for f in functions {
        match parse_function(f, modulus, builder.constants(), builder.functions()) {
            Ok(def) => {
                builder.add_function(def);
            }
            Err(es) => errors.extend(es),
        }
    }

    let mut static_count = None;
    if let Some(s) = single(&statics, "static", false, mpos, &mut errors) {
        let declared = s.items().len() - 1;
        static_count = (declared > 0).then_some(declared);

        match parse_static(s, modulus) {
            Ok(set) => builder.set_static_registers(set),
            Err(es) => errors.extend(es),
        }
    }

    let mut trace_width = None;
    if let Some(t) = single(&transitions, "transition", true, mpos, &mut errors) {
        match procedure_header(ProcedureKind::Transition, t) {
            Ok(width) => {
                trace_width = Some(width);
                let kind = ProcedureKind::Transition;
                let parsed = parse_procedure(kind, t, width, width, static_count, modulus, &builder);
                match parsed {
                    Ok(p) => builder.set_transition(p),
                    Err(es) => errors.extend(es),
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if let Some(ev) = single(&evaluations, "evaluation", true, mpos, &mut errors) {
        match (procedure_header(ProcedureKind::Evaluation, ev), trace_width) {
            (Ok(width), Some(tw)) => {
                let kind = ProcedureKind::Evaluation;
                let parsed = parse_procedure(kind, ev, width, tw, static_count, modulus, &builder);
                match parsed {
                    Ok(p) => builder.set_evaluation(p),
                    Err(es) => errors.extend(es),
                }
            }
            // trace width is unknown without a valid transition
            (Ok(_), None) => {}
            (Err(e), _) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(builder)
    } else {
        Err(CompileError::new(errors))
    }
}

#[allow(clippy::too_many_arguments)]
fn parse_procedure(
    kind: ProcedureKind,
    s: &Sexp,
    width: usize,
    trace_width: usize,
    statics: Option<usize>,
    modulus: u128,
    builder: &SchemaBuilder,
) -> Result<Procedure, Vec<Error>> {
    let ctx = Ctx {
        modulus,
        constants: builder.constants(),
        functions: builder.functions(),
        scope: Scope::Procedure {
            span: kind.span(),
            trace_width,
            statics,
        },
    };

    let body = ctx.body(&s.items()[3..], s.pos())?;
    Procedure::new(kind, width, body).map_err(|e| vec![e.located(s.pos())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprKind;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> Result<SchemaBuilder, CompileError> {
        parse(&lex(src).unwrap())
    }

    const MINIMAL: &str = "
        (module
          (field prime 340282366920938463463374607393113505793)
          (transition (span 1) (result vector 2)
            (add (load.trace 0) 1))
          (evaluation (span 2) (result vector 2)
            (sub (load.trace 1) (add (load.trace 0) 1))))";

    #[test]
    fn reader_reports_unbalanced_parens() {
        let err = parse_src("(module (field prime 7)").unwrap_err();
        assert!(err.any(|e| matches!(e, Error::Parse { .. })));

        let err = parse_src("(module))").unwrap_err();
        assert!(err.any(|e| matches!(e, Error::Parse { .. })));
    }

    #[test]
    fn parses_minimal_module() {
        let b = parse_src(MINIMAL).unwrap();
        assert_eq!(b.field().modulus, 340282366920938463463374607393113505793);
    }

    #[test]
    fn integer_only_vectors_are_literals() {
        let mut b = BodyBuilder::new();
        let ctx = Ctx {
            modulus: 97,
            constants: &[],
            functions: &[],
            scope: Scope::Procedure {
                span: 1,
                trace_width: 2,
                statics: None,
            },
        };

        let forms = Reader {
            tokens: &lex("(vector 1 2) (vector (scalar 1) 2) (slice (load.trace 0) 0 1)").unwrap(),
            at: 0,
        }
        .read_all()
        .unwrap();

        let lit = ctx.expr(&mut b, &forms[0]).unwrap();
        let built = ctx.expr(&mut b, &forms[1]).unwrap();
        let seg = ctx.expr(&mut b, &forms[2]).unwrap();

        assert!(matches!(b.arena().get(lit).kind, ExprKind::Literal(_)));
        assert!(matches!(b.arena().get(built).kind, ExprKind::MakeVector(_)));
        assert!(matches!(b.arena().get(seg).kind, ExprKind::TraceSegment { .. }));
    }

    #[test]
    fn collects_independent_errors() {
        let src = "
            (module
              (field prime 97)
              (static (cycle 1 2 3) (input public vector (steps 3)))
              (transition (span 1) (result vector 1)
                (store.local 0 (load.trace 0))
                (load.trace 5))
              (evaluation (span 2) (result vector 1)
                (load.param 0)))";

        let err = parse_src(src).unwrap_err();
        // cycle length, steps, undeclared local, trace row, param
        assert_eq!(err.errors().len(), 5, "{err}");
    }

    #[test]
    fn rejects_values_outside_field() {
        let src = "
            (module
              (field prime 97)
              (const scalar 97)
              (transition (span 1) (result vector 1) (load.trace 0))
              (evaluation (span 2) (result vector 1) (load.trace 1)))";

        let err = parse_src(src).unwrap_err();
        assert_eq!(err.errors().len(), 1);
    }

    #[test]
    fn missing_sections_are_reported() {
        let err = parse_src("(module (field prime 97))").unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn functions_cannot_read_trace() {
        let src = "
            (module
              (field prime 97)
              (function (result vector 1) (param vector 1) (load.trace 0))
              (transition (span 1) (result vector 1) (load.trace 0))
              (evaluation (span 2) (result vector 1) (load.trace 1)))";

        let err = parse_src(src).unwrap_err();
        assert!(err.any(|e| matches!(e, Error::UndefinedReference(_))));
    }
}
