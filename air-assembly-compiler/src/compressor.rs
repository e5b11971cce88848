// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

//! Common subexpression hoisting.
//!
//! Nodes are hash-consed into structural classes; a
//! `load.local` is keyed together with the number of
//! stores to its slot seen so far, so two reads of a
//! local only match when they observe the same value.
//! Repeated classes are hoisted, heaviest first, into
//! fresh locals stored right before their first use.

use crate::expr::{Dimensions, ExprArena, ExprId, ExprKind, LoadSource};
use crate::procedure::{Body, Subroutine};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressorOptions {
    pub enabled: bool,
    /// Smallest subtree (in nodes) worth hoisting.
    pub min_weight: usize,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_weight: 3,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Stmt {
    // None for the result
    local: Option<usize>,
    root: ExprId,
}

#[derive(Clone, Debug)]
struct Forest {
    arena: ExprArena,
    locals: Vec<Dimensions>,
    stmts: Vec<Stmt>,
}

impl Forest {
    fn from_body(body: &Body) -> Self {
        let mut stmts: Vec<Stmt> = body
            .subroutines()
            .iter()
            .map(|s| Stmt {
                local: Some(s.local),
                root: s.value,
            })
            .collect();
        stmts.push(Stmt {
            local: None,
            root: body.result(),
        });

        Self {
            arena: body.arena().clone(),
            locals: body.locals().to_vec(),
            stmts,
        }
    }

    /// Store counts per local as seen by each statement.
    fn versions(&self) -> Vec<Vec<usize>> {
        let mut cur = vec![0; self.locals.len()];
        let mut out = Vec::with_capacity(self.stmts.len());
        for s in &self.stmts {
            out.push(cur.clone());
            if let Some(l) = s.local {
                cur[l] += 1;
            }
        }

        out
    }
}

type Key = (ExprKind, Dimensions, usize);

#[derive(Debug)]
struct Class {
    count: usize,
    stmt: usize,
    repr: ExprId,
    weight: usize,
    trivial: bool,
}

#[derive(Debug, Default)]
struct Interner {
    ids: HashMap<Key, usize>,
    classes: Vec<Class>,
}

impl Interner {
    fn key(arena: &ExprArena, id: ExprId, children: &[usize], versions: &[usize]) -> Key {
        let expr = arena.get(id);
        let children: Vec<ExprId> = children.iter().map(|&c| ExprId::from_index(c)).collect();
        let version = match expr.kind {
            ExprKind::Load {
                source: LoadSource::Local,
                index,
            } => versions[index],
            _ => 0,
        };

        (expr.kind.with_children(&children), expr.dims, version)
    }

    fn visit(&mut self, arena: &ExprArena, id: ExprId, stmt: usize, versions: &[usize]) -> usize {
        let children: Vec<usize> = arena
            .get(id)
            .kind
            .children()
            .into_iter()
            .map(|c| self.visit(arena, c, stmt, versions))
            .collect();

        let key = Self::key(arena, id, &children, versions);
        let next = self.classes.len();
        let class = *self.ids.entry(key).or_insert(next);
        if class == next {
            self.classes.push(Class {
                count: 0,
                stmt,
                repr: id,
                weight: arena.weight(id),
                trivial: is_trivial(&arena.get(id).kind),
            });
        }

        self.classes[class].count += 1;
        class
    }

    fn candidate(&self, min_weight: usize) -> Option<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.count >= 2 && !c.trivial && c.weight >= min_weight)
            .max_by(|(ia, a), (ib, b)| a.weight.cmp(&b.weight).then(ib.cmp(ia)))
            .map(|(i, _)| i)
    }
}

fn is_trivial(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Literal(_) | ExprKind::Load { .. } | ExprKind::TraceSegment { .. }
    )
}

/// Hoist repeated subexpressions of `body` into locals
/// and return the normalized result.
pub fn compress(body: &Body, options: &CompressorOptions) -> Body {
    if !options.enabled {
        return body.clone();
    }

    let min_weight = options.min_weight.max(2);
    let mut forest = Forest::from_body(body);
    let mut hoisted = 0usize;

    loop {
        let versions = forest.versions();
        let mut interner = Interner::default();
        for (i, s) in forest.stmts.iter().enumerate() {
            interner.visit(&forest.arena, s.root, i, &versions[i]);
        }

        let Some(target) = interner.candidate(min_weight) else {
            break;
        };

        forest = hoist(&forest, &interner, target, &versions);
        hoisted += 1;
    }

    if hoisted > 0 {
        debug!(hoisted, locals = forest.locals.len(), "compressed body");
    }

    normalize_forest(&forest)
}

fn hoist(forest: &Forest, interner: &Interner, target: usize, versions: &[Vec<usize>]) -> Forest {
    let class = &interner.classes[target];
    let dims = forest.arena.dims(class.repr);

    let mut locals = forest.locals.clone();
    let local = locals.len();
    locals.push(dims);

    let mut arena = ExprArena::new();
    let mut stmts = Vec::with_capacity(forest.stmts.len() + 1);
    for (i, s) in forest.stmts.iter().enumerate() {
        if i == class.stmt {
            let keep = |_: LoadSource, idx: usize| idx;
            let root = forest.arena.copy_into(class.repr, &mut arena, &keep);
            stmts.push(Stmt {
                local: Some(local),
                root,
            });
        }

        let mut rw = Rewriter {
            src: &forest.arena,
            dest: &mut arena,
            interner,
            target,
            local,
            versions: &versions[i],
        };
        let (root, _) = rw.rewrite(s.root);
        stmts.push(Stmt {
            local: s.local,
            root,
        });
    }

    Forest {
        arena,
        locals,
        stmts,
    }
}

struct Rewriter<'a> {
    src: &'a ExprArena,
    dest: &'a mut ExprArena,
    interner: &'a Interner,
    target: usize,
    local: usize,
    versions: &'a [usize],
}

impl Rewriter<'_> {
    /// Copy `id` into the destination arena, replacing
    /// the target class by a read of the new local.
    fn rewrite(&mut self, id: ExprId) -> (ExprId, Option<usize>) {
        let expr = self.src.get(id);
        let mut new_children = Vec::new();
        let mut classes = Vec::new();
        for c in expr.kind.children() {
            let (nc, cls) = self.rewrite(c);
            new_children.push(nc);
            classes.push(cls);
        }

        let class = classes
            .iter()
            .copied()
            .collect::<Option<Vec<usize>>>()
            .and_then(|cs| {
                let key = Interner::key(self.src, id, &cs, self.versions);
                self.interner.ids.get(&key).copied()
            });

        if class == Some(self.target) {
            let load = self.dest.push(
                ExprKind::Load {
                    source: LoadSource::Local,
                    index: self.local,
                },
                expr.dims,
            );

            return (load, class);
        }

        let new = self.dest.push(expr.kind.with_children(&new_children), expr.dims);
        (new, class)
    }
}

/// Canonical form of a body: locals that are never read
/// are dropped, the rest renumbered in order of their
/// first store, and the arena rebuilt in statement order.
pub fn normalize(body: &Body) -> Body {
    normalize_forest(&Forest::from_body(body))
}

fn normalize_forest(forest: &Forest) -> Body {
    let mut read = vec![false; forest.locals.len()];
    for s in &forest.stmts {
        mark_reads(&forest.arena, s.root, &mut read);
    }

    let mut renumber: Vec<Option<usize>> = vec![None; forest.locals.len()];
    let mut locals = Vec::new();
    for s in &forest.stmts {
        if let Some(l) = s.local {
            if read[l] && renumber[l].is_none() {
                renumber[l] = Some(locals.len());
                locals.push(forest.locals[l]);
            }
        }
    }

    let remap = |source: LoadSource, index: usize| match source {
        LoadSource::Local => renumber[index].unwrap_or(index),
        _ => index,
    };

    let mut arena = ExprArena::new();
    let mut subroutines = Vec::new();
    // exactly one result statement, always last
    let mut result = ExprId::from_index(0);
    for s in &forest.stmts {
        match s.local {
            Some(l) => {
                let Some(local) = renumber[l] else {
                    continue;
                };

                let value = forest.arena.copy_into(s.root, &mut arena, &remap);
                subroutines.push(Subroutine {
                    local,
                    value,
                    dims: locals[local],
                });
            }
            None => result = forest.arena.copy_into(s.root, &mut arena, &remap),
        }
    }

    Body::from_parts(locals, subroutines, arena, result)
}

fn mark_reads(arena: &ExprArena, id: ExprId, read: &mut [bool]) {
    let expr = arena.get(id);
    if let ExprKind::Load {
        source: LoadSource::Local,
        index,
    } = expr.kind
    {
        read[index] = true;
    }

    for c in expr.kind.children() {
        mark_reads(arena, c, read);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, LiteralValue};
    use crate::procedure::BodyBuilder;

    // (add (mul (get r 0) (get r 1)) (mul (get r 0) (get r 1)))
    fn repeated_product() -> Body {
        fn product(a: &mut ExprArena) -> ExprId {
            let r = a.load(LoadSource::Trace, 0, Dimensions::vector(2));
            let x = a.get_element(r, 0).unwrap();
            let y = a.get_element(r, 1).unwrap();
            a.binary(BinaryOp::Mul, x, y).unwrap()
        }

        let mut b = BodyBuilder::new();
        let a = b.arena_mut();
        let p = product(a);
        let q = product(a);
        let sum = a.binary(BinaryOp::Add, p, q).unwrap();
        let res = a.make_vector(vec![sum]).unwrap();

        b.finish(res)
    }

    #[test]
    fn hoists_repeated_subtree() {
        let body = repeated_product();
        let out = compress(&body, &CompressorOptions::default());

        assert_eq!(out.locals(), &[Dimensions::scalar()]);
        assert_eq!(out.subroutines().len(), 1);
        assert_eq!(out.arena().weight(out.subroutines()[0].value), 5);
        assert!(out.node_count() < body.node_count());
    }

    #[test]
    fn compress_is_idempotent() {
        let once = compress(&repeated_product(), &CompressorOptions::default());
        let twice = compress(&once, &CompressorOptions::default());

        assert_eq!(once, twice);
    }

    #[test]
    fn disabled_compressor_keeps_body() {
        let body = repeated_product();
        let opts = CompressorOptions {
            enabled: false,
            ..CompressorOptions::default()
        };

        assert_eq!(compress(&body, &opts), body);
    }

    #[test]
    fn light_subtrees_stay_inline() {
        let body = repeated_product();
        let opts = CompressorOptions {
            enabled: true,
            min_weight: 6,
        };

        let out = compress(&body, &opts);
        assert!(out.subroutines().is_empty());
    }

    #[test]
    fn reads_across_a_restore_do_not_merge() {
        // local 0 = r0; a = local0 * local0; local 0 = 5; b = local0 * local0
        let mut b = BodyBuilder::new();
        let l = b.declare_local(Dimensions::vector(1));
        let r = b.arena_mut().load(LoadSource::Trace, 0, Dimensions::vector(1));
        b.store(l, r).unwrap();

        let square = |b: &mut BodyBuilder| {
            let x = b.arena_mut().load(LoadSource::Local, l, Dimensions::vector(1));
            let y = b.arena_mut().load(LoadSource::Local, l, Dimensions::vector(1));
            let m = b.arena_mut().binary(BinaryOp::Mul, x, y).unwrap();
            let one = b.arena_mut().literal(LiteralValue::Scalar(1)).unwrap();
            b.arena_mut().binary(BinaryOp::Add, m, one).unwrap()
        };

        let first = square(&mut b);
        let l2 = b.declare_local(Dimensions::vector(1));
        b.store(l2, first).unwrap();
        let five = b.arena_mut().literal(LiteralValue::Vector(vec![5])).unwrap();
        b.store(l, five).unwrap();
        let second = square(&mut b);
        let saved = b.arena_mut().load(LoadSource::Local, l2, Dimensions::vector(1));
        let res = b.arena_mut().binary(BinaryOp::Sub, saved, second).unwrap();
        let body = b.finish(res);

        let out = compress(&body, &CompressorOptions::default());
        assert_eq!(out.locals().len(), 2);
        assert_eq!(out.subroutines().len(), 3);
    }

    #[test]
    fn normalize_drops_unread_locals() {
        let mut b = BodyBuilder::new();
        let unused = b.declare_local(Dimensions::scalar());
        let used = b.declare_local(Dimensions::vector(1));
        let c = b.arena_mut().literal(LiteralValue::Scalar(3)).unwrap();
        b.store(unused, c).unwrap();
        let r = b.arena_mut().load(LoadSource::Trace, 0, Dimensions::vector(1));
        b.store(used, r).unwrap();
        let res = b.arena_mut().load(LoadSource::Local, used, Dimensions::vector(1));
        let body = b.finish(res);

        let out = normalize(&body);
        assert_eq!(out.locals(), &[Dimensions::vector(1)]);
        assert_eq!(out.subroutines()[0].local, 0);
        assert_eq!(
            out.arena().get(out.result()).kind,
            ExprKind::Load {
                source: LoadSource::Local,
                index: 0
            }
        );
    }
}
