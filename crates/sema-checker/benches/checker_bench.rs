//! End-to-end checking throughput on synthetic packages (section 4.F):
//! a flat package of small functions doing integer arithmetic, and a
//! single function whose body repeatedly instantiates a generic `Box<T>`
//! to exercise the template cache (section 4.D/4.F.5) under the checker.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sema_ast::{Node, NodeArena, NodeFlags, NodeId, NodeKind, NodePayload, Symbol, UserTypeHeader};
use sema_checker::CheckerContext;
use sema_common::{CheckerOptions, Span};

fn primitive(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
    arena.alloc(Node::new(kind, NodeFlags::empty(), Span::dummy(), NodePayload::Primitive(Default::default())))
}

fn int_lit(arena: &mut NodeArena, value: i128) -> NodeId {
    arena.alloc(Node::new(
        NodeKind::IntLiteral,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::IntLiteral { text: value.to_string(), value },
    ))
}

fn binop(arena: &mut NodeArena, op: sema_ast::BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
    arena.alloc(Node::new(NodeKind::BinOp, NodeFlags::empty(), Span::dummy(), NodePayload::BinOp { op, lhs, rhs }))
}

fn var(arena: &mut NodeArena, name: &str, init: NodeId) -> NodeId {
    arena.alloc(Node::new(
        NodeKind::Var,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::Var { name: Symbol::intern(name), type_annotation: None, init: Some(init), mutable: false },
    ))
}

/// A function `fn f_i() void { var a = 1 + 2 * 3 - 4; var b = a + a; }` —
/// enough nested binop/literal/var checking to exercise expression
/// checking's literal-promotion and scope-declaration paths without
/// being dominated by allocation itself.
fn make_arith_fun(arena: &mut NodeArena, index: usize) -> NodeId {
    let one = int_lit(arena, 1);
    let two = int_lit(arena, 2);
    let three = int_lit(arena, 3);
    let four = int_lit(arena, 4);
    let mul = binop(arena, sema_ast::BinaryOp::Mul, two, three);
    let add = binop(arena, sema_ast::BinaryOp::Add, one, mul);
    let sub = binop(arena, sema_ast::BinaryOp::Sub, add, four);
    let a = var(arena, "a", sub);
    let a_id = arena.alloc(Node::new(
        NodeKind::Id,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::Id { name: Symbol::intern("a"), resolved: std::cell::Cell::new(None) },
    ));
    let a_id2 = arena.alloc(Node::new(
        NodeKind::Id,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::Id { name: Symbol::intern("a"), resolved: std::cell::Cell::new(None) },
    ));
    let sum = binop(arena, sema_ast::BinaryOp::Add, a_id, a_id2);
    let b = var(arena, "b", sum);
    let void_ty = primitive(arena, NodeKind::Void);
    let body = arena.alloc(Node::new(NodeKind::Block, NodeFlags::empty(), Span::dummy(), NodePayload::Block { stmts: vec![a, b] }));
    arena.alloc(Node::new(
        NodeKind::Fun,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::Fun {
            name: Some(Symbol::intern(&format!("f_{index}"))),
            header: UserTypeHeader::default(),
            params: Vec::new(),
            result: void_ty,
            body: Some(body),
        },
    ))
}

fn bench_check_package_of_arith_funs(c: &mut Criterion) {
    c.bench_function("check_package_128_arith_funs", |b| {
        b.iter(|| {
            let mut arena = NodeArena::new();
            let decls: Vec<NodeId> = (0..128).map(|i| make_arith_fun(&mut arena, i)).collect();
            let unit = arena.alloc(Node::new(NodeKind::Unit, NodeFlags::empty(), Span::dummy(), NodePayload::Unit { decls }));
            let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "bench".to_string());
            ctx.check_unit(unit);
            black_box(ctx.diagnostics.len())
        })
    });
}

/// A single generic `Box<T> { v T }` instantiated with `N` distinct
/// primitive arguments, exercising `expand_template_instance`'s cache
/// insert/lookup path (section 4.F.5) rather than arithmetic checking.
fn make_box_template(arena: &mut NodeArena) -> (NodeId, Vec<NodeId>) {
    let t_param = arena.alloc(Node::new(
        NodeKind::Placeholder,
        NodeFlags::TEMPLATE,
        Span::dummy(),
        NodePayload::Placeholder { name: Symbol::intern("T") },
    ));
    let field = sema_ast::StructField::new(Symbol::intern("v"), t_param, NodeFlags::empty());
    let definition = arena.alloc(Node::new(
        NodeKind::Struct,
        NodeFlags::TEMPLATE,
        Span::dummy(),
        NodePayload::Struct { meta: Default::default(), header: UserTypeHeader::default(), name: Some(Symbol::intern("Box")), fields: vec![field] },
    ));
    let template_param_decl = arena.alloc(Node::new(
        NodeKind::TemplateParamDecl,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::TemplateParamDecl(sema_ast::TemplateParam { name: Symbol::intern("T"), default: None }),
    ));
    let header = UserTypeHeader { parent_namespace: None, template_list: vec![template_param_decl] };
    let template = arena.alloc(Node::new(
        NodeKind::Template,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::Template { header, name: Symbol::intern("Box"), definition },
    ));

    let arg_kinds = [NodeKind::I32, NodeKind::F64, NodeKind::Bool, NodeKind::U8];
    let instances: Vec<NodeId> = arg_kinds
        .iter()
        .map(|&k| {
            let arg_ty = primitive(arena, k);
            arena.alloc(Node::new(
                NodeKind::TemplateInstance,
                NodeFlags::empty(),
                Span::dummy(),
                NodePayload::TemplateInstance {
                    header: UserTypeHeader::default(),
                    template,
                    arg_exprs: vec![arg_ty],
                    resolved: std::cell::Cell::new(None),
                },
            ))
        })
        .collect();
    (template, instances)
}

/// Wrap a `TemplateInstance` node as the target of a uniquely-named
/// `Typedef`, the only way `check_unit`'s public surface reaches
/// `check_type_ref`/`expand_template_instance` (section 4.F.0's
/// `Typedef` dispatch).
fn typedef_of(arena: &mut NodeArena, name: &str, target: NodeId) -> NodeId {
    arena.alloc(Node::new(
        NodeKind::Typedef,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::Typedef { name: Symbol::intern(name), header: UserTypeHeader::default(), target },
    ))
}

fn bench_template_instantiation_cache(c: &mut Criterion) {
    c.bench_function("template_instance_cache_hit_vs_miss", |b| {
        b.iter(|| {
            let mut arena = NodeArena::new();
            let (_template, instances) = make_box_template(&mut arena);
            // Each distinct argument misses the cache once; a second
            // `Typedef` naming the same instance node re-resolves it
            // through the already-checked fast path, and a third wraps a
            // *fresh* `TemplateInstance` node with identical args to hit
            // the instance cache proper rather than the per-node cache.
            let mut decls: Vec<NodeId> = instances
                .iter()
                .enumerate()
                .map(|(i, &inst)| typedef_of(&mut arena, &format!("first_{i}"), inst))
                .collect();
            for (i, &inst) in instances.iter().enumerate() {
                let fresh = arena_clone_instance(&mut arena, inst);
                decls.push(typedef_of(&mut arena, &format!("second_{i}"), fresh));
            }
            let unit = arena.alloc(Node::new(NodeKind::Unit, NodeFlags::empty(), Span::dummy(), NodePayload::Unit { decls }));

            let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "bench".to_string());
            ctx.check_unit(unit);
            black_box(ctx.diagnostics.len())
        })
    });
}

/// Clone a `TemplateInstance` node so the cache-hit path is exercised
/// against a *new* node id referencing the same `(template, args)` key,
/// matching how two use sites in real source would each get their own
/// node but resolve to the same cached instance.
fn arena_clone_instance(arena: &mut NodeArena, id: NodeId) -> NodeId {
    let (header, template, arg_exprs) = match &arena.get(id).payload {
        NodePayload::TemplateInstance { header, template, arg_exprs, .. } => (header.clone(), *template, arg_exprs.clone()),
        other => panic!("expected TemplateInstance, got {other:?}"),
    };
    arena.alloc(Node::new(
        NodeKind::TemplateInstance,
        NodeFlags::empty(),
        Span::dummy(),
        NodePayload::TemplateInstance { header, template, arg_exprs, resolved: std::cell::Cell::new(None) },
    ))
}

criterion_group!(checker_benches, bench_check_package_of_arith_funs, bench_template_instantiation_cache);
criterion_main!(checker_benches);
