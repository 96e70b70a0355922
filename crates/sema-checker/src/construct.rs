//! Call-as-type checking (section 4.F.3): construction and casts
//! reached through `Typecons` (`T(...)`) and through a `Call` whose
//! callee names a type rather than a function.
//!
//! Dispatches on the target type's shape rather than the call-site
//! syntax: a primitive target is a conversion, a struct target builds a
//! field map, an array/slice target checks element assignability.

use rustc_hash::FxHashMap;
use sema_ast::{BinaryOp, NodeId, NodeKind, NodePayload, Symbol};
use sema_common::diagnostics::codes;

use crate::context::CheckerContext;

impl<'a> CheckerContext<'a> {
    /// Check a construction/cast expression `id` whose `target` names a
    /// type and whose `args` are the parenthesized arguments.
    pub(crate) fn check_construction(&mut self, id: NodeId, target: NodeId, args: &[NodeId]) -> NodeId {
        match &self.arena.get(target).payload {
            NodePayload::Primitive(_) => self.check_primitive_construction(id, target, args),
            NodePayload::Struct { .. } => self.check_struct_construction(target, args),
            NodePayload::Array { .. } | NodePayload::Slice { .. } => self.check_array_construction(id, target, args),
            NodePayload::Alias { target: alias_target, .. } => {
                let alias_target = *alias_target;
                self.check_construction(id, alias_target, args)
            }
            NodePayload::TemplateInstance { resolved, .. } => match resolved.get() {
                Some(instance) => self.check_construction(id, instance, args),
                None => {
                    for &arg in args {
                        self.check_expr(arg);
                    }
                    target
                }
            },
            _ => {
                for &arg in args {
                    self.check_expr(arg);
                }
                target
            }
        }
    }

    /// A primitive target takes exactly one argument and converts it;
    /// convertibility is limited to same-family primitives (integer to
    /// integer, float to float) and identical types.
    fn check_primitive_construction(&mut self, id: NodeId, target: NodeId, args: &[NodeId]) -> NodeId {
        if args.len() != 1 {
            let expected = "1".to_string();
            let got = args.len().to_string();
            self.error_at_node_msg(id, codes::ARITY_MISMATCH, &[&expected, &got]);
            for &arg in args {
                self.check_expr(arg);
            }
            return target;
        }

        let arg = args[0];
        let arg_ty = self.check_expr(arg);
        if !primitive_convertible(self.arena.get(arg_ty).kind, self.arena.get(target).kind) {
            let from_name = format!("{:?}", self.arena.get(arg_ty).kind);
            let to_name = format!("{:?}", self.arena.get(target).kind);
            self.error_at_node_msg(id, codes::INVALID_CONVERSION, &[&from_name, &to_name]);
        }
        target
    }

    /// A struct target's arguments build a field map: a positional
    /// identifier shorthand (`Point(x, y)`, `x`/`y` named the same as a
    /// field) or a named initializer (parsed as `name = value`, reusing
    /// the assignment shape rather than a dedicated AST node). Duplicate
    /// and unknown field names are diagnosed; a field missing from the
    /// map is not an error (section 4.F.3: "default-initialised").
    fn check_struct_construction(&mut self, target: NodeId, args: &[NodeId]) -> NodeId {
        let fields = match &self.arena.get(target).payload {
            NodePayload::Struct { fields, .. } => fields.clone(),
            other => panic!("check_struct_construction called on non-Struct payload: {other:?}"),
        };

        let mut seen: FxHashMap<Symbol, ()> = FxHashMap::default();
        for &arg in args {
            let (field_name, value) = self.named_field_arg(arg);
            let Some(field_name) = field_name else {
                self.check_expr(arg);
                continue;
            };

            if seen.contains_key(&field_name) {
                self.error_at_node_msg(arg, codes::DUPLICATE_FIELD_INITIALIZER, &[field_name.as_str()]);
                self.check_expr(value);
                continue;
            }
            seen.insert(field_name.clone(), ());

            match fields.iter().find(|f| f.name == field_name).map(|f| f.type_node) {
                Some(field_ty) => {
                    let value_ty = self.check_expr_with_ctx(value, Some(field_ty));
                    if !self.types_compatible(value_ty, field_ty) {
                        self.report_unassignable(value, value_ty, field_ty);
                    }
                }
                None => {
                    self.check_expr(value);
                    let type_name = format!("{:?}", self.arena.get(target).kind);
                    self.error_at_node_msg(arg, codes::UNKNOWN_FIELD_INITIALIZER, &[&type_name, field_name.as_str()]);
                }
            }
        }
        target
    }

    /// Split a construction argument into a field name and its value
    /// expression, if it has one of the two shapes section 4.F.3
    /// allows: `name = value` (a named initializer) or a bare `Id`
    /// naming both the field and the local it shorthand-references.
    fn named_field_arg(&self, arg: NodeId) -> (Option<Symbol>, NodeId) {
        match &self.arena.get(arg).payload {
            NodePayload::BinOp { op: BinaryOp::Assign, lhs, rhs } => match &self.arena.get(*lhs).payload {
                NodePayload::Id { name, .. } => (Some(name.clone()), *rhs),
                _ => (None, arg),
            },
            NodePayload::Id { name, .. } => (Some(name.clone()), arg),
            _ => (None, arg),
        }
    }

    /// An array/slice target's arguments are positional elements;
    /// each must be assignable to the element type, and a sized array's
    /// argument count must match its length exactly.
    fn check_array_construction(&mut self, id: NodeId, target: NodeId, args: &[NodeId]) -> NodeId {
        let (elem, len) = match &self.arena.get(target).payload {
            NodePayload::Array { elem, len, .. } => (*elem, *len),
            NodePayload::Slice { elem, .. } => (*elem, None),
            other => panic!("check_array_construction called on non-Array/Slice payload: {other:?}"),
        };

        if let Some(len) = len {
            if args.len() as u64 != len {
                let expected = len.to_string();
                let got = args.len().to_string();
                self.error_at_node_msg(id, codes::ARITY_MISMATCH, &[&expected, &got]);
            }
        }

        for &arg in args {
            let arg_ty = self.check_expr_with_ctx(arg, Some(elem));
            if !self.types_compatible(arg_ty, elem) {
                self.report_unassignable(arg, arg_ty, elem);
            }
        }
        target
    }
}

fn primitive_convertible(from: NodeKind, to: NodeKind) -> bool {
    if from == to || from == NodeKind::Unknown || to == NodeKind::Unknown {
        return true;
    }
    is_integer_kind(from) && is_integer_kind(to) || is_float_kind(from) && is_float_kind(to)
}

fn is_integer_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::I8
            | NodeKind::I16
            | NodeKind::I32
            | NodeKind::I64
            | NodeKind::Int
            | NodeKind::U8
            | NodeKind::U16
            | NodeKind::U32
            | NodeKind::U64
            | NodeKind::Uint
    )
}

fn is_float_kind(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::F32 | NodeKind::F64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeArena, NodeFlags, StructField};
    use sema_common::{CheckerOptions, Span};

    fn alloc_primitive(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
        arena.alloc(Node::new(kind, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())))
    }

    #[test]
    fn primitive_cast_between_integers_is_allowed() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let i64_ty = alloc_primitive(&mut arena, NodeKind::I64);
        let lit = arena.alloc(Node::new(NodeKind::IntLiteral, NodeFlags::empty(), Span::dummy(), NodePayload::IntLiteral { text: "1".into(), value: 1 }));
        let id = arena.alloc(Node::new(NodeKind::Typecons, NodeFlags::empty(), Span::dummy(), NodePayload::Typecons { target: i64_ty, args: vec![lit] }));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let ty = ctx.check_construction(id, i64_ty, &[lit]);
        assert_eq!(ty, i64_ty);
        assert!(!ctx.reported_any_error);
        let _ = i32_ty;
    }

    #[test]
    fn struct_construction_reports_unknown_field() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let field = StructField::new(Symbol::intern("x"), i32_ty, NodeFlags::empty());
        let struct_ty = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::CHECKED,
            Span::dummy(),
            NodePayload::Struct { meta: Default::default(), header: Default::default(), name: Some(Symbol::intern("Point")), fields: vec![field] },
        ));
        let bogus_value = arena.alloc(Node::new(NodeKind::IntLiteral, NodeFlags::empty(), Span::dummy(), NodePayload::IntLiteral { text: "1".into(), value: 1 }));
        let bogus_name = arena.alloc(Node::new(NodeKind::Id, NodeFlags::empty(), Span::dummy(), NodePayload::Id { name: Symbol::intern("y"), resolved: Default::default() }));
        let named_arg = arena.alloc(Node::new(
            NodeKind::BinOp,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::BinOp { op: BinaryOp::Assign, lhs: bogus_name, rhs: bogus_value },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.check_struct_construction(struct_ty, &[named_arg]);
        assert!(ctx.reported_any_error);
    }
}
