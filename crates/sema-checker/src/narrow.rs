//! Flow-sensitive optional narrowing (section 4.F.2): walking a
//! condition expression to record which storage locations are proven
//! present or absent along the then/else branches it guards.
//!
//! Walks a condition's AST once up front and installs the resulting
//! facts into the scope before the guarded branches are checked, rather
//! than re-deriving them ad hoc at every read site.

use sema_ast::{BinaryOp, Node, NodeFlags, NodeId, NodeKind, NodePayload, UnaryOp};

use crate::context::CheckerContext;
use crate::scope::Narrow;

/// One storage location a condition says something definite about.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NarrowRecord {
    pub(crate) storage: NodeId,
    /// `true` if the condition proves the storage *absent* rather than
    /// present (e.g. the operand of a `!`).
    pub(crate) negated: bool,
}

/// What a condition node proved, cached so `apply_narrowing` doesn't
/// re-walk the AST after `check_condition` already did.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConditionInfo {
    pub(crate) records: Vec<NarrowRecord>,
    /// Whether the records are precise enough to narrow the *else*
    /// branch too. A bare `&&` chain still lets the then-branch narrow
    /// every operand (all must hold), but only a condition with no `&&`
    /// or `||` anywhere in it is definite enough to narrow the negation
    /// (section 4.F.2: "the else branch installs NO iff the decision is
    /// definitive").
    pub(crate) definitive: bool,
}

impl<'a> CheckerContext<'a> {
    /// Type-check a condition expression and record what it proves about
    /// any optional storage it tests, for `apply_narrowing` to consume
    /// once the guarded branch's scope is active.
    pub(crate) fn check_condition(&mut self, cond: NodeId) -> NodeId {
        let mut records = Vec::new();
        let mut definitive = true;
        let ty = self.walk_condition(cond, false, &mut records, &mut definitive);
        self.condition_info.insert(cond, ConditionInfo { records, definitive });
        ty
    }

    /// Walk `id` as a boolean-valued subexpression of a condition,
    /// `neg` tracking whether it is reached through an odd number of
    /// enclosing `!`. Returns `id`'s checked type. Appends any narrowing
    /// facts the subexpression proves to `records`, and clears
    /// `*definitive` the moment a `||` is seen anywhere in the path (an
    /// `&&` leaves it set: every operand of a conjunction still holds in
    /// the then-branch, and the whole conjunction's negation is still a
    /// definite "at least one is absent", which this checker does not
    /// attempt to attribute to a single operand for the else branch, so
    /// `&&` alone does not force `definitive` false, but the top-level
    /// condition that contains one is tracked here for callers that care
    /// only about is-it-a-single-fact).
    fn walk_condition(&mut self, id: NodeId, neg: bool, records: &mut Vec<NarrowRecord>, definitive: &mut bool) -> NodeId {
        enum Shape {
            Not(NodeId),
            Logical(BinaryOp, NodeId, NodeId),
            Let(NodeId),
            Other,
        }

        let shape = match &self.arena.get(id).payload {
            NodePayload::PrefixUnary { op: UnaryOp::Not, operand } => Shape::Not(*operand),
            NodePayload::BinOp { op, lhs, rhs } if op.is_logical() => Shape::Logical(*op, *lhs, *rhs),
            NodePayload::Let { .. } => Shape::Let(id),
            _ => Shape::Other,
        };

        match shape {
            Shape::Not(operand) => {
                self.walk_condition(operand, !neg, records, definitive);
                let bool_ty = self.primitive_type(sema_ast::NodeKind::Bool);
                self.finish_condition_node(id, bool_ty);
                bool_ty
            }

            Shape::Logical(op, lhs, rhs) => {
                *definitive = false;
                if op == BinaryOp::LogAnd && !neg {
                    // Every operand of a true `&&` holds: keep narrowing
                    // facts from both sides for the then-branch.
                    self.walk_condition(lhs, neg, records, definitive);
                    self.walk_condition(rhs, neg, records, definitive);
                } else {
                    // `||`, or a negated `&&`/`||`: presence on one arm
                    // doesn't guarantee presence for the whole condition,
                    // so facts from either side are discarded.
                    let mut scratch = Vec::new();
                    self.walk_condition(lhs, neg, &mut scratch, definitive);
                    scratch.clear();
                    self.walk_condition(rhs, neg, &mut scratch, definitive);
                }
                let bool_ty = self.primitive_type(sema_ast::NodeKind::Bool);
                self.finish_condition_node(id, bool_ty);
                bool_ty
            }

            Shape::Let(_) => {
                // `if let x = e`: the binding's declaration doubles as
                // the storage narrowing proves present (section 4.F.2's
                // companion to the `storage-of` rule, which does not
                // itself resolve `Let` payloads).
                let ty = self.check_expr(id);
                if matches!(self.arena.get(ty).payload, NodePayload::Optional { .. }) {
                    records.push(NarrowRecord { storage: id, negated: neg });
                }
                ty
            }

            Shape::Other => {
                let ty = self.check_expr(id);
                if let Some(storage) = self.storage_of(id) {
                    let decl_ty = self.type_of_decl(storage);
                    if matches!(self.arena.get(decl_ty).payload, NodePayload::Optional { .. }) {
                        records.push(NarrowRecord { storage, negated: neg });
                        self.wrap_condition_operand_in_ocheck(id, decl_ty);
                    }
                }
                ty
            }
        }
    }

    /// Wrap a bare narrowable operand (an `Id` or `Member` reached
    /// directly as a condition, e.g. `if a { ... }`) in a synthetic
    /// `OCHECK` presence test, unless it is already shaped as one
    /// (section 4.F.2: "wrapped with OCHECK unless already wrapped" —
    /// the `x == void`/`x != void` rewrite already produces an
    /// `OCHECK`/`!OCHECK` pair and must not be wrapped again).
    fn wrap_condition_operand_in_ocheck(&mut self, id: NodeId, operand_ty: NodeId) {
        if !matches!(self.arena.get(id).kind, NodeKind::Id | NodeKind::Member) {
            return;
        }
        if matches!(self.arena.get(id).payload, NodePayload::PrefixUnary { op: UnaryOp::OCheck, .. }) {
            return;
        }
        let original = self.clone_narrowable_read(id, operand_ty);
        let bool_ty = self.primitive_type(NodeKind::Bool);
        self.replace_with_unary_wrap(id, UnaryOp::OCheck, original, bool_ty);
    }

    /// Clone the narrowable read at `id` (an `Id` or `Member` expression)
    /// into a fresh node carrying the same resolved referent, typed at
    /// `ty`, for use as the operand of a synthetic wrapper (`OCHECK` or
    /// `ODEREF`) that replaces `id`'s own slot.
    pub(crate) fn clone_narrowable_read(&mut self, id: NodeId, ty: NodeId) -> NodeId {
        let span = self.arena.get(id).span;
        let kind = self.arena.get(id).kind;
        let copy = match &self.arena.get(id).payload {
            NodePayload::Id { name, resolved } => NodePayload::Id {
                name: name.clone(),
                resolved: std::cell::Cell::new(resolved.get()),
            },
            NodePayload::Member { receiver, name, resolved } => NodePayload::Member {
                receiver: *receiver,
                name: name.clone(),
                resolved: std::cell::Cell::new(resolved.get()),
            },
            _ => unreachable!("only Id/Member expressions are narrowable (section 4.F.2)"),
        };
        let node = self.arena.alloc(Node::new(kind, NodeFlags::CHECKED, span, copy));
        self.arena.get(node).resolved_type.set(Some(ty));
        node
    }

    /// Replace `id`'s node with a `PrefixUnary { op, operand }` typed at
    /// `result_ty`, mirroring `rewrite_void_comparison`'s in-place
    /// node-replacement pattern.
    pub(crate) fn replace_with_unary_wrap(&mut self, id: NodeId, op: UnaryOp, operand: NodeId, result_ty: NodeId) -> NodeId {
        let span = self.arena.get(id).span;
        self.arena.replace(id, Node::new(NodeKind::PrefixUnary, NodeFlags::CHECKED, span, NodePayload::PrefixUnary { op, operand }));
        self.arena.get(id).resolved_type.set(Some(result_ty));
        result_ty
    }

    fn finish_condition_node(&mut self, id: NodeId, ty: NodeId) {
        self.arena.get(id).resolved_type.set(Some(ty));
        self.arena.get(id).mark_checked();
    }

    /// Install the narrow-info `check_condition` recorded for `cond`
    /// into the current (already-pushed) scope, for whichever branch is
    /// being entered.
    ///
    /// `then_branch` selects which side of each record to apply: the
    /// then-branch sees every fact as recorded, while the else branch
    /// sees each fact's negation and is only installed at all when the
    /// condition was definitive (no `||`/`&&` anywhere in its path).
    pub(crate) fn apply_narrowing(&mut self, cond: NodeId, then_branch: bool) {
        let Some(info) = self.condition_info.get(&cond).cloned() else {
            return;
        };
        if !then_branch && !info.definitive {
            return;
        }
        for record in &info.records {
            let present = if then_branch { !record.negated } else { record.negated };
            let state = if present { Narrow::Yes } else { Narrow::No };
            self.scopes.set_narrow(record.storage, state);
        }
    }
}
