//! Expression checking (section 4.F.1): identifier lookup, literal
//! promotion, operator checking (including the synthetic `OCHECK`
//! rewrite for `x == void` / `x != void`), call dispatch, member lookup,
//! and subscript bounds checking.
//!
//! Dispatches on `node.kind` to route to a per-kind checking function,
//! with call and member handling split into their own entry points.

use sema_ast::{BinaryOp, Node, NodeFlags, NodeId, NodeKind, NodePayload, Symbol, UnaryOp};
use sema_common::diagnostics::codes;

use crate::context::CheckerContext;
use crate::scope::Narrow;

impl<'a> CheckerContext<'a> {
    /// Check `id` with no contextual expected type.
    pub fn check_expr(&mut self, id: NodeId) -> NodeId {
        self.check_expr_with_ctx(id, None)
    }

    /// Check `id`, propagating `expected` as the context type used for
    /// literal promotion and result-type checks (section 4.F.1).
    pub(crate) fn check_expr_with_ctx(&mut self, id: NodeId, expected: Option<NodeId>) -> NodeId {
        if self.arena.get(id).is_checked() {
            return self.arena.get(id).resolved_type.get().unwrap_or(id);
        }

        if self.expr_depth >= self.options.max_expr_check_depth {
            tracing::warn!(depth = self.expr_depth, "expression check depth exceeded");
            let unknown = self.primitive_type(NodeKind::Unknown);
            self.arena.get(id).resolved_type.set(Some(unknown));
            self.arena.get(id).mark_checked();
            return unknown;
        }

        self.expr_depth += 1;
        self.enter_node(id);
        // `check_expr_inner` recurses through the native call stack one
        // frame per nested expression; `max_expr_check_depth` bounds how
        // deep that gets semantically, but a pathological tree can still
        // approach the default thread stack size before the counter
        // trips. Grow the stack in 1 MiB increments once within 32 KiB
        // of its end rather than bounding the guard on the depth counter
        // itself, which tracks AST depth, not frame size.
        let ty = stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.check_expr_inner(id, expected));
        self.exit_node();
        self.expr_depth -= 1;

        self.arena.get(id).resolved_type.set(Some(ty));
        self.arena.get(id).mark_checked();
        ty
    }

    fn check_expr_inner(&mut self, id: NodeId, expected: Option<NodeId>) -> NodeId {
        // Payload is matched by ref to read fixed-size fields; anything
        // needing further `&mut self` access is copied out first.
        match &self.arena.get(id).payload {
            NodePayload::BoolLiteral { .. } => self.primitive_type(NodeKind::Bool),

            NodePayload::IntLiteral { value, .. } => {
                let value = *value;
                self.check_int_literal(id, value, expected)
            }

            NodePayload::FloatLiteral { .. } => match expected.map(|e| self.arena.get(e).kind) {
                Some(NodeKind::F32) => expected.unwrap(),
                _ => self.primitive_type(NodeKind::F64),
            },

            NodePayload::StringLiteral { .. } => self.string_type(),

            NodePayload::ArrayLiteral { elements } => {
                let elements = elements.clone();
                self.check_array_literal(elements, expected)
            }

            NodePayload::Id { .. } => self.check_id(id),

            NodePayload::BinOp { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                self.check_binop(id, op, lhs, rhs)
            }

            NodePayload::PrefixUnary { op, operand } | NodePayload::PostfixUnary { op, operand } => {
                let (op, operand) = (*op, *operand);
                self.check_unary(id, op, operand)
            }

            NodePayload::Deref { operand } => {
                let operand = *operand;
                self.check_deref(id, operand)
            }

            NodePayload::Call { callee, args } => {
                let (callee, args) = (*callee, args.clone());
                self.check_call(id, callee, &args)
            }

            NodePayload::Typecons { target, args } => {
                let (target, args) = (*target, args.clone());
                self.check_type_ref(target);
                self.check_construction(id, target, &args)
            }

            NodePayload::Member { receiver, name, .. } => {
                let (receiver, name) = (*receiver, name.clone());
                self.check_member(id, receiver, &name)
            }

            NodePayload::Subscript { receiver, index } => {
                let (receiver, index) = (*receiver, *index);
                self.check_subscript(id, receiver, index)
            }

            NodePayload::If { cond, then_branch, else_branch } => {
                let (cond, then_branch, else_branch) = (*cond, *then_branch, *else_branch);
                self.check_if(cond, then_branch, else_branch, expected)
            }

            NodePayload::For { binding, iterable, cond, step, body } => {
                let (binding, iterable, cond, step, body) = (*binding, *iterable, *cond, *step, *body);
                self.check_for(binding, iterable, cond, step, body)
            }

            NodePayload::Return { value } => {
                let value = *value;
                self.check_return(value)
            }

            NodePayload::Block { stmts } => {
                let stmts = stmts.clone();
                self.check_block(&stmts, expected)
            }

            NodePayload::Let { .. } | NodePayload::Var { .. } => self.check_binding(id),

            NodePayload::Param { type_annotation, default, .. } => {
                let (type_annotation, default) = (*type_annotation, *default);
                self.check_type_ref(type_annotation);
                if let Some(default) = default {
                    self.check_expr_with_ctx(default, Some(type_annotation));
                }
                type_annotation
            }

            NodePayload::Field { type_annotation, default, .. } => {
                let (type_annotation, default) = (*type_annotation, *default);
                self.check_type_ref(type_annotation);
                if let Some(default) = default {
                    self.check_expr_with_ctx(default, Some(type_annotation));
                }
                type_annotation
            }

            _ => self.primitive_type(NodeKind::Void),
        }
    }

    fn check_int_literal(&mut self, id: NodeId, value: i128, expected: Option<NodeId>) -> NodeId {
        if let Some(expected) = expected {
            let kind = self.arena.get(expected).kind;
            if is_integer_kind(kind) {
                if !fits_in(kind, value) {
                    let text = value.to_string();
                    let ty_name = format!("{kind:?}");
                    self.error_at_node_msg(id, codes::INTEGER_LITERAL_OVERFLOW, &[&text, &ty_name]);
                }
                return expected;
            }
        }
        // Magnitude-based default (section 4.F.1): the smallest signed
        // type the literal fits in, widening from i32.
        if fits_in(NodeKind::I32, value) {
            self.primitive_type(NodeKind::I32)
        } else {
            self.primitive_type(NodeKind::I64)
        }
    }

    fn check_array_literal(&mut self, elements: Vec<NodeId>, expected: Option<NodeId>) -> NodeId {
        let elem_expected = expected.and_then(|e| match &self.arena.get(e).payload {
            NodePayload::Array { elem, .. } | NodePayload::Slice { elem, .. } => Some(*elem),
            _ => None,
        });
        let mut elem_ty = elem_expected;
        for &el in &elements {
            let ty = self.check_expr_with_ctx(el, elem_expected);
            if elem_ty.is_none() {
                elem_ty = Some(ty);
            }
        }
        let elem = elem_ty.unwrap_or_else(|| self.primitive_type(NodeKind::Unknown));
        let array_ty = self.arena.alloc(Node::new(
            NodeKind::Array,
            NodeFlags::CHECKED,
            sema_common::Span::dummy(),
            NodePayload::Array {
                meta: sema_ast::TypeMeta::default(),
                header: sema_ast::UserTypeHeader::default(),
                elem,
                len: Some(elements.len() as u64),
            },
        ));
        self.ensure_layout(array_ty);
        array_ty
    }

    fn check_id(&mut self, id: NodeId) -> NodeId {
        let name = match &self.arena.get(id).payload {
            NodePayload::Id { name, .. } => name.clone(),
            _ => unreachable!(),
        };
        let already = match &self.arena.get(id).payload {
            NodePayload::Id { resolved, .. } => resolved.get(),
            _ => unreachable!(),
        };
        let referent = match already {
            Some(r) => r,
            None => match self.scopes.lookup(&name) {
                Some(r) => {
                    if let NodePayload::Id { resolved, .. } = &self.arena.get(id).payload {
                        resolved.set(Some(r));
                    }
                    r
                }
                None => {
                    self.report_unknown_identifier(id, name.as_str());
                    return self.primitive_type(NodeKind::Unknown);
                }
            },
        };
        self.arena.get(referent).bump_use_count();

        let decl_ty = self.type_of_decl(referent);

        // An optional narrowed to `Yes` in the current condition reads
        // through a synthetic `ODEREF`, and the read site itself is
        // rewritten to that deref node (section 4.F.2: "reading an
        // optional whose current availability is YES is rewritten to a
        // synthetic ODEREF expression of element type T"). One narrowed
        // to `NO` diagnoses instead of reading at all.
        match self.scopes.narrow_of(referent) {
            Narrow::Yes => {
                if let NodePayload::Optional { inner, .. } = &self.arena.get(decl_ty).payload {
                    let inner = *inner;
                    let original = self.clone_narrowable_read(id, decl_ty);
                    return self.replace_with_unary_wrap(id, UnaryOp::ODeref, original, inner);
                }
                decl_ty
            }
            Narrow::No => {
                if matches!(self.arena.get(decl_ty).payload, NodePayload::Optional { .. }) {
                    self.report_optional_is_empty(id, decl_ty);
                }
                decl_ty
            }
            Narrow::Maybe => decl_ty,
        }
    }

    /// The type of a declaration node (a `Let`/`Var`/`Param`/`Field`/
    /// `Fun`), computing and caching it lazily if the declaration itself
    /// hasn't been checked yet (forward reference to a later top-level
    /// declaration, section 4.F.0).
    pub(crate) fn type_of_decl(&mut self, decl: NodeId) -> NodeId {
        match &self.arena.get(decl).payload {
            NodePayload::Fun { .. } => self.fun_type_of(decl),
            NodePayload::Let { .. } | NodePayload::Var { .. } | NodePayload::Param { .. } | NodePayload::Field { .. } => {
                if !self.arena.get(decl).is_checked() {
                    self.check_expr(decl);
                }
                self.arena.get(decl).resolved_type.get().unwrap_or(decl)
            }
            _ => decl,
        }
    }

    fn fun_type_of(&mut self, fun: NodeId) -> NodeId {
        if let Some(&ty) = self.fun_types.get(&fun) {
            return ty;
        }
        let (params, result) = match &self.arena.get(fun).payload {
            NodePayload::Fun { params, result, .. } => (params.clone(), *result),
            _ => unreachable!(),
        };
        let param_types: Vec<NodeId> = params.iter().map(|&p| self.type_of_decl(p)).collect();
        let ty = self.arena.alloc(Node::new(
            NodeKind::FunType,
            NodeFlags::CHECKED,
            sema_common::Span::dummy(),
            NodePayload::FunType {
                meta: sema_ast::TypeMeta::default(),
                header: sema_ast::UserTypeHeader::default(),
                params: param_types,
                result,
            },
        ));
        self.ensure_layout(ty);
        self.fun_types.insert(fun, ty);
        ty
    }

    fn string_type(&mut self) -> NodeId {
        let u8_ty = self.primitive_type(NodeKind::U8);
        let slice_ty = self.arena.alloc(Node::new(
            NodeKind::Slice,
            NodeFlags::CHECKED,
            sema_common::Span::dummy(),
            NodePayload::Slice {
                meta: sema_ast::TypeMeta::default(),
                header: sema_ast::UserTypeHeader::default(),
                elem: u8_ty,
            },
        ));
        self.ensure_layout(slice_ty);
        slice_ty
    }

    fn check_binop(&mut self, id: NodeId, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        if op == BinaryOp::Assign {
            return self.check_assign(id, lhs, rhs);
        }
        if op.is_logical() {
            return self.check_condition(id);
        }
        if op.is_equality() && self.arena.get(rhs).kind == NodeKind::Void {
            // `x == void` / `x != void`: rewrite into the synthetic
            // OCHECK optional-presence test (section 4.F.1). The `void`
            // operand is the primitive `Void` type node used directly
            // as an expression; it carries no value to check.
            return self.rewrite_void_comparison(id, op, lhs);
        }

        let lhs_ty = self.check_expr(lhs);
        let rhs_ty = self.check_expr_with_ctx(rhs, Some(lhs_ty));

        if op.is_comparison() {
            if !self.types_compatible(lhs_ty, rhs_ty) {
                self.report_incompatible(id, lhs_ty, rhs_ty);
            }
            return self.primitive_type(NodeKind::Bool);
        }

        if !self.types_compatible(lhs_ty, rhs_ty) {
            self.report_incompatible(id, lhs_ty, rhs_ty);
        }
        lhs_ty
    }

    fn rewrite_void_comparison(&mut self, id: NodeId, op: BinaryOp, storage: NodeId) -> NodeId {
        self.check_expr(storage);
        let bool_ty = self.primitive_type(NodeKind::Bool);
        let span = self.arena.get(id).span;

        // `x != void` means *present*: the OCHECK test directly.
        // `x == void` means *absent*: negate it.
        let payload = if op == BinaryOp::Eq {
            let ocheck = self.arena.alloc(Node::new(
                NodeKind::PrefixUnary,
                NodeFlags::CHECKED,
                span,
                NodePayload::PrefixUnary { op: UnaryOp::OCheck, operand: storage },
            ));
            self.arena.get(ocheck).resolved_type.set(Some(bool_ty));
            NodePayload::PrefixUnary { op: UnaryOp::Not, operand: ocheck }
        } else {
            NodePayload::PrefixUnary { op: UnaryOp::OCheck, operand: storage }
        };

        self.arena.replace(id, Node::new(NodeKind::PrefixUnary, NodeFlags::CHECKED, span, payload));
        self.arena.get(id).resolved_type.set(Some(bool_ty));
        bool_ty
    }

    fn check_assign(&mut self, id: NodeId, lhs: NodeId, rhs: NodeId) -> NodeId {
        if !self.storage_is_mutable(lhs) {
            self.error_at_node(
                id,
                codes::MUTABILITY_VIOLATION,
                sema_common::diagnostics::format_message(
                    sema_common::diagnostics::get_message_template(codes::MUTABILITY_VIOLATION).unwrap(),
                    &[],
                ),
            );
        }
        let lhs_ty = self.check_expr(lhs);
        let rhs_ty = self.check_expr_with_ctx(rhs, Some(lhs_ty));
        if !self.types_compatible(lhs_ty, rhs_ty) {
            self.report_unassignable(id, rhs_ty, lhs_ty);
        }
        lhs_ty
    }

    fn check_unary(&mut self, id: NodeId, op: UnaryOp, operand: NodeId) -> NodeId {
        match op {
            UnaryOp::Addr => {
                let inner = self.check_expr(operand);
                let reference = self.arena.alloc(Node::new(
                    NodeKind::Reference,
                    NodeFlags::CHECKED,
                    sema_common::Span::dummy(),
                    NodePayload::Reference {
                        meta: sema_ast::TypeMeta::default(),
                        header: sema_ast::UserTypeHeader::default(),
                        referent: inner,
                    },
                ));
                self.ensure_layout(reference);
                reference
            }
            UnaryOp::MutAddr => {
                if !self.storage_is_mutable(operand) {
                    self.error_at_node_msg(id, codes::MUTABILITY_VIOLATION, &[]);
                }
                let inner = self.check_expr(operand);
                let reference = self.arena.alloc(Node::new(
                    NodeKind::MutReference,
                    NodeFlags::CHECKED,
                    sema_common::Span::dummy(),
                    NodePayload::MutReference { meta: sema_ast::TypeMeta::default(), referent: inner },
                ));
                self.ensure_layout(reference);
                reference
            }
            UnaryOp::Not => {
                self.check_expr(operand);
                self.primitive_type(NodeKind::Bool)
            }
            UnaryOp::Neg | UnaryOp::BitNot => self.check_expr(operand),
            UnaryOp::PreIncr | UnaryOp::PreDecr | UnaryOp::PostIncr | UnaryOp::PostDecr => {
                if !self.storage_is_mutable(operand) {
                    self.error_at_node_msg(id, codes::MUTABILITY_VIOLATION, &[]);
                }
                self.check_expr(operand)
            }
            UnaryOp::OCheck | UnaryOp::ODeref => {
                // Synthetic: only ever installed by the checker itself,
                // already typed at construction time.
                self.arena.get(id).resolved_type.get().unwrap_or(operand)
            }
        }
    }

    fn check_deref(&mut self, id: NodeId, operand: NodeId) -> NodeId {
        let ty = self.check_expr(operand);
        match &self.arena.get(ty).payload {
            NodePayload::Pointer { pointee, .. } => *pointee,
            NodePayload::Reference { referent, .. } | NodePayload::MutReference { referent, .. } => *referent,
            _ => {
                let ty_name = format!("{:?}", self.arena.get(ty).kind);
                self.error_at_node_msg(id, codes::DEREF_NON_POINTER, &[&ty_name]);
                self.primitive_type(NodeKind::Unknown)
            }
        }
    }

    fn check_subscript(&mut self, id: NodeId, receiver: NodeId, index: NodeId) -> NodeId {
        let receiver_ty = self.check_expr(receiver);
        let index_ty = self.check_expr(index);
        let _ = index_ty;

        let (elem, len) = match &self.arena.get(receiver_ty).payload {
            NodePayload::Array { elem, len, .. } => (*elem, *len),
            NodePayload::Slice { elem, .. } => (*elem, None),
            _ => return self.primitive_type(NodeKind::Unknown),
        };

        if let (Some(len), NodePayload::IntLiteral { value, .. }) = (len, &self.arena.get(index).payload) {
            let value = *value;
            if value < 0 || value as u64 >= len {
                let idx_text = value.to_string();
                let len_text = len.to_string();
                self.error_at_node_msg(id, codes::OUT_OF_BOUNDS_CONSTANT, &[&idx_text, &len_text]);
            }
        }
        elem
    }

    fn check_call(&mut self, id: NodeId, callee: NodeId, args: &[NodeId]) -> NodeId {
        // Evaluate the callee first: an `Id` naming a type (struct,
        // alias, template, primitive) dispatches to construction rather
        // than a function call (section 4.F.1/4.F.3).
        if let NodePayload::Id { name, resolved } = &self.arena.get(callee).payload {
            let name = name.clone();
            let already = resolved.get();
            let target = already.or_else(|| self.scopes.lookup(&name));
            if let Some(target) = target {
                if self.is_type_decl(target) {
                    self.check_type_ref(target);
                    return self.check_construction(id, target, args);
                }
            }
        }

        let callee_ty = self.check_expr(callee);
        let (param_types, result) = match &self.arena.get(callee_ty).payload {
            NodePayload::FunType { params, result, .. } => (params.clone(), *result),
            _ => {
                let ty_name = format!("{:?}", self.arena.get(callee_ty).kind);
                self.error_at_node_msg(id, codes::NO_SUCH_OPERATOR, &["()", &ty_name]);
                return self.primitive_type(NodeKind::Unknown);
            }
        };

        if param_types.len() != args.len() {
            let expected = param_types.len().to_string();
            let got = args.len().to_string();
            self.error_at_node_msg(id, codes::ARITY_MISMATCH, &[&expected, &got]);
        }
        for (i, &arg) in args.iter().enumerate() {
            let expected = param_types.get(i).copied();
            self.check_expr_with_ctx(arg, expected);
        }
        result
    }

    fn check_member(&mut self, id: NodeId, receiver: NodeId, name: &Symbol) -> NodeId {
        let receiver_ty = self.check_expr(receiver);
        let unwrapped = self.unwrap_to_struct(receiver_ty);

        let Some(struct_ty) = unwrapped else {
            if matches!(self.arena.get(receiver_ty).payload, NodePayload::Optional { .. }) {
                let ty_name = format!("{:?}", self.arena.get(receiver_ty).kind);
                self.error_at_node_msg(id, codes::ACCESS_THROUGH_UNCHECKED_OPTIONAL, &[name.as_str(), &ty_name]);
            } else {
                let ty_name = format!("{:?}", self.arena.get(receiver_ty).kind);
                self.error_at_node_msg(id, codes::NO_SUCH_MEMBER, &[&ty_name, name.as_str()]);
            }
            return self.primitive_type(NodeKind::Unknown);
        };

        let field_ty = match &self.arena.get(struct_ty).payload {
            NodePayload::Struct { fields, .. } => fields.iter().find(|f| &f.name == name).map(|f| f.type_node),
            _ => None,
        };
        match field_ty {
            Some(ty) => {
                if let NodePayload::Member { resolved, .. } = &self.arena.get(id).payload {
                    resolved.set(Some(struct_ty));
                }
                let storage = self.storage_of(id);
                if let Some(storage) = storage {
                    match self.scopes.narrow_of(storage) {
                        Narrow::Yes => {
                            if let NodePayload::Optional { inner, .. } = &self.arena.get(ty).payload {
                                let inner = *inner;
                                let original = self.clone_narrowable_read(id, ty);
                                return self.replace_with_unary_wrap(id, UnaryOp::ODeref, original, inner);
                            }
                        }
                        Narrow::No => {
                            if matches!(self.arena.get(ty).payload, NodePayload::Optional { .. }) {
                                self.report_optional_is_empty(id, ty);
                            }
                        }
                        Narrow::Maybe => {}
                    }
                }
                ty
            }
            None => {
                let ty_name = format!("{:?}", self.arena.get(struct_ty).kind);
                self.error_at_node_msg(id, codes::NO_SUCH_MEMBER, &[&ty_name, name.as_str()]);
                self.primitive_type(NodeKind::Unknown)
            }
        }
    }

    /// Unwrap alias/reference/pointer layers (but *not* optional —
    /// accessing a member through an optional requires it be narrowed
    /// first) down to the underlying `Struct` type node, if any.
    fn unwrap_to_struct(&mut self, mut ty: NodeId) -> Option<NodeId> {
        for _ in 0..self.options.max_alias_resolution_depth {
            match &self.arena.get(ty).payload {
                NodePayload::Struct { .. } => return Some(ty),
                NodePayload::Alias { target, .. } => ty = *target,
                NodePayload::Reference { referent, .. } | NodePayload::MutReference { referent, .. } => ty = *referent,
                NodePayload::Pointer { pointee, .. } => ty = *pointee,
                _ => return None,
            }
        }
        None
    }

    fn check_if(&mut self, cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId>, expected: Option<NodeId>) -> NodeId {
        // The condition is checked inside the then-branch's scope, not
        // before it, so an `if let x = e` binding lives only as long as
        // the then-branch (section 4.F.2: narrow-info and any binding it
        // installs never outlive the scope that introduced them).
        self.push_scope();
        self.check_condition(cond);
        self.apply_narrowing(cond, true);
        let then_ty = self.check_expr_with_ctx(then_branch, expected);
        self.pop_scope();

        match else_branch {
            Some(else_branch) => {
                self.push_scope();
                self.apply_narrowing(cond, false);
                let else_ty = self.check_expr_with_ctx(else_branch, expected.or(Some(then_ty)));
                self.pop_scope();
                if !self.types_compatible(then_ty, else_ty) {
                    self.report_incompatible(else_branch, then_ty, else_ty);
                }
                then_ty
            }
            None => self.primitive_type(NodeKind::Void),
        }
    }

    fn check_for(&mut self, binding: Option<NodeId>, iterable: Option<NodeId>, cond: Option<NodeId>, step: Option<NodeId>, body: NodeId) -> NodeId {
        self.push_scope();
        if let Some(binding) = binding {
            self.check_expr(binding);
        }
        if let Some(iterable) = iterable {
            self.check_expr(iterable);
        }
        if let Some(cond) = cond {
            self.check_condition(cond);
        }
        if let Some(step) = step {
            self.check_expr(step);
        }
        self.check_expr(body);
        self.pop_scope();
        self.primitive_type(NodeKind::Void)
    }

    fn check_return(&mut self, value: Option<NodeId>) -> NodeId {
        let expected = self.current_result_type();
        match value {
            Some(value) => {
                let ty = self.check_expr_with_ctx(value, expected);
                if let Some(expected) = expected {
                    if !self.types_compatible(ty, expected) {
                        self.report_unassignable(value, ty, expected);
                    }
                }
            }
            None => {
                if let Some(expected) = expected {
                    if self.arena.get(expected).kind != NodeKind::Void {
                        self.error_at_current_node(
                            codes::TYPE_MISMATCH,
                            sema_common::diagnostics::format_message(
                                sema_common::diagnostics::get_message_template(codes::TYPE_MISMATCH).unwrap(),
                                &["void", &format!("{:?}", self.arena.get(expected).kind)],
                            ),
                        );
                    }
                }
            }
        }
        self.primitive_type(NodeKind::Void)
    }

    fn check_block(&mut self, stmts: &[NodeId], expected: Option<NodeId>) -> NodeId {
        self.push_scope();
        let mut result = self.primitive_type(NodeKind::Void);
        for (i, &stmt) in stmts.iter().enumerate() {
            let is_last = i + 1 == stmts.len();
            result = if is_last {
                self.check_expr_with_ctx(stmt, expected)
            } else {
                self.check_expr(stmt)
            };
        }
        self.pop_scope();
        result
    }

    fn check_binding(&mut self, id: NodeId) -> NodeId {
        let (name, type_annotation, init, mutable) = match &self.arena.get(id).payload {
            NodePayload::Let { name, type_annotation, init } => (name.clone(), *type_annotation, Some(*init), false),
            NodePayload::Var { name, type_annotation, init, mutable } => (name.clone(), *type_annotation, *init, *mutable),
            _ => unreachable!(),
        };
        let _ = mutable;

        if let Some(ty) = type_annotation {
            self.check_type_ref(ty);
        }
        let ty = match (type_annotation, init) {
            (Some(ty), Some(init)) => {
                let init_ty = self.check_expr_with_ctx(init, Some(ty));
                if !self.types_compatible(init_ty, ty) {
                    self.report_unassignable(init, init_ty, ty);
                }
                ty
            }
            (Some(ty), None) => ty,
            (None, Some(init)) => self.check_expr(init),
            (None, None) => self.primitive_type(NodeKind::Unknown),
        };

        self.scopes.declare(name, id);
        self.scopes.set_narrow(id, Narrow::Maybe);
        ty
    }

    fn is_type_decl(&self, node: NodeId) -> bool {
        matches!(
            self.arena.get(node).payload,
            NodePayload::Struct { .. }
                | NodePayload::Alias { .. }
                | NodePayload::Template { .. }
                | NodePayload::TemplateInstance { .. }
                | NodePayload::Primitive(_)
        )
    }

    /// Whether `expr`'s referent may be written to: only a mutable `Var`
    /// binding or a `Param` marked `mut` (the shared `storage-of` rule,
    /// section 4.F.2, reused here for assignment/`&mut`/increment
    /// checking per the design note that mutability and narrowing share
    /// one notion of "storage").
    pub(crate) fn storage_is_mutable(&mut self, expr: NodeId) -> bool {
        match self.storage_of(expr) {
            Some(storage) => match &self.arena.get(storage).payload {
                NodePayload::Var { mutable, .. } => *mutable,
                NodePayload::Param { mutable, .. } => *mutable,
                _ => false,
            },
            None => false,
        }
    }

    /// Resolve `expr` to the declaration node it ultimately reads from,
    /// if it names one directly (an `Id`) or through member/deref chains
    /// that preserve storage identity. Returns `None` for anything that
    /// isn't an addressable location (a literal, a call result, ...).
    pub(crate) fn storage_of(&mut self, expr: NodeId) -> Option<NodeId> {
        match &self.arena.get(expr).payload {
            NodePayload::Id { resolved, name } => match resolved.get() {
                Some(r) => Some(r),
                None => {
                    let name = name.clone();
                    self.scopes.lookup(&name)
                }
            },
            NodePayload::Deref { operand } => {
                let operand = *operand;
                self.storage_of(operand)
            }
            NodePayload::Member { receiver, .. } => {
                let receiver = *receiver;
                self.storage_of(receiver)
            }
            _ => None,
        }
    }

    pub(crate) fn types_compatible(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let (ka, kb) = (self.arena.get(a).kind, self.arena.get(b).kind);
        if ka == NodeKind::Unknown || kb == NodeKind::Unknown {
            return true;
        }
        ka == kb
    }

    pub(crate) fn report_incompatible(&mut self, node: NodeId, a: NodeId, b: NodeId) {
        let a_name = format!("{:?}", self.arena.get(a).kind);
        let b_name = format!("{:?}", self.arena.get(b).kind);
        self.error_at_node_msg(node, codes::INCOMPATIBLE_TYPES, &[&a_name, &b_name]);
    }

    pub(crate) fn report_unassignable(&mut self, node: NodeId, from: NodeId, to: NodeId) {
        let from_name = format!("{:?}", self.arena.get(from).kind);
        let to_name = format!("{:?}", self.arena.get(to).kind);
        self.error_at_node_msg(node, codes::UNASSIGNABLE_TYPE, &[&from_name, &to_name]);
    }
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

fn fits_in(kind: NodeKind, value: i128) -> bool {
    match kind {
        NodeKind::I8 => i8::try_from(value).is_ok(),
        NodeKind::I16 => i16::try_from(value).is_ok(),
        NodeKind::I32 | NodeKind::Int => i32::try_from(value).is_ok(),
        NodeKind::I64 => i64::try_from(value).is_ok(),
        NodeKind::U8 => u8::try_from(value).is_ok(),
        NodeKind::U16 => u16::try_from(value).is_ok(),
        NodeKind::U32 | NodeKind::Uint => u32::try_from(value).is_ok(),
        NodeKind::U64 => u64::try_from(value).is_ok(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::NodeArena;
    use sema_common::{CheckerOptions, Span};

    fn alloc(arena: &mut NodeArena, kind: NodeKind, payload: NodePayload) -> NodeId {
        arena.alloc(Node::new(kind, NodeFlags::empty(), Span::dummy(), payload))
    }

    /// Section 8 scenario 1: `let x i32 = 3` — an untyped int literal
    /// bound by an explicit annotation takes that annotation's type.
    #[test]
    fn let_with_explicit_annotation_types_the_initializer() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.alloc(Node::new(NodeKind::I32, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let init = alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "3".to_string(), value: 3 });
        let let_node = alloc(
            &mut arena,
            NodeKind::Let,
            NodePayload::Let { name: Symbol::intern("x"), type_annotation: Some(i32_ty), init },
        );
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        let ty = ctx.check_expr(let_node);
        ctx.pop_scope();
        assert_eq!(ty, i32_ty);
        assert!(!ctx.reported_any_error);
    }

    /// An untyped int literal with no context defaults to `i32` when it
    /// fits, widening to `i64` only once it doesn't.
    #[test]
    fn untyped_int_literal_defaults_to_i32_then_widens() {
        let mut arena = NodeArena::new();
        let small = alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "3".to_string(), value: 3 });
        let huge_value = i128::from(i64::MAX);
        let huge = alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: huge_value.to_string(), value: huge_value });
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let small_ty = ctx.check_expr(small);
        let huge_ty = ctx.check_expr(huge);
        assert_eq!(ctx.arena.get(small_ty).kind, NodeKind::I32);
        assert_eq!(ctx.arena.get(huge_ty).kind, NodeKind::I64);
    }

    /// Section 8 scenario 6: indexing a fixed-size array with a constant
    /// index at or past its length is an `OUT_OF_BOUNDS_CONSTANT` error.
    #[test]
    fn constant_subscript_past_array_length_is_rejected() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.alloc(Node::new(NodeKind::I32, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let elements = vec![
            alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "1".to_string(), value: 1 }),
            alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "2".to_string(), value: 2 }),
        ];
        let array_lit = alloc(&mut arena, NodeKind::ArrayLiteral, NodePayload::ArrayLiteral { elements });
        let index = alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "2".to_string(), value: 2 });
        let subscript = alloc(&mut arena, NodeKind::Subscript, NodePayload::Subscript { receiver: array_lit, index });
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let _ = i32_ty;
        ctx.check_expr(subscript);
        assert!(ctx.reported_any_error);
        assert!(ctx.diagnostics.iter().any(|d| d.code == codes::OUT_OF_BOUNDS_CONSTANT));
    }

    /// An array literal's synthesized `Array` type node has its own
    /// layout populated (element type times element count) rather than
    /// being left with a zeroed `TypeMeta`.
    #[test]
    fn array_literal_type_has_its_layout_computed() {
        let mut arena = NodeArena::new();
        let elements = vec![
            alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "1".to_string(), value: 1 }),
            alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "2".to_string(), value: 2 }),
            alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "3".to_string(), value: 3 }),
        ];
        let array_lit = alloc(&mut arena, NodeKind::ArrayLiteral, NodePayload::ArrayLiteral { elements });
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let ty = ctx.check_expr(array_lit);
        match &ctx.arena.get(ty).payload {
            NodePayload::Array { meta, len, .. } => {
                assert_eq!(*len, Some(3));
                assert_eq!(meta.size.get(), 12);
                assert_eq!(meta.align.get(), 4);
            }
            other => panic!("expected Array, got {other:?}"),
        }
    }

    /// Assigning through an immutable `Var` binding reports
    /// `MUTABILITY_VIOLATION` but still type-checks both sides.
    #[test]
    fn assigning_to_an_immutable_var_is_rejected() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.alloc(Node::new(NodeKind::I32, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let init = alloc(&mut arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "1".to_string(), value: 1 });
        let var_node = alloc(
            &mut arena,
            NodeKind::Var,
            NodePayload::Var { name: Symbol::intern("x"), type_annotation: Some(i32_ty), init: Some(init), mutable: false },
        );
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.check_expr(var_node);
        let id_node = alloc(&mut ctx.arena, NodeKind::Id, NodePayload::Id { name: Symbol::intern("x"), resolved: Default::default() });
        let rhs = alloc(&mut ctx.arena, NodeKind::IntLiteral, NodePayload::IntLiteral { text: "2".to_string(), value: 2 });
        let assign = alloc(&mut ctx.arena, NodeKind::BinOp, NodePayload::BinOp { op: BinaryOp::Assign, lhs: id_node, rhs });
        ctx.check_expr(assign);
        ctx.pop_scope();
        assert!(ctx.diagnostics.iter().any(|d| d.code == codes::MUTABILITY_VIOLATION));
    }

    /// `x != void` rewrites into the synthetic `OCHECK` presence test
    /// (section 4.F.1).
    #[test]
    fn not_equal_void_rewrites_to_ocheck() {
        let mut arena = NodeArena::new();
        let inner = arena.alloc(Node::new(NodeKind::I32, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let opt_ty = arena.alloc(Node::new(
            NodeKind::Optional,
            NodeFlags::CHECKED,
            Span::dummy(),
            NodePayload::Optional { meta: Default::default(), header: Default::default(), inner },
        ));
        let init = alloc(&mut arena, NodeKind::BoolLiteral, NodePayload::BoolLiteral { value: true });
        let storage = alloc(
            &mut arena,
            NodeKind::Let,
            NodePayload::Let { name: Symbol::intern("x"), type_annotation: Some(opt_ty), init },
        );
        let void_node = arena.alloc(Node::new(NodeKind::Void, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let cmp = alloc(&mut arena, NodeKind::BinOp, NodePayload::BinOp { op: BinaryOp::Ne, lhs: storage, rhs: void_node });
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.check_expr(cmp);
        ctx.pop_scope();
        assert!(matches!(ctx.arena.get(cmp).payload, NodePayload::PrefixUnary { op: UnaryOp::OCheck, .. }));
    }
}
