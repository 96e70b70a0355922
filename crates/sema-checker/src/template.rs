//! Template expansion (section 4.F.5): resolving a `TemplateInstance`
//! type reference to a concrete clone of its template's definition,
//! substituting each parameter placeholder for its argument.
//!
//! Follows an evaluate-arguments / consult-cache / insert-before-check /
//! substitute sequence. Substitution itself is `sema_template`'s
//! `transform_tree` (component E); this module only decides *when* to
//! instantiate and what counts as a valid argument.

use sema_ast::{NodeFlags, NodeId, NodeKind, NodePayload, Symbol, TypeIdHandle};
use sema_common::diagnostics::codes;
use sema_template::{instance_key, transform_tree};

use crate::context::CheckerContext;

impl<'a> CheckerContext<'a> {
    /// Resolve `type_node` (a `TemplateInstance` payload) to its
    /// instantiation, expanding it on first use and reusing the cached
    /// instance on every later reference with pointer-equal argument
    /// typeids.
    pub(crate) fn expand_template_instance(&mut self, type_node: NodeId) {
        let (template, arg_exprs, already) = match &self.arena.get(type_node).payload {
            NodePayload::TemplateInstance { template, arg_exprs, resolved, .. } => (*template, arg_exprs.clone(), resolved.get()),
            other => panic!("expand_template_instance called on non-TemplateInstance payload: {other:?}"),
        };
        if already.is_some() {
            self.arena.get(type_node).mark_checked();
            return;
        }

        let (params, definition) = match &self.arena.get(template).payload {
            NodePayload::Template { header, definition, .. } => (header.template_list.clone(), *definition),
            other => panic!("expand_template_instance's template is not a Template payload: {other:?}"),
        };

        if arg_exprs.len() > params.len() {
            self.report_template_arity(type_node, template, params.len(), arg_exprs.len());
            self.arena.get(type_node).mark_checked();
            return;
        }

        // Evaluate each argument to a concrete type (or a supported
        // constant), materializing a trailing parameter's default when
        // the use site supplied fewer arguments than the template takes.
        let mut param_names = Vec::with_capacity(params.len());
        let mut concrete_args = Vec::with_capacity(params.len());
        for (index, &param) in params.iter().enumerate() {
            let (name, default) = match &self.arena.get(param).payload {
                NodePayload::TemplateParamDecl(p) => (p.name.clone(), p.default),
                other => panic!("template parameter is not a TemplateParamDecl: {other:?}"),
            };
            param_names.push(name);

            let arg = match arg_exprs.get(index).copied() {
                Some(arg_expr) => self.evaluate_template_arg(arg_expr),
                None => match default {
                    Some(default_expr) => self.evaluate_template_arg(default_expr),
                    None => {
                        self.report_template_arity(type_node, template, params.len(), arg_exprs.len());
                        self.arena.get(type_node).mark_checked();
                        return;
                    }
                },
            };
            concrete_args.push(arg);
        }

        let arg_typeids: Vec<TypeIdHandle> = concrete_args.iter().map(|&arg| sema_intern::GLOBAL.intern_type(self.arena, arg)).collect();
        let key = instance_key(template, &arg_typeids);

        if let Some(instance) = self.template_cache.get(&key) {
            self.resolve_instance(type_node, instance);
            return;
        }

        if self.template_nest >= self.options.max_instantiation_depth {
            self.error_at_node_msg(type_node, codes::EXCESSIVE_INSTANTIATION_DEPTH, &[]);
            self.arena.get(type_node).mark_checked();
            return;
        }

        let instance = self.instantiate(definition, &param_names, &concrete_args);
        // Inserted before the recursive check below: a template that
        // refers to its own instantiation finds itself already cached
        // on the way back in rather than recursing forever (section
        // 4.F.5, 4.D).
        self.template_cache.insert(key, instance);
        self.instances_by_template.entry(template).or_default().push(instance);

        self.template_nest += 1;
        self.check_instance_body(instance);
        self.template_nest -= 1;

        self.resolve_instance(type_node, instance);
    }

    fn resolve_instance(&mut self, type_node: NodeId, instance: NodeId) {
        if let NodePayload::TemplateInstance { resolved, .. } = &self.arena.get(type_node).payload {
            resolved.set(Some(instance));
        }
        self.arena.get(type_node).mark_checked();
    }

    fn report_template_arity(&mut self, node: NodeId, template: NodeId, expected: usize, got: usize) {
        let name = match &self.arena.get(template).payload {
            NodePayload::Template { name, .. } => name.to_string(),
            _ => "?".to_string(),
        };
        let expected = expected.to_string();
        let got = got.to_string();
        self.error_at_node_msg(node, codes::TEMPLATE_ARGUMENT_ARITY, &[&name, &expected, &got]);
    }

    /// Clone `definition`'s subtree with every `Placeholder` matching one
    /// of `param_names` replaced by the corresponding `concrete_args`
    /// entry, then repoint the clone's own template-argument list at the
    /// concrete arguments (the transform's generic substitution already
    /// rewrites the header's `template_list` field, but only for ids it
    /// finds in `subst` — the parameter-declaration ids themselves are
    /// never substituted, since nothing in `definition`'s body refers to
    /// them by id, so they are overwritten directly here instead).
    fn instantiate(&mut self, definition: NodeId, param_names: &[Symbol], concrete_args: &[NodeId]) -> NodeId {
        let subst: Vec<(Symbol, NodeId)> = param_names.iter().cloned().zip(concrete_args.iter().copied()).collect();
        let mut visit = |arena: &sema_ast::NodeArena, id: NodeId| -> Option<NodeId> {
            match &arena.get(id).payload {
                NodePayload::Placeholder { name } => subst.iter().find(|(n, _)| n == name).map(|(_, arg)| *arg),
                _ => None,
            }
        };
        let instance = transform_tree(self.arena, definition, &mut visit);

        let flags = self.arena.get(instance).flags.get();
        self.arena.get(instance).flags.set(flags.difference(NodeFlags::TEMPLATE).union(NodeFlags::TEMPLATEI));
        if let Some(header) = self.arena.get_mut(instance).payload.user_type_header_mut() {
            header.template_list = concrete_args.to_vec();
        }
        instance
    }

    /// Recursively check the freshly substituted instance: a function
    /// template's body is checked the same way any other function's is;
    /// anything else (struct, alias) is simply marked checked, the same
    /// generic fallback `check_type_ref` applies to a non-template type.
    fn check_instance_body(&mut self, instance: NodeId) {
        if let NodePayload::Fun { .. } = &self.arena.get(instance).payload {
            self.check_fun(instance);
        } else {
            self.arena.get(instance).mark_checked();
            if self.arena.get(instance).kind.is_type() {
                self.ensure_layout(instance);
            }
        }
    }

    /// Evaluate one template argument expression to either a resolved
    /// type node or a supported constant (an integer literal, for a
    /// non-type template parameter such as an array length). Any other
    /// expression shape is not supported as a template argument.
    fn evaluate_template_arg(&mut self, arg: NodeId) -> NodeId {
        let id_name = match &self.arena.get(arg).payload {
            NodePayload::Id { name, resolved } => Some((name.clone(), resolved.get())),
            _ => None,
        };
        if let Some((name, already)) = id_name {
            let target = already.or_else(|| self.scopes.lookup(&name));
            return match target {
                Some(target) => {
                    if let NodePayload::Id { resolved, .. } = &self.arena.get(arg).payload {
                        resolved.set(Some(target));
                    }
                    self.check_type_ref(target);
                    target
                }
                None => {
                    self.report_unknown_identifier(arg, name.as_str());
                    self.primitive_type(NodeKind::Unknown)
                }
            };
        }

        if self.arena.get(arg).kind.is_type() {
            self.check_type_ref(arg);
            return arg;
        }

        if matches!(self.arena.get(arg).payload, NodePayload::IntLiteral { .. }) {
            self.check_expr(arg);
            return arg;
        }

        self.error_at_node_msg(arg, codes::UNSUPPORTED_CONST_TEMPLATE_ARG, &["<expr>"]);
        self.primitive_type(NodeKind::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeArena, TemplateParam, UserTypeHeader};
    use sema_common::{CheckerOptions, Span};

    fn alloc_primitive(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
        arena.alloc(Node::new(kind, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())))
    }

    /// `type Box<T> { v T }` and its use site `Box<i32>`.
    fn box_template_fixture() -> (NodeArena, NodeId, NodeId) {
        let mut arena = NodeArena::new();
        let t_placeholder = arena.alloc(Node::new(NodeKind::Placeholder, NodeFlags::empty(), Span::dummy(), NodePayload::Placeholder { name: Symbol::intern("T") }));
        let field = sema_ast::StructField::new(Symbol::intern("v"), t_placeholder, NodeFlags::empty());
        let struct_def = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::TEMPLATE,
            Span::dummy(),
            NodePayload::Struct {
                meta: Default::default(),
                header: UserTypeHeader::default(),
                name: Some(Symbol::intern("Box")),
                fields: vec![field],
            },
        ));
        let param = arena.alloc(Node::new(
            NodeKind::TemplateParamDecl,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::TemplateParamDecl(TemplateParam { name: Symbol::intern("T"), default: None }),
        ));
        let template = arena.alloc(Node::new(
            NodeKind::Template,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Template {
                header: UserTypeHeader { parent_namespace: None, template_list: vec![param] },
                name: Symbol::intern("Box"),
                definition: struct_def,
            },
        ));
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let arg_expr = arena.alloc(Node::new(NodeKind::Id, NodeFlags::empty(), Span::dummy(), NodePayload::Id { name: Symbol::intern("i32_placeholder"), resolved: std::cell::Cell::new(Some(i32_ty)) }));
        let instance_node = arena.alloc(Node::new(
            NodeKind::TemplateInstance,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::TemplateInstance {
                header: UserTypeHeader::default(),
                template,
                arg_exprs: vec![arg_expr],
                resolved: std::cell::Cell::new(None),
            },
        ));
        (arena, instance_node, i32_ty)
    }

    #[test]
    fn expands_instance_substituting_placeholder() {
        let (mut arena, instance_node, i32_ty) = box_template_fixture();
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.expand_template_instance(instance_node);

        let resolved = match &ctx.arena.get(instance_node).payload {
            NodePayload::TemplateInstance { resolved, .. } => resolved.get().expect("instance resolved"),
            _ => unreachable!(),
        };
        match &ctx.arena.get(resolved).payload {
            NodePayload::Struct { fields, .. } => assert_eq!(fields[0].type_node, i32_ty),
            other => panic!("expected Struct instance, got {other:?}"),
        }
        assert!(!ctx.arena.get(resolved).flags.get().contains(NodeFlags::TEMPLATE));
        assert!(ctx.arena.get(resolved).flags.get().contains(NodeFlags::TEMPLATEI));
        assert!(!ctx.reported_any_error);
    }

    #[test]
    fn reusing_same_arguments_returns_cached_instance() {
        let (mut arena, instance_node, i32_ty) = box_template_fixture();
        let template = match &arena.get(instance_node).payload {
            NodePayload::TemplateInstance { template, .. } => *template,
            _ => unreachable!(),
        };
        let arg_expr_2 = arena.alloc(Node::new(NodeKind::Id, NodeFlags::empty(), Span::dummy(), NodePayload::Id { name: Symbol::intern("i32_placeholder_2"), resolved: std::cell::Cell::new(Some(i32_ty)) }));
        let instance_node_2 = arena.alloc(Node::new(
            NodeKind::TemplateInstance,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::TemplateInstance {
                header: UserTypeHeader::default(),
                template,
                arg_exprs: vec![arg_expr_2],
                resolved: std::cell::Cell::new(None),
            },
        ));

        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.expand_template_instance(instance_node);
        ctx.expand_template_instance(instance_node_2);

        let first = match &ctx.arena.get(instance_node).payload {
            NodePayload::TemplateInstance { resolved, .. } => resolved.get().unwrap(),
            _ => unreachable!(),
        };
        let second = match &ctx.arena.get(instance_node_2).payload {
            NodePayload::TemplateInstance { resolved, .. } => resolved.get().unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(first, second);
        assert_eq!(ctx.template_cache.len(), 1);
    }

    #[test]
    fn arity_mismatch_with_no_default_is_reported() {
        let (mut arena, instance_node, _i32_ty) = box_template_fixture();
        if let NodePayload::TemplateInstance { arg_exprs, .. } = &mut arena.get_mut(instance_node).payload {
            arg_exprs.clear();
        }
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.expand_template_instance(instance_node);
        assert!(ctx.reported_any_error);
    }
}
