//! Diagnostic emission helpers (section 4.G): low-level emitters
//! (`error_at_*`, taking an already-formatted message) and the
//! `report_*` wrappers each pass calls with the specific arguments for
//! one catalogued code.

use sema_ast::NodeId;
use sema_common::diagnostics::{codes, format_message, get_message_template, suggest_name, Diagnostic};

use crate::context::CheckerContext;

impl<'a> CheckerContext<'a> {
    /// Emit an error at `node`'s span with an already-formatted message.
    pub(crate) fn error_at_node(&mut self, node: NodeId, code: u32, message: String) {
        let span = self.arena.get(node).span;
        self.error_at_position(span.start, span.length_or_one(), message, code);
    }

    /// Emit an error at `node`'s span, looking up and formatting `code`'s
    /// catalogued template with `args`.
    ///
    /// # Panics
    /// Panics in debug builds if `code` has no catalogued message — every
    /// code the checker reports must appear in
    /// `sema_common::diagnostics::DIAGNOSTIC_MESSAGES`.
    pub(crate) fn error_at_node_msg(&mut self, node: NodeId, code: u32, args: &[&str]) {
        let template = get_message_template(code)
            .unwrap_or_else(|| panic!("diagnostic code {code} has no catalogued message"));
        let message = format_message(template, args);
        self.error_at_node(node, code, message);
    }

    /// Emit an error at an explicit byte range, bypassing node lookup.
    /// Used when the most useful span isn't the checked node itself
    /// (e.g. pointing at a specific duplicate field initializer).
    pub(crate) fn error_at_position(&mut self, start: u32, length: u32, message: String, code: u32) {
        self.reported_any_error = true;
        self.diagnostics
            .push(Diagnostic::error(self.file.clone(), start, length, message, code));
    }

    /// Emit an error at the innermost node currently being checked, or
    /// at the start of the file if the node stack is empty.
    pub(crate) fn error_at_current_node(&mut self, code: u32, message: String) {
        match self.node_stack.last().copied() {
            Some(node) => self.error_at_node(node, code, message),
            None => self.error_at_position(0, 0, message, code),
        }
    }

    /// Like `error_at_node_msg`, but at the innermost node currently
    /// being checked rather than an explicit one.
    pub(crate) fn error_at_current_node_msg(&mut self, code: u32, args: &[&str]) {
        let template = get_message_template(code)
            .unwrap_or_else(|| panic!("diagnostic code {code} has no catalogued message"));
        let message = format_message(template, args);
        self.error_at_current_node(code, message);
    }

    /// Emit a warning at `node`'s span, suppressed entirely when
    /// `options.emit_warnings` is off (section 7).
    pub(crate) fn warn_at_node_msg(&mut self, node: NodeId, code: u32, args: &[&str]) {
        if !self.options.emit_warnings {
            return;
        }
        let template = get_message_template(code)
            .unwrap_or_else(|| panic!("diagnostic code {code} has no catalogued message"));
        let message = format_message(template, args);
        let span = self.arena.get(node).span;
        self.diagnostics.push(Diagnostic {
            category: sema_common::diagnostics::DiagnosticCategory::Warning,
            ..Diagnostic::error(self.file.clone(), span.start, span.length_or_one(), message, code)
        });
    }

    /// Cannot find name `name` at `node`, with a "did you mean" suggestion
    /// drawn from every name currently visible in scope, if one is close
    /// enough (section 4.G).
    pub(crate) fn report_unknown_identifier(&mut self, node: NodeId, name: &str) {
        let candidates: Vec<&str> = self.scopes.visible_names().map(sema_ast::Symbol::as_str).collect();
        match suggest_name(name, candidates.into_iter(), self.options.max_suggestion_edit_distance) {
            Some(suggestion) => {
                let suggestion = suggestion.to_string();
                self.error_at_node_msg(node, codes::UNKNOWN_IDENTIFIER_DID_YOU_MEAN, &[name, &suggestion]);
            }
            None => self.error_at_node_msg(node, codes::UNKNOWN_IDENTIFIER, &[name]),
        }
    }

    /// Reading a storage location narrowed to `NO` (section 4.F.2): the
    /// optional is known empty at this point in the flow, not merely
    /// unchecked.
    pub(crate) fn report_optional_is_empty(&mut self, node: NodeId, ty: NodeId) {
        let ty_name = format!("{:?}", self.arena.get(ty).kind);
        self.error_at_node_msg(node, codes::OPTIONAL_IS_EMPTY, &[&ty_name]);
    }
}

/// A span's length, or `1` for a zero-length (point) span, so a
/// diagnostic always highlights at least one character.
pub(crate) trait SpanLenOrOne {
    fn length_or_one(&self) -> u32;
}

impl SpanLenOrOne for sema_common::Span {
    fn length_or_one(&self) -> u32 {
        self.len().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeArena, NodeFlags, NodeKind, NodePayload, Symbol};
    use sema_common::CheckerOptions;

    #[test]
    fn unknown_identifier_close_to_a_visible_name_suggests_it() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.alloc(Node::new(NodeKind::I32, NodeFlags::CHECKED, sema_common::Span::dummy(), NodePayload::Primitive(Default::default())));
        let init = arena.alloc(Node::new(NodeKind::BoolLiteral, NodeFlags::empty(), sema_common::Span::dummy(), NodePayload::BoolLiteral { value: true }));
        let let_node = arena.alloc(Node::new(
            NodeKind::Let,
            NodeFlags::empty(),
            sema_common::Span::dummy(),
            NodePayload::Let { name: Symbol::intern("count"), type_annotation: Some(i32_ty), init },
        ));
        let id_node = arena.alloc(Node::new(
            NodeKind::Id,
            NodeFlags::empty(),
            sema_common::Span::dummy(),
            NodePayload::Id { name: Symbol::intern("counte"), resolved: Default::default() },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.check_expr(let_node);
        ctx.check_expr(id_node);
        ctx.pop_scope();

        let diag = ctx.diagnostics.last().expect("a diagnostic was reported");
        assert_eq!(diag.code, codes::UNKNOWN_IDENTIFIER_DID_YOU_MEAN);
        assert!(diag.message_text.contains("count"));
    }

    #[test]
    fn unknown_identifier_with_no_close_match_reports_plain_unknown() {
        let mut arena = NodeArena::new();
        let id_node = arena.alloc(Node::new(
            NodeKind::Id,
            NodeFlags::empty(),
            sema_common::Span::dummy(),
            NodePayload::Id { name: Symbol::intern("zzzzzzzzzz"), resolved: Default::default() },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.check_expr(id_node);
        ctx.pop_scope();

        let diag = ctx.diagnostics.last().expect("a diagnostic was reported");
        assert_eq!(diag.code, codes::UNKNOWN_IDENTIFIER);
    }
}
