//! Ordered field reflection (section 4.A): for a given node, the list
//! of fields a consumer (the typeid encoder, component B; the generic
//! AST transform, component E) walks in declared order.
//!
//! The specification's semantic field types
//! `{u8, u16, u32, u64, f64, loc, sym, sym?, node, node?, str, str?,
//! node-array}` become `FieldSemantic` below. Rather than literal byte
//! offsets into a C struct (not meaningful for a tagged Rust enum whose
//! variants are not layout-uniform), each field is produced by walking
//! `NodePayload`'s variant in declared order — the Rust-idiomatic
//! equivalent of offset-based reflection the ambient spec calls for.
//! Source-location fields live on the node header, not the payload, so
//! they are never reflected here — automatically satisfying "source
//! location fields are never part of identity".

use sema_ast::{Node, NodeId, NodePayload, Symbol};
use smallvec::SmallVec;

/// The closed set of semantic field types (section 4.A).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSemantic {
    U8,
    U16,
    U32,
    U64,
    F64,
    Sym,
    SymOpt,
    Node,
    NodeOpt,
    Str,
    StrOpt,
    NodeArray,
}

/// A field's actual value, as read off a specific node.
#[derive(Clone, Debug)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
    Sym(Symbol),
    SymOpt(Option<Symbol>),
    Node(NodeId),
    NodeOpt(Option<NodeId>),
    Str(String),
    StrOpt(Option<String>),
    NodeArray(SmallVec<[NodeId; 4]>),
}

/// One reflected field: its semantic type, whether it participates in
/// structural identity (typeid encoding, section 4.B), and its value.
#[derive(Clone, Debug)]
pub struct ReflectedField {
    pub name: &'static str,
    pub semantic: FieldSemantic,
    pub identity: bool,
    pub value: FieldValue,
}

impl ReflectedField {
    fn new(name: &'static str, identity: bool, value: FieldValue) -> Self {
        let semantic = match &value {
            FieldValue::U8(_) => FieldSemantic::U8,
            FieldValue::U16(_) => FieldSemantic::U16,
            FieldValue::U32(_) => FieldSemantic::U32,
            FieldValue::U64(_) => FieldSemantic::U64,
            FieldValue::F64(_) => FieldSemantic::F64,
            FieldValue::Sym(_) => FieldSemantic::Sym,
            FieldValue::SymOpt(_) => FieldSemantic::SymOpt,
            FieldValue::Node(_) => FieldSemantic::Node,
            FieldValue::NodeOpt(_) => FieldSemantic::NodeOpt,
            FieldValue::Str(_) => FieldSemantic::Str,
            FieldValue::StrOpt(_) => FieldSemantic::StrOpt,
            FieldValue::NodeArray(_) => FieldSemantic::NodeArray,
        };
        Self {
            name,
            semantic,
            identity,
            value,
        }
    }
}

fn node_array(ids: &[NodeId]) -> FieldValue {
    FieldValue::NodeArray(ids.iter().copied().collect())
}

/// Reflect `node`'s payload fields in declared order.
///
/// Resolution caches (`Id::resolved`, `Member::resolved`,
/// `NamespaceExpr::resolved`, `TemplateInstance::resolved`) and layout
/// caches (`StructField::offset`) are deliberately not reflected: they
/// are checker-computed results pointing *outside* the node's own
/// subtree, not structural children, so neither the typeid encoder nor
/// the AST transform should walk into them.
#[must_use]
pub fn reflect_fields(node: &Node) -> SmallVec<[ReflectedField; 8]> {
    let mut out = SmallVec::new();
    match &node.payload {
        NodePayload::Primitive(_) => {}

        NodePayload::Pointer {
            header, pointee, ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("pointee", true, FieldValue::Node(*pointee)));
        }
        NodePayload::Reference {
            header, referent, ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("referent", true, FieldValue::Node(*referent)));
        }
        NodePayload::MutReference { referent, .. } => {
            out.push(ReflectedField::new("referent", true, FieldValue::Node(*referent)));
        }
        NodePayload::Optional { header, inner, .. } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("inner", true, FieldValue::Node(*inner)));
        }
        NodePayload::Array {
            header, elem, len, ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("elem", true, FieldValue::Node(*elem)));
            out.push(ReflectedField::new(
                "len",
                true,
                FieldValue::U64(len.unwrap_or(0)),
            ));
        }
        NodePayload::Slice { header, elem, .. } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("elem", true, FieldValue::Node(*elem)));
        }
        NodePayload::MutSlice { elem, .. } => {
            out.push(ReflectedField::new("elem", true, FieldValue::Node(*elem)));
        }
        NodePayload::FunType {
            header,
            params,
            result,
            ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("params", true, node_array(params)));
            out.push(ReflectedField::new("result", true, FieldValue::Node(*result)));
        }
        NodePayload::Struct {
            header,
            name,
            fields,
            ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new(
                "name",
                true,
                FieldValue::SymOpt(name.clone()),
            ));
            let field_types: SmallVec<[NodeId; 4]> =
                fields.iter().map(|f| f.type_node).collect();
            out.push(ReflectedField::new(
                "field_types",
                true,
                FieldValue::NodeArray(field_types),
            ));
            for f in fields {
                out.push(ReflectedField::new(
                    "field_name",
                    true,
                    FieldValue::Sym(f.name.clone()),
                ));
            }
        }
        NodePayload::Alias {
            header,
            name,
            target,
            ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new("target", true, FieldValue::Node(*target)));
        }
        NodePayload::Namespace { name, exports } => {
            out.push(ReflectedField::new(
                "name",
                false,
                FieldValue::SymOpt(name.clone()),
            ));
            let ids: SmallVec<[NodeId; 4]> = exports.values().copied().collect();
            out.push(ReflectedField::new("exports", false, FieldValue::NodeArray(ids)));
        }
        NodePayload::Template {
            header,
            name,
            definition,
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new(
                "definition",
                true,
                FieldValue::Node(*definition),
            ));
        }
        NodePayload::TemplateInstance {
            header,
            template,
            arg_exprs,
            ..
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("template", true, FieldValue::Node(*template)));
            out.push(ReflectedField::new("arg_exprs", true, node_array(arg_exprs)));
        }
        NodePayload::Placeholder { name } => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
        }
        NodePayload::Unresolved => {}

        NodePayload::Id { name, .. } => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
        }
        NodePayload::NamespaceExpr { path, .. } => {
            for seg in path {
                out.push(ReflectedField::new("path_seg", true, FieldValue::Sym(seg.clone())));
            }
        }
        NodePayload::BoolLiteral { value } => {
            out.push(ReflectedField::new(
                "value",
                true,
                FieldValue::U8(u8::from(*value)),
            ));
        }
        NodePayload::IntLiteral { text, value } => {
            out.push(ReflectedField::new("text", true, FieldValue::Str(text.clone())));
            out.push(ReflectedField::new(
                "value",
                true,
                FieldValue::U64(*value as u64),
            ));
        }
        NodePayload::FloatLiteral { text, value } => {
            out.push(ReflectedField::new("text", true, FieldValue::Str(text.clone())));
            out.push(ReflectedField::new("value", true, FieldValue::F64(*value)));
        }
        NodePayload::ArrayLiteral { elements } => {
            out.push(ReflectedField::new("elements", true, node_array(elements)));
        }
        NodePayload::StringLiteral { value } => {
            out.push(ReflectedField::new("value", true, FieldValue::Str(value.clone())));
        }
        NodePayload::BinOp { op, lhs, rhs } => {
            out.push(ReflectedField::new("op", true, FieldValue::U8(*op as u8)));
            out.push(ReflectedField::new("lhs", true, FieldValue::Node(*lhs)));
            out.push(ReflectedField::new("rhs", true, FieldValue::Node(*rhs)));
        }
        NodePayload::PrefixUnary { op, operand } | NodePayload::PostfixUnary { op, operand } => {
            out.push(ReflectedField::new("op", true, FieldValue::U8(*op as u8)));
            out.push(ReflectedField::new("operand", true, FieldValue::Node(*operand)));
        }
        NodePayload::Deref { operand } => {
            out.push(ReflectedField::new("operand", true, FieldValue::Node(*operand)));
        }
        NodePayload::Call { callee, args } => {
            out.push(ReflectedField::new("callee", true, FieldValue::Node(*callee)));
            out.push(ReflectedField::new("args", true, node_array(args)));
        }
        NodePayload::Typecons { target, args } => {
            out.push(ReflectedField::new("target", true, FieldValue::Node(*target)));
            out.push(ReflectedField::new("args", true, node_array(args)));
        }
        NodePayload::Member { receiver, name, .. } => {
            out.push(ReflectedField::new("receiver", true, FieldValue::Node(*receiver)));
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
        }
        NodePayload::Subscript { receiver, index } => {
            out.push(ReflectedField::new("receiver", true, FieldValue::Node(*receiver)));
            out.push(ReflectedField::new("index", true, FieldValue::Node(*index)));
        }
        NodePayload::If {
            cond,
            then_branch,
            else_branch,
        } => {
            out.push(ReflectedField::new("cond", true, FieldValue::Node(*cond)));
            out.push(ReflectedField::new(
                "then_branch",
                true,
                FieldValue::Node(*then_branch),
            ));
            out.push(ReflectedField::new(
                "else_branch",
                true,
                FieldValue::NodeOpt(*else_branch),
            ));
        }
        NodePayload::For {
            binding,
            iterable,
            cond,
            step,
            body,
        } => {
            out.push(ReflectedField::new("binding", true, FieldValue::NodeOpt(*binding)));
            out.push(ReflectedField::new("iterable", true, FieldValue::NodeOpt(*iterable)));
            out.push(ReflectedField::new("cond", true, FieldValue::NodeOpt(*cond)));
            out.push(ReflectedField::new("step", true, FieldValue::NodeOpt(*step)));
            out.push(ReflectedField::new("body", true, FieldValue::Node(*body)));
        }
        NodePayload::Return { value } => {
            out.push(ReflectedField::new("value", true, FieldValue::NodeOpt(*value)));
        }
        NodePayload::Block { stmts } => {
            out.push(ReflectedField::new("stmts", true, node_array(stmts)));
        }
        NodePayload::Fun {
            name,
            header,
            params,
            result,
            body,
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("name", true, FieldValue::SymOpt(name.clone())));
            out.push(ReflectedField::new("params", true, node_array(params)));
            out.push(ReflectedField::new("result", true, FieldValue::Node(*result)));
            out.push(ReflectedField::new("body", true, FieldValue::NodeOpt(*body)));
        }
        NodePayload::Field {
            name,
            type_annotation,
            default,
        } => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new(
                "type_annotation",
                true,
                FieldValue::Node(*type_annotation),
            ));
            out.push(ReflectedField::new("default", true, FieldValue::NodeOpt(*default)));
        }
        NodePayload::Param {
            name,
            type_annotation,
            default,
            mutable,
        } => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new(
                "type_annotation",
                true,
                FieldValue::Node(*type_annotation),
            ));
            out.push(ReflectedField::new("default", true, FieldValue::NodeOpt(*default)));
            out.push(ReflectedField::new(
                "mutable",
                true,
                FieldValue::U8(u8::from(*mutable)),
            ));
        }
        NodePayload::Var {
            name,
            type_annotation,
            init,
            mutable,
        } => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new(
                "type_annotation",
                true,
                FieldValue::NodeOpt(*type_annotation),
            ));
            out.push(ReflectedField::new("init", true, FieldValue::NodeOpt(*init)));
            out.push(ReflectedField::new(
                "mutable",
                true,
                FieldValue::U8(u8::from(*mutable)),
            ));
        }
        NodePayload::Let {
            name,
            type_annotation,
            init,
        } => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new(
                "type_annotation",
                true,
                FieldValue::NodeOpt(*type_annotation),
            ));
            out.push(ReflectedField::new("init", true, FieldValue::Node(*init)));
        }
        NodePayload::Import { path, alias } => {
            for seg in path {
                out.push(ReflectedField::new("path_seg", true, FieldValue::Sym(seg.clone())));
            }
            out.push(ReflectedField::new("alias", true, FieldValue::SymOpt(alias.clone())));
        }
        NodePayload::Typedef {
            name,
            header,
            target,
        } => {
            push_header(&mut out, header);
            out.push(ReflectedField::new("name", true, FieldValue::Sym(name.clone())));
            out.push(ReflectedField::new("target", true, FieldValue::Node(*target)));
        }
        NodePayload::Unit { decls } => {
            out.push(ReflectedField::new("decls", true, node_array(decls)));
        }
        NodePayload::TemplateParamDecl(param) => {
            out.push(ReflectedField::new("name", true, FieldValue::Sym(param.name.clone())));
            out.push(ReflectedField::new(
                "default",
                true,
                FieldValue::NodeOpt(param.default),
            ));
        }
    }
    out
}

fn push_header(out: &mut SmallVec<[ReflectedField; 8]>, header: &sema_ast::UserTypeHeader) {
    // Section 4.B: "for user types, the template-parameter/argument list
    // is emitted before any kind-specific fields" — `push_header` is
    // always the first thing each user-type arm calls.
    out.push(ReflectedField::new(
        "template_list",
        true,
        node_array(&header.template_list),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{NodeArena, NodeFlags, NodeKind};
    use sema_common::Span;

    #[test]
    fn binop_reflects_op_then_operands() {
        let mut arena = NodeArena::new();
        let lhs = arena.alloc(Node::new(
            NodeKind::IntLiteral,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::IntLiteral {
                text: "1".into(),
                value: 1,
            },
        ));
        let rhs = arena.alloc(Node::new(
            NodeKind::IntLiteral,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::IntLiteral {
                text: "2".into(),
                value: 2,
            },
        ));
        let binop = Node::new(
            NodeKind::BinOp,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::BinOp {
                op: sema_ast::BinaryOp::Add,
                lhs,
                rhs,
            },
        );
        let fields = reflect_fields(&binop);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "op");
        assert_eq!(fields[1].name, "lhs");
        assert_eq!(fields[2].name, "rhs");
    }

    #[test]
    fn primitive_has_no_fields() {
        let node = Node::new(
            NodeKind::I32,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Primitive(Default::default()),
        );
        assert!(reflect_fields(&node).is_empty());
    }
}
