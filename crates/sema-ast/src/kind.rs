/// The closed enumeration of AST node kinds (section 3).
///
/// Variants are grouped primitive types, composite types, expressions,
/// and statements, matching the data-model partition. Adding a variant
/// requires a matching entry in `sema_reflect`'s kind-tag and field
/// tables (checked by `sema_reflect::verify_reflection_tables`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NodeKind {
    // --- primitive types ---
    Void = 0,
    Bool,
    I8,
    I16,
    I32,
    I64,
    Int,
    U8,
    U16,
    U32,
    U64,
    Uint,
    F32,
    F64,
    Unknown,

    // --- composite types ---
    Pointer,
    Reference,
    MutReference,
    Optional,
    Array,
    Slice,
    MutSlice,
    FunType,
    Struct,
    Alias,
    Namespace,
    Template,
    TemplateInstance,
    Placeholder,
    Unresolved,

    // --- expressions ---
    Id,
    NamespaceExpr,
    BoolLiteral,
    IntLiteral,
    FloatLiteral,
    ArrayLiteral,
    StringLiteral,
    BinOp,
    PrefixUnary,
    PostfixUnary,
    Deref,
    Call,
    Typecons,
    Member,
    Subscript,
    If,
    For,
    Return,
    Block,
    Fun,
    Field,
    Param,
    Var,
    Let,

    // --- statements ---
    Import,
    Typedef,
    Unit,
    TemplateParamDecl,
}

impl NodeKind {
    pub const COUNT: usize = Self::TemplateParamDecl as usize + 1;

    /// Types per the data-model partition (primitive and composite
    /// kinds); everything else is an expression or statement.
    #[must_use]
    pub const fn is_type(self) -> bool {
        (self as u8) <= (Self::Unresolved as u8)
    }

    #[must_use]
    pub const fn is_primitive_type(self) -> bool {
        (self as u8) <= (Self::Unknown as u8)
    }

    /// User types carry a template-parameter/argument list (section 3).
    #[must_use]
    pub const fn is_user_type(self) -> bool {
        matches!(
            self,
            Self::Struct
                | Self::Alias
                | Self::FunType
                | Self::Array
                | Self::Slice
                | Self::Optional
                | Self::Pointer
                | Self::Reference
                | Self::Template
                | Self::TemplateInstance
        )
    }

    #[must_use]
    pub const fn all() -> [NodeKind; NodeKind::COUNT] {
        use NodeKind::*;
        [
            Void,
            Bool,
            I8,
            I16,
            I32,
            I64,
            Int,
            U8,
            U16,
            U32,
            U64,
            Uint,
            F32,
            F64,
            Unknown,
            Pointer,
            Reference,
            MutReference,
            Optional,
            Array,
            Slice,
            MutSlice,
            FunType,
            Struct,
            Alias,
            Namespace,
            Template,
            TemplateInstance,
            Placeholder,
            Unresolved,
            Id,
            NamespaceExpr,
            BoolLiteral,
            IntLiteral,
            FloatLiteral,
            ArrayLiteral,
            StringLiteral,
            BinOp,
            PrefixUnary,
            PostfixUnary,
            Deref,
            Call,
            Typecons,
            Member,
            Subscript,
            If,
            For,
            Return,
            Block,
            Fun,
            Field,
            Param,
            Var,
            Let,
            Import,
            Typedef,
            Unit,
            TemplateParamDecl,
        ]
    }
}
