/// Binary operators (section 4.F.1).
///
/// `Assign` covers plain `x = y`; the checker validates it through the
/// same `storage-of` mutability rule used by optional narrowing rather
/// than the per-type operator table used by the others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Assign,
}

impl BinaryOp {
    /// Operators that enter the dedicated condition/narrowing mode of
    /// section 4.F.2 rather than the ordinary type-propagation rules.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::LogAnd | Self::LogOr)
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }

    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Assign => "=",
        }
    }
}

/// Unary (prefix and postfix) operators.
///
/// `OCheck` and `ODeref` are never produced by the parser: they are the
/// synthetic operators the checker inserts during optional narrowing
/// (section 4.F.2) and `x == void` / `x != void` rewriting (section
/// 4.F.1). A parser never emits them; a consumer of a checked AST may
/// rely on their presence exactly where narrowing requires it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x` (boolean not, or `!opt` optional-empty test)
    Not,
    /// `~x`
    BitNot,
    /// `&x`
    Addr,
    /// `mut&x`
    MutAddr,
    PreIncr,
    PreDecr,
    PostIncr,
    PostDecr,
    /// Synthetic: tests whether an optional is present. Wraps `NOT` for
    /// the `==` rewrite in section 4.F.1.
    OCheck,
    /// Synthetic: unwraps a narrowed optional to its element type.
    ODeref,
}

impl UnaryOp {
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::OCheck | Self::ODeref)
    }

    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Addr => "&",
            Self::MutAddr => "mut&",
            Self::PreIncr | Self::PostIncr => "++",
            Self::PreDecr | Self::PostDecr => "--",
            Self::OCheck => "OCHECK",
            Self::ODeref => "ODEREF",
        }
    }
}
