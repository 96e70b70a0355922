//! Diagnostic message catalogue for the semantic-analysis passes.
//!
//! Codes are grouped by the pass that reports them. Unlike scanner/parser
//! diagnostics, every message here is produced by the checker or the
//! postanalyze pass (section 7).

use super::DiagnosticCategory;
use super::DiagnosticMessage;

pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: codes::UNKNOWN_IDENTIFIER,
        category: DiagnosticCategory::Error,
        message: "Cannot find name '{0}'.",
    },
    DiagnosticMessage {
        code: codes::UNKNOWN_IDENTIFIER_DID_YOU_MEAN,
        category: DiagnosticCategory::Error,
        message: "Cannot find name '{0}'. Did you mean '{1}'?",
    },
    DiagnosticMessage {
        code: codes::DUPLICATE_DEFINITION,
        category: DiagnosticCategory::Error,
        message: "Duplicate definition of '{0}'.",
    },
    DiagnosticMessage {
        code: codes::TYPE_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' is not compatible with expected type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::UNASSIGNABLE_TYPE,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' is not assignable to type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::INCOMPATIBLE_TYPES,
        category: DiagnosticCategory::Error,
        message: "Operand types '{0}' and '{1}' are incompatible.",
    },
    DiagnosticMessage {
        code: codes::NO_SUCH_MEMBER,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' has no member named '{1}'.",
    },
    DiagnosticMessage {
        code: codes::NO_SUCH_OPERATOR,
        category: DiagnosticCategory::Error,
        message: "Operator '{0}' is not defined for type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::OUT_OF_BOUNDS_CONSTANT,
        category: DiagnosticCategory::Error,
        message: "Index {0} is out of bounds for array of length {1}.",
    },
    DiagnosticMessage {
        code: codes::OPTIONAL_MAY_BE_EMPTY,
        category: DiagnosticCategory::Error,
        message: "Value of optional type '{0}' may be empty; narrow it first.",
    },
    DiagnosticMessage {
        code: codes::OPTIONAL_IS_EMPTY,
        category: DiagnosticCategory::Error,
        message: "Value of optional type '{0}' is known to be empty here.",
    },
    DiagnosticMessage {
        code: codes::INVALID_DROP_SIGNATURE,
        category: DiagnosticCategory::Error,
        message: "Function 'drop' on type '{0}' must have signature (mut this) -> void.",
    },
    DiagnosticMessage {
        code: codes::INVALID_MAIN_SIGNATURE,
        category: DiagnosticCategory::Error,
        message: "Function 'main' must take no parameters and return void.",
    },
    DiagnosticMessage {
        code: codes::ARITY_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Expected {0} argument(s), got {1}.",
    },
    DiagnosticMessage {
        code: codes::MUTABILITY_VIOLATION,
        category: DiagnosticCategory::Error,
        message: "Cannot take a mutable reference to an immutable location.",
    },
    DiagnosticMessage {
        code: codes::INTEGER_LITERAL_OVERFLOW,
        category: DiagnosticCategory::Error,
        message: "Integer literal '{0}' does not fit in type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::INTERNAL_TYPE_LEAKS_FROM_PUBLIC,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' is package-private but leaks from public declaration '{1}'.",
    },
    DiagnosticMessage {
        code: codes::SELF_REFERENTIAL_ALIAS,
        category: DiagnosticCategory::Error,
        message: "Type alias '{0}' is self-referential.",
    },
    DiagnosticMessage {
        code: codes::TEMPLATE_ARGUMENT_ARITY,
        category: DiagnosticCategory::Error,
        message: "Template '{0}' expects {1} argument(s), got {2}.",
    },
    DiagnosticMessage {
        code: codes::UNSUPPORTED_CONST_TEMPLATE_ARG,
        category: DiagnosticCategory::Error,
        message: "Template argument '{0}' is a constant expression of an unsupported form.",
    },
    DiagnosticMessage {
        code: codes::EXCESSIVE_INSTANTIATION_DEPTH,
        category: DiagnosticCategory::Error,
        message: "Template instantiation is excessively deep and possibly infinite.",
    },
    DiagnosticMessage {
        code: codes::DUPLICATE_FIELD_INITIALIZER,
        category: DiagnosticCategory::Error,
        message: "Field '{0}' is initialized more than once.",
    },
    DiagnosticMessage {
        code: codes::UNKNOWN_FIELD_INITIALIZER,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' has no field named '{1}'.",
    },
    DiagnosticMessage {
        code: codes::INVALID_CONVERSION,
        category: DiagnosticCategory::Error,
        message: "Cannot convert '{0}' to '{1}'.",
    },
    DiagnosticMessage {
        code: codes::DEREF_NON_POINTER,
        category: DiagnosticCategory::Error,
        message: "Cannot dereference a value of type '{0}'.",
    },
    DiagnosticMessage {
        code: codes::ACCESS_THROUGH_UNCHECKED_OPTIONAL,
        category: DiagnosticCategory::Error,
        message: "Cannot access member '{0}' through unnarrowed optional type '{1}'.",
    },
    DiagnosticMessage {
        code: codes::UNUSED_VARIABLE,
        category: DiagnosticCategory::Warning,
        message: "'{0}' is declared but never used.",
    },
    DiagnosticMessage {
        code: codes::UNUSED_PARAMETER,
        category: DiagnosticCategory::Warning,
        message: "Parameter '{0}' is declared but never used.",
    },
    DiagnosticMessage {
        code: codes::UNUSED_FIELD,
        category: DiagnosticCategory::Warning,
        message: "Field '{0}' is declared but never used.",
    },
    DiagnosticMessage {
        code: codes::UNUSED_OWNING_RESULT,
        category: DiagnosticCategory::Warning,
        message: "Result of type '{0}' is owning and its value is silently dropped.",
    },
    DiagnosticMessage {
        code: codes::UNUSED_IF_RVALUE,
        category: DiagnosticCategory::Warning,
        message: "Result of 'if' expression is never used.",
    },
];

/// Numeric diagnostic codes, grouped by pass. Stable across versions:
/// treat renumbering as a breaking change to any consumer that persists
/// codes (e.g. suppression lists).
pub mod codes {
    pub const UNKNOWN_IDENTIFIER: u32 = 1001;
    pub const UNKNOWN_IDENTIFIER_DID_YOU_MEAN: u32 = 1002;
    pub const DUPLICATE_DEFINITION: u32 = 1003;
    pub const TYPE_MISMATCH: u32 = 1010;
    pub const UNASSIGNABLE_TYPE: u32 = 1011;
    pub const INCOMPATIBLE_TYPES: u32 = 1012;
    pub const NO_SUCH_MEMBER: u32 = 1020;
    pub const NO_SUCH_OPERATOR: u32 = 1021;
    pub const OUT_OF_BOUNDS_CONSTANT: u32 = 1030;
    pub const OPTIONAL_MAY_BE_EMPTY: u32 = 1040;
    pub const OPTIONAL_IS_EMPTY: u32 = 1041;
    pub const INVALID_DROP_SIGNATURE: u32 = 1050;
    pub const INVALID_MAIN_SIGNATURE: u32 = 1051;
    pub const ARITY_MISMATCH: u32 = 1060;
    pub const MUTABILITY_VIOLATION: u32 = 1070;
    pub const INTEGER_LITERAL_OVERFLOW: u32 = 1080;
    pub const INTERNAL_TYPE_LEAKS_FROM_PUBLIC: u32 = 1090;
    pub const SELF_REFERENTIAL_ALIAS: u32 = 1091;
    pub const TEMPLATE_ARGUMENT_ARITY: u32 = 1100;
    pub const UNSUPPORTED_CONST_TEMPLATE_ARG: u32 = 1101;
    pub const EXCESSIVE_INSTANTIATION_DEPTH: u32 = 1102;
    pub const DUPLICATE_FIELD_INITIALIZER: u32 = 1110;
    pub const UNKNOWN_FIELD_INITIALIZER: u32 = 1111;
    pub const INVALID_CONVERSION: u32 = 1120;
    pub const DEREF_NON_POINTER: u32 = 1121;
    pub const ACCESS_THROUGH_UNCHECKED_OPTIONAL: u32 = 1130;
    pub const UNUSED_VARIABLE: u32 = 1200;
    pub const UNUSED_PARAMETER: u32 = 1201;
    pub const UNUSED_FIELD: u32 = 1202;
    pub const UNUSED_OWNING_RESULT: u32 = 1203;
    pub const UNUSED_IF_RVALUE: u32 = 1204;
}
