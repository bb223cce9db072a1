//! Data model handed from the source front-end to the assembler core.
//!
//! A program is an ordered list of [`Line`]s. Each line owns its operand
//! expressions and, once assembled, the bytes it contributes to the image.

pub mod addressing_mode;
pub mod expression;
pub mod line;
pub mod source_position;

pub use addressing_mode::{AddressingMode, ImmediateModifier};
pub use expression::{Expr, ListElement};
pub use line::Line;
pub use source_position::SourcePosition;
