use std::{fs, path::Path};

use thiserror::Error;

use super::context::resolve_path;
use super::registry::{Directive, Handler, InstructionRegistry};
use crate::ast::{AddressingMode, Expr, Line, SourcePosition};

/// Size of the 65816 address space.
const MAX_IMAGE_SIZE: usize = 0x100_0000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodeGenError {
    #[error("{0}: unknown instruction '{1}'")]
    UnknownInstruction(SourcePosition, String),
    #[error("{0}: list element {1} was never resolved")]
    UnresolvedElement(SourcePosition, Expr),
    #[error("{position}: cannot read included file {path}: {reason}")]
    IncludeFile {
        position: SourcePosition,
        path: String,
        reason: String,
    },
    #[error("{position}: included file {path} changed size from {expected} to {actual} bytes")]
    IncludeSizeChanged {
        position: SourcePosition,
        path: String,
        expected: usize,
        actual: usize,
    },
    #[error("Program too large")]
    ProgramOverflow,
}

fn list_to_bytes(line: &Line, width: usize, bytes: &mut Vec<u8>) -> Result<(), CodeGenError> {
    for element in &line.list {
        let value = element
            .value()
            .ok_or_else(|| CodeGenError::UnresolvedElement(line.position.clone(), element.expr.clone()))?;
        bytes.extend_from_slice(&value.to_le_bytes()[..width]);
    }
    Ok(())
}

fn incbin_to_bytes(line: &Line, include_dir: Option<&Path>, bytes: &mut Vec<u8>) -> Result<(), CodeGenError> {
    let Some(Expr::StringLiteral(name)) = &line.operand else {
        return Ok(());
    };
    let path = resolve_path(include_dir, name);
    let contents = fs::read(&path).map_err(|err| CodeGenError::IncludeFile {
        position: line.position.clone(),
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    let expected = line.byte_size.unwrap_or(0);
    if contents.len() != expected {
        return Err(CodeGenError::IncludeSizeChanged {
            position: line.position.clone(),
            path: path.display().to_string(),
            expected,
            actual: contents.len(),
        });
    }
    bytes.extend(contents);
    Ok(())
}

/// Write out the memory image of an assembled program.
///
/// Every line is assumed to carry its final size and bytes, and every list
/// element its final value.
#[tracing::instrument(skip_all, fields(lines = lines.len()))]
pub fn generate(
    lines: &[Line],
    registry: &InstructionRegistry,
    include_dir: Option<&Path>,
) -> Result<Vec<u8>, CodeGenError> {
    let mut bytes = vec![];

    for line in lines {
        let Some(name) = &line.instruction else {
            continue;
        };
        let handler = registry
            .lookup(name)
            .ok_or_else(|| CodeGenError::UnknownInstruction(line.position.clone(), name.clone()))?;

        match handler {
            Handler::Directive(Directive::Pad) => {
                bytes.resize(bytes.len() + line.byte_size.unwrap_or(0), 0x00);
            }
            Handler::Directive(Directive::Ascii) => {
                if let Some(Expr::StringLiteral(text)) = &line.operand {
                    bytes.extend_from_slice(text.as_bytes());
                }
            }
            Handler::Directive(Directive::Incbin) => incbin_to_bytes(line, include_dir, &mut bytes)?,
            Handler::Directive(Directive::Db) if line.addr_mode == AddressingMode::List => {
                list_to_bytes(line, 1, &mut bytes)?
            }
            Handler::Directive(Directive::Dw) if line.addr_mode == AddressingMode::List => {
                list_to_bytes(line, 2, &mut bytes)?
            }
            _ => bytes.extend_from_slice(line.encoded()),
        }

        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(CodeGenError::ProgramOverflow);
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::registry::INSTRUCTIONS;

    use pretty_assertions::assert_eq;

    fn string(directive: &str, text: &str) -> Line {
        Line::instruction(
            directive,
            AddressingMode::String,
            Some(Expr::StringLiteral(text.to_string())),
        )
    }

    #[test]
    fn test_generate() -> Result<(), CodeGenError> {
        let mut lda = Line::instruction("lda", AddressingMode::Immediate, Some(Expr::Number(1)));
        lda.emit(0xA9, 0x01, 2);

        let mut pad = Line::instruction("pad", AddressingMode::Absolute, Some(Expr::Number(0)));
        pad.byte_size = Some(3);

        let mut words = Line::list("dw", vec![Expr::Number(0x1234), Expr::symbol("later")]);
        words.list[1].resolve(0x8000);

        let mut bytes = Line::list("DB", vec![Expr::Number(1), Expr::Number(-1)]);
        bytes.byte_size = Some(2);

        let lines = vec![
            Line::label("start"),
            lda,
            pad,
            string("ascii", "Hi"),
            words,
            bytes,
        ];

        assert_eq!(
            generate(&lines, &INSTRUCTIONS, None)?,
            vec![0xA9, 0x01, 0x00, 0x00, 0x00, b'H', b'i', 0x34, 0x12, 0x00, 0x80, 0x01, 0xFF]
        );
        Ok(())
    }

    #[test]
    fn test_unresolved_list_element() {
        let lines = vec![Line::list("db", vec![Expr::symbol("later")])];
        assert_eq!(
            generate(&lines, &INSTRUCTIONS, None),
            Err(CodeGenError::UnresolvedElement(
                SourcePosition::default(),
                Expr::symbol("later")
            ))
        );
    }

    #[test]
    fn test_incbin() -> Result<(), CodeGenError> {
        let dir = std::env::temp_dir().join("asm65816-codegen-test");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("tiles.bin"), [0xDEu8, 0xAD, 0xBE, 0xEF]).unwrap();

        let mut incbin = string("incbin", "tiles.bin");
        incbin.byte_size = Some(4);
        assert_eq!(
            generate(&[incbin.clone()], &INSTRUCTIONS, Some(dir.as_path()))?,
            vec![0xDE, 0xAD, 0xBE, 0xEF]
        );

        incbin.byte_size = Some(2);
        let result = generate(&[incbin], &INSTRUCTIONS, Some(dir.as_path()));
        assert!(matches!(
            result,
            Err(CodeGenError::IncludeSizeChanged {
                expected: 2,
                actual: 4,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_instruction() {
        let lines = vec![Line::instruction("foo", AddressingMode::Implied, None)];
        assert_eq!(
            generate(&lines, &INSTRUCTIONS, None),
            Err(CodeGenError::UnknownInstruction(
                SourcePosition::default(),
                "foo".to_string()
            ))
        );
    }
}
