//! Textual rendering of positions
//!
//! One line per frame, head first:
//!
//! ```text
//! at pkg.Vec.add(12) receiver=pkg.Vec@1f // invoke_virtual #3 (pkg.Vec.grow()V)
//! at pkg.List.push(3)
//! ```
//!
//! The `// ...` disassembly suffix needs a [`BytecodeInfo`]; the plain
//! `Display` impl omits it.

use std::fmt;

use itertools::Itertools;

use crate::bytecode::BytecodeInfo;

use super::SourcePosition;

/// Line terminator between frames
pub const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Display adapter rendering a position with disassembly
pub struct PositionDisplay<'a> {
    position: &'a SourcePosition,
    bytecode: &'a dyn BytecodeInfo,
    shallow: bool,
}

struct FrameText<'a> {
    position: &'a SourcePosition,
    bytecode: Option<&'a dyn BytecodeInfo>,
}

impl fmt::Display for FrameText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = self.position.method();
        write!(
            f,
            "at {}.{}({})",
            method.declaring_type().to_source_name(),
            method.name(),
            self.position.bci()
        )?;
        if let Some(receiver) = self.position.receiver() {
            write!(f, " receiver={}", receiver)?;
        }
        let disassembly = self
            .bytecode
            .and_then(|b| b.disassemble_one(method, self.position.bci()))
            .filter(|text| !text.is_empty());
        if let Some(text) = disassembly {
            write!(f, " // {}", text)?;
        }
        Ok(())
    }
}

impl fmt::Display for PositionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytecode = Some(self.bytecode);
        if self.shallow {
            let frame = FrameText {
                position: self.position,
                bytecode,
            };
            return write!(f, "{}", frame);
        }
        let lines = self
            .position
            .iter()
            .map(|position| FrameText { position, bytecode });
        write!(f, "{}", lines.format(LINE_SEPARATOR))
    }
}

impl SourcePosition {
    /// Render the whole chain with disassembly of each frame's instruction
    pub fn display<'a>(&'a self, bytecode: &'a dyn BytecodeInfo) -> PositionDisplay<'a> {
        PositionDisplay {
            position: self,
            bytecode,
            shallow: false,
        }
    }

    /// Render only this frame, with disassembly
    pub fn shallow_display<'a>(&'a self, bytecode: &'a dyn BytecodeInfo) -> PositionDisplay<'a> {
        PositionDisplay {
            position: self,
            bytecode,
            shallow: true,
        }
    }

    pub fn to_string_with(&self, bytecode: &dyn BytecodeInfo) -> String {
        self.display(bytecode).to_string()
    }

    pub fn shallow_to_string(&self, bytecode: &dyn BytecodeInfo) -> String {
        self.shallow_display(bytecode).to_string()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.iter().map(|position| FrameText {
            position,
            bytecode: None,
        });
        write!(f, "{}", lines.format(LINE_SEPARATOR))
    }
}
