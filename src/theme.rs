pub mod catppuccin {
    use nu_ansi_term::Color;
    pub struct Mocha;
    impl Mocha {
        pub const SURFACE2: Color = Color::Rgb(108, 112, 134);  // Subtle dim

        // Accents
        pub const RED: Color = Color::Rgb(243, 139, 168);
        pub const GREEN: Color = Color::Rgb(166, 227, 161);
        pub const YELLOW: Color = Color::Rgb(249, 226, 175);
        pub const MAUVE: Color = Color::Rgb(203, 166, 247);
        pub const PEACH: Color = Color::Rgb(250, 179, 135);
        pub const TEAL: Color = Color::Rgb(148, 226, 213);
        pub const SKY: Color = Color::Rgb(137, 220, 235);
    }
}

use nu_ansi_term::Style;

use crate::program::Instruction;
use catppuccin::Mocha as P;

/// Style for one source character; `None` is comment text.
///
/// > <   => SKY/TEAL (movement)
/// + -   => GREEN/RED (data modification)
/// . ,   => YELLOW/PEACH (I/O)
/// [ ]   => MAUVE (flow control)
pub fn instruction_style(instr: Option<Instruction>) -> Style {
    let color = match instr {
        Some(Instruction::MoveRight) => P::SKY,
        Some(Instruction::MoveLeft) => P::TEAL,
        Some(Instruction::Increment) => P::GREEN,
        Some(Instruction::Decrement) => P::RED,
        Some(Instruction::Output) => P::YELLOW,
        Some(Instruction::Input) => P::PEACH,
        Some(Instruction::JumpForward) | Some(Instruction::JumpBackward) => P::MAUVE,
        None => return Style::new().fg(P::SURFACE2),
    };
    Style::new().fg(color).bold()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_share_a_style() {
        assert_eq!(
            instruction_style(Some(Instruction::JumpForward)),
            instruction_style(Some(Instruction::JumpBackward))
        );
    }

    #[test]
    fn comments_are_dimmed_not_bold() {
        let style = instruction_style(None);
        assert!(!style.is_bold);
        assert_ne!(style, instruction_style(Some(Instruction::Increment)));
    }
}
