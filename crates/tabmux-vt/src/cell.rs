use bitflags::bitflags;

/// RGB color value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Color of a cell as the host terminal should draw it.
///
/// `Default` defers to the host's own foreground/background so tabmux
/// inherits whatever theme the user's terminal runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CellColor {
    #[default]
    Default,
    /// One of the 256 palette entries.
    Indexed(u8),
    /// Truecolor, either set directly or via an OSC palette override.
    Rgb(Rgb),
}

bitflags! {
    /// Cell attributes the renderer knows how to reproduce.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        const BOLD          = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const STRIKETHROUGH = 0b0000_1000;
        const INVERSE       = 0b0001_0000;
        const DIM           = 0b0010_0000;
        const HIDDEN        = 0b0100_0000;
    }
}

/// A single cell in the visible grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VtCell {
    pub codepoint: char,
    pub fg: CellColor,
    pub bg: CellColor,
    pub flags: CellFlags,
    /// 1 for normal, 2 for the leading half of a wide char, 0 for its spacer.
    pub width: u8,
}

impl VtCell {
    /// A space with default colors.
    pub fn blank() -> Self {
        Self {
            codepoint: ' ',
            fg: CellColor::Default,
            bg: CellColor::Default,
            flags: CellFlags::empty(),
            width: 1,
        }
    }

    /// Spacer cells trail a wide char and must not be drawn.
    pub fn is_spacer(&self) -> bool {
        self.width == 0
    }
}

impl Default for VtCell {
    fn default() -> Self {
        Self::blank()
    }
}
