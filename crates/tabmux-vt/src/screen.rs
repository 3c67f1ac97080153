use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::cell::{Cell, Flags as AlacFlags};
use alacritty_terminal::term::color::Colors;
use alacritty_terminal::term::Term;
use alacritty_terminal::vte::ansi::{Color, CursorShape as AlacCursorShape, NamedColor};

use crate::cell::{CellColor, CellFlags, Rgb, VtCell};
use crate::terminal::EventProxy;

/// Current state of the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorState {
    pub row: u16,
    pub col: u16,
    pub shape: CursorShape,
    pub visible: bool,
}

/// Shape of the terminal cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
    Hidden,
}

/// A read-only view into the visible part of the grid.
pub struct ScreenView<'a> {
    term: &'a Term<EventProxy>,
}

impl<'a> ScreenView<'a> {
    pub(crate) fn new(term: &'a Term<EventProxy>) -> Self {
        Self { term }
    }

    /// Number of visible rows.
    pub fn rows(&self) -> u16 {
        self.term.screen_lines() as u16
    }

    /// Number of columns.
    pub fn cols(&self) -> u16 {
        self.term.columns() as u16
    }

    /// Cell at `(row, col)`; row 0 is the top of the visible screen.
    /// Out-of-range coordinates yield a blank cell.
    pub fn cell(&self, row: u16, col: u16) -> VtCell {
        if (row as usize) >= self.term.screen_lines() || (col as usize) >= self.term.columns() {
            return VtCell::blank();
        }
        let cell = &self.term.grid()[Line(row as i32)][Column(col as usize)];
        convert_cell(cell, self.term.colors())
    }

    /// All cells in a row.
    pub fn row_cells(&self, row: u16) -> Vec<VtCell> {
        (0..self.cols()).map(|col| self.cell(row, col)).collect()
    }

    /// Plain text of a row with trailing blanks removed.
    pub fn row_text(&self, row: u16) -> String {
        let text: String = self
            .row_cells(row)
            .into_iter()
            .filter(|c| !c.is_spacer())
            .map(|c| c.codepoint)
            .collect();
        text.trim_end().to_string()
    }

    /// Plain text of every visible row, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        (0..self.rows()).map(|row| self.row_text(row)).collect()
    }
}

fn convert_color(color: &Color, colors: &Colors) -> CellColor {
    match color {
        Color::Spec(rgb) => CellColor::Rgb(Rgb::new(rgb.r, rgb.g, rgb.b)),
        Color::Indexed(idx) => match colors[*idx as usize] {
            Some(rgb) => CellColor::Rgb(Rgb::new(rgb.r, rgb.g, rgb.b)),
            None => CellColor::Indexed(*idx),
        },
        Color::Named(named) => {
            if let Some(rgb) = colors[*named] {
                return CellColor::Rgb(Rgb::new(rgb.r, rgb.g, rgb.b));
            }
            let idx = *named as usize;
            if idx < 16 {
                return CellColor::Indexed(idx as u8);
            }
            let dim_base = NamedColor::DimBlack as usize;
            let dim_last = NamedColor::DimWhite as usize;
            if (dim_base..=dim_last).contains(&idx) {
                // Dim variants draw as the normal color; DIM is carried in the flags.
                CellColor::Indexed((idx - dim_base) as u8)
            } else {
                CellColor::Default
            }
        }
    }
}

pub(crate) fn convert_cell(cell: &Cell, colors: &Colors) -> VtCell {
    const FLAG_MAP: [(AlacFlags, CellFlags); 7] = [
        (AlacFlags::BOLD, CellFlags::BOLD),
        (AlacFlags::ITALIC, CellFlags::ITALIC),
        (AlacFlags::UNDERLINE, CellFlags::UNDERLINE),
        (AlacFlags::STRIKEOUT, CellFlags::STRIKETHROUGH),
        (AlacFlags::INVERSE, CellFlags::INVERSE),
        (AlacFlags::DIM, CellFlags::DIM),
        (AlacFlags::HIDDEN, CellFlags::HIDDEN),
    ];

    let flags = FLAG_MAP
        .iter()
        .filter(|(alac, _)| cell.flags.contains(*alac))
        .fold(CellFlags::empty(), |acc, (_, ours)| acc | *ours);

    let width = if cell.flags.contains(AlacFlags::WIDE_CHAR) {
        2
    } else if cell.flags.contains(AlacFlags::WIDE_CHAR_SPACER) {
        0
    } else {
        1
    };

    VtCell {
        codepoint: cell.c,
        fg: convert_color(&cell.fg, colors),
        bg: convert_color(&cell.bg, colors),
        flags,
        width,
    }
}

pub(crate) fn convert_cursor_shape(shape: AlacCursorShape) -> CursorShape {
    match shape {
        AlacCursorShape::Block | AlacCursorShape::HollowBlock => CursorShape::Block,
        AlacCursorShape::Underline => CursorShape::Underline,
        AlacCursorShape::Beam => CursorShape::Bar,
        AlacCursorShape::Hidden => CursorShape::Hidden,
    }
}
