use ratatui::style::Stylize;
use ratatui::style::{Color, Style};

pub fn title_style() -> Style { Style::default().fg(Color::Cyan).bold() }
pub fn translit_style() -> Style { Style::default().fg(Color::DarkGray) }
pub fn selected_style() -> Style { Style::default().fg(Color::Yellow).bold() }
pub fn footer_style() -> Style { Style::default().fg(Color::Gray) }
