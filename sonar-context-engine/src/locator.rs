//! Derives the source window to show for each issue.

use crate::model::Issue;

/// Line range to cut out of a component, before clamping to file length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowBounds {
    pub component: String,
    pub line: u32,
    pub from_line: u32,
    pub to_line: u32,
}

/// Outcome of locating an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Window(WindowBounds),
    /// Project-level issues carry no position; nothing to fetch.
    NoLineInfo,
}

/// `line` wins over `textRange.startLine`; non-positive values count as absent.
pub fn locate(issue: &Issue, context_lines: u32) -> Located {
    let Some(component) = issue.component() else {
        return Located::NoLineInfo;
    };

    let line = issue
        .line()
        .filter(|l| *l >= 1)
        .or_else(|| issue.text_range_start().filter(|l| *l >= 1))
        .and_then(|l| u32::try_from(l).ok());

    match line {
        Some(line) => Located::Window(window_bounds(component, line, context_lines)),
        None => Located::NoLineInfo,
    }
}

/// `[max(1, line - n), line + n]`.
pub fn window_bounds(component: &str, line: u32, context_lines: u32) -> WindowBounds {
    WindowBounds {
        component: component.to_string(),
        line,
        from_line: line.saturating_sub(context_lines).max(1),
        to_line: line.saturating_add(context_lines),
    }
}
