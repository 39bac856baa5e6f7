use console::{style, StyledObject};
use std::fmt::Display;

use crate::decision::BuildDecision;

// Everything except the decision line is written to stderr, so colouring
// follows stderr's terminal detection.
fn on_stderr(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).for_stderr()
}

pub fn bright_yellow(text: impl Display) -> StyledObject<String> {
    on_stderr(text).bright().yellow()
}

pub fn bright_green(text: impl Display) -> StyledObject<String> {
    on_stderr(text).bright().green()
}

pub fn bright_red(text: impl Display) -> StyledObject<String> {
    on_stderr(text).bright().red()
}

pub fn cyan(text: impl Display) -> StyledObject<String> {
    on_stderr(text).cyan()
}

pub fn dim(text: impl Display) -> StyledObject<String> {
    on_stderr(text).dim()
}

pub fn bright(text: impl Display) -> StyledObject<String> {
    on_stderr(text).bright()
}

pub fn magenta_bold(text: impl Display) -> StyledObject<String> {
    on_stderr(text).magenta().bold()
}

/// Decision label for the stdout decision line.
pub fn decision_label(decision: &BuildDecision) -> StyledObject<&'static str> {
    let label = style(decision.label()).bold();
    match decision {
        BuildDecision::Skip => label.cyan(),
        BuildDecision::Quick => label.yellow(),
        BuildDecision::Full { .. } => label.green(),
    }
}
