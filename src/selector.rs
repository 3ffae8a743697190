//! Interactive prompts: variant selection and install confirmation.
//!
//! Both prompts share one bounded loop: an invalid answer re-prompts, and the
//! operator gets `MAX_TRIES` answers before the installer gives up.

use crate::error::{CudaInstallError, Result};
use crate::manifest::Manifest;
use crate::types::Variant;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

/// Attempts the operator gets before the installer gives up
pub const MAX_TRIES: usize = 5;

/// Parse one line of prompt input.
///
/// An empty line picks the default (`Recent`).
pub fn parse_choice(line: &str) -> Option<Variant> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(Variant::default());
    }
    trimmed.parse::<usize>().ok().and_then(Variant::from_index)
}

/// Parse a yes/no answer. An empty line means yes.
pub fn parse_confirm(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Show `prompt` until `parse` accepts an answer.
///
/// Returns `None` when input ends first.
fn ask<I, O, T>(
    input: &mut I,
    output: &mut O,
    prompt: &str,
    max_tries: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>>
where
    I: BufRead,
    O: Write,
{
    for attempt in 1..=max_tries {
        write!(output, "{prompt}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            debug!("Input closed on attempt {}", attempt);
            return Ok(None);
        }

        if let Some(answer) = parse(&line) {
            debug!("Accepted answer {:?} on attempt {}", line.trim(), attempt);
            return Ok(Some(answer));
        }

        warn!("Invalid answer {:?} (attempt {}/{})", line.trim(), attempt, max_tries);
        writeln!(output, "Invalid Input. Please try again.")?;
    }

    writeln!(output, "\nToo many tries. Exiting...")?;
    Err(CudaInstallError::TooManyTries { tries: max_tries })
}

/// Ask the operator which package set to install.
///
/// Re-prompts on invalid input and fails with `TooManyTries` after
/// `max_tries` rejected answers. End of input counts as an empty answer.
pub fn select_variant<I: BufRead, O: Write>(
    input: &mut I,
    output: &mut O,
    manifest: &Manifest,
    max_tries: usize,
) -> Result<Variant> {
    let prompt = format!(
        "Current cuda support choices:\n\tRecent: {:?}\n\tCompatible: {:?}\n\
         Select your version, (0 | Default) Recent, (1) Compatible: ",
        manifest.recent.support, manifest.compatible.support
    );

    Ok(ask(input, output, &prompt, max_tries, parse_choice)?.unwrap_or_default())
}

/// Ask whether to go ahead with downloading and installing.
///
/// Closed input declines, so nothing is installed without an answer.
pub fn confirm_install<I: BufRead, O: Write>(
    input: &mut I,
    output: &mut O,
    max_tries: usize,
) -> Result<bool> {
    let prompt = "Would you like to proceed with the installation? [Y/n] ";
    Ok(ask(input, output, prompt, max_tries, parse_confirm)?.unwrap_or(false))
}
