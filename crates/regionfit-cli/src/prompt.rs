//! Console side of the selection procedure
//!
//! Uses dialoguer when both stdin and stdout are terminals. Otherwise each
//! answer is one line read from stdin, so the binary can be scripted; EOF or
//! a blank line counts as no input.

use std::io::{self, BufRead, IsTerminal, Write};

use dialoguer::{Confirm, Input};
use regionfit_core::services::report;
use regionfit_core::{AutoApprove, Interaction, RegionAssessment, SelectionEvent};

use crate::output::print_event;

enum Answers {
    Terminal,
    Lines(io::StdinLock<'static>),
}

impl Answers {
    fn detect() -> Self {
        if io::stdin().is_terminal() && io::stdout().is_terminal() {
            Answers::Terminal
        } else {
            log::debug!("Non-interactive session, reading answers from stdin");
            Answers::Lines(io::stdin().lock())
        }
    }

    /// One free-form answer; `None` on EOF, blank input or a prompt error
    fn text(&mut self, question: &str) -> Option<String> {
        let answer = match self {
            Answers::Terminal => Input::<String>::new()
                .with_prompt(question)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| log::warn!("Prompt failed: {}", e))
                .ok()?,
            Answers::Lines(stdin) => {
                eprint!("{}: ", question);
                let _ = io::stderr().flush();
                let mut line = String::new();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => {
                        eprintln!();
                        return None;
                    }
                    Ok(_) => line,
                }
            }
        };

        let answer = answer.trim();
        if answer.is_empty() {
            None
        } else {
            Some(answer.to_string())
        }
    }

    /// Yes/no answer; anything but y/yes/n/no is asked again
    fn confirm(&mut self, question: &str) -> Option<bool> {
        if let Answers::Terminal = self {
            return Confirm::new()
                .with_prompt(question)
                .interact_opt()
                .map_err(|e| log::warn!("Prompt failed: {}", e))
                .ok()
                .flatten();
        }

        loop {
            let answer = self.text(&format!("{} [y/n]", question))?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Some(true),
                "n" | "no" => return Some(false),
                _ => eprintln!("Please answer y or n."),
            }
        }
    }
}

/// Interaction printing events to stderr and asking the user
///
/// With `auto` set, prompts are answered by [`AutoApprove`] instead.
pub struct ConsoleInteraction {
    answers: Option<Answers>,
    auto: Option<AutoApprove>,
    quiet: bool,
}

impl ConsoleInteraction {
    pub fn new(auto: bool, quiet: bool) -> Self {
        Self {
            answers: None,
            auto: auto.then(AutoApprove::new),
            quiet,
        }
    }

    fn answers(&mut self) -> &mut Answers {
        self.answers.get_or_insert_with(Answers::detect)
    }

    fn show_pool(&self, heading: &str, pool: &[RegionAssessment]) {
        if self.quiet {
            return;
        }
        eprintln!("{}", heading);
        eprintln!("{}", report::render_table(&report::rows(pool)));
    }
}

impl Interaction for ConsoleInteraction {
    fn notify(&mut self, event: &SelectionEvent<'_>) {
        print_event(event.level(), &event.to_string(), self.quiet);
    }

    fn confirm_switch(&mut self, primary: &RegionAssessment, alternatives: &[RegionAssessment]) -> Option<bool> {
        if let Some(auto) = self.auto.as_mut() {
            return auto.confirm_switch(primary, alternatives);
        }
        self.show_pool("Recommended alternatives:", alternatives);
        self.answers().confirm(&format!(
            "Switch away from '{}' to another region?",
            primary.region
        ))
    }

    fn choose_region(&mut self, pool: &[RegionAssessment]) -> Option<String> {
        if let Some(auto) = self.auto.as_mut() {
            return auto.choose_region(pool);
        }
        self.show_pool("Regions with sufficient quota:", pool);
        self.answers().text("Enter a region")
    }

    fn confirm_candidate(&mut self, candidate: &RegionAssessment) -> Option<bool> {
        if let Some(auto) = self.auto.as_mut() {
            return auto.confirm_candidate(candidate);
        }
        self.answers().confirm(&format!(
            "Region '{}' has less than the recommended headroom. Use it anyway?",
            candidate.region
        ))
    }
}
