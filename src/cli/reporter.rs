//! Terminal reporter for execution events
//!
//! Compile tasks get a spinner while they run when stdout is a terminal.
//! Everything else, and all output when stdout is piped, is one line per
//! event. In JSON mode each event is printed as a single JSON object.

use crate::cli::output::{create_spinner, format_execution_event};
use crate::execution::ExecutionEvent;
use console::Term;
use indicatif::{MultiProgress, ProgressBar};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

pub struct TerminalReporter {
    json: bool,
    interactive: bool,
    multi: MultiProgress,
    spinners: Mutex<HashMap<Uuid, ProgressBar>>,
}

impl TerminalReporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            interactive: !json && Term::stdout().is_term(),
            multi: MultiProgress::new(),
            spinners: Mutex::new(HashMap::new()),
        }
    }

    pub fn handle(&self, event: &ExecutionEvent) {
        if self.json {
            println!("{}", event.to_json());
            return;
        }

        match event {
            ExecutionEvent::TaskStarted { run_id, task, kind } if self.interactive && kind == "compile" => {
                let spinner = self.multi.add(create_spinner(format!("Compiling {}", task)));
                self.spinners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(*run_id, spinner);
            }
            ExecutionEvent::TaskCompleted { run_id, .. } | ExecutionEvent::TaskFailed { run_id, .. } => {
                let spinner = self
                    .spinners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(run_id);
                if let Some(spinner) = spinner {
                    spinner.finish_and_clear();
                    self.multi.remove(&spinner);
                }
                self.print(format_execution_event(event));
            }
            _ => self.print(format_execution_event(event)),
        }
    }

    fn print(&self, line: String) {
        if self.interactive {
            // Keeps the line above any live spinners
            if self.multi.println(&line).is_ok() {
                return;
            }
        }
        println!("{}", line);
    }
}
