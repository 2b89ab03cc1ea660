//! Interactive REPL on rustyline.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use taskpilot_agent::Copilot;
use taskpilot_core::Config;

pub async fn run(mut copilot: Copilot, initial_query: Option<String>) -> anyhow::Result<()> {
    println!("taskpilot {} - type 'exit' or Ctrl-D to quit", env!("CARGO_PKG_VERSION"));
    println!();

    let mut editor = DefaultEditor::new()?;
    let history_path = Config::config_dir().join("history.txt");
    if editor.load_history(&history_path).is_err() {
        debug!("No history file yet at {:?}", history_path);
    }

    if let Some(query) = initial_query {
        answer(&mut copilot, &query).await;
    }

    loop {
        match editor.readline("taskpilot> ") {
            Ok(line) => {
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if matches!(query, "exit" | "quit" | "q") {
                    break;
                }
                let _ = editor.add_history_entry(query);
                answer(&mut copilot, query).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C drops the current line, not the session
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    editor.save_history(&history_path)?;
    println!("Goodbye!");
    Ok(())
}

async fn answer(copilot: &mut Copilot, query: &str) {
    match copilot.process(query).await {
        Ok(response) => {
            println!("{}", response.text);
            for warning in &response.warnings {
                eprintln!("warning: {warning}");
            }
            println!();
        }
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(suggestion) = e.recovery_suggestion() {
                eprintln!("hint: {suggestion}");
            }
            println!();
        }
    }
}
