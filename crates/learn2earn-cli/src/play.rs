//! Interactive course player.
//!
//! Reads commands from stdin and drives a [`CourseSession`]. Reward claims go
//! to a [`RecordingSigner`], so nothing is broadcast.

use std::sync::Arc;
use std::time::Duration;

use learn2earn_chain::{Learn2EarnContract, RecordingSigner};
use learn2earn_course::{Config, Course, CourseSession, SessionHooks};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::onchain;

/// Terminator for multi-line code input.
const END_OF_CODE: &str = ".end";

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PlayCommand {
    Show,
    Hint,
    Code,
    Load(String),
    Reset,
    Run,
    Next,
    Prev,
    Goto(usize),
    Status,
    Claim,
    Back,
    Help,
}

impl PlayCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Err(String::new());
        };
        let arg = parts.next();

        match (word, arg) {
            ("show", None) => Ok(Self::Show),
            ("hint", None) => Ok(Self::Hint),
            ("code", None) => Ok(Self::Code),
            ("load", Some(path)) => Ok(Self::Load(path.to_string())),
            ("load", None) => Err("Usage: load <FILE>".to_string()),
            ("reset", None) => Ok(Self::Reset),
            ("run", None) => Ok(Self::Run),
            ("next", None) => Ok(Self::Next),
            ("prev", None) => Ok(Self::Prev),
            ("goto", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Goto(n - 1)),
                _ => Err(format!("Not a module number: {n}")),
            },
            ("goto", None) => Err("Usage: goto <N>".to_string()),
            ("status", None) => Ok(Self::Status),
            ("claim", None) => Ok(Self::Claim),
            ("back" | "quit" | "exit", None) => Ok(Self::Back),
            ("help", None) => Ok(Self::Help),
            _ => Err(format!("Unknown command: {line} (type 'help')")),
        }
    }
}

/// Prints session callbacks.
#[derive(Debug, Default)]
struct ConsoleHooks {
    reward_label: String,
}

impl SessionHooks for ConsoleHooks {
    fn on_module_success(&mut self, index: usize) {
        println!("✓ Module {} complete!", index + 1);
    }

    fn on_course_complete(&mut self, course_id: &str) {
        println!("🎉 {} claimed for completing {course_id}", self.reward_label);
    }

    fn on_back(&mut self) {
        println!("Back to the course list");
    }
}

/// Plays `course` until the learner goes back or stdin closes.
pub async fn play(course: Arc<Course>, config: &Config, wallet: Option<String>) -> anyhow::Result<()> {
    let contract = Learn2EarnContract::new(&config.contract.address)?;
    let hooks = ConsoleHooks {
        reward_label: config.reward_label.clone(),
    };
    let mut session = CourseSession::new(Arc::clone(&course), hooks).with_contract(contract);
    let signer = RecordingSigner::new();
    let run_delay = Duration::from_millis(config.run_delay_ms);

    let mut code = session.current_module()?.starter_code.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{} {} ({} modules)", course.icon, course.title, course.len());
    if let Some(wallet) = wallet.as_deref() {
        let completed = onchain::completed_courses(&onchain::node(config), config, wallet).await;
        if completed.contains(&course.id) {
            println!("✓ {wallet} already completed this course on chain");
        }
    }
    println!("Type 'help' for commands.");
    show(&session)?;

    loop {
        print_prompt(&session);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match PlayCommand::parse(line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            PlayCommand::Show => show(&session)?,
            PlayCommand::Hint => {
                if session.toggle_hint() {
                    println!("💡 {}", session.current_module()?.hint);
                } else {
                    println!("Hint hidden");
                }
            }
            PlayCommand::Code => {
                println!("Enter code, finish with '{END_OF_CODE}' on its own line:");
                code = read_code(&mut lines).await?;
            }
            PlayCommand::Load(path) => match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    code = text;
                    println!("Loaded {path}");
                }
                Err(e) => println!("Failed to read '{path}': {e}"),
            },
            PlayCommand::Reset => {
                code.clone_from(&session.current_module()?.starter_code);
                println!("Editor reset to starter code");
            }
            PlayCommand::Run => {
                println!("Running...");
                tokio::time::sleep(run_delay).await;
                let outcome = session.run(&code);
                for line in &outcome.output {
                    println!("  {line}");
                }
                match outcome.message() {
                    None => {
                        if session.status().is_course_complete() {
                            println!(
                                "🏆 Course complete! Type 'claim' to earn {}",
                                config.reward_label
                            );
                        }
                    }
                    Some(message) => println!("✗ {message}"),
                }
            }
            PlayCommand::Next | PlayCommand::Prev | PlayCommand::Goto(_) => {
                let moved = match command {
                    PlayCommand::Next => session.next(),
                    PlayCommand::Prev => session.previous(),
                    PlayCommand::Goto(index) => session.go_to(index),
                    _ => Ok(()),
                };
                match moved {
                    Ok(()) => {
                        code.clone_from(&session.current_module()?.starter_code);
                        show(&session)?;
                    }
                    Err(e) => println!("{e}"),
                }
            }
            PlayCommand::Status => print_status(&session),
            PlayCommand::Claim => {
                let Some(wallet) = wallet.as_deref() else {
                    println!("Pass --wallet <ADDRESS> to claim the reward");
                    continue;
                };
                match session.claim_reward(&signer, wallet).await {
                    Ok(receipt) => println!("Transaction: {}", receipt.txid),
                    Err(e) => println!("{e}"),
                }
            }
            PlayCommand::Back => break,
            PlayCommand::Help => print_help(),
        }
    }

    let state = session.back();
    tracing::debug!(
        course_id = %state.course_id,
        completed = state.completed_modules.len(),
        status = %state.status,
        "Session ended"
    );
    Ok(())
}

async fn read_code(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<String> {
    let mut code = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == END_OF_CODE {
            break;
        }
        code.push(line);
    }
    Ok(code.join("\n"))
}

fn show<H: SessionHooks>(session: &CourseSession<H>) -> anyhow::Result<()> {
    let index = session.state().current_module;
    let module = session.current_module()?;

    println!();
    println!("=== Module {}/{}: {} ===", index + 1, session.course().len(), module.title);
    println!("{}", theory_text(&module.theory));
    println!();
    println!("Task: {}", module.task);
    println!("Starter code:");
    for line in module.starter_code.lines() {
        println!("  {line}");
    }
    Ok(())
}

fn print_prompt<H: SessionHooks>(session: &CourseSession<H>) {
    use std::io::Write;

    print!("[{}/{}] > ", session.state().current_module + 1, session.course().len());
    std::io::stdout().flush().ok();
}

fn print_status<H: SessionHooks>(session: &CourseSession<H>) {
    let state = session.state();
    println!(
        "Progress: {}/{} modules ({:.0}%), status: {}",
        state.completed_modules.len(),
        session.course().len(),
        session.completion_ratio() * 100.0,
        state.status
    );
    for (index, module) in session.course().modules.iter().enumerate() {
        let marker = if state.completed_modules.contains(&index) {
            "✓"
        } else if index == state.current_module {
            "▶"
        } else if session.can_go_to(index) {
            " "
        } else {
            "🔒"
        };
        println!("  {marker} {}. {}", index + 1, module.title);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  show          Show the current module");
    println!("  hint          Toggle the hint");
    println!("  code          Type new code (finish with '{END_OF_CODE}')");
    println!("  load <FILE>   Load code from a file");
    println!("  reset         Restore the starter code");
    println!("  run           Run the code and check the output");
    println!("  next, prev    Move between modules");
    println!("  goto <N>      Jump to module N");
    println!("  status        Show progress");
    println!("  claim         Claim the completion reward");
    println!("  back          Leave the course");
}

/// Theory HTML as plain terminal text.
fn theory_text(html: &str) -> String {
    let text = match Regex::new(r"<[^>]+>") {
        Ok(tags) => tags.replace_all(html, "").into_owned(),
        Err(_) => html.to_string(),
    };
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(PlayCommand::parse("run"), Ok(PlayCommand::Run));
        assert_eq!(PlayCommand::parse("quit"), Ok(PlayCommand::Back));
        assert_eq!(
            PlayCommand::parse("load  lesson.py"),
            Ok(PlayCommand::Load("lesson.py".to_string()))
        );
    }

    #[test]
    fn test_parse_goto_is_one_based() {
        assert_eq!(PlayCommand::parse("goto 3"), Ok(PlayCommand::Goto(2)));
        assert!(PlayCommand::parse("goto 0").is_err());
        assert!(PlayCommand::parse("goto x").is_err());
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = PlayCommand::parse("dance").unwrap_err();
        assert!(err.contains("Unknown command"));
    }

    #[test]
    fn test_theory_text_strips_tags() {
        let html = "<h3>Loops</h3><p>Use <code>x &lt; 5</code></p>";
        assert_eq!(theory_text(html), "LoopsUse x < 5");
    }
}
