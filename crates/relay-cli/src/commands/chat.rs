//! Line-oriented terminal chat over the turn orchestrator.

use super::store::{print_projects, print_sessions};
use super::{ensure_available, log_settings};
use anyhow::{Result, bail};
use async_trait::async_trait;
use relay_application::chat::{short_id, short_path};
use relay_application::{ChatId, LivenessSignal, TurnOrchestrator, TurnOutcome, UserId};
use relay_core::RelayConfig;
use relay_core::session::{ProjectInfo, SessionStateTracker, SessionSummary};
use relay_infrastructure::FsTranscriptRepository;
use relay_interaction::ClaudeCodeExecutor;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// The terminal is a single chat.
const LOCAL_CHAT: ChatId = 0;

const SESSION_LIST_LIMIT: usize = 10;

const PULSE_INTERVAL: Duration = Duration::from_secs(5);

const HELP: &str = "\
Commands:
  /projects             list projects
  /cd [n|text]          switch project by number or path fragment
  /sessions             list recent sessions of the current project
  /resume <n|id>        resume a listed session, a session id or an id prefix
  /new                  start a new conversation
  /model [name]         show or set the model
  /budget [amount]      show or set the budget cap in USD
  /status               show the current project, session and settings
  /approve [id]         approve requested permissions
  /deny [id]            deny requested permissions
  /quit                 exit
Anything else is sent to Claude.";

/// Prints a marker on stderr while a turn is running.
struct StderrPulse;

#[async_trait]
impl LivenessSignal for StderrPulse {
    async fn pulse(&self, _chat_id: ChatId) {
        eprintln!("[working...]");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Projects,
    Cd(Option<&'a str>),
    Sessions,
    Resume(Option<&'a str>),
    New,
    Model(Option<&'a str>),
    Budget(Option<&'a str>),
    Status,
    Approve(Option<&'a str>),
    Deny(Option<&'a str>),
    Help,
    Quit,
    Unknown(&'a str),
    Prompt(&'a str),
}

fn parse_line(line: &str) -> Option<ReplCommand<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ReplCommand::Prompt(line));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|arg| !arg.is_empty())),
        None => (rest, None),
    };
    let command = match name {
        "projects" => ReplCommand::Projects,
        "cd" => ReplCommand::Cd(arg),
        "sessions" => ReplCommand::Sessions,
        "resume" => ReplCommand::Resume(arg),
        "new" => ReplCommand::New,
        "model" => ReplCommand::Model(arg),
        "budget" => ReplCommand::Budget(arg),
        "status" => ReplCommand::Status,
        "approve" => ReplCommand::Approve(arg),
        "deny" => ReplCommand::Deny(arg),
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(name),
    };
    Some(command)
}

struct ChatRepl {
    orchestrator: TurnOrchestrator,
    user_id: UserId,
    /// Last listing shown by `/sessions`, for `/resume <n>`.
    last_sessions: Vec<SessionSummary>,
}

impl ChatRepl {
    /// Handles one line. Returns false when the user asked to quit.
    async fn handle(&mut self, command: ReplCommand<'_>) -> Result<bool> {
        match command {
            ReplCommand::Projects => {
                self.show_projects().await?;
            }
            ReplCommand::Cd(query) => self.change_project(query).await?,
            ReplCommand::Sessions => self.show_sessions().await?,
            ReplCommand::Resume(arg) => self.resume(arg).await?,
            ReplCommand::New => {
                self.orchestrator.new_conversation(LOCAL_CHAT).await;
                println!("Conversation reset. Starting fresh!");
            }
            ReplCommand::Model(None) => {
                let options = self.orchestrator.options().await;
                println!("Current model: {}\nUsage: /model <name>", options.model);
            }
            ReplCommand::Model(Some(model)) => {
                self.orchestrator.set_model(model).await;
                println!("Model set to: {}", model);
            }
            ReplCommand::Budget(None) => {
                let options = self.orchestrator.options().await;
                println!(
                    "Current budget: {}\nUsage: /budget <amount>",
                    options.max_budget_usd.as_deref().unwrap_or("not set")
                );
            }
            ReplCommand::Budget(Some(amount)) => {
                self.orchestrator.set_budget(Some(amount.to_string())).await;
                println!("Budget cap set to: ${}", amount);
            }
            ReplCommand::Status => println!("{}", self.orchestrator.status(LOCAL_CHAT).await),
            ReplCommand::Approve(id) => self.answer_approval(id, true).await?,
            ReplCommand::Deny(id) => self.answer_approval(id, false).await?,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => return Ok(false),
            ReplCommand::Unknown(name) => println!("Unknown command: /{} (try /help)", name),
            ReplCommand::Prompt(prompt) => self.send(prompt).await?,
        }
        Ok(true)
    }

    async fn show_projects(&self) -> Result<Vec<ProjectInfo>> {
        let projects = self.orchestrator.list_projects().await?;
        if projects.is_empty() {
            println!("No projects found.");
        } else {
            println!("Projects:");
            print_projects(&projects);
        }
        Ok(projects)
    }

    async fn change_project(&mut self, query: Option<&str>) -> Result<()> {
        let Some(query) = query else {
            let chat = self.orchestrator.chat(LOCAL_CHAT).await;
            println!("Current directory: {}", short_path(&chat.working_directory));
            self.show_projects().await?;
            return Ok(());
        };

        match self.orchestrator.switch_project(LOCAL_CHAT, query).await? {
            Some(project) => {
                println!("Switched to: {}", short_path(&project.resolved_path));
                self.show_sessions().await?;
            }
            None => println!("Project not found: {}", query),
        }
        Ok(())
    }

    async fn show_sessions(&mut self) -> Result<()> {
        if !self.orchestrator.chat(LOCAL_CHAT).await.has_project() {
            println!("No project selected.");
            self.show_projects().await?;
            return Ok(());
        }

        self.last_sessions = self
            .orchestrator
            .list_sessions(LOCAL_CHAT, SESSION_LIST_LIMIT)
            .await?;
        if self.last_sessions.is_empty() {
            println!("No sessions yet. Send a message to start one.");
        } else {
            println!("Recent sessions (/resume <n>):");
            print_sessions(&self.last_sessions);
        }
        Ok(())
    }

    async fn resume(&mut self, arg: Option<&str>) -> Result<()> {
        let Some(arg) = arg else {
            return self.show_sessions().await;
        };

        let listed = arg
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|index| self.last_sessions.get(index))
            .cloned();
        if let Some(summary) = listed {
            let chat = self.orchestrator.resume_session(LOCAL_CHAT, &summary).await;
            println!(
                "Resumed: \"{}\"\nSession: {}...\nWorking dir: {}",
                summary.first_message_preview.chars().take(60).collect::<String>(),
                short_id(&chat.session_id),
                short_path(&chat.working_directory)
            );
            return Ok(());
        }

        match self.orchestrator.resume_by_id(LOCAL_CHAT, arg).await? {
            Some(record) => println!(
                "Resumed session: {}...\nWorking dir: {}",
                short_id(&record.session_id),
                short_path(&record.working_directory)
            ),
            None => println!("Session not found: {}", arg),
        }
        Ok(())
    }

    async fn answer_approval(&self, id: Option<&str>, approve: bool) -> Result<()> {
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let pending = self.orchestrator.pending_approvals(LOCAL_CHAT).await;
                match pending.as_slice() {
                    [] => {
                        println!("Nothing to approve.");
                        return Ok(());
                    }
                    [only] => only.id.clone(),
                    several => {
                        println!("Several requests are pending, pick one:");
                        for request in several {
                            println!("  {}: {} tool call(s)", request.id, request.denials.len());
                        }
                        return Ok(());
                    }
                }
            }
        };

        if !approve {
            if self.orchestrator.deny(self.user_id, &id).await? {
                println!("Permission denied.");
            } else {
                println!("This permission request has expired.");
            }
            return Ok(());
        }

        println!("Permission granted. Resuming...");
        match self.orchestrator.approve(self.user_id, &id).await? {
            Some(outcome) => render_outcome(&outcome),
            None => println!("This permission request has expired."),
        }
        Ok(())
    }

    async fn send(&self, prompt: &str) -> Result<()> {
        if !self.orchestrator.chat(LOCAL_CHAT).await.has_project() {
            let projects = self.orchestrator.list_projects().await?;
            if !projects.is_empty() {
                println!("No project selected. Pick one with /cd <n>:");
                print_projects(&projects);
                return Ok(());
            }
        }

        let outcome = self
            .orchestrator
            .send_prompt(self.user_id, LOCAL_CHAT, prompt)
            .await?;
        render_outcome(&outcome);
        Ok(())
    }
}

fn render_outcome(outcome: &TurnOutcome) {
    if !outcome.result.text.is_empty() {
        println!("{}", outcome.result.text);
    }
    if let Some(request) = &outcome.approval {
        println!("\n{}", request.summary);
        println!("Reply /approve {} or /deny {}", request.id, request.id);
    }
}

pub async fn run(config: RelayConfig, user_id: UserId) -> Result<()> {
    let problems = config.validate();
    if !problems.is_empty() {
        bail!("Invalid configuration:\n  {}", problems.join("\n  "));
    }
    if !config.is_user_allowed(user_id) {
        bail!("User {} is not in allowed_user_ids", user_id);
    }

    let sessions = SessionStateTracker::new();
    let executor = ClaudeCodeExecutor::from_config(&config, sessions.clone());
    ensure_available(&executor)?;
    log_settings(&config);

    let transcripts = FsTranscriptRepository::new(&config.projects_dir);
    let orchestrator = TurnOrchestrator::new(
        Arc::new(executor),
        Arc::new(transcripts),
        sessions,
        &config,
    )
    .with_liveness(Arc::new(StderrPulse), PULSE_INTERVAL);

    let mut repl = ChatRepl {
        orchestrator,
        user_id,
        last_sessions: Vec::new(),
    };

    println!("relay chat. Type /help for commands.");
    repl.show_projects().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match repl.handle(command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("Error: {:#}", e),
        }
    }
    Ok(())
}
