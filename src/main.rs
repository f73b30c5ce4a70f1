//! NPS Form Builder command-line host

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use nps_form_builder::commands;
use nps_form_builder::config::AppConfig;
use nps_form_builder::AppState;

const LOG_TAIL_LINES: usize = 5;

#[derive(Parser)]
#[command(name = "nps-forms")]
#[command(about = "Edit NPS campaign forms and record responses")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "nps-forms.json")]
    config: PathBuf,

    /// Mirror log output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the campaign's form
    Show { campaign: String },
    /// Append a field (text, select, radio or nps)
    AddField { campaign: String, kind: String },
    RemoveField { campaign: String, field: String },
    /// Change a field's attributes
    UpdateField {
        campaign: String,
        field: String,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        required: Option<bool>,
        /// Replace the option list (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,
    },
    AddOption { campaign: String, field: String },
    SetOption {
        campaign: String,
        field: String,
        index: usize,
        value: String,
    },
    RemoveOption {
        campaign: String,
        field: String,
        index: usize,
    },
    /// Move a field from one display position to another
    Move { campaign: String, from: usize, to: usize },
    /// Final save of the form
    Commit { campaign: String },
    /// Delete the campaign's form and responses
    DeleteCampaign { campaign: String },
    /// Record a response
    Respond {
        campaign: String,
        score: u8,
        #[arg(long)]
        feedback: Option<String>,
        /// FIELD_ID=VALUE, value parsed as JSON when possible (repeatable)
        #[arg(long = "answer", value_parser = parse_answer)]
        answers: Vec<(String, serde_json::Value)>,
    },
    Responses { campaign: String },
    Summary { campaign: String },
    Groups,
    AddGroup { name: String },
    /// Delete a group and detach its contacts
    DeleteGroup { group: String },
    /// List contacts, optionally only one group's
    Contacts {
        #[arg(long)]
        group: Option<String>,
    },
    AddContact {
        name: String,
        email: String,
        phone: String,
        /// Group id (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,
        #[arg(long)]
        company: Option<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Find contacts by name, email, phone, company or tag
    SearchContacts { query: String },
    DeleteContact { contact: String },
}

fn parse_answer(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected FIELD_ID=VALUE, got {}", raw))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

async fn run(state: &AppState, command: Command) -> Result<(), String> {
    match command {
        Command::Show { campaign } => print_json(&commands::show_form(state, &campaign).await?),
        Command::AddField { campaign, kind } => {
            print_json(&commands::add_field(state, &campaign, &kind).await?)
        }
        Command::RemoveField { campaign, field } => {
            print_json(&commands::remove_field(state, &campaign, &field).await?)
        }
        Command::UpdateField {
            campaign,
            field,
            kind,
            label,
            required,
            options,
        } => {
            let options = (!options.is_empty()).then_some(options);
            let form =
                commands::update_field(state, &campaign, &field, kind.as_deref(), label, required, options).await?;
            print_json(&form)
        }
        Command::AddOption { campaign, field } => {
            print_json(&commands::add_option(state, &campaign, &field).await?)
        }
        Command::SetOption {
            campaign,
            field,
            index,
            value,
        } => print_json(&commands::set_option(state, &campaign, &field, index, value).await?),
        Command::RemoveOption { campaign, field, index } => {
            print_json(&commands::remove_option(state, &campaign, &field, index).await?)
        }
        Command::Move { campaign, from, to } => {
            print_json(&commands::move_field(state, &campaign, from, to).await?)
        }
        Command::Commit { campaign } => print_json(&commands::commit_form(state, &campaign).await?),
        Command::DeleteCampaign { campaign } => commands::delete_campaign(state, &campaign).await,
        Command::Respond {
            campaign,
            score,
            feedback,
            answers,
        } => {
            let answers: BTreeMap<_, _> = answers.into_iter().collect();
            let response = commands::submit_response(state, &campaign, score, feedback, answers).await?;
            print_json(&response)
        }
        Command::Responses { campaign } => {
            print_json(&commands::list_responses(state, &campaign).await?)
        }
        Command::Summary { campaign } => {
            print_json(&commands::campaign_summary(state, &campaign).await?)
        }
        Command::Groups => print_json(&commands::list_groups(state).await?),
        Command::AddGroup { name } => print_json(&commands::create_group(state, &name).await?),
        Command::DeleteGroup { group } => commands::delete_group(state, &group).await,
        Command::Contacts { group } => {
            print_json(&commands::list_contacts(state, group.as_deref()).await?)
        }
        Command::AddContact {
            name,
            email,
            phone,
            groups,
            company,
            tags,
        } => {
            let contact = commands::add_contact(state, &name, &email, &phone, groups, company, tags).await?;
            print_json(&contact)
        }
        Command::SearchContacts { query } => {
            print_json(&commands::search_contacts(state, &query).await?)
        }
        Command::DeleteContact { contact } => commands::delete_contact(state, &contact).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut options = config.logger_options();
    options.stderr = cli.verbose;
    let _log_guard = match rolling_logger::init_logger_with(config.log_dir(), "nps-forms", options) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to init logger: {}", e);
            None
        }
    };

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            let _ = rolling_logger::error(&format!("Failed to open storage: {}", e));
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&state, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::warn!("Command failed: {}", e);
            eprintln!("{}", e);
            if !cli.verbose {
                print_log_tail();
            }
            ExitCode::FAILURE
        }
    }
}

/// Show what was logged just before a failure
fn print_log_tail() {
    let lines = rolling_logger::recent_lines();
    let tail = &lines[lines.len().saturating_sub(LOG_TAIL_LINES)..];
    for line in tail {
        eprintln!("  {}", line);
    }
    if let Some(dir) = rolling_logger::log_dir() {
        eprintln!("Logs: {}", dir.display());
    }
}
