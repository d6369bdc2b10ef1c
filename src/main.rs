use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use dealmind_lab_lib::api::TrainingConfig;
use dealmind_lab_lib::commands::{entries, export, prompts, sessions, settings, table, training};
use dealmind_lab_lib::config::AppConfig;
use dealmind_lab_lib::db::models::PromptParameters;
use dealmind_lab_lib::export::{ExportFormat, ExportOptions};
use dealmind_lab_lib::filter::{parse_tags, EntryFilter};
use dealmind_lab_lib::llm::LatencyProfile;
use dealmind_lab_lib::{init_tracing, AppState};

#[derive(Parser)]
#[command(name = "dealmind")]
#[command(about = "DealMind Lab - negotiation dataset studio", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Conversation entries
    Entries {
        #[command(subcommand)]
        action: EntriesAction,
    },
    /// Distinct tags, intents and outcomes
    Tags,
    /// Export entries as a fine-tuning dataset
    Export(ExportArgs),
    /// System prompt and its version history
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },
    /// Model provider settings
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },
    /// Saved table dataset
    Table {
        #[command(subcommand)]
        action: TableAction,
    },
    /// Saved simulation sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Trained models on the backend
    Training {
        #[command(subcommand)]
        action: TrainingAction,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Substring of the title or intent
    #[arg(long, default_value = "")]
    search: String,
    /// Comma-separated tags; entries with any of them match
    #[arg(long, default_value = "")]
    tags: String,
    #[arg(long)]
    intent: Option<String>,
    #[arg(long)]
    outcome: Option<String>,
    #[arg(long)]
    complexity: Option<String>,
}

impl FilterArgs {
    fn into_filter(self) -> EntryFilter {
        EntryFilter {
            search: self.search,
            tags: parse_tags(&self.tags).into_iter().collect(),
            intent: self.intent,
            outcome: self.outcome,
            complexity: self.complexity,
        }
    }
}

#[derive(Subcommand)]
enum EntriesAction {
    /// List entries passing the filter
    List(FilterArgs),
    /// Import a JSON array of entries
    Import { file: PathBuf },
    Delete { id: String },
    /// Toggle the favorite flag
    Favorite { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Jsonl,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Jsonl => ExportFormat::Jsonl,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, value_enum, default_value = "jsonl")]
    format: FormatArg,
    /// Leave id, title, timestamps and metadata out of JSONL records
    #[arg(long)]
    no_metadata: bool,
    /// Entry ids to export; every entry passing the filter when omitted
    #[arg(long = "id")]
    ids: Vec<String>,
    /// Print a preview instead of writing the file
    #[arg(long)]
    preview: bool,
    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Subcommand)]
enum PromptAction {
    /// The current prompt
    Show,
    /// Every saved version, oldest first
    History,
    /// Edit the current prompt and save it as the next version
    Save {
        #[arg(long)]
        system_prompt_file: Option<PathBuf>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        top_p: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Show a saved version
    Load { id: String },
    /// Show the default prompt
    Reset,
    /// Add a few-shot example and save a new version
    AddExample {
        #[arg(long)]
        input: String,
        #[arg(long)]
        output: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Remove a few-shot example and save a new version
    RemoveExample { id: String },
    /// The prompt with its examples, ready to paste
    Preview,
}

#[derive(Subcommand)]
enum ProvidersAction {
    /// Configs with masked API keys
    List,
    /// Models available for chatting
    Models,
    /// Update and save one provider's config
    Set {
        provider: String,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Test one provider, or every ready one
    Test {
        provider: Option<String>,
        #[arg(long, default_value = settings::TEST_MESSAGE)]
        message: String,
    },
}

#[derive(Subcommand)]
enum TableAction {
    /// The most recently saved table dataset
    Show,
}

#[derive(Subcommand)]
enum SessionsAction {
    List,
}

#[derive(Subcommand)]
enum TrainingAction {
    /// Models already trained
    List,
    /// Train on a dataset and record the resulting model
    Start {
        dataset: String,
        #[arg(long, default_value_t = 32)]
        batch_size: u32,
        #[arg(long, default_value_t = 10)]
        epochs: u32,
        #[arg(long, default_value_t = 0.001)]
        learning_rate: f64,
        /// Percent of rows held out for testing
        #[arg(long, default_value_t = 20)]
        test_size: u32,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}

async fn run(command: Commands, state: &mut AppState) -> Result<(), String> {
    match command {
        Commands::Entries { action } => match action {
            EntriesAction::List(filter) => {
                entries::set_filter(state, filter.into_filter());
                print_json(&entries::list_entries(state))
            }
            EntriesAction::Import { file } => {
                let raw = std::fs::read_to_string(&file).map_err(|e| e.to_string())?;
                let count = entries::import_entries(state, &raw)?;
                print_json(&serde_json::json!({ "imported": count }))
            }
            EntriesAction::Delete { id } => {
                let deleted = entries::delete_entry(state, &id)?;
                print_json(&serde_json::json!({ "deleted": deleted }))
            }
            EntriesAction::Favorite { id } => {
                let favorite = entries::toggle_favorite(state, &id)?;
                print_json(&serde_json::json!({ "is_favorite": favorite }))
            }
        },
        Commands::Tags => print_json(&entries::get_tag_index(state)),
        Commands::Export(args) => {
            entries::set_filter(state, args.filter.into_filter());
            if args.ids.is_empty() {
                entries::select_all_filtered(state);
            } else {
                entries::select_ids(state, args.ids);
            }
            let options = ExportOptions {
                format: args.format.into(),
                include_metadata: !args.no_metadata,
            };
            if args.preview {
                let preview = export::preview_export(state, options)?;
                println!("{preview}");
                return print_json(&export::export_summary(state, options));
            }
            print_json(&export::export_dataset(state, options)?)
        }
        Commands::Prompt { action } => match action {
            PromptAction::Show => print_json(&prompts::get_current_prompt(state)),
            PromptAction::History => print_json(&prompts::list_prompt_versions(state)),
            PromptAction::Save {
                system_prompt_file,
                notes,
                temperature,
                top_p,
                max_tokens,
            } => {
                let system_prompt = system_prompt_file
                    .map(std::fs::read_to_string)
                    .transpose()
                    .map_err(|e| e.to_string())?;
                let current = prompts::get_current_prompt(state).parameters;
                let parameters = PromptParameters {
                    temperature: temperature.unwrap_or(current.temperature),
                    top_p: top_p.unwrap_or(current.top_p),
                    max_tokens: max_tokens.unwrap_or(current.max_tokens),
                };
                prompts::edit_prompt(
                    state,
                    prompts::PromptEdit {
                        system_prompt,
                        notes,
                        parameters: Some(parameters),
                    },
                )?;
                print_json(&prompts::save_prompt_version(state)?)
            }
            PromptAction::Load { id } => print_json(&prompts::load_prompt_version(state, &id)?),
            PromptAction::Reset => print_json(&prompts::reset_prompt(state)),
            PromptAction::AddExample {
                input,
                output,
                description,
            } => {
                prompts::add_few_shot_example(state, &input, &output, &description)?;
                print_json(&prompts::save_prompt_version(state)?)
            }
            PromptAction::RemoveExample { id } => {
                if !prompts::remove_few_shot_example(state, &id) {
                    return Err(format!("Example not found: {id}"));
                }
                print_json(&prompts::save_prompt_version(state)?)
            }
            PromptAction::Preview => {
                println!("{}", prompts::few_shot_preview(state));
                Ok(())
            }
        },
        Commands::Providers { action } => match action {
            ProvidersAction::List => print_json(&settings::get_model_configs(state)),
            ProvidersAction::Models => print_json(&settings::get_available_models(state)),
            ProvidersAction::Set {
                provider,
                api_key,
                model,
                base_url,
                enabled,
            } => {
                settings::update_model_config(
                    state,
                    &provider,
                    settings::ModelConfigEdit {
                        api_key,
                        model,
                        base_url,
                        is_enabled: enabled,
                    },
                )?;
                settings::save_model_configs(state)?;
                print_json(&settings::get_model_configs(state).get(&provider))
            }
            ProvidersAction::Test { provider, message } => match provider {
                Some(provider) => {
                    let result =
                        settings::test_model(state, &provider, &message, LatencyProfile::default())
                            .await?;
                    print_json(&result)
                }
                None => {
                    let results = settings::test_all_models(
                        state,
                        &message,
                        LatencyProfile::default(),
                        settings::TEST_ALL_PAUSE,
                    )
                    .await;
                    print_json(&results)
                }
            },
        },
        Commands::Table { action } => match action {
            TableAction::Show => print_json(&table::get_latest_table(state)),
        },
        Commands::Sessions { action } => match action {
            SessionsAction::List => print_json(&sessions::list_sessions(state)),
        },
        Commands::Training { action } => match action {
            TrainingAction::List => print_json(&training::list_trained_models(state).await?),
            TrainingAction::Start {
                dataset,
                batch_size,
                epochs,
                learning_rate,
                test_size,
            } => {
                let config = TrainingConfig {
                    batch_size,
                    epochs,
                    learning_rate,
                    test_size,
                    training_size: 100u32.saturating_sub(test_size),
                };
                print_json(&training::start_training(state, &dataset, config).await?)
            }
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.config.log);

    let mut state = match AppState::open(cli.config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("failed to open data store: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &mut state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
