//! The `storylens models` command for browsing and installing vision models.

use clap::{Args, Subcommand};
use storylens_core::{name_matches, CancelSignal, Config, ModelDescriptor, StoryClient};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List the built-in vision models
    List {
        /// Only show recommended models
        #[arg(long)]
        recommended: bool,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which catalog models are installed on the server
    Status,

    /// Download a model to the server (the default model if none is given)
    Pull {
        /// Model name, e.g. llava:7b
        name: Option<String>,
    },
}

/// One catalog row, ready to print.
fn format_row(model: &ModelDescriptor, default_model: &str, status: Option<&str>) -> String {
    let star = if model.recommended { "*" } else { " " };
    let default_marker = if model.name == default_model {
        "  (default)"
    } else {
        ""
    };
    match status {
        Some(status) => format!(
            "  {star} {:12} {:9} {:>6} RAM  {:14}{default_marker}",
            model.name, model.size_label, model.min_ram, status
        ),
        None => format!(
            "  {star} {:12} {:9} {:>6} RAM{default_marker}",
            model.name, model.size_label, model.min_ram
        ),
    }
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    let client = StoryClient::from_config(config)?;
    let catalog = client.catalog();
    let default_model = client.resolve_model(None);

    match args.command {
        ModelsCommand::List { recommended, json } => {
            let models: Vec<&ModelDescriptor> = if recommended {
                catalog.recommended().collect()
            } else {
                catalog.list().iter().collect()
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&models)?);
                return Ok(());
            }

            println!("Vision models (* = recommended):\n");
            for model in models {
                println!("{}", format_row(model, &default_model, None));
                println!("      {}", model.description);
            }
        }

        ModelsCommand::Status => {
            let installed = client.availability().installed().await.map_err(|e| {
                anyhow::anyhow!(
                    "Could not reach Ollama at {}: {e}\n\n  \
                     Hint: Start it with `ollama serve`.",
                    client.endpoint()
                )
            })?;

            println!("Models on {}:\n", client.endpoint());
            for model in catalog.list() {
                let status = if installed.iter().any(|m| name_matches(&m.name, model.name)) {
                    "ready"
                } else {
                    "not installed"
                };
                println!("{}", format_row(model, &default_model, Some(status)));
            }

            let others: Vec<&str> = installed
                .iter()
                .map(|m| m.name.as_str())
                .filter(|name| !catalog.list().iter().any(|d| name_matches(name, d.name)))
                .collect();
            if !others.is_empty() {
                println!("\n  Other installed models: {}", others.join(", "));
            }
        }

        ModelsCommand::Pull { name } => {
            let name = name.unwrap_or(default_model);
            let info = catalog.get_info(&name);
            if info.name == name {
                tracing::info!("{name}: {} download, needs {} RAM", info.size_label, info.min_ram);
            }

            let cancel = CancelSignal::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let pulled = client.ensure_model(&name, &cancel).await?;
            if pulled {
                println!("{name} is ready.");
            } else {
                println!("{name} is already installed.");
            }
        }
    }

    Ok(())
}
