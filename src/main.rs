// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cvm_fichas::{BatchResult, Config, Registry, Session, Template};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cvm-fichas")]
#[command(version)]
#[command(about = "Consulta de fundos (CVM) por CNPJ e geração de fichas", long_about = None)]
struct Cli {
    #[command(flatten)]
    sources: SourceArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct SourceArgs {
    /// URL of registro_fundo_classe.zip
    #[arg(long, global = true)]
    registry_url: Option<String>,

    /// Local copy of the registry archive (skips the download)
    #[arg(long, global = true)]
    registry_file: Option<PathBuf>,

    /// Ficha template (.docx)
    #[arg(long, global = true)]
    template: Option<PathBuf>,
}

impl SourceArgs {
    fn apply(self, config: &mut Config) {
        if let Some(url) = self.registry_url {
            config.registry_url = url;
        }
        if let Some(file) = self.registry_file {
            config.registry_file = Some(file);
        }
        if let Some(template) = self.template {
            config.template_path = template;
        }
    }
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Interactive terminal UI (default)
    Ui,

    /// Look up CNPJs and print the result
    Consulta {
        /// CNPJs, punctuated or not; ',' ';' and newlines also split
        #[arg(required = true)]
        cnpjs: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Look up CNPJs and write the zip of fichas
    Fichas {
        #[arg(required = true)]
        cnpjs: Vec<String>,

        /// Output zip (defaults to the configured output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    cli.sources.apply(&mut config);

    let command = cli.command.unwrap_or(Commands::Ui);
    init_logging(&config, matches!(command, Commands::Ui));

    // Startup order: template, then registry. Both are fatal.
    let template = Template::load(&config.template_path)?;
    let registry = load_registry(&config)?;

    match command {
        Commands::Ui => run_ui_mode(&registry, &template, &config)?,
        Commands::Consulta { cnpjs, json } => run_consulta(&registry, &cnpjs, json)?,
        Commands::Fichas { cnpjs, output } => {
            let output = output.unwrap_or_else(|| config.output_path.clone());
            run_fichas(&registry, &template, &cnpjs, output)?
        }
    }

    Ok(())
}

fn init_logging(config: &Config, interactive: bool) {
    // The TUI owns the terminal: only errors go to stderr there
    let filter = if interactive {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_registry(config: &Config) -> Result<Registry> {
    println!("📥 Loading CVM registry...");

    let registry = match &config.registry_file {
        Some(path) => Registry::from_file(path)?,
        None => Registry::fetch(&config.registry_url)?,
    };

    println!(
        "✓ {} fundos, {} classes, {} subclasses\n",
        registry.fundo.len(),
        registry.classe.len(),
        registry.subclasse.len()
    );

    Ok(registry)
}

fn run_consulta(registry: &Registry, cnpjs: &[String], json: bool) -> Result<()> {
    let mut session = Session::new();
    let batch = session.consult(registry, &cnpjs.join("\n"));

    if json {
        println!("{}", serde_json::to_string_pretty(batch)?);
    } else {
        print_batch(batch);
    }

    Ok(())
}

fn run_fichas(
    registry: &Registry,
    template: &Template,
    cnpjs: &[String],
    output: PathBuf,
) -> Result<()> {
    let mut session = Session::new();
    print_batch(session.consult(registry, &cnpjs.join("\n")));

    let Some(archive) = session.generate(template)? else {
        eprintln!("❌ Nenhum fundo encontrado - nenhuma ficha gerada.");
        std::process::exit(1);
    };

    std::fs::write(&output, archive)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("\n📦 Fichas salvas em {}", output.display());

    Ok(())
}

/// One block per fund, fields listed vertically
fn print_batch(batch: &BatchResult) {
    for record in batch.records.records() {
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for (name, value) in record.fields() {
            println!("{:<20} {}", name, value);
        }
    }

    if !batch.malformed.is_empty() {
        println!("\n⚠️  CNPJs inválidos (não têm 14 dígitos):");
        for item in &batch.malformed {
            println!("   {}", item);
        }
    }

    if !batch.errors.is_empty() {
        println!("\n❌ Erros:");
        for err in &batch.errors {
            println!("   {}", err);
        }
    }

    if batch.records.is_empty() && batch.malformed.is_empty() && batch.errors.is_empty() {
        println!("Nenhum CNPJ informado.");
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(registry: &Registry, template: &Template, config: &Config) -> Result<()> {
    println!("Starting UI... (Press Esc to quit)\n");

    let mut app = ui::App::new(registry, template, config.output_path.clone());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_registry: &Registry, _template: &Template, _config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: cvm-fichas consulta <CNPJ>...");
    std::process::exit(1);
}
