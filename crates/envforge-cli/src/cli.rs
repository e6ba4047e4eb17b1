//! envforge CLI - export one section of a master TOML configuration
//!
//! Usage:
//!   envforge config.toml backend.local
//!   envforge config.toml backend --expand --json
//!   envforge config.toml sites --caddy -o Caddyfile

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use envforge_core::{Document, OutputFormat, ResolveOptions};
use tracing::Level;

/// envforge - Resolve and export sections of a templated TOML configuration
#[derive(Parser, Debug)]
#[command(name = "envforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, may contain #!import directives)
    config: PathBuf,

    /// Dotted path of the section to export (e.g., backend.local)
    #[arg(value_parser = parse_section)]
    section: String,

    /// Output in JSON format
    #[arg(short = 'j', long, overrides_with_all = ["dotenv", "yaml", "caddy", "docker", "bash"])]
    json: bool,

    /// Output in dotenv format (default)
    #[arg(long, overrides_with_all = ["json", "yaml", "caddy", "docker", "bash"])]
    dotenv: bool,

    /// Output in YAML format
    #[arg(short = 'y', long, overrides_with_all = ["json", "dotenv", "caddy", "docker", "bash"])]
    yaml: bool,

    /// Output Caddyfile server blocks (implies --expand)
    #[arg(long, overrides_with_all = ["json", "dotenv", "yaml", "docker", "bash"])]
    caddy: bool,

    /// Output docker compose YAML (implies --expand and --ignore-missing-vars)
    #[arg(short = 'd', long, overrides_with_all = ["json", "dotenv", "yaml", "caddy", "bash"])]
    docker: bool,

    /// Output a bash script that exports the variables
    #[arg(long, visible_alias = "envs", overrides_with_all = ["json", "dotenv", "yaml", "caddy", "docker"])]
    bash: bool,

    /// Allow execution of ${`shell command`} references
    #[arg(long)]
    allow_shell: bool,

    /// Kill shell commands after this many seconds
    #[arg(long, value_name = "SECS", requires = "allow_shell")]
    shell_timeout: Option<u64>,

    /// Keep references that do not resolve instead of failing
    #[arg(long, overrides_with = "strict_vars_check")]
    ignore_missing_vars: bool,

    /// Stop if a reference does not resolve (default)
    #[arg(long, overrides_with = "ignore_missing_vars")]
    strict_vars_check: bool,

    /// Include child sections (nested keys become PARENT__CHILD)
    #[arg(short = 'e', long)]
    expand: bool,

    /// Also export scalar values of parent sections
    #[arg(long)]
    inherit: bool,

    /// Write to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.yaml {
            OutputFormat::Yaml
        } else if self.caddy {
            OutputFormat::Caddy
        } else if self.docker {
            OutputFormat::Docker
        } else if self.bash {
            OutputFormat::Bash
        } else {
            OutputFormat::Dotenv
        }
    }

    fn resolve_options(&self, format: OutputFormat) -> ResolveOptions {
        let mut options = ResolveOptions::new()
            .with_allow_shell(self.allow_shell)
            .with_include_child_sections(self.expand)
            .with_ignore_missing(self.ignore_missing_vars)
            .with_inherit_parent_values(self.inherit);

        if let Some(secs) = self.shell_timeout {
            options = options.with_shell_timeout(Duration::from_secs(secs));
        }

        let mut options = format.apply_defaults(options);
        if self.strict_vars_check {
            options.ignore_missing = false;
        }
        options
    }
}

fn parse_section(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("section must not be empty".to_string());
    }
    if s.starts_with('-') {
        return Err(format!(
            "section {} is probably a flag option and not a proper section",
            s
        ));
    }
    Ok(s.to_string())
}

/// Rewrite the multi-letter short flags accepted by earlier releases
fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| {
            let arg = arg.into();
            let replacement = match arg.to_str() {
                Some("-de") => "--dotenv",
                Some("-cy") => "--caddy",
                Some("-ev") => "--envs",
                Some("-iv") => "--ignore-missing-vars",
                Some("-sv") => "--strict-vars-check",
                _ => return arg,
            };
            OsString::from(replacement)
        })
        .collect()
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::ERROR };
    // Also bridges `log` records emitted by envforge-core
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    run_from(std::env::args_os())
}

/// Run the CLI with the given arguments (the first one is the program name)
pub fn run_from<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let cli = Cli::parse_from(normalize_legacy_flags(args));
    init_logging(cli.verbose);

    let format = cli.format();
    let options = cli.resolve_options(format);
    tracing::debug!(format = format.name(), ?options, "Exporting section '{}'", cli.section);

    let content = match Document::load(&cli.config)
        .and_then(|doc| doc.render(&cli.section, format, &options))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };

    match cli.output {
        Some(output_path) => {
            if let Err(e) = std::fs::write(&output_path, &content) {
                eprintln!(
                    "{}: cannot write to file '{}': {}",
                    "Error".red(),
                    output_path.display(),
                    e
                );
                return ExitCode::from(1);
            }
            tracing::debug!("Wrote {} to {}", format.name(), output_path.display());
        }
        None => print!("{}", content),
    }

    ExitCode::SUCCESS
}
