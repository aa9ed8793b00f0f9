use abe_build::command::ShellRunner;
use abe_build::pipeline::{self, CompileEvent, Project, Site};
use abe_build::{config, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "abe")]
#[command(about = "Build pipeline for the AMP by Example site")]
#[command(long_about = "\
Build pipeline for the AMP by Example site

Every HTML file under the source directory is one example. An optional
sibling .json file carries its metadata. Examples are merged with the
project templates into finished AMP pages.

Project structure:

  .
  ├── config.toml                  # Hosts, paths, template names, ad defaults
  ├── src/                         # Samples
  │   ├── 10_Ads/                  # Category (numeric prefix is dropped)
  │   │   ├── basic.html           # → dist/ads/basic.html
  │   │   └── basic.json           # Sidecar: title, tags, template, preview...
  │   └── components/carousel.html # → dist/components/carousel.html
  ├── templates/                   # Handlebars: index, example, preview, new-example
  ├── static/                      # Copied verbatim into dist/
  └── snapshots/                   # Last accepted output, compared by `diff`

Sidecar metadata (all keys optional):
  title, category, description, tags, template, preview, previewTemplate,
  ad { width, height, labelHeight }, draft

Run 'abe gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root (holds config.toml)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every sample and write the site, assets and sitemap
    Build,
    /// Compile in memory and check every page against the AMP rules
    Validate,
    /// Compile and overwrite the snapshot directory
    Snapshot,
    /// Compile and compare against the snapshot directory
    Diff,
    /// Scaffold a new sample from the new-example template
    New {
        /// Human-readable title; the file name is derived from it
        title: String,
        /// Category the sample belongs to
        #[arg(long)]
        category: Option<String>,
    },
    /// Run the shell commands of a deploy target
    Deploy {
        /// Target name from [deploy.<target>] in config.toml
        target: String,
    },
    /// Run the configured lint commands
    Lint,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let load = || Project::load(&cli.root);

    let ok = match cli.command {
        Command::Build => {
            let project = load()?;
            println!("==> Compiling {}", project.source_dir().display());
            let site = compile_with_progress(&project)?;
            println!("==> Writing {}", project.output_dir().display());
            let summary = pipeline::write_site(&project, &site)?;
            output::print_failures(&site.failures);
            output::print_build_summary(&site, &summary);
            site.failures.is_empty()
        }
        Command::Validate => {
            let project = load()?;
            let site = pipeline::compile_site(&project, None)?;
            let report = pipeline::validate_site(&site);
            output::print_failures(&site.failures);
            output::print_validation_report(&report);
            site.failures.is_empty() && report.passed()
        }
        Command::Snapshot => {
            let project = load()?;
            let site = pipeline::compile_site(&project, None)?;
            let manifest = pipeline::snapshot_site(&project, &site)?;
            output::print_failures(&site.failures);
            for line in output::format_snapshot_saved(&manifest, &project.snapshot_dir()) {
                println!("{}", line);
            }
            site.failures.is_empty()
        }
        Command::Diff => {
            let project = load()?;
            let site = pipeline::compile_site(&project, None)?;
            let report = pipeline::diff_site(&project, &site);
            output::print_failures(&site.failures);
            output::print_diff_report(&report);
            site.failures.is_empty() && report.is_clean()
        }
        Command::New { title, category } => {
            let project = load()?;
            let path = pipeline::new_example(&project, &title, category.as_deref())?;
            for line in output::format_new_example(relative_to(&path, &project.root)) {
                println!("{}", line);
            }
            true
        }
        Command::Deploy { target } => {
            let project = load()?;
            println!("==> Deploying to {target}");
            pipeline::deploy(&project, &target, &ShellRunner, output::print_command_step)?;
            true
        }
        Command::Lint => {
            let project = load()?;
            pipeline::lint(&project, &ShellRunner, output::print_command_step)?;
            true
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Compile with a printer thread reporting each sample as it finishes.
fn compile_with_progress(project: &Project) -> Result<Site, pipeline::RunError> {
    let (tx, rx) = mpsc::channel::<CompileEvent>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_compile_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::compile_site(project, Some(tx));
    printer.join().unwrap();
    result
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
