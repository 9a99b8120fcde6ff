use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use env_logger::Builder;
use log::LevelFilter;

use trainergen_core::{
    load_structure, parse_response, resolve_context, select_family, validation_mode, EngineContext, FeatureType,
    FieldResolver, FileWriter, PromptBuilder, PromptConfig, ResolutionStrategy, Sandbox, ScriptValidator,
    TargetFamily, TrainerFeature, ValidatorConfig,
};

/// Engine-aware field resolution and trainer script validation
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
    /// Enable verbose logging (use multiple times for more verbosity)
    #[clap(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every field of a structure dump into read/write expressions
    Resolve {
        #[clap(flatten)]
        target: TargetArgs,
        /// Print the resolutions as JSON instead of a table
        #[clap(long)]
        json: bool,
        /// Output directory
        #[clap(short, long, default_value = "./trainer")]
        output: PathBuf,
    },
    /// Build the system and user prompts for one feature
    Prompt {
        #[clap(flatten)]
        target: TargetArgs,
        /// Feature name, e.g. "Infinite Health"
        #[clap(long)]
        feature: String,
        /// Feature type, e.g. infinite_health
        #[clap(long = "type", default_value = "custom")]
        feature_type: String,
        #[clap(long, default_value = "")]
        description: String,
        #[clap(long, default_value = "")]
        hotkey: String,
        /// Classes shown in the structure section
        #[clap(long, default_value = "60")]
        max_classes: usize,
        /// Output directory
        #[clap(short, long, default_value = "./trainer")]
        output: PathBuf,
    },
    /// Parse a generator response and validate the script in it
    Validate {
        /// File holding the raw response
        #[clap(short, long)]
        response: PathBuf,
        /// Resolution strategy tag; omit for write-instruction scripts
        #[clap(long)]
        strategy: Option<String>,
        /// Target family tag, used when --strategy is not given
        #[clap(long)]
        engine: Option<String>,
        /// Skip the luac syntax check
        #[clap(long)]
        no_syntax_check: bool,
        /// Feature name recorded in the report
        #[clap(long, default_value = "script")]
        feature: String,
        /// Output directory
        #[clap(short, long, default_value = "./trainer")]
        output: PathBuf,
    },
    /// Check an AOB pattern's format and, optionally, a scan's hit count
    CheckAob {
        pattern: String,
        /// Number of matches a scan returned
        #[clap(long)]
        hits: Option<usize>,
        /// Name used in messages
        #[clap(long, default_value = "pattern")]
        name: String,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Structure dump (JSON) to resolve
    #[clap(short, long)]
    structure: PathBuf,
    /// Target family: Unity_Mono, Unity_IL2CPP, UE4, UE5; defaults to the dump's engine
    #[clap(short, long)]
    engine: Option<String>,
    /// Engine version; defaults to the dump's version
    #[clap(long)]
    engine_version: Option<String>,
    #[clap(long, default_value = "64")]
    bitness: u32,
    /// Path of the game executable, used to fingerprint outputs
    #[clap(long, default_value = "")]
    exe: String,
    /// Module to scan for root patterns
    #[clap(long, default_value = "")]
    module: String,
    /// Managed assembly holding the game classes
    #[clap(long)]
    assembly: Option<String>,
}

impl TargetArgs {
    fn context(&self, engine: &str, version: &str) -> Result<EngineContext> {
        if self.bitness != 32 && self.bitness != 64 {
            bail!(trainergen_core::TrainerError::InvalidArgument(format!(
                "bitness must be 32 or 64, got {}",
                self.bitness
            )));
        }
        let tag = self.engine.as_deref().unwrap_or(engine);
        let mut context = EngineContext::new(TargetFamily::from_tag(tag));
        context.engine_version = self.engine_version.clone().unwrap_or_else(|| version.to_string());
        context.bitness = self.bitness;
        context.exe_path = self.exe.clone();
        context.module_name = self.module.clone();
        if let Some(assembly) = &self.assembly {
            context.assembly_name = assembly.clone();
        }
        Ok(context)
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new().filter_level(log_level).format_timestamp(None).init();

    let start_time = Instant::now();
    print_banner();

    let outcome = match cli.command {
        Command::Resolve { target, json, output } => run_resolve(&target, json, &output),
        Command::Prompt {
            target,
            feature,
            feature_type,
            description,
            hotkey,
            max_classes,
            output,
        } => run_prompt(&target, &feature, &feature_type, &description, &hotkey, max_classes, &output),
        Command::Validate {
            response,
            strategy,
            engine,
            no_syntax_check,
            feature,
            output,
        } => run_validate(&response, strategy.as_deref(), engine.as_deref(), no_syntax_check, &feature, &output),
        Command::CheckAob { pattern, hits, name } => run_check_aob(&pattern, hits, &name),
    };

    match outcome {
        Ok(true) => {
            println!(
                "\n{} {:?}",
                "Done in".bright_black().bold(),
                start_time.elapsed()
            );
        }
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", "==========================".bright_red().bold());
    println!("{}", "  _____         _         ".bright_white().on_bright_red().bold());
    println!("{}", " |_   _| _ __ _(_)_ _     ".bright_white().on_bright_red().bold());
    println!("{}", "   | || '_/ _` | | ' \\    ".bright_white().on_bright_red().bold());
    println!("{}", "   |_||_| \\__,_|_|_||_|   ".bright_white().on_bright_red().bold());
    println!("{}", "                    gen   ".bright_white().on_bright_red().bold());
    println!("{}", "==========================".bright_red().bold());
    println!();
}

fn section(title: &str) {
    println!(
        "{}",
        format!(
            "\n=================== {} ===================",
            format!(" {} ", title).bright_white().on_bright_blue().italic()
        )
        .bright_blue()
        .bold()
    );
}

fn print_written(paths: &[PathBuf]) {
    println!("\n{}", "Results written to:".bright_green().bold());
    for path in paths {
        println!("- {}", path.display());
    }
}

fn run_resolve(target: &TargetArgs, json: bool, output: &Path) -> Result<bool> {
    let structure = load_structure(&target.structure)
        .with_context(|| format!("loading {}", target.structure.display()))?;
    let context = target.context(&structure.engine, &structure.version)?;
    let strategy = select_family(context.engine_type).strategy();
    let (context, preamble) = resolve_context(&structure, context);

    if json {
        println!("{}", serde_json::to_string_pretty(&context.resolutions)?);
    } else {
        section("TARGET");
        println!("{} {}", "Target:".bright_blue().bold(), context);
        println!("{} {}", "Strategy:".bright_blue().bold(), strategy);
        println!(
            "{} {} of {}",
            "Resolved fields:".bright_blue().bold(),
            context.resolutions.len(),
            structure.field_count()
        );

        section("FIELDS");
        for r in &context.resolutions {
            let confidence = if r.confidence < 1.0 {
                format!("({:.1})", r.confidence).bright_yellow().italic()
            } else {
                format!("({:.1})", r.confidence).bright_black().italic()
            };
            println!("- {}.{} {}", r.class_name.bold(), r.field_name, confidence);
            println!("    {} {}", "read :".bright_black(), r.lua_read_expr);
            println!("    {} {}", "write:".bright_black(), r.lua_write_expr);
        }
    }

    let written = FileWriter::for_context(&context).write_resolutions(&context, strategy.as_str(), &preamble, output)?;
    print_written(&written);
    Ok(true)
}

fn run_prompt(
    target: &TargetArgs,
    feature: &str,
    feature_type: &str,
    description: &str,
    hotkey: &str,
    max_classes: usize,
    output: &Path,
) -> Result<bool> {
    let structure = load_structure(&target.structure)
        .with_context(|| format!("loading {}", target.structure.display()))?;
    let feature = TrainerFeature::new(feature, feature_type.parse::<FeatureType>()?)?
        .with_description(description)
        .with_hotkey(hotkey);
    let (context, _) = resolve_context(&structure, target.context(&structure.engine, &structure.version)?);

    let builder = PromptBuilder::new(PromptConfig {
        max_classes,
        ..PromptConfig::default()
    });
    let (system, user) = builder.build(&structure, &feature, Some(&context));

    section("PROMPT");
    println!("{} {}", "Feature:".bright_blue().bold(), feature);
    println!("{} {}", "Target:".bright_blue().bold(), context);
    println!(
        "{} {} / {} chars",
        "System / user:".bright_blue().bold(),
        system.len(),
        user.len()
    );

    let written = FileWriter::for_context(&context).write_prompt(&system, &user, output)?;
    print_written(&written);
    Ok(true)
}

fn run_validate(
    response: &Path,
    strategy: Option<&str>,
    engine: Option<&str>,
    no_syntax_check: bool,
    feature: &str,
    output: &Path,
) -> Result<bool> {
    let raw = std::fs::read_to_string(response).with_context(|| format!("reading {}", response.display()))?;
    let strategy = match (strategy, engine) {
        (Some(tag), _) => Some(tag.parse::<ResolutionStrategy>()?),
        (None, Some(engine)) => validation_mode(engine),
        (None, None) => None,
    };

    let feature = TrainerFeature::new(feature, FeatureType::Custom)?;
    let script = parse_response(&raw, feature, "")?;
    let validator = ScriptValidator::new(ValidatorConfig {
        use_syntax_check: !no_syntax_check,
        ..ValidatorConfig::default()
    });
    let result = validator.validate(&script, strategy);

    section("VALIDATION");
    println!("{} {}", "Script:".bright_blue().bold(), script);
    println!(
        "{} {}",
        "Mode:".bright_blue().bold(),
        strategy.map(|s| s.to_string()).unwrap_or_else(|| "legacy".to_string())
    );
    if !validator.has_syntax_check() {
        println!("{}", "  (luac not used, syntax not checked)".bright_yellow().italic());
    }
    for check in &result.checks_run {
        println!("- {}", check.bright_black());
    }
    for error in &result.errors {
        println!("{} {}", "error:".bright_red().bold(), error);
    }
    for warning in &result.warnings {
        println!("{} {}", "warning:".bright_yellow().bold(), warning);
    }
    let status = if result.passed {
        result.to_string().bright_green().bold()
    } else {
        result.to_string().bright_red().bold()
    };
    println!("\n{}", status);

    let written = FileWriter::new().write_validation(
        &script,
        strategy.as_ref().map(ResolutionStrategy::as_str),
        &result,
        output,
    )?;
    print_written(&[written]);
    Ok(result.passed)
}

fn run_check_aob(pattern: &str, hits: Option<usize>, name: &str) -> Result<bool> {
    section("AOB");
    let well_formed = Sandbox::validate_aob_pattern(pattern);
    if well_formed {
        println!("{} {}", "[PASS]".bright_green().bold(), "pattern is well formed");
    } else {
        println!(
            "{} {}",
            "[FAIL]".bright_red().bold(),
            "pattern needs 4+ hex/?? tokens and at most 60% wildcards"
        );
    }

    let unique = match hits {
        Some(count) => {
            let result = Sandbox::check_aob_unique(count, name);
            if result.passed {
                println!("{}", result.to_string().bright_green());
            } else {
                println!("{}", result.to_string().bright_red());
            }
            result.passed
        }
        None => true,
    };

    Ok(well_formed && unique)
}
