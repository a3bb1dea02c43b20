#![warn(clippy::pedantic)]

pub mod global;
pub mod script;

use anyhow::{Context as _, Result as AnyResult};
use clap::Parser;
use layercake_core::{
    context::Context,
    data::{factory::DataFactory, template::Template, Data},
};

/// Headless layercake: builds an image from a template, runs a batch script of editing
/// operations on it and prints the resulting layer tree.
#[derive(Parser, Debug)]
#[command(name = "layercake", version)]
struct Args {
    /// TOML script of `[[step]]` operations.
    #[arg(short, long, value_name = "SCRIPT.toml")]
    script: Option<std::path::PathBuf>,
    /// Name of a loaded template to start from.
    #[arg(short, long)]
    template: Option<String>,
    /// Override the template's size, as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    size: Option<(i32, i32)>,
    /// Write the current preferences, with documentation, and exit.
    #[arg(long)]
    write_config: bool,
    /// List loaded data records and exit.
    #[arg(long)]
    list_data: bool,
}

fn parse_size(text: &str) -> Result<(i32, i32), String> {
    let (width, height) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))?;
    let parse = |s: &str| s.trim().parse::<i32>().map_err(|e| format!("{s:?}: {e}"));
    Ok((parse(width)?, parse(height)?))
}

fn load_registry<T: Data>(factory: &mut DataFactory<T>, root: Option<&std::path::Path>) {
    let Some(root) = root else {
        return;
    };
    if let Err(e) = factory.load_dir(&root.join(T::FOLDER)) {
        log::warn!("Failed to load {}:\n{e}", T::FOLDER);
    }
}

fn list_registry<T: Data>(factory: &DataFactory<T>) {
    println!("{}:", T::FOLDER);
    for data in factory.iter() {
        println!("  {}", data.name());
    }
    println!("  {} (standard)", factory.standard().name());
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }
    let args = Args::parse();

    let preferences = global::preferences();
    if args.write_config {
        let path = preferences.save()?;
        println!("wrote {}", path.display());
        return Ok(());
    }
    if preferences.did_fail_to_load() {
        log::warn!("Using default preferences.");
    }

    let mut context = Context::default();
    let data_dir = preferences.data_dir();
    load_registry(&mut context.palettes, data_dir.as_deref());
    load_registry(&mut context.patterns, data_dir.as_deref());
    load_registry(&mut context.gradients, data_dir.as_deref());
    load_registry(&mut context.brushes, data_dir.as_deref());
    load_registry(&mut context.dynamics, data_dir.as_deref());
    load_registry(&mut context.templates, data_dir.as_deref());
    if args.list_data {
        list_registry(&context.palettes);
        list_registry(&context.patterns);
        list_registry(&context.gradients);
        list_registry(&context.brushes);
        list_registry(&context.dynamics);
        list_registry(&context.templates);
        return Ok(());
    }

    let mut template: Template = match &args.template {
        Some(name) => context
            .templates
            .find(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no template named {name:?}"))?,
        None => context.templates.standard().clone(),
    };
    if let Some((width, height)) = args.size {
        template.width = width;
        template.height = height;
    }
    let mut image = template
        .create_image(&context, preferences.core.clone())
        .context("creating image")?;

    if let Some(path) = &args.script {
        let script = script::Script::load(path)?;
        script::run(&mut image, &context, &script)?;
    }
    print!("{}", script::describe(&image));
    log::debug!(
        "undo history: {} steps, {} bytes",
        image.undo_stack().depth(),
        image.undo_memsize()
    );
    Ok(())
}
