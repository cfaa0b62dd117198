//! Strata CLI - Demand-driven image pipelines
//!
//! This is a demonstration CLI for the Strata library. It runs the
//! bilateral filter over 8-bit grayscale images.

use anyhow::{anyhow, bail, Context, Result};
use strata::io::{ImageFileReader, ImageFileWriter, ImageSink, ImageSource};
use strata::prelude::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("strata");

    if args.len() < 2 {
        print_usage(program);
        return Ok(());
    }

    match args[1].as_str() {
        "list" => list_filters(),
        "info" => {
            let filter_id = args.get(2).ok_or_else(|| anyhow!("Please specify a filter ID"))?;
            filter_info(filter_id)?;
        }
        "bilateral" => {
            if args.len() < 4 {
                print_usage(program);
                bail!("Please specify input and output paths");
            }
            run_bilateral(&args[2..])?;
        }
        "help" | "--help" | "-h" => print_usage(program),
        other => {
            print_usage(program);
            bail!("Unknown command: {}", other);
        }
    }
    Ok(())
}

fn print_usage(program: &str) {
    println!("Strata v{}", strata::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                          List all available filters");
    println!("  info <filter>                 Show detailed info about a filter");
    println!("  bilateral <in> <out> [opts]   Edge-preserving smoothing of a grayscale image");
    println!("  help                          Show this help message");
    println!();
    println!("Bilateral options:");
    println!("  --config <file.toml>   Load parameters from a configuration file");
    println!("  --domain-sigma <s>     Spatial sigma in pixels (default: 4.0)");
    println!("  --range-sigma <s>      Intensity sigma (default: 50.0)");
    println!("  --domain-mu <m>        Kernel extent in sigmas (default: 2.5)");
    println!("  --threads <n>          Worker threads, 0 = all cores (default: 0)");
    println!();
    println!("Set RUST_LOG=info to see per-node progress.");
}

fn list_filters() {
    let registry = FilterRegistry::<u8, 2>::with_builtins();
    let grouped = registry.grouped_by_category();

    println!("Available filters ({} total):", registry.len());
    println!();

    for (category, filters) in grouped {
        println!("  {}", category.display_name());
        for metadata in filters {
            println!("      {} - {}", metadata.id, metadata.description);
        }
        println!();
    }
}

fn filter_info(filter_id: &str) -> Result<()> {
    let registry = FilterRegistry::<u8, 2>::with_builtins();
    let metadata = registry
        .get_metadata(filter_id)
        .ok_or_else(|| anyhow!("Filter not found: {} (use 'list' to see available filters)", filter_id))?;

    println!("Filter: {}", metadata.name);
    println!("ID: {}", metadata.id);
    println!("Category: {}", metadata.category.display_name());
    println!("Inputs: {}", metadata.input_count);
    println!();
    println!("Description:");
    println!("  {}", metadata.description);

    if let Some(node) = registry.create(filter_id) {
        let parameters = node.parameters();
        if !parameters.is_empty() {
            println!();
            println!("Parameters:");
            for (name, value) in parameters {
                println!("  {} [{}] = {}", name, value.type_name(), value);
            }
        }
    }
    Ok(())
}

fn run_bilateral(args: &[String]) -> Result<()> {
    let input_path = &args[0];
    let output_path = &args[1];

    let mut config = PipelineConfig::default();
    let mut i = 2;
    while i < args.len() {
        let value = args
            .get(i + 1)
            .ok_or_else(|| anyhow!("Missing value for {}", args[i]))?;
        match args[i].as_str() {
            "--config" => {
                // Later flags override the file
                config = PipelineConfig::from_file(value)?;
            }
            "--domain-sigma" => {
                config.bilateral.domain_sigma =
                    strata::config::SigmaSetting::Uniform(parse_number(&args[i], value)?);
            }
            "--range-sigma" => config.bilateral.range_sigma = parse_number(&args[i], value)?,
            "--domain-mu" => config.bilateral.domain_mu = parse_number(&args[i], value)?,
            "--threads" => {
                config.execution.threads = value
                    .parse()
                    .with_context(|| format!("Invalid value for --threads: {}", value))?;
            }
            other => bail!("Unknown option: {}", other),
        }
        i += 2;
    }

    let image: ImageBuffer<u8, 2> = ImageFileReader::new(input_path)
        .read()
        .with_context(|| format!("Failed to read {}", input_path))?;

    let mut graph = ProcessingGraph::new();
    let source = graph.add_filter(ImageSourceNode::new(image));
    let filter = graph.add_filter(BilateralImageFilter::<2>::new());
    graph.set_input(filter, 0, source)?;
    config.apply_to(graph.filter_mut::<BilateralImageFilter<2>>(filter)?)?;

    let report = ValidationPipeline::default().validate(&graph);
    if !report.is_valid() {
        for error in &report.errors {
            eprintln!("  {}", error);
        }
        bail!(report.summary());
    }

    println!("Processing {} -> {}", input_path, output_path);
    let engine = ExecutionEngine::with_options(config.execution_options())?;
    let stats = engine.update(&mut graph, filter)?;

    let output = graph
        .output(filter)?
        .ok_or_else(|| anyhow!("Filter produced no output"))?;
    ImageFileWriter::new(output_path)
        .write(&*output, output.requested_region())
        .with_context(|| format!("Failed to write {}", output_path))?;

    println!(
        "Done in {:?} ({} nodes, {} worker threads)",
        stats.total_duration,
        stats.nodes_executed,
        engine.dispatcher().thread_count()
    );
    Ok(())
}

fn parse_number(flag: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", flag, value))
}
