use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cinema::{
    Descriptor, DescriptorTrack, Document, Explorer, FileStore, FnTrack, MetadataTrack, Payload,
    SingleFileStore, Store, Track, Value, format_descriptor, make_parameter,
};

#[derive(Parser, Debug)]
#[command(name = "cinema", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a store's schema file.
    Info(InfoArgs),
    /// List the documents matching a partial descriptor.
    Find(FindArgs),
    /// Populate a small demonstration store.
    Demo(DemoArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Store schema file (`info.json`).
    info: PathBuf,
}

#[derive(Parser, Debug)]
struct FindArgs {
    /// Store schema file (`info.json`).
    info: PathBuf,

    /// Restrict a parameter, as `name=value`. Repeatable.
    #[arg(long = "where", value_parser = parse_assignment)]
    conditions: Vec<(String, String)>,

    /// Print one JSON object per document instead of text lines.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct DemoArgs {
    /// Directory to create the store in.
    dir: PathBuf,

    /// Pack images into one volume instead of writing one text file per document.
    #[arg(long)]
    single_file: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Find(args) => cmd_find(args),
        Command::Demo(args) => cmd_demo(args),
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{s}'")),
    }
}

fn open(path: &Path) -> anyhow::Result<Box<dyn Store>> {
    cinema::open_store(path).with_context(|| format!("open store '{}'", path.display()))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let store = open(&args.info)?;
    let info = store.core().info();

    println!(
        "store: {} ({})",
        args.info.display(),
        info.store_type().unwrap_or("FS")
    );
    if let Some(pattern) = &info.name_pattern {
        println!("pattern: {pattern}");
    }
    println!("parameters:");
    for (name, p) in store.parameters().iter() {
        let values: Vec<String> = p.values.iter().map(ToString::to_string).collect();
        println!(
            "  {name}: [{}] default {} ({})",
            values.join(", "),
            p.default,
            p.kind.as_str()
        );
    }
    let graph = store.associations();
    if !graph.is_empty() {
        println!("dependencies:");
        for dependent in graph.dependents() {
            for (controller, allowed) in graph.controllers(dependent) {
                let allowed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                println!("  {dependent} <- {controller} in [{}]", allowed.join(", "));
            }
        }
    }
    if let Some(meta) = store.metadata() {
        println!("metadata: {}", serde_json::Value::Object(meta.clone()));
    }
    Ok(())
}

fn cmd_find(args: FindArgs) -> anyhow::Result<()> {
    let store = open(&args.info)?;

    let mut query = Descriptor::new();
    for (name, text) in &args.conditions {
        let param = store.get_parameter(name)?;
        let value = param
            .value_for_component(text)
            .cloned()
            .unwrap_or_else(|| Value::parse_component(text));
        query.insert(name.clone(), value);
    }

    let mut count = 0usize;
    for doc in store.find(&query)? {
        let doc = doc?;
        if args.json {
            let line = serde_json::json!({
                "descriptor": doc.descriptor(),
                "attributes": doc.attributes,
                "payload": summarize(&doc),
            });
            println!("{line}");
        } else {
            println!("{}\t{}", format_descriptor(doc.descriptor()), summarize(&doc));
        }
        count += 1;
    }
    eprintln!("{count} document(s)");
    Ok(())
}

fn summarize(doc: &Document) -> String {
    match &doc.data {
        None => "-".to_string(),
        Some(Payload::Image(img)) => format!("{}x{} image", img.width(), img.height()),
        Some(payload) => match doc.text() {
            Some(text) => text.to_string(),
            None => format!("{} bytes", payload.len()),
        },
    }
}

fn cmd_demo(args: DemoArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("create store dir '{}'", args.dir.display()))?;
    let info = args.dir.join("info.json");

    let stats = if args.single_file {
        let mut store = SingleFileStore::new(&info);
        for name in ["phi", "theta"] {
            store.add_parameter(name, make_parameter(name, [60, 90, 120, 150])?)?;
        }
        store.create()?;
        let tracks: Vec<Box<dyn Track>> = vec![
            Box::new(MetadataTrack::image_stack()),
            Box::new(FnTrack::new(render_swatch)),
        ];
        Explorer::for_all(&mut store, tracks).explore(None)?
    } else {
        let mut store = FileStore::new(&info);
        store.add_parameter("theta", make_parameter("theta", [0, 10, 20, 30, 40])?)?;
        store.add_parameter("phi", make_parameter("phi", [0, 10, 20])?)?;
        store.set_filename_pattern("{theta}/{phi}.txt")?;
        store.create()?;
        Explorer::for_all(&mut store, vec![Box::new(DescriptorTrack)]).explore(None)?
    };

    eprintln!(
        "wrote {} document(s) to {}",
        stats.documents,
        info.display()
    );
    Ok(())
}

/// Solid 8x8 swatch whose color encodes the camera angles.
fn render_swatch(doc: &mut Document) -> cinema::CinemaResult<()> {
    let channel = |name: &str| {
        doc.descriptor()
            .get(name)
            .and_then(Value::as_f64)
            .map_or(0, |deg| (deg / 150.0 * 255.0) as u8)
    };
    let rgb = image::Rgb([channel("phi"), channel("theta"), 128]);
    doc.data = Some(image::RgbImage::from_pixel(8, 8, rgb).into());
    Ok(())
}
