use anyhow::{Context, Result};
use range_context_config::Config;
use range_context_engine::ancestors::path_from_incl_to_boundary_incl;
use range_context_engine::{
    Document, NodeId, Range, Strategy, TagFormatter, apply_context, extract_markers,
    render_with_markers,
};
use std::{env, path::PathBuf, process};

#[derive(Debug, PartialEq, Eq)]
struct Args {
    unformat: bool,
    config_path: Option<PathBuf>,
    format: String,
    markup: String,
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut unformat = false;
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--unformat" => unformat = true,
            "--config" => config_path = Some(PathBuf::from(iter.next()?)),
            flag if flag.starts_with("--") => return None,
            _ => positional.push(arg.clone()),
        }
    }
    let [format, markup] = <[String; 2]>::try_from(positional).ok()?;
    Some(Args {
        unformat,
        config_path,
        format,
        markup,
    })
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = explicit else {
        let config = Config::load()?;
        log::debug!("config from {}: {config:?}", Config::config_path().display());
        return Ok(config.unwrap_or_default());
    };
    let path = Config::expand_path(path).unwrap_or_else(|| path.clone());
    let Some(config) = Config::load_from_path(&path)? else {
        anyhow::bail!("config file {} does not exist", path.display());
    };
    log::debug!("config from {}: {config:?}", path.display());
    Ok(config)
}

/// Nearest inclusive ancestor of the range start named `host`.
fn find_editing_host(doc: &Document, range: &Range, host: &str) -> Option<NodeId> {
    let path = path_from_incl_to_boundary_incl(doc, range.start().node, |d, n| d.has_name(n, host));
    path.last().copied().filter(|&n| doc.has_name(n, host))
}

fn run(args: &Args, config: &Config) -> Result<(String, Strategy)> {
    let element = config.element_for(&args.format);
    let (mut doc, root, mut range) = extract_markers(&args.markup)
        .with_context(|| format!("Failed to read fragment {:?}", args.markup))?;

    let mut policy = if args.unformat {
        TagFormatter::removing(element)
    } else {
        TagFormatter::new(element)
    };
    if let Some(host) = config.editing_host.as_deref() {
        match find_editing_host(&doc, &range, host) {
            Some(node) => policy = policy.with_editing_host(node),
            None => log::warn!("No <{host}> editing host around the range; using the root"),
        }
    }

    let strategy = apply_context(&mut doc, &mut range, &policy)
        .with_context(|| format!("Failed to apply <{element}>"))?;
    log::debug!("{} <{element}>: {strategy:?}", if args.unformat { "removed" } else { "applied" });
    Ok((render_with_markers(&doc, root, &range)?, strategy))
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("range-context", String::as_str);
    let Some(parsed) = parse_args(args.get(1..).unwrap_or_default()) else {
        eprintln!("Usage: {program} [--unformat] [--config PATH] <format> <markup>");
        eprintln!("Mark the range with {{ }} between nodes or [ ] inside text, e.g.");
        eprintln!("  {program} bold '<p>So[me te]xt</p>'");
        process::exit(1);
    };

    let config = load_config(parsed.config_path.as_ref())?;
    let (output, _) = run(&parsed, &config)?;
    println!("{output}");
    Ok(())
}
