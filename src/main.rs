//! folio - EPUB package reader

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use folio::{Epub, ManifestEntry, Metadata, Options, SpineItem, TocNode, Traversal};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Read EPUB packages and serve their chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    folio info book.epub                        Show metadata and structure
    folio toc book.epub                         Print the table of contents
    folio chapter book.epub ch1 --image-root /static
    folio extract book.epub out/ --link-root /read")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Prefix for rewritten image and media references
    #[arg(long, global = true, value_name = "ROOT")]
    image_root: Option<String>,

    /// Prefix for rewritten hyperlinks
    #[arg(long, global = true, value_name = "ROOT")]
    link_root: Option<String>,

    /// Treatment of references that climb above the package root
    #[arg(long, global = true, value_enum, default_value_t = Traversal::Preserve)]
    traversal: Traversal,

    /// Keep scripts, styles and event handlers in rendered chapters
    #[arg(long, global = true)]
    no_sanitize: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show package metadata and structure
    Info {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the table of contents
    Toc {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Print a rendered chapter, by manifest id or spine position
    Chapter {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Manifest id, or a spine position when numeric
        #[arg(value_name = "CHAPTER")]
        chapter: String,
    },
    /// Extract manifest entries (all archive members if none are given)
    Extract {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Manifest ids to extract
        #[arg(value_name = "ID")]
        ids: Vec<String>,
    },
}

#[derive(Serialize)]
struct Info<'a> {
    descriptor: &'a str,
    metadata: &'a Metadata,
    manifest: Vec<&'a ManifestEntry>,
    spine: &'a [SpineItem],
    toc: &'a [TocNode],
    cover: Option<&'a str>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let options = options(&cli);

    let result = match &cli.command {
        Command::Info { input, json } => show_info(input, options, *json),
        Command::Toc { input } => show_toc(input, options),
        Command::Chapter { input, chapter } => show_chapter(input, options, chapter),
        Command::Extract { input, dest, ids } => extract(input, options, dest, ids),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn options(cli: &Cli) -> Options {
    let mut options = Options::new()
        .with_traversal(cli.traversal)
        .with_sanitize(!cli.no_sanitize);
    if let Some(root) = &cli.image_root {
        options = options.with_image_root(root);
    }
    if let Some(root) = &cli.link_root {
        options = options.with_link_root(root);
    }
    options
}

fn show_info(path: &Path, options: Options, json: bool) -> Result<(), String> {
    let epub = Epub::open_with(path, options).map_err(|e| e.to_string())?;
    let structure = epub.structure();

    if json {
        let info = Info {
            descriptor: &structure.descriptor_path,
            metadata: epub.metadata(),
            manifest: epub.manifest().iter().collect(),
            spine: epub.spine(),
            toc: epub.toc(),
            cover: epub.cover().map(|entry| entry.href.as_str()),
        };
        let out = serde_json::to_string_pretty(&info).map_err(|e| e.to_string())?;
        println!("{out}");
        return Ok(());
    }

    let meta = epub.metadata();
    println!("File: {}", path.display());
    println!("Title: {}", meta.title().unwrap_or("(untitled)"));
    let creators = meta.creators();
    if !creators.is_empty() {
        println!("Creators: {}", creators.join(", "));
    }
    if let Some(language) = meta.language() {
        println!("Language: {language}");
    }
    if let Some(identifier) = meta.identifier() {
        println!("Identifier: {identifier}");
    }
    println!("Descriptor: {}", structure.descriptor_path);
    if let Some(cover) = epub.cover() {
        println!("Cover: {}", cover.href);
    }
    println!("Spine items: {}", epub.spine().len());
    println!("TOC entries: {}", folio::package::toc::flatten(epub.toc()).len());
    println!("Manifest entries: {}", epub.manifest().len());
    println!("Media types: {}", epub.manifest().media_types().join(", "));

    let dangling: Vec<&str> = epub
        .spine()
        .iter()
        .filter(|item| epub.manifest().lookup_by_id(&item.idref).is_none())
        .map(|item| item.idref.as_str())
        .collect();
    if !dangling.is_empty() {
        println!("Dangling spine ids: {}", dangling.join(", "));
    }

    Ok(())
}

fn show_toc(path: &Path, options: Options) -> Result<(), String> {
    let epub = Epub::open_with(path, options).map_err(|e| e.to_string())?;
    for node in epub.toc() {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &TocNode, depth: usize) {
    let target = match &node.fragment {
        Some(fragment) => format!("{}#{fragment}", node.file_name),
        None => node.file_name.clone(),
    };
    println!("{}{} -> {target}", "  ".repeat(depth), node.name);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn show_chapter(path: &Path, options: Options, chapter: &str) -> Result<(), String> {
    let epub = Epub::open_with(path, options).map_err(|e| e.to_string())?;
    let html = match chapter.parse::<usize>() {
        Ok(position) if epub.manifest().lookup_by_id(chapter).is_none() => epub.spine_chapter(position),
        _ => epub.chapter(chapter),
    }
    .map_err(|e| e.to_string())?;
    println!("{html}");
    Ok(())
}

fn extract(path: &Path, options: Options, dest: &Path, ids: &[String]) -> Result<(), String> {
    let epub = Epub::open_with(path, options).map_err(|e| e.to_string())?;
    let written = if ids.is_empty() {
        epub.extract_all(dest)
    } else {
        epub.extract(dest, ids)
    }
    .map_err(|e| e.to_string())?;
    println!("Extracted {} file(s) to {}", written.len(), dest.display());
    Ok(())
}
