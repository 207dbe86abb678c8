//! Main entry point for the crxscope CLI application.
//!
//! Loads a CRX container from disk or over HTTP, then lists, searches,
//! filters or extracts its contents.

use anyhow::{bail, Context, Result};
use clap::Parser;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crxscope::filter::{glob_to_regex, CompiledFilter};
use crxscope::io::read_all;
use crxscope::search::FileSearchResult;
use crxscope::tree::FileTreeNode;
use crxscope::{Cli, CrxPackage, HttpRangeReader, LocalFileReader, ReadAt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let bytes = if cli.is_http_url() {
        let reader = HttpRangeReader::new(cli.file.clone()).await?;
        let bytes = read_all(&reader, cli.max_container_size).await?;

        if !cli.is_quiet() {
            eprintln!(
                "Total bytes transferred: {}",
                format_size(reader.transferred_bytes())
            );
        }
        bytes
    } else {
        let reader = LocalFileReader::new(Path::new(&cli.file))?;
        debug!(path = %reader.path().display(), size = reader.size(), "local container");
        read_all(&reader, cli.max_container_size).await?
    };

    process_package(&bytes, &cli).await
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run every view the command line asks for; extract when none is requested.
async fn process_package(bytes: &[u8], cli: &Cli) -> Result<()> {
    let package = CrxPackage::parse_with_limit(bytes, cli.max_entries)
        .map_err(|e| anyhow::anyhow!("{} [{}]", e, e.error_code()))
        .with_context(|| format!("Cannot inspect {}", cli.file))?;

    debug!(
        version = package.header().version.as_u32(),
        archive_offset = package.header().archive_offset,
        entries = package.entries().len(),
        "package parsed"
    );

    for rejected in package.rejected() {
        warn!("Skipping entry: {}", rejected);
    }

    let filter = cli.filter_criteria().compile()?;
    let mut shown = false;

    if cli.manifest {
        show_manifest(&package, cli)?;
        shown = true;
    }

    if let Some(options) = cli.search_options() {
        let report = package.search(&options, Some(&filter))?;
        for (path, e) in &report.unreadable {
            warn!("Cannot search {}: {}", path, e);
        }
        show_search(&report.results, cli)?;
        shown = true;
    }

    if cli.tree {
        let tree = filter.filter_tree(package.tree());
        if cli.json {
            print_json(&tree)?;
        } else {
            print_tree(&tree);
        }
        shown = true;
    }

    if cli.list || cli.verbose {
        list_files(&package, &filter, cli)?;
        shown = true;
    }

    if !shown {
        extract_files(&package, &filter, cli).await?;
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_manifest(package: &CrxPackage<'_>, cli: &Cli) -> Result<()> {
    let manifest = package.manifest()?;
    if cli.json {
        return print_json(&manifest);
    }

    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("Name:        {}", field(&manifest.name));
    println!("Version:     {}", field(&manifest.version));
    println!(
        "Manifest:    v{}",
        manifest
            .manifest_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
    if let Some(description) = &manifest.description {
        println!("Description: {}", description);
    }
    let permissions = manifest.permission_names();
    if !permissions.is_empty() {
        println!("Permissions: {}", permissions.join(", "));
    }
    if !manifest.host_permissions.is_empty() {
        println!("Hosts:       {}", manifest.host_permissions.join(", "));
    }
    Ok(())
}

fn show_search(results: &[FileSearchResult], cli: &Cli) -> Result<()> {
    if cli.json {
        return print_json(results);
    }

    let mut total = 0u64;
    for file in results {
        total += file.match_count as u64;
        for m in &file.matches {
            let first_context = m.line_number as usize - m.context_before.len();
            for (i, line) in m.context_before.iter().enumerate() {
                println!("{}-{}- {}", file.file_path, first_context + i, line);
            }
            println!(
                "{}:{}:{}: {}",
                file.file_path, m.line_number, m.column_number, m.line_content
            );
            for (i, line) in m.context_after.iter().enumerate() {
                println!("{}-{}- {}", file.file_path, m.line_number as usize + 1 + i, line);
            }
            if !m.context_before.is_empty() || !m.context_after.is_empty() {
                println!("--");
            }
        }
        if file.matches.len() < file.match_count as usize {
            println!(
                "{}: {} more matches not shown",
                file.file_path,
                file.match_count as usize - file.matches.len()
            );
        }
    }

    if !cli.is_very_quiet() {
        eprintln!("{} matches in {} files", total, results.len());
    }
    Ok(())
}

/// Render a tree with box-drawing guides.
fn print_tree(root: &FileTreeNode) {
    fn walk(node: &FileTreeNode, prefix: &str) {
        let children = node.children();
        for (i, child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            let branch = if last { "└── " } else { "├── " };
            match child {
                FileTreeNode::Directory(d) => {
                    println!("{}{}{}/", prefix, branch, d.name);
                    let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
                    walk(child, &next);
                }
                FileTreeNode::File(f) => {
                    println!(
                        "{}{}{}  ({}, {})",
                        prefix,
                        branch,
                        f.name,
                        format_size(f.size),
                        f.category
                    );
                }
            }
        }
    }

    println!(".");
    walk(root, "");
    let summary = root.summarize();
    println!(
        "\n{} directories, {} files, {}",
        summary.directory_count,
        summary.file_count,
        format_size(summary.total_size)
    );
}

/// List archive entries in archive order.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, timestamps and category
fn list_files(package: &CrxPackage<'_>, filter: &CompiledFilter, cli: &Cli) -> Result<()> {
    let filtering = !cli.filter_criteria().is_empty();
    let selected: HashSet<String> = filter.matching_paths(package.tree()).into_iter().collect();

    let entries: Vec<_> = package
        .entries()
        .iter()
        .filter(|e| !filtering || (!e.is_directory && selected.contains(&e.path)))
        .collect();

    if cli.json {
        return print_json(&entries);
    }

    if cli.verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:<13}  Name",
            "Length", "Size", "Cmpr", "Date", "Time", "Category"
        );
        println!("{}", "-".repeat(84));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if !cli.verbose {
            if entry.is_directory {
                println!("{}/", entry.path);
            } else {
                println!("{}", entry.path);
            }
            continue;
        }

        let (date, time) = match entry.modified_at {
            Some(ts) => (ts.format("%Y-%m-%d").to_string(), ts.format("%H:%M").to_string()),
            None => ("-".to_string(), "-".to_string()),
        };

        let ratio = format_ratio(entry.compressed_size, entry.uncompressed_size);

        let category = if entry.is_directory {
            String::new()
        } else {
            crxscope::tree::categorize(&entry.path).to_string()
        };

        println!(
            "{:>10}  {:>10}  {}  {:>10}  {:>5}  {:<13}  {}{}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio,
            date,
            time,
            category,
            entry.path,
            if entry.is_directory { "/" } else { "" }
        );

        if !entry.is_directory {
            total_uncompressed = total_uncompressed.saturating_add(entry.uncompressed_size);
            total_compressed = total_compressed.saturating_add(entry.compressed_size);
            file_count += 1;
        }
    }

    if cli.verbose {
        println!("{}", "-".repeat(84));
        let total_ratio = format_ratio(total_compressed, total_uncompressed);
        println!(
            "{:>10}  {:>10}  {}  {:>34}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
    }

    Ok(())
}

/// Pick the files to extract: positional FILES (exact path, base name or
/// glob) narrowed by the filter flags.
fn select_files(package: &CrxPackage<'_>, filter: &CompiledFilter, cli: &Cli) -> Result<Vec<String>> {
    let requested = cli
        .files
        .iter()
        .map(|f| -> Result<Selector<'_>> {
            if has_glob_chars(f) {
                Ok(Selector::Glob(Regex::new(&glob_to_regex(f))?))
            } else {
                Ok(Selector::Exact(f.as_str()))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(filter
        .matching_paths(package.tree())
        .into_iter()
        .filter(|path| requested.is_empty() || requested.iter().any(|s| s.matches(path)))
        .collect())
}

enum Selector<'a> {
    Exact(&'a str),
    Glob(Regex),
}

impl Selector<'_> {
    fn matches(&self, path: &str) -> bool {
        let basename = path.rsplit('/').next().unwrap_or(path);
        match self {
            Selector::Exact(f) => path == *f || basename == *f,
            Selector::Glob(re) => re.is_match(path) || re.is_match(basename),
        }
    }
}

async fn extract_files(package: &CrxPackage<'_>, filter: &CompiledFilter, cli: &Cli) -> Result<()> {
    let files = select_files(package, filter, cli)?;
    if files.is_empty() && !cli.files.is_empty() {
        bail!("No matching files in {}", cli.file);
    }

    let show_filename = cli.pipe && files.len() > 1;
    for path in &files {
        extract_file(package, path, cli, show_filename).await?;
    }
    Ok(())
}

/// Extract a single file.
///
/// - Pipe mode (`-p`): Write to stdout instead of file
/// - Custom output directory (`-d`): Extract to specified directory
/// - Junk paths (`-j`): Ignore directory structure in archive
/// - Overwrite control (`-n`, `-o`): Handle existing files
async fn extract_file(
    package: &CrxPackage<'_>,
    path: &str,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let data = package
        .read_file(path)
        .with_context(|| format!("Cannot extract {}", path))?;

    if cli.pipe {
        let mut stdout = tokio::io::stdout();
        if show_filename {
            stdout
                .write_all(format!("--- {} ---\n", path).as_bytes())
                .await?;
        }
        stdout.write_all(&data).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let file_name = if cli.junk_paths {
        path.rsplit('/').next().unwrap_or(path)
    } else {
        path
    };
    let output_path = match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(file_name),
        None => PathBuf::from(file_name),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", path);
            }
            return Ok(());
        }
        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", path);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", path);
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&output_path, &data).await?;

    Ok(())
}

/// Compression ratio as percentage saved. Sizes come straight from the
/// central directory, so the arithmetic is done in i128.
fn format_ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 {
        return "  0%".to_string();
    }
    let saved = 100 - (compressed as i128 * 100 / uncompressed as i128);
    format!("{:>4}%", saved)
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Format a byte size into a human-readable string.
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
