use anyhow::{bail, Context as _};
use colored::Colorize;
use echo_ledger::{
    ContinuityContext, LedgerConfig, LedgerReader, LedgerStore, LedgerSummary, LedgerWriter,
    SessionReflection, ThoughtRecorder,
};
use echo_types::{context_from_json, Context, ContextValue, EntryId, MemoryEntry, SessionId};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let store = open_store(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Append(args) => cmd_append(&store, format, args),
        Command::Log(args) => cmd_log(&store, format, args),
        Command::Show(args) => cmd_show(&store, format, args),
        Command::Verify(_) => cmd_verify(&store, format),
        Command::Snapshot(args) => cmd_snapshot(&store, format, args),
        Command::Snapshots(_) => cmd_snapshots(&store, format),
        Command::Restore(args) => cmd_restore(&store, format, args),
        Command::Context(_) => cmd_context(&store, format),
        Command::Summary(_) => cmd_summary(&store, format),
        Command::Reflect(args) => cmd_reflect(&store, format, args),
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<LedgerStore> {
    let mut config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    Ok(LedgerStore::with_config(config)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `--context-json` first, then `--context` pairs on top.
fn build_context(args: &AppendArgs) -> anyhow::Result<Option<Context>> {
    if args.context.is_empty() && args.context_json.is_none() {
        return Ok(None);
    }
    let mut context = match &args.context_json {
        Some(text) => {
            let value: serde_json::Value =
                serde_json::from_str(text).context("--context-json is not valid JSON")?;
            context_from_json(value)?
        }
        None => Context::new(),
    };
    for (key, value) in &args.context {
        context.insert(key.clone(), ContextValue::from(value.as_str()));
    }
    Ok(Some(context))
}

fn cmd_append(store: &LedgerStore, format: OutputFormat, args: AppendArgs) -> anyhow::Result<()> {
    let context = build_context(&args)?;
    let entry = match &args.session {
        Some(session) => ThoughtRecorder::with_session(store, SessionId::new(session.as_str())?)
            .log(&args.category, &args.thought, context)?,
        None => store.append(&args.category, &args.thought, context)?,
    };
    match format {
        OutputFormat::Json => print_json(&entry),
        OutputFormat::Text => {
            println!(
                "{} Recorded {} [{}] {}",
                "✓".green().bold(),
                entry.id.to_string().yellow().bold(),
                entry.category.cyan(),
                entry.checksum.short_hex().dimmed()
            );
            Ok(())
        }
    }
}

fn cmd_log(store: &LedgerStore, format: OutputFormat, args: LogArgs) -> anyhow::Result<()> {
    let mut entries = match &args.category {
        Some(category) => store.by_category(category)?,
        None => store.read_all()?,
    };
    let skip = entries.len().saturating_sub(args.limit);
    let entries = entries.split_off(skip);

    if format == OutputFormat::Json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No thoughts recorded.");
        return Ok(());
    }
    for entry in &entries {
        if args.oneline {
            let headline = entry.thought.lines().next().unwrap_or_default();
            println!(
                "{} {} [{}] {}",
                entry.id.to_string().yellow(),
                entry.checksum.short_hex().dimmed(),
                entry.category.cyan(),
                headline
            );
        } else {
            print_entry(entry);
            println!();
        }
    }
    Ok(())
}

fn print_entry(entry: &MemoryEntry) {
    println!(
        "{}  {}  [{}]  {}",
        entry.id.to_string().yellow().bold(),
        entry.timestamp,
        entry.category.cyan(),
        entry.checksum.short_hex().dimmed()
    );
    for line in entry.thought.lines() {
        println!("  {line}");
    }
    for (key, value) in &entry.context {
        println!("  {}: {}", key.bold(), value.to_json());
    }
}

fn cmd_show(store: &LedgerStore, format: OutputFormat, args: ShowArgs) -> anyhow::Result<()> {
    let id = EntryId::new(args.id);
    let Some(entry) = store.get(id)? else {
        bail!("entry {id} not found");
    };
    match format {
        OutputFormat::Json => print_json(&entry),
        OutputFormat::Text => {
            print_entry(&entry);
            println!("  checksum: {}", entry.checksum.to_hex().dimmed());
            Ok(())
        }
    }
}

fn cmd_verify(store: &LedgerStore, format: OutputFormat) -> anyhow::Result<()> {
    let report = store.verify()?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text if report.is_clean() => {
            println!(
                "{} {} entries verified",
                "✓".green().bold(),
                report.total.to_string().bold()
            );
        }
        OutputFormat::Text => {
            println!(
                "{} {} of {} entries corrupted",
                "✗".red().bold(),
                report.corrupted.len().to_string().bold(),
                report.total
            );
            for bad in &report.corrupted {
                println!("  {} {}", bad.label().red(), bad.description);
            }
        }
    }
    if !report.is_clean() {
        bail!("ledger failed verification");
    }
    Ok(())
}

fn cmd_snapshot(
    store: &LedgerStore,
    format: OutputFormat,
    args: SnapshotArgs,
) -> anyhow::Result<()> {
    let info = store.snapshot(&args.label)?;
    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Text => {
            println!(
                "{} Snapshot {} saved ({} entries)",
                "✓".green().bold(),
                info.label.yellow().bold(),
                info.entry_count
            );
            println!("  Path: {}", info.path.display());
            println!("  Digest: {}", info.digest.short_hex().dimmed());
            Ok(())
        }
    }
}

fn cmd_snapshots(store: &LedgerStore, format: OutputFormat) -> anyhow::Result<()> {
    let infos = store.list_snapshots()?;
    if format == OutputFormat::Json {
        return print_json(&infos);
    }
    if infos.is_empty() {
        println!("No snapshots.");
    }
    for info in &infos {
        println!(
            "{}  {}  {} entries  {}",
            info.label.yellow().bold(),
            info.created_at,
            info.entry_count,
            info.digest.short_hex().dimmed()
        );
    }
    Ok(())
}

fn cmd_restore(store: &LedgerStore, format: OutputFormat, args: RestoreArgs) -> anyhow::Result<()> {
    let snapshot = store.load_snapshot(&args.label)?;
    match format {
        OutputFormat::Json => print_json(&snapshot),
        OutputFormat::Text => {
            println!(
                "Snapshot {} taken {} ({} entries, digest {})",
                snapshot.label.yellow().bold(),
                snapshot.created_at,
                snapshot.entries.len(),
                snapshot.digest.short_hex().dimmed()
            );
            println!();
            for entry in &snapshot.entries {
                print_entry(entry);
                println!();
            }
            Ok(())
        }
    }
}

fn cmd_context(store: &LedgerStore, format: OutputFormat) -> anyhow::Result<()> {
    let context = ContinuityContext::build(&store.read_all()?);
    match format {
        OutputFormat::Json => print_json(&context),
        OutputFormat::Text => {
            print!("{}", context.render());
            Ok(())
        }
    }
}

fn cmd_summary(store: &LedgerStore, format: OutputFormat) -> anyhow::Result<()> {
    let summary = LedgerSummary::build(&store.read_all()?);
    if format == OutputFormat::Json {
        return print_json(&summary);
    }
    println!("Ledger: {}", store.ledger_path().display().to_string().bold());
    println!("Entries: {}", summary.total_entries.to_string().bold());
    println!("Sessions: {}", summary.sessions);
    if let (Some(first), Some(last)) = (summary.first_recorded, summary.last_recorded) {
        println!("Recorded: {first} .. {last}");
    }
    if let (Some(head), Some(checksum)) = (summary.head, summary.head_checksum) {
        println!("Head: {} {}", head.to_string().yellow(), checksum.short_hex().dimmed());
    }
    for (category, count) in &summary.categories {
        println!("  {:<24} {count}", category.cyan());
    }
    Ok(())
}

fn cmd_reflect(store: &LedgerStore, format: OutputFormat, args: ReflectArgs) -> anyhow::Result<()> {
    let entries = store.read_all()?;
    let reflection = match &args.session {
        Some(session) => SessionReflection::build(&entries, &SessionId::new(session.as_str())?),
        None => match SessionReflection::latest(&entries) {
            Some(reflection) => reflection,
            None => bail!("no session recorded yet"),
        },
    };
    match format {
        OutputFormat::Json => print_json(&reflection),
        OutputFormat::Text => {
            print!("{}", reflection.render());
            Ok(())
        }
    }
}
