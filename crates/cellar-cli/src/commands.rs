use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use cellar_cache::{CacheConfig, Fixture, FixtureSummary, PropertyCache};
use cellar_schema::{InMemorySchema, SchemaProvider};
use cellar_types::{FieldId, ObjectHandle};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Schema(args) => cmd_schema(args, cli.format),
        Command::Load(args) => cmd_load(args, cli.format),
        Command::Verify(args) => cmd_verify(args, cli.format),
        Command::Dump(args) => cmd_dump(args, cli.format),
    }
}

struct Loaded {
    schema: Arc<InMemorySchema>,
    cache: PropertyCache,
    summary: FixtureSummary,
}

fn open(args: &DataArgs) -> anyhow::Result<Loaded> {
    let config = match &args.config {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => CacheConfig::default(),
    };
    let schema = Arc::new(
        InMemorySchema::load_with(&args.schema, config.system_fields)
            .with_context(|| format!("loading schema {}", args.schema.display()))?,
    );
    let provider: Arc<dyn SchemaProvider> = schema.clone();
    let mut cache = PropertyCache::with_config(Some(provider), config)?;
    let summary = Fixture::load(&args.data)
        .and_then(|fixture| fixture.apply(&mut cache))
        .with_context(|| format!("loading fixture {}", args.data.display()))?;
    Ok(Loaded {
        schema,
        cache,
        summary,
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_schema(args: SchemaArgs, format: OutputFormat) -> anyhow::Result<()> {
    let schema = load_schema(&args.path)?;
    if format == OutputFormat::Json {
        println!("{}", schema.to_document().to_json_string()?);
        return Ok(());
    }
    println!(
        "{} {} classes, {} fields",
        "Schema".bold(),
        schema.class_count(),
        schema.fields().count()
    );
    for class in schema.classes() {
        let base = class
            .base
            .and_then(|b| schema.class_name(b))
            .map(|name| format!(" : {name}"))
            .unwrap_or_default();
        println!("\n{} {}{}", class.id.to_string().dimmed(), class.name.cyan().bold(), base);
        for field in schema.fields().filter(|f| f.class == class.id) {
            println!(
                "  {:>6}  {:<24} {}",
                field.id.raw().to_string().dimmed(),
                field.name,
                field.kind.to_string().yellow()
            );
        }
    }
    Ok(())
}

fn load_schema(path: &Path) -> anyhow::Result<InMemorySchema> {
    InMemorySchema::load(path).with_context(|| format!("loading schema {}", path.display()))
}

fn cmd_load(args: DataArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = open(&args)?;
    let summary = loaded.summary;
    if format == OutputFormat::Json {
        return print_json(&json!({
            "objects": summary.objects,
            "properties": summary.properties,
            "alternatives": summary.alternatives,
            "owning_fields": summary.owning_fields,
            "next_handle": loaded.cache.next_handle().raw(),
        }));
    }
    println!(
        "{} Loaded {} objects from {}",
        "✓".green().bold(),
        summary.objects.to_string().bold(),
        args.data.display()
    );
    println!("  Properties:    {}", summary.properties);
    println!("  Alternatives:  {}", summary.alternatives);
    println!("  Owning fields: {}", summary.owning_fields);
    Ok(())
}

fn cmd_verify(args: DataArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = open(&args)?;
    let violations = loaded.cache.verify_ownership()?;
    if format == OutputFormat::Json {
        let list: Vec<String> = violations.iter().map(ToString::to_string).collect();
        print_json(&json!({ "objects": loaded.cache.object_count(), "violations": list }))?;
    } else if violations.is_empty() {
        println!(
            "{} Ownership verified for {} objects",
            "✓".green().bold(),
            loaded.cache.object_count()
        );
    } else {
        for violation in &violations {
            println!("  {} {}", "✗".red(), violation);
        }
    }
    if !violations.is_empty() {
        bail!("{} ownership violations", violations.len());
    }
    Ok(())
}

fn cmd_dump(args: DumpArgs, format: OutputFormat) -> anyhow::Result<()> {
    let loaded = open(&args.data)?;
    let cache = &loaded.cache;
    let handles = match args.handle {
        Some(raw) => {
            let handle = ObjectHandle::new(raw);
            cache.class_of(handle)?;
            vec![handle]
        }
        None => cache.handles(),
    };

    if format == OutputFormat::Json {
        let mut snapshot = Fixture::capture(cache);
        snapshot
            .objects
            .retain(|object| handles.contains(&ObjectHandle::new(object.handle)));
        println!("{}", snapshot.to_json_string()?);
        return Ok(());
    }

    let schema = &loaded.schema;
    let field_label = |field: FieldId| {
        schema
            .field_name(field)
            .unwrap_or_else(|| field.to_string())
    };
    for handle in handles {
        let class = cache.class_of(handle)?;
        let class_name = schema.class_name(class).unwrap_or_else(|| class.to_string());
        println!("{} {}", handle.to_string().yellow().bold(), class_name.cyan());
        for (field, value) in cache.properties_of(handle) {
            println!("  {:<24} {}", field_label(field), value);
        }
        for (field, language, text) in cache.alternatives_of(handle) {
            println!(
                "  {:<24} {} {:?}",
                field_label(field),
                language.to_string().dimmed(),
                text.text()
            );
        }
    }
    Ok(())
}
