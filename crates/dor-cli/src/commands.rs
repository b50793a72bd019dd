use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use dor_repository::{LoggingObserver, Repository};
use dor_server::{DorServer, ServerConfig};
use dor_types::{ContentType, DigitalObject, DublinCore, DublinCoreElement, Identifier};
use serde_json::json;

use crate::cli::{
    Cli, Command, DeleteArgs, DescribeArgs, GetArgs, OutputFormat, ServeArgs, StoreArgs,
};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    let out = &mut io::stdout();
    match cli.command {
        Command::Store(args) => cmd_store(&config, args, format, out),
        Command::Get(args) => cmd_get(&config, args, format, out),
        Command::Delete(args) => cmd_delete(&config, args, format, out),
        Command::Describe(args) => cmd_describe(&config, args, format, out),
        Command::Types => cmd_types(format, out),
        Command::Serve(args) => cmd_serve(config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn open_repository(config: &ServerConfig) -> anyhow::Result<Repository> {
    let repository = config.repository.open().context("opening repository")?;
    repository.register_observer(Arc::new(LoggingObserver));
    Ok(repository)
}

fn read_payload(file: &Path) -> anyhow::Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data).context("reading stdin")?;
        Ok(data)
    } else {
        std::fs::read(file).with_context(|| format!("reading {}", file.display()))
    }
}

fn cmd_store(
    config: &ServerConfig,
    args: StoreArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let content_type = ContentType::from_token(&args.content_type)?;
    let identifier = args.id.as_deref().map(Identifier::parse).transpose()?;
    let object = DigitalObject::new(read_payload(&args.file)?, content_type);

    let repository = open_repository(config)?;
    let id = repository.store(
        &object,
        &config.repository.storage_path,
        &config.repository.metadata_path,
        identifier.as_ref(),
        &args.message,
    )?;
    repository.close()?;

    match format {
        OutputFormat::Json => {
            let stored = json!({
                "id": id.to_string(),
                "name": id.name(),
                "content_type": content_type,
                "bytes": object.len(),
            });
            writeln!(out, "{stored}")?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{} Stored {} bytes as {}",
                "✓".green().bold(),
                object.len(),
                content_type.to_string().cyan()
            )?;
            writeln!(out, "  Identifier: {}", id.to_string().yellow())?;
        }
    }
    Ok(())
}

fn cmd_get(
    config: &ServerConfig,
    args: GetArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let identifier = Identifier::parse(&args.id)?;
    let repository = open_repository(config)?;
    let object = repository.retrieve(&identifier, &config.repository.metadata_path)?;
    repository.close()?;

    let Some(path) = args.output else {
        out.write_all(object.bytes())?;
        return Ok(());
    };
    std::fs::write(&path, object.bytes()).with_context(|| format!("writing {}", path.display()))?;
    match format {
        OutputFormat::Json => {
            let written = json!({
                "id": identifier.to_string(),
                "content_type": object.content_type(),
                "bytes": object.len(),
                "output": path,
            });
            writeln!(out, "{written}")?;
        }
        OutputFormat::Text => writeln!(
            out,
            "{} Wrote {} bytes ({}) to {}",
            "✓".green().bold(),
            object.len(),
            object.content_type().to_string().cyan(),
            path.display().to_string().bold()
        )?,
    }
    Ok(())
}

fn cmd_delete(
    config: &ServerConfig,
    args: DeleteArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let identifier = Identifier::parse(&args.id)?;
    let repository = open_repository(config)?;
    repository.delete(&identifier, &config.repository.metadata_path, &args.message)?;
    repository.close()?;

    match format {
        OutputFormat::Json => writeln!(out, "{}", json!({ "deleted": identifier.to_string() }))?,
        OutputFormat::Text => writeln!(
            out,
            "{} Deleted {}",
            "✓".green().bold(),
            identifier.to_string().yellow()
        )?,
    }
    Ok(())
}

fn cmd_describe(
    config: &ServerConfig,
    args: DescribeArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let described = Identifier::parse(&args.id)?;
    let mut record = DublinCore::new(described.as_str());
    for pair in &args.elements {
        let (element, value) = pair
            .split_once('=')
            .with_context(|| format!("expected ELEMENT=VALUE, got '{pair}'"))?;
        record.put(element.parse::<DublinCoreElement>()?, value);
    }
    let object = DigitalObject::from(&record);

    let repository = open_repository(config)?;
    let id = repository.store(
        &object,
        &config.repository.storage_path,
        &config.repository.metadata_path,
        None,
        &args.message,
    )?;
    repository.close()?;

    match format {
        OutputFormat::Json => {
            let stored = json!({
                "id": id.to_string(),
                "describes": described.to_string(),
                "elements": record.element_count(),
            });
            writeln!(out, "{stored}")?;
        }
        OutputFormat::Text => writeln!(
            out,
            "{} Described {} as {}",
            "✓".green().bold(),
            described.to_string().yellow(),
            id.to_string().yellow()
        )?,
    }
    Ok(())
}

fn cmd_types(format: OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let types: Vec<_> = ContentType::ALL
                .iter()
                .map(|c| json!({ "token": c.token(), "mime_type": c.mime_type() }))
                .collect();
            writeln!(out, "{}", serde_json::Value::Array(types))?;
        }
        OutputFormat::Text => {
            for c in ContentType::ALL {
                writeln!(out, "{:<24} {}", c.token().bold(), c.mime_type().dimmed())?;
            }
        }
    }
    Ok(())
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!(
        "DOR server on {} (objects: {}, metadata: {})",
        config.bind_addr.to_string().bold(),
        config.repository.storage_path.display(),
        config.repository.metadata_path.display()
    );
    let server = DorServer::new(config)?;
    server
        .state()
        .repository
        .register_observer(Arc::new(LoggingObserver));
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}
