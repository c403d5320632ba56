//! CLI command implementations
//!
//! Commands are thin: they resolve a [`RunContext`], open the store and the
//! audit trail, call into the library, and print one JSON response.

use std::fs::{self, OpenOptions};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::{json, Value};

use super::args::{Cli, Command, GuardArgs, MutateArgs};
use super::config::RunContext;
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_error, write_response};
use crate::audit::{AuditLog, AuditQuery};
use crate::document::Document;
use crate::error::{NodeError, EXIT_OK};
use crate::fingerprint::fingerprint;
use crate::observability::{init_logging, log_event, Event};
use crate::patch::PatchOp;
use crate::pipeline::{ApplyOptions, ApplyPipeline};
use crate::reconcile::reconcile;
use crate::validator::{KnownIds, StructuralValidator, Validator};

/// Main CLI entry point
///
/// Parses arguments, runs the command and returns the process exit code.
/// This is the only function that main.rs should call.
pub fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };
    init_logging(cli.verbose);

    match run_command(&cli) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            let message = e.to_string();
            log_event(
                Event::CommandFailed,
                &[("code", e.code_str()), ("message", message.as_str())],
            );
            let _ = write_error(e.code_str(), &message, e.details());
            e.exit_code()
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cli: &Cli) -> CliResult<()> {
    let ctx = RunContext::from_cli(cli)?;
    let data = match &cli.command {
        Command::Init => init(&ctx)?,
        Command::Create {
            id,
            kind,
            title,
            summary,
            tags,
        } => {
            let mut doc = Document::new(id.as_str(), kind.as_str(), title.as_str())
                .with_tags(tags.iter().cloned());
            if let Some(summary) = summary {
                doc.summary = summary.clone();
            }
            create(&ctx, doc)?
        }
        Command::Show { id } => show(&ctx, id)?,
        Command::List { kind } => list(&ctx, kind.as_deref())?,
        Command::Fingerprint { id } => show_fingerprint(&ctx, id)?,
        Command::Set {
            id,
            path,
            value,
            opts,
        } => apply(&ctx, id, vec![PatchOp::set(path.as_str(), value.as_str())], opts)?,
        Command::Append {
            id,
            path,
            value,
            opts,
        } => apply(&ctx, id, vec![PatchOp::append(path.as_str(), value.as_str())], opts)?,
        Command::Unset { id, path, opts } => {
            apply(&ctx, id, vec![PatchOp::unset(path.as_str())], opts)?
        }
        Command::Apply { id, file, opts } => {
            let ops = PatchOp::parse_batch(&read_input(file)?).map_err(|e| {
                NodeError::invalid_request(format!("invalid operation batch: {}", e))
            })?;
            apply(&ctx, id, ops, opts)?
        }
        Command::Rewrite { id, file, opts } => {
            let doc: Document = serde_json::from_str(&read_input(file)?)
                .map_err(|e| NodeError::invalid_request(format!("invalid document: {}", e)))?;
            rewrite(&ctx, id, doc, opts)?
        }
        Command::Delete { id, guard } => delete(&ctx, id, guard)?,
        Command::History { id, since, last } => history(&ctx, id, since.as_deref(), *last)?,
        Command::Validate { id } => validate(&ctx, id)?,
        Command::Reconcile => run_reconcile(&ctx)?,
    };
    write_response(data)
}

/// Creates `<root>/nodes` and an empty audit trail.
pub fn init(ctx: &RunContext) -> CliResult<Value> {
    if ctx.is_initialized() {
        return Err(CliError::already_initialized());
    }
    fs::create_dir_all(ctx.nodes_dir()).map_err(|e| {
        CliError::io_error(format!("failed to create {}: {}", ctx.nodes_dir().display(), e))
    })?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(ctx.audit_path())
        .map_err(|e| {
            CliError::io_error(format!("failed to create {}: {}", ctx.audit_path().display(), e))
        })?;

    log_event(
        Event::StoreInitialized,
        &[("root", ctx.root.display().to_string().as_str())],
    );
    Ok(json!({
        "initialized": true,
        "root": ctx.root.display().to_string(),
        "audit_file": ctx.config.audit_file,
    }))
}

fn create(ctx: &RunContext, doc: Document) -> CliResult<Value> {
    let (store, audit) = ctx.open()?;
    let pipeline = ApplyPipeline::new(&store, &audit, &StructuralValidator, ctx.actor.as_str());
    Ok(pipeline.create(doc)?.to_json())
}

fn show(ctx: &RunContext, id: &str) -> CliResult<Value> {
    let (store, _) = ctx.open()?;
    let doc = store.load(id)?;
    Ok(json!({
        "fingerprint": fingerprint(&doc),
        "document": doc,
    }))
}

fn list(ctx: &RunContext, kind: Option<&str>) -> CliResult<Value> {
    let (store, _) = ctx.open()?;
    let documents: Vec<Value> = store
        .load_all()?
        .into_iter()
        .filter(|doc| kind.map_or(true, |k| doc.kind.eq_ignore_ascii_case(k)))
        .map(|doc| {
            json!({
                "id": doc.id,
                "kind": doc.kind,
                "title": doc.title,
                "status": doc.status,
                "version": doc.version,
                "fingerprint": fingerprint(&doc),
            })
        })
        .collect();
    Ok(json!({
        "count": documents.len(),
        "documents": documents,
    }))
}

fn show_fingerprint(ctx: &RunContext, id: &str) -> CliResult<Value> {
    let (store, _) = ctx.open()?;
    let doc = store.load(id)?;
    Ok(json!({
        "id": doc.id,
        "version": doc.version,
        "fingerprint": fingerprint(&doc),
    }))
}

fn options(ctx: &RunContext, guard: &GuardArgs, dry_run: bool) -> CliResult<ApplyOptions> {
    let expected = guard.expect.clone().filter(|e| !e.trim().is_empty());
    if ctx.config.fingerprint_check && expected.is_none() && !guard.force {
        return Err(NodeError::invalid_request(
            "fingerprint_check is enabled: pass --expect <fingerprint> or --force",
        )
        .into());
    }
    Ok(ApplyOptions {
        expected,
        force: guard.force,
        dry_run,
        kind: None,
    })
}

fn apply(ctx: &RunContext, id: &str, ops: Vec<PatchOp>, opts: &MutateArgs) -> CliResult<Value> {
    let options = options(ctx, &opts.guard, opts.dry_run)?;
    let (store, audit) = ctx.open()?;
    let pipeline = ApplyPipeline::new(&store, &audit, &StructuralValidator, ctx.actor.as_str());
    Ok(pipeline.apply(id, &ops, &options)?.to_json())
}

fn rewrite(ctx: &RunContext, id: &str, doc: Document, opts: &MutateArgs) -> CliResult<Value> {
    let options = options(ctx, &opts.guard, opts.dry_run)?;
    let (store, audit) = ctx.open()?;
    let pipeline = ApplyPipeline::new(&store, &audit, &StructuralValidator, ctx.actor.as_str());
    Ok(pipeline.rewrite(id, doc, &options)?.to_json())
}

fn delete(ctx: &RunContext, id: &str, guard: &GuardArgs) -> CliResult<Value> {
    let options = options(ctx, guard, false)?;
    let (store, audit) = ctx.open()?;
    let pipeline = ApplyPipeline::new(&store, &audit, &StructuralValidator, ctx.actor.as_str());
    Ok(pipeline.delete(id, &options)?.to_json())
}

fn history(
    ctx: &RunContext,
    id: &str,
    since: Option<&str>,
    last: Option<usize>,
) -> CliResult<Value> {
    let (_, audit) = ctx.open()?;
    let mut query = AuditQuery::for_node(id);
    if let Some(since) = since {
        query = query.since(parse_timestamp(since)?);
    }
    if let Some(n) = last {
        query = query.last(n);
    }
    let records = audit.query(&query)?;
    Ok(json!({
        "id": id,
        "count": records.len(),
        "records": records,
    }))
}

fn validate(ctx: &RunContext, id: &str) -> CliResult<Value> {
    let (store, _) = ctx.open()?;
    let doc = store.load(id)?;
    let mut known = KnownIds::from_store(&store)?;
    known.insert(id);
    let issues = StructuralValidator.validate(&doc, &known);
    if !issues.is_empty() {
        return Err(NodeError::ValidationRejected { issues }.into());
    }
    Ok(json!({
        "id": id,
        "valid": true,
        "fingerprint": fingerprint(&doc),
    }))
}

fn run_reconcile(ctx: &RunContext) -> CliResult<Value> {
    let (store, audit) = ctx.open()?;
    let report = reconcile(&store, &audit, &ctx.actor)?;
    Ok(json!(report))
}

fn parse_timestamp(raw: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            NodeError::invalid_request(format!("invalid --since timestamp '{}': {}", raw, e)).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::Config;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> RunContext {
        RunContext {
            config: Config::default(),
            root: dir.path().to_path_buf(),
            actor: "tester".into(),
        }
    }

    fn mutate(expect: Option<&str>) -> MutateArgs {
        MutateArgs {
            guard: GuardArgs {
                expect: expect.map(str::to_string),
                force: false,
            },
            dry_run: false,
        }
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        init(&ctx).unwrap();
        assert!(dir.path().join("nodes").is_dir());
        assert!(dir.path().join("audit.jsonl").is_file());
        assert_eq!(init(&ctx).unwrap_err().code_str(), "NODE_CLI_ALREADY_INITIALIZED");
    }

    #[test]
    fn test_commands_require_init() {
        let dir = TempDir::new().unwrap();
        let err = show(&ctx(&dir), "a").unwrap_err();
        assert_eq!(err.code_str(), "NODE_CLI_NOT_INITIALIZED");
    }

    #[test]
    fn test_create_set_and_history() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        init(&ctx).unwrap();
        create(&ctx, Document::new("sword-001", "item", "Iron Sword")).unwrap();

        let out = apply(
            &ctx,
            "sword-001",
            vec![PatchOp::set("title", "Steel Sword")],
            &mutate(None),
        )
        .unwrap();
        assert_eq!(out["version"], 2);
        assert_eq!(out["op"], "set");

        let hist = history(&ctx, "sword-001", None, Some(1)).unwrap();
        assert_eq!(hist["count"], 1);
        assert_eq!(hist["records"][0]["op"], "set");
        assert_eq!(hist["records"][0]["actor"], "tester");
    }

    #[test]
    fn test_fingerprint_check_requires_expect() {
        let dir = TempDir::new().unwrap();
        let mut ctx = ctx(&dir);
        init(&ctx).unwrap();
        create(&ctx, Document::new("a", "item", "A")).unwrap();
        ctx.config.fingerprint_check = true;

        let err = apply(&ctx, "a", vec![PatchOp::set("summary", "x")], &mutate(None)).unwrap_err();
        assert_eq!(err.code_str(), "NODE_INVALID_REQUEST");

        let fp = show_fingerprint(&ctx, "a").unwrap()["fingerprint"]
            .as_str()
            .unwrap()
            .to_string();
        apply(&ctx, "a", vec![PatchOp::set("summary", "x")], &mutate(Some(&fp))).unwrap();
    }

    #[test]
    fn test_list_filters_by_kind() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        init(&ctx).unwrap();
        create(&ctx, Document::new("a", "item", "A")).unwrap();
        create(&ctx, Document::new("b", "system", "B")).unwrap();

        let out = list(&ctx, Some("ITEM")).unwrap();
        assert_eq!(out["count"], 1);
        assert_eq!(out["documents"][0]["id"], "a");
        assert_eq!(list(&ctx, None).unwrap()["count"], 2);
    }

    #[test]
    fn test_bad_since_timestamp() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert_eq!(err.code_str(), "NODE_INVALID_REQUEST");
        assert!(parse_timestamp("2026-01-01T00:00:00Z").is_ok());
    }
}
