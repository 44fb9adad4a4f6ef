use std::env;
use std::path::PathBuf;

use mediakb_cli::{init_tracing, open_knowledge_base, parse_filter};
use mediakb_core::config::{expand_path, Config};
use mediakb_core::dialogue::{validate, Domain, Scripts, Severity};
use mediakb_core::schema::Catalog;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { eprintln!("Usage: {} <query|get|validate|rules> [args...]", prog); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("warn");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "query" => {
            let Some(object_type) = args.first() else {
                eprintln!("Usage: mediakb query <object_type> [attr=value | attr>value ...] [--limit N]"); std::process::exit(1)
            };
            let mut limit = settings.action.default_limit;
            let mut filters = Vec::new();
            let mut i = 1;
            while i < args.len() {
                if args[i] == "--limit" {
                    limit = args.get(i + 1).and_then(|l| l.parse().ok()).unwrap_or_else(|| { eprintln!("Error: --limit requires a number"); std::process::exit(1) });
                    i += 1;
                } else {
                    match parse_filter(&args[i]) { Some(f) => filters.push(f), None => { eprintln!("Bad filter: {}", args[i]); std::process::exit(1); } }
                }
                i += 1;
            }
            let kb = open_knowledge_base(&settings)?;
            let objects = kb.get_objects(object_type, &filters, limit).await?;
            println!("Found {} {}(s)", objects.len(), object_type);
            for (n, obj) in objects.iter().enumerate() { println!("  {}. [{}] {}", n + 1, obj.id, obj.name); }
        }
        "get" => {
            let (Some(object_type), Some(id)) = (args.first(), args.get(1)) else {
                eprintln!("Usage: mediakb get <object_type> <id>"); std::process::exit(1)
            };
            let kb = open_knowledge_base(&settings)?;
            match kb.get_object(object_type, id).await? {
                Some(obj) => {
                    println!("{} [{}]", obj.name, obj.id);
                    for (name, value) in &obj.attributes { println!("  {}: {}", name, value); }
                }
                None => { println!("No {} with id {}", object_type, id); }
            }
        }
        "validate" => {
            let dir = args.first().map(expand_path).unwrap_or_else(|| PathBuf::from(&settings.assistant.dir));
            let domain = Domain::load(&dir.join("domain.yml"))?;
            let scripts = Scripts::load_dir(&dir.join("data"))?;
            let report = validate(&domain, &scripts, &Catalog::default(), settings.action.outcome_slot());
            for issue in &report.issues {
                let tag = match issue.severity { Severity::Error => "error", Severity::Warning => "warning" };
                println!("{}: {}", tag, issue.message);
            }
            if !report.is_ok() { eprintln!("{} error(s) in {}", report.errors().count(), dir.display()); std::process::exit(1); }
            println!("✅ {} is consistent ({} stories, {} rules)", dir.display(), scripts.stories.len(), scripts.rules.len());
        }
        "rules" => {
            let dir = args.first().map(expand_path).unwrap_or_else(|| PathBuf::from(&settings.assistant.dir));
            let scripts = Scripts::load_dir(&dir.join("data"))?;
            for row in scripts.rule_table() {
                let intent = row.intent.as_deref().unwrap_or("-");
                let when = if row.conditions.is_empty() { String::new() } else { format!(" [{}]", row.conditions.join(", ")) };
                println!("{}: {}{} -> {}", row.rule, intent, when, row.actions.join(", "));
            }
        }
        _ => { eprintln!("Unknown command: {}", cmd); std::process::exit(1); }
    }
    Ok(())
}
