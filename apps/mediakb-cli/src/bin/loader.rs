use std::env;
use std::path::PathBuf;

use mediakb_cli::{current_dir, init_tracing};
use mediakb_core::config::{expand_path, Config};
use mediakb_core::dataset::{list_ndjson_files, read_ndjson, write_ndjson, DatasetProcessor};
use mediakb_core::schema::Catalog;
use mediakb_search::{BulkLoader, EsClient};

fn usage() -> ! {
    eprintln!("Usage: mediakb-loader [--dataset <name>]... [--base-dir <dir>] [--output <dir>] [--skip-transform] [--load] [--recreate]");
    std::process::exit(1)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut only: Vec<String> = Vec::new();
    let mut base_dir = current_dir();
    let mut output_dir = expand_path(&settings.loader.output_dir);
    let (mut load, mut recreate, mut skip_transform) = (false, false, false);
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--dataset" | "-d" => { only.push(args.get(i + 1).cloned().unwrap_or_else(|| usage())); i += 1; }
            "--base-dir" => { base_dir = args.get(i + 1).map(expand_path).unwrap_or_else(|| usage()); i += 1; }
            "--output" | "-o" => { output_dir = args.get(i + 1).map(expand_path).unwrap_or_else(|| usage()); i += 1; }
            "--load" => load = true,
            "--recreate" => { load = true; recreate = true; }
            "--skip-transform" => skip_transform = true,
            "--help" | "-h" => usage(),
            other => { eprintln!("Unknown argument: {}", other); usage() }
        }
        i += 1;
    }
    if output_dir.is_relative() { output_dir = base_dir.join(output_dir); }

    println!("mediakb loader\n==============");
    if !skip_transform {
        let processor = DatasetProcessor::new(&base_dir);
        for spec in settings.loader.datasets.iter().filter(|s| only.is_empty() || only.contains(&s.name)) {
            let processed = processor.process(spec)?;
            let path: PathBuf = output_dir.join(format!("{}.ndjson", processed.index));
            write_ndjson(&path, &processed.documents)?;
            println!(
                "{}: {} rows, {} documents, {} skipped -> {}",
                spec.name, processed.report.rows_read, processed.report.documents, processed.report.skipped, path.display()
            );
        }
    }

    if load {
        let catalog = Catalog::default();
        let loader = BulkLoader::new(EsClient::new(&settings.elasticsearch)?, settings.loader.batch_size)?.with_progress(true);
        for (index, path) in list_ndjson_files(&output_dir) {
            let Some(doc_type) = catalog.by_index(&index) else { println!("skipping {} (no document type)", path.display()); continue };
            if !only.is_empty() && !settings.loader.datasets.iter().any(|s| s.index == index && only.contains(&s.name)) { continue; }
            let documents = read_ndjson(&path)?;
            loader.prepare_index(doc_type, recreate).await?;
            let report = loader.load(&index, &documents).await?;
            println!("{}: loaded {} documents in {} batches ({} failed)", index, report.sent, report.batches, report.failed);
        }
    } else {
        println!("\nBulk files written to {}. Run with --load to send them to Elasticsearch.", output_dir.display());
    }
    Ok(())
}
