//! CLI tool: parse a reception inspection report PDF and print it as JSON

use report_extractor::process_report;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file> [--json] [--images-dir DIR]", args[0]);
        eprintln!();
        eprintln!("Parses a fixed-layout inspection report and prints the record as JSON.");
        eprintln!("  --json            compact single-line JSON (default is pretty)");
        eprintln!("  --images-dir DIR  dump embedded images into DIR");
        process::exit(1);
    }

    let pdf_path = &args[1];
    let compact = args.iter().any(|a| a == "--json");
    let images_dir: Option<PathBuf> = args
        .iter()
        .position(|a| a == "--images-dir")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let result = match process_report(pdf_path) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let json = if compact {
        serde_json::to_string(&result.report)
    } else {
        serde_json::to_string_pretty(&result.report)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: failed to serialize report: {}", e);
            process::exit(1);
        }
    }

    if let Some(dir) = images_dir {
        if let Err(e) = fs::create_dir_all(&dir) {
            eprintln!("Error: cannot create {}: {}", dir.display(), e);
            process::exit(1);
        }
        for (i, image) in result.images.iter().enumerate() {
            let path = dir.join(format!("image_{:03}.bin", i));
            if let Err(e) = fs::write(&path, &image.data) {
                eprintln!("Error: cannot write {}: {}", path.display(), e);
                process::exit(1);
            }
            eprintln!(
                "wrote {} ({}x{}, {} bytes)",
                path.display(),
                image.width,
                image.height,
                image.data.len()
            );
        }
    }

    eprintln!(
        "Parsed {} image(s) in {}ms",
        result.images.len(),
        result.processing_time_ms
    );
}
