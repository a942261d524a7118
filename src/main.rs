use anyhow::Result;
use std::path::PathBuf;

use kura::config::Config;
use kura::db::Database;
use kura::library::{self, ItemType};
use kura::logging;
use kura::scanner::{ScanProgress, Scanner};

enum Command {
    Scan {
        root: PathBuf,
    },
    Check {
        item_type: String,
        id: i64,
        all: bool,
    },
    Page {
        page_id: Option<i64>,
        gallery_id: Option<i64>,
        number: Option<i64>,
        prev: bool,
    },
    List,
    Stats,
}

struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional: Vec<String> = Vec::new();
    let mut all = false;
    let mut prev = false;
    let mut page_id = None;
    let mut gallery_id = None;
    let mut number = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("kura {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--all" | "-a" => {
                all = true;
            }
            "--prev" | "-p" => {
                prev = true;
            }
            "--page" => {
                page_id = take_int_arg(&args, &mut i, "--page");
            }
            "--gallery" => {
                gallery_id = take_int_arg(&args, &mut i, "--gallery");
            }
            "--number" | "-n" => {
                number = take_int_arg(&args, &mut i, "--number");
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown argument: {arg}");
                print_help();
                std::process::exit(1);
            }
            arg => {
                positional.push(arg.to_string());
            }
        }
        i += 1;
    }

    let command = match positional.first().map(|s| s.as_str()) {
        Some("scan") => {
            let Some(root) = positional.get(1) else {
                eprintln!("Error: scan requires a directory argument");
                std::process::exit(1);
            };
            Command::Scan {
                root: PathBuf::from(root),
            }
        }
        Some("check") => {
            let (Some(item_type), Some(id)) = (positional.get(1), positional.get(2)) else {
                eprintln!("Error: check requires an item type and an id");
                std::process::exit(1);
            };
            let Ok(id) = id.parse::<i64>() else {
                eprintln!("Error: '{id}' is not a valid id");
                std::process::exit(1);
            };
            Command::Check {
                item_type: item_type.clone(),
                id,
                all,
            }
        }
        Some("page") => Command::Page {
            page_id,
            gallery_id,
            number,
            prev,
        },
        Some("list") => Command::List,
        Some("stats") => Command::Stats,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    };

    CliArgs {
        config_path,
        command,
    }
}

fn take_int_arg(args: &[String], i: &mut usize, name: &str) -> Option<i64> {
    if *i + 1 < args.len() {
        match args[*i + 1].parse() {
            Ok(value) => {
                *i += 1;
                Some(value)
            }
            Err(_) => {
                eprintln!("Error: {name} requires an integer argument");
                std::process::exit(1);
            }
        }
    } else {
        eprintln!("Error: {name} requires an integer argument");
        std::process::exit(1);
    }
}

fn print_help() {
    println!(
        r#"kura - gallery library manager

USAGE:
    kura [OPTIONS] <COMMAND>

COMMANDS:
    scan <DIR>                Import galleries found under DIR
    check <TYPE> <ID> [--all] Check whether a gallery/page source still
                              exists on disk (TYPE: gallery or page;
                              --all checks every page of a gallery)
    page [--page ID] [--gallery ID] [--number N] [--prev]
                              Get the next (or previous) page by gallery
                              or page id
    list                      List galleries
    stats                     Show library statistics

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    KURA_LOG            Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/kura/config.toml"#
    );
}

fn main() -> Result<()> {
    let cli = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    // Load configuration
    let config = match cli.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize database
    let db = Database::open(&config.db_path)?;
    db.initialize()?;

    match cli.command {
        Command::Scan { root } => run_scan(&config, &db, root)?,
        Command::Check {
            item_type,
            id,
            all,
        } => {
            // An unsupported item type is rejected here, before any query
            let item_type = ItemType::parse(&item_type)?;
            let report = library::check_existence(&db, item_type, id, all)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Page {
            page_id,
            gallery_id,
            number,
            prev,
        } => {
            let page = library::get_page(&db, page_id, gallery_id, number, prev)?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::List => {
            for (gallery, page_count) in db.list_galleries()? {
                let source = gallery.single_source.as_deref().unwrap_or("-");
                println!(
                    "{:>6}  {:<40} {:>5} pages  {}",
                    gallery.id, gallery.title, page_count, source
                );
            }
        }
        Command::Stats => {
            let stats = db.get_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn run_scan(config: &Config, db: &Database, root: PathBuf) -> Result<()> {
    let scanner = Scanner::new(config.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    let handle = std::thread::spawn(move || {
        for progress in rx {
            match progress {
                ScanProgress::Started { total_galleries } => {
                    println!("Found {total_galleries} gallery candidates");
                }
                ScanProgress::Importing {
                    current,
                    total,
                    title,
                } => {
                    println!("[{current}/{total}] {title}");
                }
                ScanProgress::Error { message } => {
                    eprintln!("Warning: {message}");
                }
                ScanProgress::Completed { found, new, pages } => {
                    println!("Scan complete: {found} found, {new} new, {pages} pages imported");
                }
            }
        }
    });

    let result = scanner.scan_directory(&root, db, Some(tx));
    let _ = handle.join();
    result?;

    Ok(())
}
