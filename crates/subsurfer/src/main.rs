use chrono::Local;
use clap::{Arg, ArgAction, ArgMatches, Command};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subsurfer::config::ScanConfig;
use subsurfer::events::{LogObserver, Observer};
use subsurfer::model::{
    ensure_dir, export_to_json, export_to_text, pipe_lines, vulnerable_line, Domain, HostnameSet,
    ScanReport,
};
use subsurfer::scan::{scan, ScanRequest};
use subsurfer::takeover::fingerprint::FingerprintStore;
use subsurfer::utils::log::init_tracing_subscriber;
use subsurfer::{dns, modules, Error, Result};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Passive & active subdomain discovery with takeover detection")
        .subcommand(Command::new("modules").about("List all discovery modules"))
        .subcommand(
            Command::new("scan")
                .about("Enumerate the subdomains of a target")
                .arg(
                    Arg::new("target")
                        .help("The domain name to scan")
                        .value_name("TARGET")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("logs")
                        .short('s')
                        .long("logs")
                        .action(ArgAction::SetTrue)
                        .help("Save logs into a .log file next to the results"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("PATH")
                        .help("Result file path, without extension"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .help("Result file format")
                        .value_name("FORMAT")
                        .value_parser(["txt", "json", "both"])
                        .default_value("both"),
                )
                .arg(
                    Arg::new("verify")
                        .short('v')
                        .long("verify")
                        .action(ArgAction::SetTrue)
                        .help("Check the subdomains for takeover"),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("Check the hostnames of FILE for takeover, skipping discovery"),
                )
                .arg(
                    Arg::new("fingerprints")
                        .long("fingerprints")
                        .value_name("FILE")
                        .help("Takeover fingerprints (JSON) replacing the embedded ones"),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Scan settings (JSON)"),
                )
                .arg(
                    Arg::new("pipeweb")
                        .long("pipeweb")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("pipesub")
                        .help("Only print https://<subdomain> lines"),
                )
                .arg(
                    Arg::new("pipesub")
                        .long("pipesub")
                        .action(ArgAction::SetTrue)
                        .help("Only print subdomains"),
                ),
        )
        .arg_required_else_help(true)
        .get_matches();

    match cli.subcommand() {
        Some(("modules", _)) => {
            let config = ScanConfig::default();
            let http_client = Client::builder().build()?;
            let modules =
                modules::subdomains_modules(&config, &http_client, &dns::new_resolver(&config));
            modules::display_all(&modules);
        }
        Some(("scan", args)) => run_scan(args).await?,

        // fallback if a cmd is not handled (should not possible)
        _ => {
            error!("{:12} - Command not handled, exit program", "CLI ERROR");
            return Err(Error::CliUsage("Command not handled".into()));
        }
    }

    Ok(())
}

async fn run_scan(args: &ArgMatches) -> Result<()> {
    let target = args
        .get_one::<String>("target")
        .ok_or_else(|| Error::CliUsage("TARGET is required".into()))?;
    let target = Domain::parse(target)?;
    let pipe = args.get_flag("pipesub") || args.get_flag("pipeweb");

    // result path
    let output = match args.get_one::<String>("output") {
        Some(path) => PathBuf::from(path),
        None => {
            let timestamp = Local::now().format("%Y-%m-%d-%H-%M");
            Path::new("results").join(format!("subsurfer_{}_{}", target, timestamp))
        }
    };
    let output_dir = output
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let filename = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::CliUsage(format!("Invalid output path {:?}", output)))?;

    // logs
    let save_logs = args.get_flag("logs");
    if save_logs {
        ensure_dir(&output_dir)?;
    }
    init_tracing_subscriber(
        if pipe { "warn" } else { "info" },
        save_logs.then_some((output_dir.as_path(), filename.as_str())),
    )?;

    let config = match args.get_one::<String>("config") {
        Some(path) => ScanConfig::from_file(Path::new(path))?,
        None => ScanConfig::default(),
    };
    debug!("{:?}", config);

    let hostnames = match args.get_one::<String>("input") {
        Some(path) => Some(read_hostnames(&target, Path::new(path))?),
        None => None,
    };
    let fingerprints = match args.get_one::<String>("fingerprints") {
        Some(path) => FingerprintStore::load_or_empty(Path::new(path)),
        None => FingerprintStore::embedded(),
    };

    // run the scan
    info!("{:12} - {}", "SCANNING", target);
    let observer: Arc<dyn Observer> = Arc::new(LogObserver);
    let request = ScanRequest {
        target,
        verify: args.get_flag("verify") || hostnames.is_some(),
        hostnames,
        fingerprints,
    };
    let report = scan(request, &config, observer).await?;

    // write result
    if pipe {
        for line in pipe_lines(&report, args.get_flag("pipeweb")) {
            println!("{}", line);
        }
    } else {
        let format = args
            .get_one::<String>("format")
            .map(String::as_str)
            .unwrap_or("both");
        let saved = save_report(&report, &output_dir, &filename, format)?;
        print_summary(&report, &saved);
    }

    Ok(())
}

/// One hostname per line, filtered like discovered ones.
fn read_hostnames(target: &Domain, path: &Path) -> Result<HostnameSet> {
    let content = std::fs::read_to_string(path)?;
    let hostnames = HostnameSet::from_candidates(target, content.lines());
    info!("{:12} - {} hostnames read from {:?}", "INPUT", hostnames.len(), path);
    Ok(hostnames)
}

fn save_report(
    report: &ScanReport,
    output_dir: &Path,
    filename: &str,
    format: &str,
) -> Result<Vec<PathBuf>> {
    ensure_dir(output_dir)?;
    let mut saved = Vec::new();

    if format == "both" || format == "txt" {
        // the target itself has dots, so no `with_extension` here
        let txt_path = output_dir.join(format!("{}.txt", filename));
        export_to_text(report, &txt_path)?;
        saved.push(txt_path);
    }

    if format == "both" || format == "json" {
        let json_path = output_dir.join(format!("{}.json", filename));
        export_to_json(report, &json_path)?;
        saved.push(json_path);
    }

    Ok(saved)
}

fn print_summary(report: &ScanReport, saved: &[PathBuf]) {
    println!(
        "{} subdomains found for {}",
        report.subdomains.len(),
        report.target
    );
    for finding in &report.takeovers {
        println!("{}", vulnerable_line(finding));
    }
    for path in saved {
        println!("Results saved to {}", path.display());
    }
}
