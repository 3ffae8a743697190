//! archcuda - Main entry point
//!
//! Loads the package manifest, updates shared dependencies, asks which
//! package set to install and runs the installer.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

use archcuda::cli::{Cli, Commands};
use archcuda::command_runner::SystemRunner;
use archcuda::installer::{InstallReport, Installer, update_dependencies};
use archcuda::manifest::{InstallerVariant, Manifest};
use archcuda::selector::{MAX_TRIES, confirm_install, select_variant};
use archcuda::types::Variant;
use archcuda::{logging, process_guard, sanity};

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init_logging(cli.verbose);
    info!("archcuda starting up");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Interrupts terminate running downloads and remove the work directory
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    let manifest = load_manifest(cli)?;

    if let Some(Commands::Show) = cli.command {
        for variant in [Variant::Recent, Variant::Compatible] {
            print_variant(variant, manifest.variant(variant));
        }
        return Ok(());
    }

    let preflight = sanity::run_preflight_checks();
    if !preflight.is_ok() {
        anyhow::bail!("{}", sanity::describe_failure(&preflight));
    }

    let runner = if cli.dry_run {
        SystemRunner::dry_run()
    } else {
        SystemRunner::new()
    };

    if cli.skip_deps {
        info!("Skipping dependency update (--skip-deps)");
    } else {
        update_dependencies(&runner, &manifest)?;
    }

    let variant = match cli.variant {
        Some(variant) => variant,
        None => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            select_variant(&mut stdin.lock(), &mut stdout, &manifest, MAX_TRIES)?
        }
    };
    info!("Selected {} package set", variant);

    let packages = manifest.variant(variant);
    print_variant(variant, packages);

    if !cli.yes && !confirm_install(&mut io::stdin().lock(), &mut io::stdout(), MAX_TRIES)? {
        info!("Installation declined by the operator");
        println!("Installation cancelled, nothing was downloaded.");
        return Ok(());
    }

    let report = Installer::new(&runner, &cli.work_dir)
        .install(packages)
        .with_context(|| format!("Installing the {} package set failed", variant))?;

    goodbye(packages, &report);
    Ok(())
}

fn load_manifest(cli: &Cli) -> Result<Manifest> {
    match &cli.manifest {
        Some(path) => {
            info!("Loading manifest from {}", path.display());
            Manifest::load_from_file(path)
        }
        None => Manifest::embedded().context("Built-in package manifest is invalid"),
    }
}

fn print_variant(variant: Variant, packages: &InstallerVariant) {
    println!("\nSupporting packages for `{}` version:", variant.label());
    for supported in &packages.support {
        println!("\t{}", supported);
    }
    for pkg in packages.packages() {
        println!("\t  {} ({})", pkg.name, pkg.link);
    }
    println!();
    let _ = io::stdout().flush();
}

fn goodbye(packages: &InstallerVariant, report: &InstallReport) {
    println!("Installation Complete!");
    if !report.already_installed.is_empty() {
        println!("Already installed: {}", report.already_installed.join(", "));
    }

    println!(
        "\nTo prevent the system from updating the packages, add the following to /etc/pacman.conf"
    );
    println!("\tIgnorePkg = {}", packages.ignore_list().join(" "));

    println!("\nCommon Error: # ERROR: libdevice not found at ./libdevice.10.bc");
    println!(
        "To fix this error, run the following command:\n\texport XLA_FLAGS=--xla_gpu_cuda_data_dir=/opt/cuda"
    );
}
