mod config;

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use gfgb_core::{disasm, gameboy::GameBoy, sst, symbols::DebugSymbolTable};
use log::{debug, info};

// Failing cases printed per SST file.
const MAX_REPORTED: usize = 5;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "gfgb", about = "Headless Game Boy CPU core runner")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a ROM without video or audio and print serial output
    Run {
        /// Path to ROM file
        rom: PathBuf,

        /// Path to boot ROM file
        #[arg(long)]
        bootrom: Option<PathBuf>,

        /// Stop after this many instructions
        #[arg(long)]
        max_steps: Option<u64>,

        /// RGBDS .sym file used to name the failing routine
        #[arg(long)]
        symbols: Vec<PathBuf>,
    },
    /// Print a disassembly of the boot ROM and bank 0
    Disasm {
        /// Path to ROM file
        rom: PathBuf,

        /// RGBDS .sym file (may be given more than once)
        #[arg(long)]
        symbols: Vec<PathBuf>,

        /// Path to boot ROM file
        #[arg(long)]
        bootrom: Option<PathBuf>,
    },
    /// Replay single-step test vectors
    Sst {
        /// JSON files, or directories of them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let cfg = config::load_from_file(&config_path);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cfg.log_level))
        .init();
    debug!("config {}: {cfg:?}", config_path.display());

    let result = match cli.command {
        Command::Run {
            rom,
            bootrom,
            max_steps,
            symbols,
        } => run_rom(
            &rom,
            bootrom.or(cfg.bootrom_path),
            max_steps.unwrap_or(cfg.max_steps),
            &symbols,
        ),
        Command::Disasm {
            rom,
            symbols,
            bootrom,
        } => disassemble(&rom, bootrom.or(cfg.bootrom_path), &symbols),
        Command::Sst { paths } => replay_sst(&paths),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn load_machine(rom: &Path, bootrom: Option<PathBuf>) -> Result<GameBoy, Box<dyn Error>> {
    let mut gb = GameBoy::new();
    gb.load_rom_file(rom)?;
    if let Some(path) = bootrom {
        gb.load_boot_rom_file(&path)?;
        info!("boot ROM {} mapped", path.display());
    }
    Ok(gb)
}

fn load_symbols(paths: &[PathBuf]) -> Result<DebugSymbolTable, Box<dyn Error>> {
    let mut table = DebugSymbolTable::new();
    for path in paths {
        let report = table.load_file(path)?;
        if report.skipped > 0 {
            eprintln!(
                "{}: skipped {} malformed line(s)",
                path.display(),
                report.skipped
            );
        }
    }
    Ok(table)
}

fn run_rom(rom: &Path, bootrom: Option<PathBuf>, max_steps: u64, symbols: &[PathBuf]) -> CliResult {
    let mut gb = load_machine(rom, bootrom)?;
    let symbols = load_symbols(symbols)?;

    let mut stdout = io::stdout().lock();
    let mut steps = 0u64;
    while steps < max_steps {
        if let Err(e) = gb.step() {
            stdout.flush()?;
            let pc = gb.cpu.regs.pc;
            return Err(match symbols.symbol_containing(pc) {
                Some(sym) => format!("{e} (in {})\n{}", sym.name, gb.cpu.regs.debug_state()),
                None => format!("{e}\n{}", gb.cpu.regs.debug_state()),
            }
            .into());
        }
        steps += 1;

        let out = gb.mmu.serial.take_output();
        if !out.is_empty() {
            stdout.write_all(&out)?;
            stdout.flush()?;
        }

        // Nothing can wake the CPU from here.
        if gb.cpu.stopped || (gb.cpu.halted && gb.mmu.ie_reg & 0x1F == 0) {
            info!("CPU idle at {:04X}", gb.cpu.regs.pc);
            break;
        }
    }

    info!("{steps} instructions, {} clocks", gb.cpu.cycles);
    Ok(())
}

fn disassemble(rom: &Path, bootrom: Option<PathBuf>, symbols: &[PathBuf]) -> CliResult {
    let gb = load_machine(rom, bootrom)?;
    let symbols = load_symbols(symbols)?;

    let mut stdout = io::BufWriter::new(io::stdout().lock());
    disasm::disassemble_program(&gb.mmu, Some(&symbols), &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn sst_files(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn replay_sst(paths: &[PathBuf]) -> CliResult {
    let files = sst_files(paths)?;
    let mut total = 0usize;
    let mut failed = 0usize;

    for file in &files {
        let cases = sst::load_file(file)?;
        let mut file_failed = 0usize;
        for case in &cases {
            if let Err(e) = case.run() {
                if file_failed < MAX_REPORTED {
                    println!("  {e}");
                }
                file_failed += 1;
            }
        }
        println!(
            "{}: {}/{} passed",
            file.display(),
            cases.len() - file_failed,
            cases.len()
        );
        total += cases.len();
        failed += file_failed;
    }

    println!("{} files, {}/{total} cases passed", files.len(), total - failed);
    if failed > 0 {
        return Err(format!("{failed} case(s) failed").into());
    }
    Ok(())
}
