use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use partita::config::RenderConfig;
use partita::{midi, synth};

#[derive(Parser)]
#[command(name = "partita", version, about = "Compile score files to MIDI and WAV")]
struct Args {
    /// Score source file
    input: PathBuf,

    /// Write a Standard MIDI File to this path
    #[arg(long)]
    midi: Option<PathBuf>,

    /// Write a WAV rendering to this path
    #[arg(long)]
    wav: Option<PathBuf>,

    /// YAML render configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    let source = fs::read_to_string(&args.input)?;
    let output = partita::compile(&source);
    for diagnostic in &output.diagnostics {
        eprintln!("{diagnostic}");
    }
    if output.had_parse_error {
        eprintln!("warning: source had parse errors; output is best-effort");
    }

    // With no explicit targets, both artifacts land next to the input.
    let (midi_target, wav_target) = match (&args.midi, &args.wav) {
        (None, None) => (
            Some(args.input.with_extension("mid")),
            Some(args.input.with_extension("wav")),
        ),
        (midi, wav) => (midi.clone(), wav.clone()),
    };

    let mut written = 0usize;
    let mut requested = 0usize;

    if let Some(path) = midi_target {
        requested += 1;
        let (bytes, diagnostics) = midi::emit(&output.score, config.ticks_per_quarter);
        for diagnostic in &diagnostics {
            eprintln!("{diagnostic}");
        }
        match fs::write(&path, bytes) {
            Ok(()) => {
                println!("wrote {}", path.display());
                written += 1;
            }
            Err(e) => eprintln!("failed to write {}: {e}", path.display()),
        }
    }

    if let Some(path) = wav_target {
        requested += 1;
        let (samples, diagnostics) = synth::synthesize(&output.score, &config.synth_params());
        for diagnostic in &diagnostics {
            eprintln!("{diagnostic}");
        }
        match synth::write_wav(&path, &samples, config.sample_rate) {
            Ok(()) => {
                println!("wrote {}", path.display());
                written += 1;
            }
            Err(e) => eprintln!("failed to write {}: {e}", path.display()),
        }
    }

    if requested > 0 && written == 0 {
        return Err("no output artifacts could be written".into());
    }
    Ok(())
}
