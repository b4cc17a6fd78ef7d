//! Fetch command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{format_duration, Output};
use crate::config::{Settings, TranscriptSource};
use crate::orchestrator::{AcquireOptions, Acquisition, Orchestrator};
use crate::transcript::{format_transcript, OutputFormat};
use anyhow::Result;

/// Options for the fetch command, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub media: String,
    pub language: Option<String>,
    pub source: String,
    pub no_refine: bool,
    pub force: bool,
    pub no_demo: bool,
    pub output: Option<String>,
    pub format: String,
}

/// Run the fetch command.
pub async fn run_fetch(args: FetchArgs, settings: Settings) -> Result<()> {
    let source: TranscriptSource = args.source.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let format: OutputFormat = args.format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if let Err(e) = preflight::check(Operation::Acquire(source), &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tekst doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let refine = !args.no_refine && source == TranscriptSource::Captions;
    if refine && settings.refinement.enabled && !preflight::refinement_available(&settings) {
        Output::warning("OPENAI_API_KEY not set; captions will not be refined.");
    }

    let options = AcquireOptions {
        source,
        refine,
        demo_fallback: settings.captions.demo_fallback && !args.no_demo,
        force: args.force,
    };

    let orchestrator = Orchestrator::new(settings)?.with_progress(true);
    let acquisition = acquire(&orchestrator, &args.media, args.language.as_deref(), options).await?;

    if acquisition.is_demo() {
        Output::warning("No captions available for this video; showing the demo transcript.");
    }

    match args.output {
        Some(path) => {
            let content = format_transcript(&acquisition.transcript, format);
            std::fs::write(&path, content)?;
            Output::success(&format!(
                "Wrote {} segments to {}",
                acquisition.transcript.len(),
                path
            ));
        }
        None => print_acquisition(&acquisition),
    }

    Ok(())
}

/// Acquire with user-facing progress, shared by the fetch and play commands.
pub(crate) async fn acquire(
    orchestrator: &Orchestrator,
    media: &str,
    language: Option<&str>,
    options: AcquireOptions,
) -> Result<Acquisition> {
    match options.source {
        TranscriptSource::Captions => {
            Output::info(&format!("Fetching captions for {}", media));
            match orchestrator.acquire(media, language, options).await {
                Ok(acquisition) => Ok(acquisition),
                Err(e) => {
                    Output::error(&format!("Failed to fetch captions: {}", e));
                    Err(e.into())
                }
            }
        }
        TranscriptSource::Diarized => {
            let spinner = Output::spinner("Extracting audio and transcribing (this can take a while)...");
            let result = orchestrator.acquire(media, language, options).await;
            spinner.finish_and_clear();
            match result {
                Ok(acquisition) => Ok(acquisition),
                Err(e) => {
                    Output::error(&format!("Diarized transcription failed ({}): {}", e.kind(), e));
                    Err(e.into())
                }
            }
        }
    }
}

fn print_acquisition(acquisition: &Acquisition) {
    let transcript = &acquisition.transcript;

    Output::header(&format!("Transcript {}", transcript.media_id));
    Output::kv("Language", &transcript.language);
    Output::kv("Segments", &transcript.len().to_string());
    Output::kv("Words", &transcript.word_count().to_string());
    Output::kv("Duration", &format_duration(transcript.duration_seconds()));

    let speakers = transcript.speakers();
    if !speakers.is_empty() {
        Output::kv("Speakers", &speakers.join(", "));
    }

    let origin = if acquisition.from_cache {
        "cache"
    } else if acquisition.is_demo() {
        "demo"
    } else if acquisition.refined {
        "fresh, refined"
    } else {
        "fresh"
    };
    Output::kv("Source", origin);
    println!();

    for (index, segment) in transcript.segments.iter().enumerate() {
        Output::segment(index, segment, None);
    }
}
