//! Batched sentence reconstruction and speaker attribution.

use super::CompletionClient;
use crate::config::{Prompts, RefinementSettings};
use crate::error::{Result, TekstError};
use crate::transcript::Segment;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One refined caption line as returned by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefinedLine {
    #[serde(rename = "fullSentence", alias = "full_sentence", default)]
    pub full_sentence: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Result of refining one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The model returned one usable line per input segment.
    Refined(Vec<Segment>),
    /// The batch kept its raw text.
    Fallback { segments: Vec<Segment>, reason: String },
}

impl BatchOutcome {
    pub fn segments(&self) -> &[Segment] {
        match self {
            BatchOutcome::Refined(segments) => segments,
            BatchOutcome::Fallback { segments, .. } => segments,
        }
    }

    fn into_segments(self) -> Vec<Segment> {
        match self {
            BatchOutcome::Refined(segments) => segments,
            BatchOutcome::Fallback { segments, .. } => segments,
        }
    }
}

/// Strip a Markdown code fence around a model response, if any.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse a refinement response into exactly `expected` lines.
///
/// Accepts a bare JSON array, optionally wrapped in a code fence, or an
/// object whose first array-valued field holds the lines.
pub fn parse_refinement_response(content: &str, expected: usize) -> Result<Vec<RefinedLine>> {
    let body = strip_code_fences(content);

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TekstError::RefinementParseFailure(format!("invalid JSON: {}", e)))?;

    let array = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(_, v)| v)
            .find(|v| v.is_array())
            .ok_or_else(|| {
                TekstError::RefinementParseFailure("response object holds no array".to_string())
            })?,
        _ => {
            return Err(TekstError::RefinementParseFailure(
                "response is not a JSON array".to_string(),
            ))
        }
    };

    let lines: Vec<RefinedLine> = serde_json::from_value(array)
        .map_err(|e| TekstError::RefinementParseFailure(format!("invalid lines: {}", e)))?;

    if lines.len() != expected {
        return Err(TekstError::RefinementParseFailure(format!(
            "expected {} lines, got {}",
            expected,
            lines.len()
        )));
    }

    Ok(lines)
}

/// Refines caption segments in sequential batches, carrying the last known
/// speaker from one batch into the next.
pub struct ChunkedRefiner {
    client: Arc<dyn CompletionClient>,
    prompts: Prompts,
    batch_size: usize,
    default_speaker: String,
    show_progress: bool,
}

impl ChunkedRefiner {
    pub fn new(client: Arc<dyn CompletionClient>, prompts: Prompts, settings: &RefinementSettings) -> Self {
        Self {
            client,
            prompts,
            batch_size: settings.batch_size.max(1),
            default_speaker: settings.default_speaker.clone(),
            show_progress: false,
        }
    }

    /// Show a progress bar on stderr while refining.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Refine `segments`, returning a sequence of the same length and order.
    ///
    /// Every returned segment has a `full_sentence` and a `speaker`. If the
    /// refined sequence would not line up with the input, the input is
    /// returned unchanged.
    #[instrument(skip(self, segments), fields(segments = segments.len()))]
    pub async fn refine(&self, segments: Vec<Segment>, language: &str) -> Vec<Segment> {
        if segments.is_empty() {
            return segments;
        }

        let batch_count = segments.len().div_ceil(self.batch_size);
        info!("Refining {} segments in {} batches", segments.len(), batch_count);

        let pb = self.progress_bar(batch_count);

        let mut refined = Vec::with_capacity(segments.len());
        let mut carried_speaker = self.default_speaker.clone();
        let mut fallbacks = 0usize;

        for (index, batch) in segments.chunks(self.batch_size).enumerate() {
            let outcome = self.refine_batch(batch, language, &carried_speaker).await;

            match &outcome {
                BatchOutcome::Refined(batch_segments) => {
                    if let Some(speaker) = batch_segments.last().and_then(|s| s.speaker.clone()) {
                        carried_speaker = speaker;
                    }
                }
                BatchOutcome::Fallback { reason, .. } => {
                    fallbacks += 1;
                    warn!("Batch {}/{} kept raw text: {}", index + 1, batch_count, reason);
                }
            }

            refined.extend(outcome.into_segments());
            pb.inc(1);
        }

        pb.finish_and_clear();

        if refined.len() != segments.len() {
            warn!(
                "Refined transcript has {} segments, expected {}; keeping raw captions",
                refined.len(),
                segments.len()
            );
            return segments;
        }

        info!(
            "Refinement complete: {} of {} batches refined",
            batch_count - fallbacks,
            batch_count
        );
        refined
    }

    /// Refine a single batch with `carried_speaker` as the incoming speaker.
    pub async fn refine_batch(
        &self,
        batch: &[Segment],
        language: &str,
        carried_speaker: &str,
    ) -> BatchOutcome {
        match self.request_lines(batch, language, carried_speaker).await {
            Ok(lines) => BatchOutcome::Refined(
                batch
                    .iter()
                    .zip(lines)
                    .map(|(segment, line)| {
                        let sentence = if line.full_sentence.trim().is_empty() {
                            segment.text.clone()
                        } else {
                            line.full_sentence
                        };
                        let speaker = line
                            .speaker
                            .filter(|s| !s.trim().is_empty())
                            .unwrap_or_else(|| carried_speaker.to_string());
                        segment
                            .clone()
                            .with_full_sentence(sentence)
                            .with_speaker(speaker)
                    })
                    .collect(),
            ),
            Err(e) => BatchOutcome::Fallback {
                segments: batch
                    .iter()
                    .map(|segment| {
                        segment
                            .clone()
                            .with_full_sentence(segment.text.clone())
                            .with_speaker(carried_speaker)
                    })
                    .collect(),
                reason: e.to_string(),
            },
        }
    }

    async fn request_lines(
        &self,
        batch: &[Segment],
        language: &str,
        carried_speaker: &str,
    ) -> Result<Vec<RefinedLine>> {
        let numbered = batch
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s.text))
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("language".to_string(), language.to_string());
        vars.insert("count".to_string(), batch.len().to_string());
        vars.insert("speaker".to_string(), carried_speaker.to_string());
        vars.insert("text".to_string(), numbered);

        let system = self.prompts.render_with_custom(&self.prompts.refinement.system, &vars);
        let user = self.prompts.render_with_custom(&self.prompts.refinement.user, &vars);

        let content = self.client.complete(&system, &user).await?;
        debug!("Refinement response: {} chars", content.len());

        parse_refinement_response(&content, batch.len())
    }

    fn progress_bar(&self, batches: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(batches as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Refining [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses in order, failing once they run out.
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.calls.lock().unwrap().push(user.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TekstError::OpenAI("no more responses".to_string())))
        }
    }

    fn settings(batch_size: usize) -> RefinementSettings {
        RefinementSettings {
            batch_size,
            ..Default::default()
        }
    }

    fn captions(n: usize) -> Vec<Segment> {
        (0..n)
            .map(|i| Segment::new(format!("line {}", i), i as f64 * 2.0, 2.0))
            .collect()
    }

    fn lines_json(speakers: &[&str]) -> String {
        let lines: Vec<serde_json::Value> = speakers
            .iter()
            .enumerate()
            .map(|(i, s)| serde_json::json!({"fullSentence": format!("Sentence {}.", i), "speaker": s}))
            .collect();
        serde_json::Value::Array(lines).to_string()
    }

    #[test]
    fn test_parse_bare_array() {
        let lines = parse_refinement_response(
            r#"[{"fullSentence": "Hallo.", "speaker": "Speaker 1"}]"#,
            1,
        )
        .unwrap();
        assert_eq!(lines[0].full_sentence, "Hallo.");
        assert_eq!(lines[0].speaker.as_deref(), Some("Speaker 1"));
    }

    #[test]
    fn test_parse_fenced_array() {
        let content = "```json\n[{\"fullSentence\": \"Hi.\", \"speaker\": \"Speaker 2\"}]\n```";
        let lines = parse_refinement_response(content, 1).unwrap();
        assert_eq!(lines[0].speaker.as_deref(), Some("Speaker 2"));

        let bare_fence = "```\n[{\"fullSentence\": \"Hi.\"}]\n```";
        let lines = parse_refinement_response(bare_fence, 1).unwrap();
        assert!(lines[0].speaker.is_none());
    }

    #[test]
    fn test_parse_wrapped_object() {
        let content = r#"{"lines": [{"fullSentence": "A."}, {"fullSentence": "B."}]}"#;
        let lines = parse_refinement_response(content, 2).unwrap();
        assert_eq!(lines[1].full_sentence, "B.");
    }

    #[test]
    fn test_parse_count_mismatch() {
        let err = parse_refinement_response(r#"[{"fullSentence": "A."}]"#, 2).unwrap_err();
        assert!(matches!(err, TekstError::RefinementParseFailure(_)));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_refinement_response("Sure! Here you go.", 1).is_err());
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let client = ScriptedClient::new(vec![]);
        let refiner = ChunkedRefiner::new(client.clone(), Prompts::default(), &settings(10));
        let out = refiner.refine(Vec::new(), "de").await;
        assert!(out.is_empty());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_batches_fail_keeps_length_and_text() {
        let client = ScriptedClient::new(vec![]);
        let refiner = ChunkedRefiner::new(client.clone(), Prompts::default(), &settings(3));
        let input = captions(7);

        let out = refiner.refine(input.clone(), "de").await;

        assert_eq!(out.len(), input.len());
        assert_eq!(client.calls().len(), 3);
        for (refined, raw) in out.iter().zip(&input) {
            assert_eq!(refined.full_sentence.as_deref(), Some(raw.text.as_str()));
            assert_eq!(refined.speaker.as_deref(), Some("Speaker 1"));
            assert_eq!(refined.start, raw.start);
        }
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let client = ScriptedClient::new(vec![
            Ok(lines_json(&["Speaker 1", "Speaker 1"])),
            Ok(lines_json(&["Speaker 2", "Speaker 2"])),
            Ok(lines_json(&["Speaker 1"])),
        ]);
        let refiner = ChunkedRefiner::new(client, Prompts::default(), &settings(2));
        let input = captions(5);

        let out = refiner.refine(input.clone(), "en").await;

        let starts: Vec<f64> = out.iter().map(|s| s.start).collect();
        let expected: Vec<f64> = input.iter().map(|s| s.start).collect();
        assert_eq!(starts, expected);
        assert_eq!(out[2].full_sentence.as_deref(), Some("Sentence 0."));
        assert_eq!(out[2].text, "line 2");
    }

    #[tokio::test]
    async fn test_speaker_carried_into_failed_batch() {
        let client = ScriptedClient::new(vec![
            Ok(lines_json(&["Speaker 1", "Speaker 2"])),
            Err(TekstError::OpenAI("rate limited".to_string())),
        ]);
        let refiner = ChunkedRefiner::new(client.clone(), Prompts::default(), &settings(2));

        let out = refiner.refine(captions(4), "de").await;

        assert_eq!(out[1].speaker.as_deref(), Some("Speaker 2"));
        assert_eq!(out[2].speaker.as_deref(), Some("Speaker 2"));
        assert_eq!(out[3].speaker.as_deref(), Some("Speaker 2"));
        assert_eq!(out[3].full_sentence.as_deref(), Some("line 3"));

        // Second prompt announces the carried speaker
        let calls = client.calls();
        assert!(calls[1].contains("Speaker 2"));
    }

    #[tokio::test]
    async fn test_wrong_line_count_falls_back_for_that_batch() {
        let client = ScriptedClient::new(vec![
            Ok(lines_json(&["Speaker 3"])),
            Ok(lines_json(&["Speaker 1", "Speaker 2"])),
        ]);
        let refiner = ChunkedRefiner::new(client, Prompts::default(), &settings(2));

        let out = refiner.refine(captions(4), "de").await;

        assert_eq!(out.len(), 4);
        assert_eq!(out[0].full_sentence.as_deref(), Some("line 0"));
        assert_eq!(out[0].speaker.as_deref(), Some("Speaker 1"));
        assert_eq!(out[3].speaker.as_deref(), Some("Speaker 2"));
        assert_eq!(out[3].full_sentence.as_deref(), Some("Sentence 1."));
    }

    #[tokio::test]
    async fn test_prompt_numbers_lines() {
        let client = ScriptedClient::new(vec![Ok(lines_json(&["Speaker 1", "Speaker 1"]))]);
        let refiner = ChunkedRefiner::new(client.clone(), Prompts::default(), &settings(5));

        refiner.refine(captions(2), "de").await;

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("1. line 0\n2. line 1"));
        assert!(calls[0].contains("Language: de"));
    }

    #[tokio::test]
    async fn test_batch_outcome_variants() {
        let client = ScriptedClient::new(vec![Ok("not json".to_string())]);
        let refiner = ChunkedRefiner::new(client, Prompts::default(), &settings(5));

        let outcome = refiner.refine_batch(&captions(2), "de", "Speaker 4").await;
        match outcome {
            BatchOutcome::Fallback { segments, .. } => {
                assert_eq!(segments.len(), 2);
                assert_eq!(segments[1].speaker.as_deref(), Some("Speaker 4"));
            }
            BatchOutcome::Refined(_) => panic!("expected fallback"),
        }
    }
}
