//! Narration timing.
//!
//! A [`SpeechService`] turns narration text with inline `<bookmark mark="name"/>` markers
//! into a [`Speech`]: the transcript with the markers stripped, its duration, and the
//! offset of every bookmark. A [`Voiceover`] borrows the stage for the length of one
//! speech segment; animations played through it overlap the narration, and dropping it
//! waits out whatever is left of the speech.

use log::{debug, warn};

use crate::stage::{EngineError, Stage};

#[derive(thiserror::Error, Debug)]
pub enum VoiceError {
    #[error("unknown bookmark {0:?}")]
    UnknownBookmark(String),

    #[error("malformed bookmark marker at byte {0}")]
    Markup(usize),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Speech {
    pub transcript: String,
    /// Seconds.
    pub duration: f32,
    /// Bookmark names with their offsets from the start of the speech, in text order.
    pub bookmarks: Vec<(String, f32)>,
}

impl Speech {
    pub fn bookmark(&self, name: &str) -> Option<f32> {
        self.bookmarks
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }
}

pub trait SpeechService {
    fn synthesize(&self, text: &str) -> Result<Speech, VoiceError>;
}

/// Text without markers, plus each bookmark with the number of words spoken before it.
pub fn strip_bookmarks(text: &str) -> Result<(String, Vec<(String, usize)>), VoiceError> {
    const OPEN: &str = "<bookmark";
    let mut words: Vec<&str> = Vec::new();
    let mut marks = Vec::new();
    let mut rest = text;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        words.extend(rest[..start].split_whitespace());
        let tag_start = offset + start;
        let after = &rest[start + OPEN.len()..];
        let end = after.find("/>").ok_or(VoiceError::Markup(tag_start))?;
        let name = mark_attribute(&after[..end]).ok_or(VoiceError::Markup(tag_start))?;
        marks.push((name.to_string(), words.len()));

        let consumed = start + OPEN.len() + end + 2;
        rest = &rest[consumed..];
        offset += consumed;
    }
    words.extend(rest.split_whitespace());
    Ok((words.join(" "), marks))
}

fn mark_attribute(attrs: &str) -> Option<&str> {
    let i = attrs.find("mark")?;
    let value = attrs[i + 4..].trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &value[1..];
    let close = body.find(quote)?;
    Some(&body[..close]).filter(|n| !n.is_empty())
}

/// Offline speech timing estimated from a speaking rate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScriptedSpeech {
    pub words_per_minute: f32,
    /// Lower bound on any segment's duration.
    pub min_duration: f32,
}

impl Default for ScriptedSpeech {
    fn default() -> Self {
        Self {
            words_per_minute: 150.0,
            min_duration: 0.5,
        }
    }
}

impl SpeechService for ScriptedSpeech {
    fn synthesize(&self, text: &str) -> Result<Speech, VoiceError> {
        let (transcript, marks) = strip_bookmarks(text)?;
        let per_word = 60.0 / self.words_per_minute.max(1.0);
        let words = transcript.split_whitespace().count();
        let duration = (words as f32 * per_word).max(self.min_duration);
        Ok(Speech {
            transcript,
            duration,
            bookmarks: marks
                .into_iter()
                .map(|(name, w)| (name, w as f32 * per_word))
                .collect(),
        })
    }
}

/// One narrated segment. Holds the stage until dropped.
pub struct Voiceover<'s, S: Stage + ?Sized> {
    stage: &'s mut S,
    speech: Speech,
    start: f32,
    finished: bool,
}

impl<'s, S: Stage + ?Sized> Voiceover<'s, S> {
    pub fn begin(
        stage: &'s mut S,
        service: &dyn SpeechService,
        text: &str,
    ) -> Result<Self, VoiceError> {
        let speech = service.synthesize(text)?;
        let start = stage.time();
        debug!(
            "voiceover at {start:.2}s for {:.2}s: {:?}",
            speech.duration, speech.transcript
        );
        Ok(Self {
            stage,
            speech,
            start,
            finished: false,
        })
    }

    pub fn stage(&mut self) -> &mut S {
        &mut *self.stage
    }

    pub fn speech(&self) -> &Speech {
        &self.speech
    }

    pub fn elapsed(&self) -> f32 {
        self.stage.time() - self.start
    }

    pub fn remaining(&self) -> f32 {
        (self.speech.duration - self.elapsed()).max(0.0)
    }

    /// Wait until the narration reaches bookmark `name`. Returns at once if it already has.
    pub fn wait_until_bookmark(&mut self, name: &str) -> Result<(), VoiceError> {
        let at = self
            .speech
            .bookmark(name)
            .ok_or_else(|| VoiceError::UnknownBookmark(name.to_string()))?;
        let dt = at - self.elapsed();
        if dt > 0.0 {
            self.stage.wait(dt)?;
        }
        Ok(())
    }

    /// Wait out the rest of the speech, reporting a failed wait.
    pub fn finish(mut self) -> Result<(), VoiceError> {
        self.finished = true;
        let r = self.remaining();
        if r > 0.0 {
            self.stage.wait(r)?;
        }
        Ok(())
    }
}

impl<S: Stage + ?Sized> Drop for Voiceover<'_, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let r = self.remaining();
        if r > 0.0 {
            if let Err(e) = self.stage.wait(r) {
                warn!("voiceover: could not wait out {r:.2}s of speech: {e}");
            }
        }
    }
}

/// Start a narrated segment on `stage`.
pub fn voiceover<'s, S: Stage + ?Sized>(
    stage: &'s mut S,
    service: &dyn SpeechService,
    text: &str,
) -> Result<Voiceover<'s, S>, VoiceError> {
    Voiceover::begin(stage, service, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Recorder;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    // 60 wpm: one second per word.
    fn slow() -> ScriptedSpeech {
        ScriptedSpeech {
            words_per_minute: 60.0,
            min_duration: 0.0,
        }
    }

    #[test]
    fn test_strip_bookmarks() {
        let (text, marks) =
            strip_bookmarks("Let's find <bookmark mark=\"x\"/> the  side 'x'. <bookmark mark='end' />")
                .unwrap();
        assert_eq!(text, "Let's find the side 'x'.");
        assert_eq!(marks, vec![("x".to_string(), 2), ("end".to_string(), 5)]);
        assert!(matches!(strip_bookmarks("a <bookmark mark=\"x\""), Err(VoiceError::Markup(2))));
        assert!(strip_bookmarks("a <bookmark/>").is_err());
    }

    #[test]
    fn test_bookmark_offsets() {
        let s = slow().synthesize("one two <bookmark mark=\"b\"/> three four").unwrap();
        assert!(approx(s.duration, 4.0));
        assert_eq!(s.bookmark("b"), Some(2.0));
        assert_eq!(s.bookmark("nope"), None);
    }

    #[test]
    fn test_wait_until_bookmark_and_drop() {
        let mut rec = Recorder::default();
        {
            let mut vo = voiceover(&mut rec, &slow(), "a b c <bookmark mark=\"m\"/> d e").unwrap();
            vo.stage().wait(1.0).unwrap();
            vo.wait_until_bookmark("m").unwrap();
            assert!(approx(vo.elapsed(), 3.0));
            vo.wait_until_bookmark("m").unwrap();
            assert!(approx(vo.elapsed(), 3.0));
            assert!(matches!(
                vo.wait_until_bookmark("x"),
                Err(VoiceError::UnknownBookmark(n)) if n == "x"
            ));
        }
        assert!(approx(rec.time(), 5.0));
    }

    #[test]
    fn test_drop_on_error_path_waits_out_speech() {
        fn lesson(rec: &mut Recorder) -> Result<(), VoiceError> {
            let mut vo = voiceover(rec, &slow(), "one two three")?;
            vo.wait_until_bookmark("missing")?;
            Ok(())
        }
        let mut rec = Recorder::default();
        assert!(lesson(&mut rec).is_err());
        assert!(approx(rec.time(), 3.0));
    }

    #[test]
    fn test_finish_and_overrun() {
        let mut rec = Recorder::default();
        let mut vo = voiceover(&mut rec, &slow(), "short").unwrap();
        vo.stage().wait(2.5).unwrap();
        assert_eq!(vo.remaining(), 0.0);
        vo.finish().unwrap();
        assert!(approx(rec.time(), 2.5));
    }
}
