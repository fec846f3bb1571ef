//! Speech output that plays a synthesized or sampled clip.

use crate::error::Result;
use crate::playback::{MediaEvent, PlaybackElement};
use crate::speech::backend::{PauseOutcome, SpeechOutput};
use crate::speech::conversion::PlayableClip;
use std::rc::Rc;

/// Builds a fresh playback element for each utterance.
pub type ElementFactory = Rc<dyn Fn() -> Box<dyn PlaybackElement>>;

/// A clip playing on its own element.
pub struct ClipOutput {
    element: Box<dyn PlaybackElement>,
    pausable: bool,
    finished: bool,
}

impl ClipOutput {
    /// Loads `clip` and starts it at `volume`.
    pub fn start(mut element: Box<dyn PlaybackElement>, clip: &PlayableClip, volume: f32) -> Result<Self> {
        element.load(clip.blob())?;
        element.set_volume(volume);
        element.play()?;
        Ok(Self {
            element,
            pausable: clip.supports_pause(),
            finished: false,
        })
    }
}

impl SpeechOutput for ClipOutput {
    fn pause(&mut self) -> Result<PauseOutcome> {
        if self.pausable {
            self.element.pause();
            Ok(PauseOutcome::Paused)
        } else {
            tracing::debug!("Clip has no pause, stopping instead");
            self.stop();
            Ok(PauseOutcome::Stopped)
        }
    }

    fn resume(&mut self) -> Result<()> {
        self.element.play()
    }

    fn stop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.element.pause();
            self.element.unload();
        }
    }

    fn is_finished(&mut self) -> bool {
        while let Some(event) = self.element.poll_event() {
            if event == MediaEvent::Ended {
                self.finished = true;
            }
        }
        self.finished
    }
}

impl Drop for ClipOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::{self, AudioBlob};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Element that records calls into a shared log.
    pub(crate) struct LoggingElement {
        pub log: Rc<RefCell<Vec<String>>>,
        pub events: Rc<RefCell<VecDeque<MediaEvent>>>,
    }

    impl LoggingElement {
        pub(crate) fn factory(
            log: Rc<RefCell<Vec<String>>>,
            events: Rc<RefCell<VecDeque<MediaEvent>>>,
        ) -> ElementFactory {
            Rc::new(move || {
                Box::new(LoggingElement {
                    log: Rc::clone(&log),
                    events: Rc::clone(&events),
                }) as Box<dyn PlaybackElement>
            })
        }
    }

    impl PlaybackElement for LoggingElement {
        fn load(&mut self, blob: &AudioBlob) -> Result<()> {
            self.log
                .borrow_mut()
                .push(format!("load {}", blob.container().extension()));
            Ok(())
        }

        fn unload(&mut self) {
            self.log.borrow_mut().push("unload".into());
        }

        fn play(&mut self) -> Result<()> {
            self.log.borrow_mut().push("play".into());
            Ok(())
        }

        fn pause(&mut self) {
            self.log.borrow_mut().push("pause".into());
        }

        fn seek(&mut self, _position: f64) {}

        fn set_volume(&mut self, volume: f32) {
            self.log.borrow_mut().push(format!("volume {volume}"));
        }

        fn poll_event(&mut self) -> Option<MediaEvent> {
            self.events.borrow_mut().pop_front()
        }
    }

    fn start(clip: PlayableClip) -> (ClipOutput, Rc<RefCell<Vec<String>>>, Rc<RefCell<VecDeque<MediaEvent>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::new(RefCell::new(VecDeque::new()));
        let factory = LoggingElement::factory(Rc::clone(&log), Rc::clone(&events));
        let output = ClipOutput::start(factory(), &clip, 0.5).unwrap();
        (output, log, events)
    }

    #[test]
    fn element_clip_pauses_and_resumes() {
        let wav = media::wav::silent_clip(1, 8_000).unwrap();
        let (mut output, log, _) = start(PlayableClip::Element(wav));
        assert_eq!(output.pause().unwrap(), PauseOutcome::Paused);
        output.resume().unwrap();
        assert_eq!(*log.borrow(), vec!["load wav", "volume 0.5", "play", "pause", "play"]);
        assert!(!output.is_finished());
    }

    #[test]
    fn graph_clip_stops_on_pause() {
        let wav = media::wav::silent_clip(1, 8_000).unwrap();
        let (mut output, log, _) = start(PlayableClip::Graph(wav));
        assert_eq!(output.pause().unwrap(), PauseOutcome::Stopped);
        assert!(output.is_finished());
        drop(output);
        assert_eq!(log.borrow().iter().filter(|c| *c == "unload").count(), 1);
    }

    #[test]
    fn ended_event_finishes_output() {
        let wav = media::wav::silent_clip(1, 8_000).unwrap();
        let (mut output, _, events) = start(PlayableClip::Element(wav));
        events.borrow_mut().push_back(MediaEvent::TimeUpdate { position: 0.5 });
        events.borrow_mut().push_back(MediaEvent::Ended);
        assert!(output.is_finished());
    }
}
