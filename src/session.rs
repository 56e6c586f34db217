use chrono::Local;
use thiserror::Error;

use crate::calibration::{CalibrationTracker, ConfirmOutcome};
use crate::estimator::{CalibrationFeed, Readiness};
use crate::report::Report;
use crate::sample::{Extent, GazeSample, SampleBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    Idle,
    Calibrating,
    Tracking,
    Reporting,
}

/// Discrete inputs to the session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StartCalibration,
    /// A calibration target was clicked at screen point (x, y)
    TargetConfirmed { target: usize, x: f64, y: f64 },
    CalibrationFinished,
    CancelCalibration,
    BeginTracking,
    SampleArrived(GazeSample),
    StopTracking,
    DismissReport,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StartCalibration => "start-calibration",
            SessionEvent::TargetConfirmed { .. } => "target-confirmed",
            SessionEvent::CalibrationFinished => "calibration-finished",
            SessionEvent::CancelCalibration => "cancel-calibration",
            SessionEvent::BeginTracking => "begin-tracking",
            SessionEvent::SampleArrived(_) => "sample-arrived",
            SessionEvent::StopTracking => "stop-tracking",
            SessionEvent::DismissReport => "dismiss-report",
        }
    }
}

/// Facts about the session context the pure transition function may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Guards {
    pub ready: bool,
    pub has_calibrated: bool,
    pub calibration_complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ResetCalibration,
    ConfirmTarget { target: usize, x: f64, y: f64 },
    MarkCalibrated,
    ResetBuffer,
    RecordSample(GazeSample),
    FreezeReport,
    DiscardReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("gaze estimator is not ready")]
    EstimatorNotReady,
    #[error("tracking requires a finished calibration")]
    NotCalibrated,
    #[error("calibration targets are not all satisfied")]
    CalibrationIncomplete,
    #[error("'{event}' is not valid while {from}")]
    IllegalTransition {
        from: SessionState,
        event: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Next {
        state: SessionState,
        effects: Vec<Effect>,
    },
    /// Samples outside Tracking: dropped without comment
    Ignored,
    Rejected(Rejection),
}

/// Pure state transition: no side effects, only a description of them
pub fn transition(state: SessionState, guards: Guards, event: &SessionEvent) -> Transition {
    use SessionEvent as E;
    use SessionState as S;

    let next = |state, effects| Transition::Next { state, effects };

    match (state, event) {
        (S::Tracking, E::SampleArrived(sample)) => {
            next(S::Tracking, vec![Effect::RecordSample(*sample)])
        }
        (_, E::SampleArrived(_)) => Transition::Ignored,

        (S::Idle | S::Calibrating, E::StartCalibration) => {
            if !guards.ready {
                Transition::Rejected(Rejection::EstimatorNotReady)
            } else {
                next(S::Calibrating, vec![Effect::ResetCalibration])
            }
        }
        (S::Calibrating, E::TargetConfirmed { target, x, y }) => next(
            S::Calibrating,
            vec![Effect::ConfirmTarget {
                target: *target,
                x: *x,
                y: *y,
            }],
        ),
        (S::Calibrating, E::CalibrationFinished) => {
            if guards.calibration_complete {
                next(S::Idle, vec![Effect::MarkCalibrated])
            } else {
                Transition::Rejected(Rejection::CalibrationIncomplete)
            }
        }
        (S::Calibrating, E::CancelCalibration) => next(S::Idle, vec![]),

        (S::Idle, E::BeginTracking) => {
            if !guards.ready {
                Transition::Rejected(Rejection::EstimatorNotReady)
            } else if !guards.has_calibrated {
                Transition::Rejected(Rejection::NotCalibrated)
            } else {
                next(S::Tracking, vec![Effect::ResetBuffer])
            }
        }
        (S::Tracking, E::StopTracking) => next(S::Reporting, vec![Effect::FreezeReport]),
        (S::Reporting, E::DismissReport) => next(S::Idle, vec![Effect::DiscardReport]),

        (from, ev) => Transition::Rejected(Rejection::IllegalTransition {
            from,
            event: ev.name(),
        }),
    }
}

/// Session context owned by the host: state, calibration, buffer and report
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    readiness: Readiness,
    has_calibrated: bool,
    tracker: CalibrationTracker,
    buffer: SampleBuffer,
    report: Option<Report>,
    last_gaze: Option<GazeSample>,
    screen: Extent,
}

impl Session {
    pub fn new(required_clicks: u32, screen: Extent) -> Self {
        Self {
            state: SessionState::Idle,
            readiness: Readiness::Pending,
            has_calibrated: false,
            tracker: CalibrationTracker::new(required_clicks),
            buffer: SampleBuffer::new(),
            report: None,
            last_gaze: None,
            screen,
        }
    }

    pub fn with_buffer_capacity(mut self, capacity: Option<usize>) -> Self {
        self.buffer = match capacity {
            Some(cap) => SampleBuffer::with_capacity(cap),
            None => SampleBuffer::new(),
        };
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn set_readiness(&mut self, readiness: Readiness) {
        match &readiness {
            Readiness::Ready => log::info!("gaze estimator ready"),
            Readiness::Unavailable(reason) => log::warn!("gaze estimator unavailable: {reason}"),
            Readiness::Pending => {}
        }
        self.readiness = readiness;
    }

    pub fn has_calibrated(&self) -> bool {
        self.has_calibrated
    }

    pub fn tracker(&self) -> &CalibrationTracker {
        &self.tracker
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn last_gaze(&self) -> Option<GazeSample> {
        self.last_gaze
    }

    pub fn screen(&self) -> Extent {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Extent) {
        self.screen = screen;
    }

    pub fn guards(&self) -> Guards {
        Guards {
            ready: self.is_ready(),
            has_calibrated: self.has_calibrated,
            calibration_complete: self.tracker.is_complete(),
        }
    }

    /// Feed one event through the state machine.
    /// Returns true when the event produced a transition.
    pub fn handle<F>(&mut self, event: SessionEvent, feed: &mut F) -> bool
    where
        F: CalibrationFeed + ?Sized,
    {
        if let SessionEvent::SampleArrived(sample) = &event {
            self.last_gaze = Some(*sample);
        }

        match transition(self.state, self.guards(), &event) {
            Transition::Next { state, effects } => {
                for effect in effects {
                    self.apply(effect, feed);
                }
                if state != self.state {
                    log::info!("session {} -> {} on {}", self.state, state, event.name());
                }
                self.state = state;
                true
            }
            Transition::Ignored => false,
            Transition::Rejected(reason) => {
                log::warn!("rejected {} in {}: {reason}", event.name(), self.state);
                false
            }
        }
    }

    fn apply<F>(&mut self, effect: Effect, feed: &mut F)
    where
        F: CalibrationFeed + ?Sized,
    {
        match effect {
            Effect::ResetCalibration => self.tracker.reset(),
            Effect::ConfirmTarget { target, x, y } => match self.tracker.confirm(target) {
                ConfirmOutcome::Counted => feed.feed_calibration_point(x, y),
                ConfirmOutcome::AlreadySatisfied => {
                    log::debug!("target {target} already satisfied, click ignored")
                }
                ConfirmOutcome::UnknownTarget => log::warn!("no calibration target {target}"),
            },
            Effect::MarkCalibrated => self.has_calibrated = true,
            Effect::ResetBuffer => self.buffer.reset(),
            Effect::RecordSample(sample) => {
                self.buffer.record(SessionState::Tracking, sample);
            }
            Effect::FreezeReport => {
                let samples = self.buffer.drain();
                log::info!("froze {} samples for report", samples.len());
                self.report = Some(Report::new(samples, self.screen, Local::now()));
            }
            Effect::DiscardReport => self.report = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::RecordingFeed;
    use assert_matches::assert_matches;

    fn ready_session(required: u32) -> Session {
        let mut s = Session::new(required, Extent::new(800, 600));
        s.set_readiness(Readiness::Ready);
        s
    }

    fn calibrate(s: &mut Session, feed: &mut RecordingFeed) {
        assert!(s.handle(SessionEvent::StartCalibration, feed));
        for _ in 0..s.tracker().required_clicks() {
            for id in 0..9 {
                s.handle(
                    SessionEvent::TargetConfirmed {
                        target: id,
                        x: 1.0,
                        y: 2.0,
                    },
                    feed,
                );
            }
        }
        assert!(s.handle(SessionEvent::CalibrationFinished, feed));
    }

    #[test]
    fn starts_idle_and_uncalibrated() {
        let s = Session::new(3, Extent::new(10, 10));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.has_calibrated());
        assert!(!s.is_ready());
        assert!(s.report().is_none());
    }

    #[test]
    fn transition_table() {
        let ready = Guards {
            ready: true,
            has_calibrated: true,
            calibration_complete: true,
        };

        assert_matches!(
            transition(SessionState::Idle, ready, &SessionEvent::StartCalibration),
            Transition::Next { state: SessionState::Calibrating, .. }
        );
        assert_matches!(
            transition(SessionState::Calibrating, ready, &SessionEvent::CalibrationFinished),
            Transition::Next { state: SessionState::Idle, .. }
        );
        assert_matches!(
            transition(SessionState::Idle, ready, &SessionEvent::BeginTracking),
            Transition::Next { state: SessionState::Tracking, .. }
        );
        assert_matches!(
            transition(SessionState::Tracking, ready, &SessionEvent::StopTracking),
            Transition::Next { state: SessionState::Reporting, .. }
        );
        assert_matches!(
            transition(SessionState::Reporting, ready, &SessionEvent::DismissReport),
            Transition::Next { state: SessionState::Idle, .. }
        );
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let g = Guards {
            ready: true,
            has_calibrated: true,
            calibration_complete: true,
        };
        assert_matches!(
            transition(SessionState::Calibrating, g, &SessionEvent::BeginTracking),
            Transition::Rejected(Rejection::IllegalTransition {
                from: SessionState::Calibrating,
                event: "begin-tracking"
            })
        );
        assert_matches!(
            transition(SessionState::Tracking, g, &SessionEvent::StartCalibration),
            Transition::Rejected(Rejection::IllegalTransition { .. })
        );
        assert_matches!(
            transition(SessionState::Idle, g, &SessionEvent::StopTracking),
            Transition::Rejected(_)
        );
    }

    #[test]
    fn samples_outside_tracking_are_ignored() {
        let g = Guards::default();
        let sample = SessionEvent::SampleArrived(GazeSample::new(1.0, 1.0, 0.0));
        for state in [
            SessionState::Idle,
            SessionState::Calibrating,
            SessionState::Reporting,
        ] {
            assert_eq!(transition(state, g, &sample), Transition::Ignored);
        }
    }

    #[test]
    fn not_ready_blocks_calibration_and_tracking() {
        let mut s = Session::new(1, Extent::new(10, 10));
        let mut feed = RecordingFeed::default();
        assert!(!s.handle(SessionEvent::StartCalibration, &mut feed));
        assert_eq!(s.state(), SessionState::Idle);

        s.set_readiness(Readiness::Unavailable("no camera".into()));
        assert!(!s.handle(SessionEvent::StartCalibration, &mut feed));
        assert!(!s.handle(SessionEvent::BeginTracking, &mut feed));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn begin_tracking_requires_calibration() {
        let mut s = ready_session(1);
        let mut feed = RecordingFeed::default();
        assert!(!s.handle(SessionEvent::BeginTracking, &mut feed));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn finishing_incomplete_calibration_is_rejected() {
        let mut s = ready_session(2);
        let mut feed = RecordingFeed::default();
        s.handle(SessionEvent::StartCalibration, &mut feed);
        s.handle(
            SessionEvent::TargetConfirmed {
                target: 0,
                x: 0.0,
                y: 0.0,
            },
            &mut feed,
        );
        assert!(!s.handle(SessionEvent::CalibrationFinished, &mut feed));
        assert_eq!(s.state(), SessionState::Calibrating);
        assert!(!s.has_calibrated());
    }

    #[test]
    fn counted_confirmations_feed_the_estimator() {
        let mut s = ready_session(2);
        let mut feed = RecordingFeed::default();
        s.handle(SessionEvent::StartCalibration, &mut feed);
        for _ in 0..4 {
            s.handle(
                SessionEvent::TargetConfirmed {
                    target: 3,
                    x: 80.0,
                    y: 300.0,
                },
                &mut feed,
            );
        }
        assert_eq!(feed.points, vec![(80.0, 300.0), (80.0, 300.0)]);
    }

    #[test]
    fn full_lifecycle_freezes_report() {
        let mut s = ready_session(1);
        let mut feed = RecordingFeed::default();
        calibrate(&mut s, &mut feed);
        assert!(s.has_calibrated());
        assert_eq!(s.state(), SessionState::Idle);

        s.handle(SessionEvent::SampleArrived(GazeSample::new(9.0, 9.0, 0.0)), &mut feed);
        assert!(s.handle(SessionEvent::BeginTracking, &mut feed));
        for i in 0..3 {
            s.handle(
                SessionEvent::SampleArrived(GazeSample::new(i as f64, 1.0, i as f64)),
                &mut feed,
            );
        }
        assert_eq!(s.buffered(), 3);
        assert!(s.handle(SessionEvent::StopTracking, &mut feed));
        assert_eq!(s.state(), SessionState::Reporting);
        assert_eq!(s.buffered(), 0);

        let report = s.report().unwrap();
        assert_eq!(report.samples().len(), 3);
        assert!(report.samples().iter().all(|smp| smp.x != 9.0));

        s.handle(SessionEvent::SampleArrived(GazeSample::new(5.0, 5.0, 9.0)), &mut feed);
        assert_eq!(s.report().unwrap().samples().len(), 3);

        assert!(s.handle(SessionEvent::DismissReport, &mut feed));
        assert!(s.report().is_none());
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.has_calibrated());
    }

    #[test]
    fn immediate_stop_yields_empty_report() {
        let mut s = ready_session(1);
        let mut feed = RecordingFeed::default();
        calibrate(&mut s, &mut feed);
        s.handle(SessionEvent::BeginTracking, &mut feed);
        s.handle(SessionEvent::StopTracking, &mut feed);
        assert!(s.report().unwrap().samples().is_empty());
    }

    #[test]
    fn recalibration_resets_progress() {
        let mut s = ready_session(2);
        let mut feed = RecordingFeed::default();
        calibrate(&mut s, &mut feed);
        assert_eq!(s.tracker().progress(), 1.0);

        assert!(s.handle(SessionEvent::StartCalibration, &mut feed));
        assert_eq!(s.tracker().progress(), 0.0);
        assert!(s.tracker().targets().iter().all(|t| t.confirm_count == 0));
    }

    #[test]
    fn cancel_calibration_keeps_previous_arming() {
        let mut s = ready_session(1);
        let mut feed = RecordingFeed::default();
        calibrate(&mut s, &mut feed);

        s.handle(SessionEvent::StartCalibration, &mut feed);
        assert!(s.handle(SessionEvent::CancelCalibration, &mut feed));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.has_calibrated());
    }

    #[test]
    fn last_gaze_tracks_every_sample() {
        let mut s = ready_session(1);
        let mut feed = RecordingFeed::default();
        s.handle(SessionEvent::SampleArrived(GazeSample::new(3.0, 4.0, 5.0)), &mut feed);
        assert_eq!(s.last_gaze(), Some(GazeSample::new(3.0, 4.0, 5.0)));
        assert_eq!(s.buffered(), 0);
    }
}
