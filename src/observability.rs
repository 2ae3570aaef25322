use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("tutor.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("tutor.client.request_errors");
pub(crate) static CLIENT_TTFB: Moments = Moments::new("tutor.client.ttfb_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("tutor.stream.chunks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("tutor.stream.bytes");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("tutor.stream.errors");

pub(crate) static TURNS: Counter = Counter::new("tutor.session.turns");
pub(crate) static TURNS_SKIPPED: Counter = Counter::new("tutor.session.turns_skipped");
pub(crate) static TURNS_FAILED: Counter = Counter::new("tutor.session.turns_failed");
pub(crate) static TURNS_INTERRUPTED: Counter = Counter::new("tutor.session.turns_interrupted");
pub(crate) static TURN_DURATION: Moments = Moments::new("tutor.session.turn_duration_seconds");
pub(crate) static STYLE_CHANGES: Counter = Counter::new("tutor.session.style_changes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_TTFB);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&TURNS);
    collector.register_counter(&TURNS_SKIPPED);
    collector.register_counter(&TURNS_FAILED);
    collector.register_counter(&TURNS_INTERRUPTED);
    collector.register_moments(&TURN_DURATION);
    collector.register_counter(&STYLE_CHANGES);
}
