use std::f64::consts::TAU;
use std::io::Write;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};
use trigno_frame::{BlockLayout, BlockWriter, ChannelRole};

use crate::error::{Result, StationError};

/// Peak value of the synthetic signal.
const AMPLITUDE: f64 = 1.0e-3;

/// Base frequency of channel 0; channel `n` runs at `(n + 1)` times this.
const BASE_FREQUENCY_HZ: f64 = 10.0;

/// Time between blocks at `rate_hz`.
///
/// Rejects rates that are not finite and positive, and rates whose period
/// does not fit a non-zero `Duration`.
pub fn sample_period(rate_hz: f64) -> Result<Duration> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(StationError::InvalidSampleRate(rate_hz));
    }
    match Duration::try_from_secs_f64(1.0 / rate_hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(StationError::InvalidSampleRate(rate_hz)),
    }
}

/// Single-step rate controller.
///
/// The next tick is due one period after the timestamp recorded when the
/// previous block was sent. Sleep overshoot and send time are never paid
/// back, so the achieved rate can fall below the target but never exceeds
/// it. Not drift-corrected.
#[derive(Debug, Clone)]
pub struct RateController {
    period: Duration,
    deadline: Instant,
}

impl RateController {
    /// Controller whose first tick is due at `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            deadline: start,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// Record that a tick was sent at `now` and schedule the next one.
    pub fn tick(&mut self, now: Instant) {
        self.deadline = now + self.period;
    }
}

/// Fill `out` with the synthetic sample for `tick`.
///
/// Every channel carries a sine of its own frequency, so the stream is
/// deterministic and the channels are distinguishable.
pub fn synthesize(tick: u64, rate_hz: f64, out: &mut [f32]) {
    let t = tick as f64 / rate_hz;
    for (channel, value) in out.iter_mut().enumerate() {
        let frequency = BASE_FREQUENCY_HZ * (channel + 1) as f64;
        *value = (AMPLITUDE * (TAU * frequency * t).sin()) as f32;
    }
}

/// One running sample generation loop.
///
/// Stopping sends on the stop channel and joins the thread, so once
/// [`Generator::stop`] returns the loop can no longer write to the stream.
pub struct Generator {
    role: ChannelRole,
    stop: Sender<()>,
    handle: JoinHandle<u64>,
}

impl Generator {
    /// Start streaming blocks of `layout` at `rate_hz` into `stream`.
    pub fn spawn<W>(role: ChannelRole, stream: W, layout: BlockLayout, rate_hz: f64) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let period = sample_period(rate_hz)?;
        let (stop, stopped) = mpsc::channel();
        let name = format!("trigno-{role}");
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let rate = RateController::new(period, Instant::now());
                generate(role, BlockWriter::new(stream, layout), rate, rate_hz, stopped)
            })
            .map_err(|source| StationError::Spawn { name, source })?;

        debug!(channel = %role, rate_hz, "generator started");
        Ok(Self { role, stop, handle })
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    /// Signal the loop and wait for it to exit. Returns the blocks written.
    pub fn stop(self) -> Result<u64> {
        // The loop may already have exited after a write failure.
        let _ = self.stop.send(());
        let blocks = self
            .handle
            .join()
            .map_err(|_| StationError::GeneratorPanicked(self.role))?;
        debug!(channel = %self.role, blocks, "generator stopped");
        Ok(blocks)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator").field("role", &self.role).finish()
    }
}

fn generate<W: Write>(
    role: ChannelRole,
    mut writer: BlockWriter<W>,
    mut rate: RateController,
    rate_hz: f64,
    stopped: Receiver<()>,
) -> u64 {
    let mut values = vec![0.0f32; writer.layout().channels()];
    let mut tick = 0u64;

    loop {
        match stopped.recv_timeout(rate.remaining(Instant::now())) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        synthesize(tick, rate_hz, &mut values);
        tick += 1;

        match writer.write_block(&values) {
            Ok(()) => {}
            Err(err) if err.is_timeout() => {
                trace!(channel = %role, pending = writer.pending(), "data channel stalled");
            }
            Err(err) => {
                warn!(channel = %role, error = %err, "data channel write failed, generator exiting");
                return writer.blocks_written();
            }
        }
        rate.tick(Instant::now());
    }

    if writer.pending() > 0 {
        if let Err(err) = writer.drain() {
            warn!(channel = %role, error = %err, "final block left incomplete");
        }
    }
    writer.blocks_written()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use trigno_frame::decode_blocks;

    use super::*;

    #[test]
    fn first_tick_is_due_immediately() {
        let start = Instant::now();
        let rate = RateController::new(sample_period(4000.0).unwrap(), start);
        assert_eq!(rate.remaining(start), Duration::ZERO);
        assert_eq!(rate.period(), Duration::from_micros(250));
    }

    #[test]
    fn late_send_waits_a_full_period() {
        let start = Instant::now();
        let mut rate = RateController::new(Duration::from_millis(1), start);

        // Sent 300us after it was due: the overshoot is not paid back.
        let sent = start + Duration::from_micros(300);
        rate.tick(sent);
        assert_eq!(rate.remaining(sent), Duration::from_millis(1));
        assert_eq!(
            rate.remaining(sent + Duration::from_micros(400)),
            Duration::from_micros(600)
        );
    }

    #[test]
    fn falling_behind_does_not_catch_up() {
        let start = Instant::now();
        let mut rate = RateController::new(Duration::from_millis(1), start);

        let late = start + Duration::from_millis(5);
        rate.tick(late);
        assert_eq!(rate.remaining(late), Duration::from_millis(1));
    }

    #[test]
    fn steady_overshoot_lowers_the_rate() {
        let period = sample_period(4000.0).unwrap();
        let overshoot = Duration::from_micros(100);
        let start = Instant::now();
        let mut rate = RateController::new(period, start);
        let mut now = start;
        for _ in 0..4000 {
            now += rate.remaining(now) + overshoot;
            rate.tick(now);
        }

        let achieved = 4000.0 / (now - start).as_secs_f64();
        assert!(achieved < 4000.0, "achieved {achieved} Hz");
        assert!((achieved - 1.0 / 350e-6).abs() < 2.0, "achieved {achieved} Hz");
    }

    #[test]
    fn ticks_never_outpace_the_period() {
        let start = Instant::now();
        let mut rate = RateController::new(sample_period(100.0).unwrap(), start);
        let mut now = start;
        for _ in 0..50 {
            now += rate.remaining(now);
            rate.tick(now);
        }
        assert!(now - start >= Duration::from_millis(490));
    }

    #[test]
    fn unusable_rates_rejected() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-30, 1e300] {
            assert!(
                matches!(sample_period(rate), Err(StationError::InvalidSampleRate(_))),
                "rate {rate} accepted"
            );
        }
        assert_eq!(sample_period(0.5).unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn synthetic_channels_differ_and_repeat() {
        let mut a = [0.0f32; 4];
        let mut b = [0.0f32; 4];
        synthesize(37, 4000.0, &mut a);
        synthesize(37, 4000.0, &mut b);
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
        assert!(a.iter().all(|v| v.abs() <= AMPLITUDE as f32));

        synthesize(0, 4000.0, &mut a);
        assert_eq!(a, [0.0; 4]);
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stop_joins_and_reports_whole_blocks() {
        let sink = SharedSink::default();
        let layout = BlockLayout::new(3).unwrap();
        let generator =
            Generator::spawn(ChannelRole::Primary, sink.clone(), layout, 2000.0).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let blocks = generator.stop().unwrap();

        let wire = sink.0.lock().unwrap().clone();
        assert!(blocks > 0);
        assert_eq!(wire.len() as u64, blocks * layout.block_size() as u64);

        // Nothing is written after stop returns.
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(sink.0.lock().unwrap().len(), wire.len());

        let matrix = decode_blocks(&wire, layout);
        let mut expected = [0.0f32; 3];
        synthesize(1, 2000.0, &mut expected);
        assert_eq!(matrix.block(1).unwrap(), expected.to_vec());
    }

    enum Step {
        Accept(usize),
        Stall,
    }

    /// Follows a fixed script of partial writes and timeouts, then accepts
    /// everything.
    #[derive(Clone)]
    struct ScriptedSink {
        script: Arc<Mutex<VecDeque<Step>>>,
        wire: Arc<Mutex<Vec<u8>>>,
    }

    impl Write for ScriptedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = match self.script.lock().unwrap().pop_front() {
                Some(Step::Stall) => {
                    return Err(std::io::Error::from(std::io::ErrorKind::WouldBlock))
                }
                Some(Step::Accept(n)) => n.min(buf.len()),
                None => buf.len(),
            };
            self.wire.lock().unwrap().extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stalled_writes_still_count_every_block() {
        let sink = ScriptedSink {
            script: Arc::new(Mutex::new(VecDeque::from([
                Step::Accept(2),
                Step::Stall,
                Step::Accept(2),
                Step::Accept(1),
                Step::Stall,
            ]))),
            wire: Arc::default(),
        };
        let layout = BlockLayout::new(1).unwrap();
        let generator =
            Generator::spawn(ChannelRole::Primary, sink.clone(), layout, 1000.0).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let blocks = generator.stop().unwrap();

        let wire = sink.wire.lock().unwrap().len() as u64;
        assert!(blocks >= 3);
        assert_eq!(wire, blocks * layout.block_size() as u64);
    }

    #[test]
    fn write_failure_ends_the_loop() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let generator = Generator::spawn(
            ChannelRole::Auxiliary,
            Broken,
            BlockLayout::new(1).unwrap(),
            1000.0,
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(generator.stop().unwrap(), 0);
    }
}
