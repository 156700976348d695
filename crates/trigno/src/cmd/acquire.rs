use std::time::Instant;

use serde::Serialize;
use tracing::info;
use trigno_frame::SampleMatrix;

use crate::cmd::{connect_with_retry, parse_duration, AcquireArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{fmt_value, print_json, table, OutputFormat};

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
struct ChannelStats {
    channel: usize,
    samples: u64,
    min: f32,
    max: f32,
    mean: f64,
}

/// Running per-channel statistics over successive reads.
#[derive(Debug)]
struct StreamStats {
    channels: Vec<Accumulator>,
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    samples: u64,
    min: f32,
    max: f32,
    sum: f64,
}

impl StreamStats {
    fn new(channels: usize) -> Self {
        Self {
            channels: vec![
                Accumulator {
                    samples: 0,
                    min: f32::INFINITY,
                    max: f32::NEG_INFINITY,
                    sum: 0.0,
                };
                channels
            ],
        }
    }

    fn add(&mut self, matrix: &SampleMatrix) {
        for (acc, row) in self.channels.iter_mut().zip(matrix.rows()) {
            for &value in row {
                acc.samples += 1;
                acc.min = acc.min.min(value);
                acc.max = acc.max.max(value);
                acc.sum += f64::from(value);
            }
        }
    }

    fn samples(&self) -> u64 {
        self.channels.first().map_or(0, |acc| acc.samples)
    }

    fn summary(&self) -> Vec<ChannelStats> {
        self.channels
            .iter()
            .enumerate()
            .map(|(channel, acc)| {
                if acc.samples == 0 {
                    return ChannelStats {
                        channel,
                        samples: 0,
                        min: 0.0,
                        max: 0.0,
                        mean: 0.0,
                    };
                }
                ChannelStats {
                    channel,
                    samples: acc.samples,
                    min: acc.min,
                    max: acc.max,
                    mean: acc.sum / acc.samples as f64,
                }
            })
            .collect()
    }
}

#[derive(Serialize)]
struct PairingResult {
    sensor: u32,
    paired: bool,
}

#[derive(Serialize)]
struct StreamOutput {
    samples: u64,
    rate_hz: f64,
    channels: Vec<ChannelStats>,
}

#[derive(Serialize)]
struct AcquireOutput {
    greeting: String,
    duration_ms: u128,
    pairing: Vec<PairingResult>,
    primary: StreamOutput,
    auxiliary: StreamOutput,
}

pub fn run(args: AcquireArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.station.session_config()?;
    let duration = parse_duration(&args.duration)?;
    if args.chunk == 0 {
        return Err(CliError::new(USAGE, "--chunk must be greater than zero"));
    }

    let mut client = connect_with_retry(&config)?;

    let mut pairing = Vec::with_capacity(args.pair.len());
    for sensor in args.pair {
        let paired = client
            .pair_sensor(sensor)
            .map_err(|err| session_error("pairing failed", err))?;
        info!(sensor, paired, "pairing finished");
        pairing.push(PairingResult { sensor, paired });
    }

    let mut primary = StreamStats::new(config.primary.channels());
    let mut auxiliary = StreamStats::new(config.auxiliary.channels());

    client
        .start()
        .map_err(|err| session_error("start failed", err))?;
    let started = Instant::now();

    // Keep both channels drained while acquiring so the station never stalls
    // on a full socket buffer.
    while started.elapsed() < duration {
        let block = client
            .read_primary(Some(args.chunk))
            .map_err(|err| session_error("primary read failed", err))?;
        primary.add(&block);
        let block = client
            .read_auxiliary(Some(args.chunk))
            .map_err(|err| session_error("auxiliary read failed", err))?;
        auxiliary.add(&block);
    }

    client
        .stop()
        .map_err(|err| session_error("stop failed", err))?;
    let elapsed = started.elapsed();

    let tail = client
        .read_primary(None)
        .map_err(|err| session_error("primary drain failed", err))?;
    primary.add(&tail);
    let tail = client
        .read_auxiliary(None)
        .map_err(|err| session_error("auxiliary drain failed", err))?;
    auxiliary.add(&tail);

    let greeting = client.greeting().to_string();
    client.close();

    let seconds = elapsed.as_secs_f64();
    let out = AcquireOutput {
        greeting,
        duration_ms: elapsed.as_millis(),
        pairing,
        primary: StreamOutput {
            samples: primary.samples(),
            rate_hz: primary.samples() as f64 / seconds,
            channels: primary.summary(),
        },
        auxiliary: StreamOutput {
            samples: auxiliary.samples(),
            rate_hz: auxiliary.samples() as f64 / seconds,
            channels: auxiliary.summary(),
        },
    };

    print_acquisition(&out, format);
    Ok(SUCCESS)
}

fn print_acquisition(out: &AcquireOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            println!("Station:  {}", out.greeting);
            println!("Duration: {} ms", out.duration_ms);
            for result in &out.pairing {
                println!("Sensor {}: {}", result.sensor, pairing_label(result.paired));
            }
            for (name, stream) in [("primary", &out.primary), ("auxiliary", &out.auxiliary)] {
                println!(
                    "{name}: {} samples ({:.1} Hz)",
                    stream.samples, stream.rate_hz
                );
                let mut table = table(["CHANNEL", "SAMPLES", "MIN", "MAX", "MEAN"]);
                for stats in &stream.channels {
                    table.add_row(vec![
                        stats.channel.to_string(),
                        stats.samples.to_string(),
                        fmt_value(f64::from(stats.min)),
                        fmt_value(f64::from(stats.max)),
                        fmt_value(stats.mean),
                    ]);
                }
                println!("{table}");
            }
        }
        OutputFormat::Pretty => {
            for result in &out.pairing {
                println!("sensor={} {}", result.sensor, pairing_label(result.paired));
            }
            for (name, stream) in [("primary", &out.primary), ("auxiliary", &out.auxiliary)] {
                println!(
                    "{name} samples={} rate_hz={:.1} channels={}",
                    stream.samples,
                    stream.rate_hz,
                    stream.channels.len()
                );
            }
        }
    }
}

fn pairing_label(paired: bool) -> &'static str {
    if paired {
        "paired"
    } else {
        "not paired"
    }
}
