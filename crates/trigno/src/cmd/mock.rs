use serde::Serialize;
use trigno_mock::{MockStation, StationConfig, StationSummary};

use crate::cmd::{parse_timeout, MockArgs};
use crate::exit::{station_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Serialize)]
struct MockOutput {
    commands: usize,
    acquisitions: usize,
    primary_blocks: u64,
    auxiliary_blocks: u64,
}

impl From<StationSummary> for MockOutput {
    fn from(summary: StationSummary) -> Self {
        Self {
            commands: summary.commands,
            acquisitions: summary.acquisitions,
            primary_blocks: summary.primary_blocks,
            auxiliary_blocks: summary.auxiliary_blocks,
        }
    }
}

pub fn run(args: MockArgs, format: OutputFormat) -> CliResult<i32> {
    let (primary, auxiliary) = args.channels.layouts()?;
    let config = StationConfig::new(args.host)
        .with_ports(args.channels.ports())
        .with_sample_rate(args.rate)
        .with_primary_layout(primary)
        .with_auxiliary_layout(auxiliary)
        .with_greeting(args.greeting)
        .with_write_timeout(parse_timeout(&args.write_timeout)?);

    let station = MockStation::bind(config).map_err(|err| station_error("bind failed", err))?;
    let summary = station
        .run()
        .map_err(|err| station_error("station failed", err))?;

    print_summary(&summary.into(), format);
    Ok(SUCCESS)
}

fn print_summary(out: &MockOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = table(["COMMANDS", "ACQUISITIONS", "PRIMARY BLOCKS", "AUX BLOCKS"]);
            table.add_row(vec![
                out.commands.to_string(),
                out.acquisitions.to_string(),
                out.primary_blocks.to_string(),
                out.auxiliary_blocks.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "commands={} acquisitions={} primary_blocks={} auxiliary_blocks={}",
                out.commands, out.acquisitions, out.primary_blocks, out.auxiliary_blocks
            );
        }
    }
}
