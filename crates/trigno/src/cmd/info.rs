use serde::Serialize;

use crate::cmd::{connect_with_retry, InfoArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Serialize)]
struct SensorStatus {
    id: u32,
    paired: bool,
}

#[derive(Serialize)]
struct InfoOutput {
    host: String,
    greeting: String,
    master_reply: String,
    sensors: Vec<SensorStatus>,
    connected: bool,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.station.session_config()?;
    let mut client = connect_with_retry(&config)?;

    let mut sensors = Vec::with_capacity(args.sensor.len());
    for id in args.sensor {
        let paired = client
            .is_paired(id)
            .map_err(|err| session_error("paired query failed", err))?;
        sensors.push(SensorStatus { id, paired });
    }

    let out = InfoOutput {
        host: config.host.clone(),
        greeting: client.greeting().to_string(),
        master_reply: client.master_reply().to_string(),
        sensors,
        connected: true,
    };
    client.close();

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            println!("Station:  {}", out.host);
            println!("Greeting: {}", out.greeting);
            println!("Master:   {}", out.master_reply);
            if !out.sensors.is_empty() {
                let mut table = table(["SENSOR", "PAIRED"]);
                for sensor in &out.sensors {
                    table.add_row(vec![sensor.id.to_string(), sensor.paired.to_string()]);
                }
                println!("{table}");
            }
        }
        OutputFormat::Pretty => {
            let sensors = out
                .sensors
                .iter()
                .map(|s| format!("{}={}", s.id, if s.paired { "paired" } else { "unpaired" }))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "host={} greeting={:?} master={:?} sensors=[{}]",
                out.host, out.greeting, out.master_reply, sensors
            );
        }
    }
}
