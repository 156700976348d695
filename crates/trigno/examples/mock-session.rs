//! Runs a mock station on ephemeral ports and records one second from it.
//!
//! ```sh
//! cargo run -p trigno --example mock-session
//! ```

use std::time::Duration;

use trigno::mock::{MockStation, StationConfig};
use trigno::{PortMap, SessionConfig, TrignoClient};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let station = MockStation::bind(StationConfig::new("127.0.0.1").with_ports(PortMap::ephemeral()))?
        .spawn()?;

    let config = SessionConfig::new("127.0.0.1")
        .with_ports(station.ports())
        .with_timeout(Some(Duration::from_millis(500)));
    let mut client = TrignoClient::connect(&config)?;
    println!("connected: {}", client.greeting());
    println!("sensor 1 paired: {}", client.pair_sensor(1)?);

    client.start()?;
    let mut samples = 0;
    for _ in 0..10 {
        samples += client.read_primary(Some(400))?.samples();
        client.read_auxiliary(Some(400))?;
    }
    client.stop()?;
    samples += client.read_primary(None)?.samples();
    client.close();

    let summary = station.join()?;
    println!(
        "received {samples} primary samples, station sent {}",
        summary.primary_blocks
    );
    Ok(())
}
