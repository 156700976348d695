use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("trigno {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: trigno");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("TRIGNO_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: mock={}, cli=true", cfg!(feature = "mock"));
    println!(
        "protocol: command={} primary={} auxiliary={}",
        trigno_frame::COMMAND_PORT,
        trigno_frame::PRIMARY_PORT,
        trigno_frame::AUXILIARY_PORT
    );

    Ok(SUCCESS)
}
