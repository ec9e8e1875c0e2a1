use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("debugcart {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: debugcart");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("DEBUGCART_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("max_chunk_size: {}", debugcart_proto::MAX_CHUNK_SIZE);
    println!(
        "baud_rates: {}",
        debugcart_transport::SUPPORTED_BAUD_RATES
            .iter()
            .map(|rate| rate.to_string())
            .collect::<Vec<_>>()
            .join(",")
    );

    Ok(SUCCESS)
}
