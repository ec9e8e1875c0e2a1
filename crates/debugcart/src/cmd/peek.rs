use debugcart_session::SessionConfig;

use crate::cmd::{open_session, PeekArgs, PortSettings};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_memory, OutputFormat};

pub fn run(args: PeekArgs, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        transfer_timeout: args.timeout,
        ..SessionConfig::default()
    };
    let mut session = open_session(port, config)?;

    let mut data = vec![0u8; usize::from(args.length)];
    session
        .read_block(&mut data, args.address)
        .map_err(|err| protocol_error("read failed", err))?;

    print_memory(args.address, &data, format);
    Ok(SUCCESS)
}
