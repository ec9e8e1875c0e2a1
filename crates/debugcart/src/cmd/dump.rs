use debugcart_session::{LoadLayout, SessionConfig};
use tracing::warn;

use crate::cmd::{display_path, open_session, DumpArgs, PortSettings};
use crate::exit::{loader_error, protocol_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_report, OutputFormat, TransferReport};

pub fn run(args: DumpArgs, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        transfer_timeout: args.timeout,
        ..SessionConfig::default()
    };
    let mut session = open_session(port, config)?;

    let synced_before = session
        .try_sync()
        .map_err(|err| protocol_error("sync failed", err))?;
    if !synced_before {
        warn!("device did not answer sync before dump");
    }

    let bytes = session
        .dump_to_file(&args.file, args.address, args.length)
        .map_err(|err| loader_error("dump failed", err))?;

    let synced_after = session
        .try_sync()
        .map_err(|err| protocol_error("sync failed", err))?;

    print_report(
        &TransferReport {
            operation: "dump",
            file: display_path(&args.file),
            start_address: args.address,
            layout: LoadLayout::Linear.name(),
            bytes,
            synced_before,
            synced_after,
        },
        format,
    );

    if synced_after {
        Ok(SUCCESS)
    } else {
        Ok(HEALTH_CHECK_FAILED)
    }
}
