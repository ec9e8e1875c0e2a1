use debugcart_session::SessionConfig;

use crate::cmd::{display_path, open_session, PortSettings, SyncArgs};
use crate::exit::{protocol_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_report, OutputFormat, SyncReport};

pub fn run(_args: SyncArgs, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(port, SessionConfig::default())?;
    let synced = session
        .try_sync()
        .map_err(|err| protocol_error("sync failed", err))?;

    let report = SyncReport {
        port: display_path(&port.path),
        synced,
    };
    print_report(&report, format);

    if synced {
        Ok(SUCCESS)
    } else {
        Ok(HEALTH_CHECK_FAILED)
    }
}
