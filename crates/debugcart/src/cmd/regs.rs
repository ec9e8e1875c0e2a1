use std::io::{Read, Write};

use debugcart_session::{Clock, DeviceSession, ProtocolError, SessionConfig};

use crate::cmd::{display_path, open_session, PortSettings, RegsArgs, SetRegsArgs};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, RegistersReport};

pub fn run(_args: RegsArgs, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(port, SessionConfig::default())?;
    let (address, repeat_counter) =
        read_registers(&mut session).map_err(|err| protocol_error("register read failed", err))?;

    print_report(
        &RegistersReport {
            port: display_path(&port.path),
            address,
            repeat_counter,
        },
        format,
    );
    Ok(SUCCESS)
}

pub fn run_set(args: SetRegsArgs, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(port, SessionConfig::default())?;

    session
        .set_address(args.address)
        .map_err(|err| protocol_error("set address failed", err))?;
    if let Some(counter) = args.counter {
        session
            .set_repeat_counter(counter)
            .map_err(|err| protocol_error("set counter failed", err))?;
    }

    let (address, repeat_counter) =
        read_registers(&mut session).map_err(|err| protocol_error("register read failed", err))?;
    if address != args.address {
        tracing::warn!(
            expected = args.address,
            actual = address,
            "address register did not take the new value"
        );
    }

    print_report(
        &RegistersReport {
            port: display_path(&port.path),
            address,
            repeat_counter,
        },
        format,
    );
    Ok(SUCCESS)
}

fn read_registers<T: Read + Write, C: Clock>(
    session: &mut DeviceSession<T, C>,
) -> Result<(u32, u16), ProtocolError> {
    let address = session.get_address()?;
    let counter = session.get_repeat_counter()?;
    Ok((address, counter))
}
